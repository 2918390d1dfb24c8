// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::application::coordinator::{
    AgentHistory, AgentSummary, CallAgentRequest, CapabilityRouteRequest, CoordinatorService,
    DiscoverResponse, FullHealth, HealthReport, Liveness,
};
use crate::domain::agent::HealthState;
use crate::domain::error::CoordinatorError;
use crate::domain::routing::{AgentResponse, AggregatedResult, RouteOutcome, SearchRequest, SearchResult};

pub struct AppState {
    pub coordinator: Arc<CoordinatorService>,
}

pub fn app(coordinator: Arc<CoordinatorService>) -> Router {
    let state = Arc::new(AppState { coordinator });

    Router::new()
        .route("/health", get(liveness_handler))
        .route("/health/full", get(full_health_handler))
        .route("/api/agents", get(list_agents_handler))
        .route("/api/agents/{name}", get(get_agent_handler))
        .route("/api/agents/{name}/history", get(agent_history_handler))
        .route("/api/agents/{name}/check", post(check_agent_handler))
        .route("/api/health", get(health_report_handler))
        .route("/api/health/critical", get(critical_agents_handler))
        .route("/api/call", post(call_agent_handler))
        .route("/api/search", post(search_handler))
        .route("/api/capabilities/{capability}/route", post(capability_route_handler))
        .route("/api/handoff/{name}", post(handoff_handler))
        .route("/api/discover", post(discover_handler))
        .route("/api/events", get(stream_events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Coordinator error rendered as `{error, kind}` with a mapped status.
#[derive(Debug)]
pub struct ApiError(pub CoordinatorError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CoordinatorError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            CoordinatorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::AgentUnavailable { .. } => StatusCode::BAD_GATEWAY,
            CoordinatorError::AgentTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CoordinatorError::NoAgentsForCapability(_) => StatusCode::NOT_FOUND,
            CoordinatorError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(error: CoordinatorError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CoordinatorError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(kind = self.0.kind(), "Request failed: {}", self.0);
        }
        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
struct AgentListQuery {
    capability: Option<String>,
    status: Option<String>,
}

async fn liveness_handler(State(state): State<Arc<AppState>>) -> Json<Liveness> {
    Json(state.coordinator.liveness())
}

async fn full_health_handler(State(state): State<Arc<AppState>>) -> Json<FullHealth> {
    Json(state.coordinator.full_health())
}

async fn list_agents_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentListQuery>,
) -> ApiResult<Vec<AgentSummary>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<HealthState>)
        .transpose()
        .map_err(CoordinatorError::InvalidRequest)?;
    let capability = query.capability.as_deref().filter(|c| !c.is_empty());

    Ok(Json(state.coordinator.list_agents(capability, status)))
}

async fn get_agent_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<AgentSummary> {
    Ok(Json(state.coordinator.get_agent(&name)?))
}

async fn agent_history_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<AgentHistory> {
    Ok(Json(state.coordinator.agent_history(&name)?))
}

async fn check_agent_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<AgentSummary> {
    Ok(Json(state.coordinator.check_agent(&name).await?))
}

async fn health_report_handler(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.coordinator.get_health_report())
}

async fn critical_agents_handler(State(state): State<Arc<AppState>>) -> Json<Vec<AgentSummary>> {
    Json(state.coordinator.critical_agents())
}

async fn call_agent_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CallAgentRequest>, JsonRejection>,
) -> ApiResult<RouteOutcome> {
    let Json(request) = payload?;
    Ok(Json(state.coordinator.call_agent(request).await?))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResult> {
    let Json(request) = payload?;
    Ok(Json(state.coordinator.search_multi(request).await?))
}

async fn capability_route_handler(
    State(state): State<Arc<AppState>>,
    Path(capability): Path<String>,
    payload: Result<Json<CapabilityRouteRequest>, JsonRejection>,
) -> ApiResult<AggregatedResult> {
    let Json(request) = payload?;
    Ok(Json(
        state
            .coordinator
            .route_by_capability(&capability, request)
            .await?,
    ))
}

async fn handoff_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AgentResponse> {
    let Json(payload) = payload?;
    Ok(Json(state.coordinator.handoff(&name, payload).await?))
}

async fn discover_handler(State(state): State<Arc<AppState>>) -> ApiResult<DiscoverResponse> {
    Ok(Json(state.coordinator.rediscover()?))
}

#[derive(Debug, Deserialize)]
struct EventStreamQuery {
    agent: Option<String>,
}

async fn stream_events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let agent = query.agent.filter(|a| !a.is_empty());
    let events = state
        .coordinator
        .subscribe_events()
        .into_stream()
        .filter_map(move |received| match received {
            Ok(event) if agent.as_deref().is_none_or(|a| event.concerns(a)) => {
                Some(Event::default().event(event.name()).json_data(&event))
            }
            Ok(_) => None,
            // Lagged receivers skip the dropped events
            Err(_) => None,
        });

    // Ends once the gateway starts shutting down
    let stream = futures::StreamExt::take_until(
        events,
        state.coordinator.shutdown_token().cancelled_owned(),
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}
