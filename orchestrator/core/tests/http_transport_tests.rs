// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use hiregate_core::domain::gateway_config::RoutingSettings;
use hiregate_core::domain::routing::{CallOutcome, FailureKind, HttpMethod};
use hiregate_core::domain::transport::{AgentTransport, TransportRequest};
use hiregate_core::infrastructure::http_transport::HttpAgentTransport;
use mockito::Matcher;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

fn transport() -> HttpAgentTransport {
    HttpAgentTransport::from_settings(&RoutingSettings::default()).unwrap()
}

fn request(url: String, method: HttpMethod, payload: Option<serde_json::Value>) -> TransportRequest {
    TransportRequest {
        url,
        method,
        payload,
        timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_success_with_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;

    let outcome = transport()
        .send(&request(format!("{}/health", server.url()), HttpMethod::Get, None))
        .await;

    mock.assert_async().await;
    assert_eq!(
        outcome,
        CallOutcome::Success {
            status_code: 200,
            body: Some(json!({"status": "ok"}))
        }
    );
}

#[tokio::test]
async fn test_error_status_keeps_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/search")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let outcome = transport()
        .send(&request(
            format!("{}/search", server.url()),
            HttpMethod::Post,
            Some(json!({"query": "x"})),
        ))
        .await;

    match outcome {
        CallOutcome::Failure {
            kind,
            status_code,
            body,
            ..
        } => {
            assert_eq!(kind, FailureKind::HttpStatus);
            assert_eq!(status_code, Some(503));
            assert_eq!(body, Some(json!("overloaded")));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_payload_sent_as_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/candidates")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("skill".into(), "rust".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let outcome = transport()
        .send(&request(
            format!("{}/candidates", server.url()),
            HttpMethod::Get,
            Some(json!({"skill": "rust", "limit": 5})),
        ))
        .await;

    mock.assert_async().await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_post_payload_sent_as_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/handoff")
        .match_body(Matcher::Json(json!({"candidate_id": "c-42", "stage": "interview"})))
        .with_status(202)
        .create_async()
        .await;

    let outcome = transport()
        .send(&request(
            format!("{}/handoff", server.url()),
            HttpMethod::Post,
            Some(json!({"candidate_id": "c-42", "stage": "interview"})),
        ))
        .await;

    mock.assert_async().await;
    assert_eq!(
        outcome,
        CallOutcome::Success {
            status_code: 202,
            body: None
        }
    );
}

#[tokio::test]
async fn test_refused_connection_is_unavailable() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let outcome = transport()
        .send(&request(format!("http://{}/health", addr), HttpMethod::Get, None))
        .await;

    assert!(matches!(
        outcome,
        CallOutcome::Failure {
            kind: FailureKind::Unavailable,
            status_code: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut req = request(format!("http://{}/health", addr), HttpMethod::Get, None);
    req.timeout = Duration::from_millis(150);
    let outcome = transport().send(&req).await;

    assert!(matches!(
        outcome,
        CallOutcome::Failure {
            kind: FailureKind::Timeout,
            ..
        }
    ));
}

#[tokio::test]
async fn test_oversized_body_fails_the_call() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/small")
        .with_status(200)
        .with_body("x".repeat(64))
        .create_async()
        .await;
    server
        .mock("GET", "/declared")
        .with_status(200)
        .with_body("x".repeat(256))
        .create_async()
        .await;
    server
        .mock("GET", "/streamed")
        .with_status(200)
        .with_chunked_body(|w| {
            for _ in 0..4 {
                w.write_all(&[b'x'; 64])?;
            }
            Ok(())
        })
        .create_async()
        .await;

    let transport = transport().with_max_response_bytes(100);

    let outcome = transport
        .send(&request(format!("{}/small", server.url()), HttpMethod::Get, None))
        .await;
    assert!(outcome.is_success());

    for path in ["/declared", "/streamed"] {
        let outcome = transport
            .send(&request(format!("{}{}", server.url(), path), HttpMethod::Get, None))
            .await;
        match outcome {
            CallOutcome::Failure {
                kind: FailureKind::Unavailable,
                status_code: Some(200),
                body: None,
                message,
            } => assert!(message.contains("exceeds 100 bytes"), "{path}: {message}"),
            other => panic!("{path}: expected an oversized failure, got {other:?}"),
        }
    }
}
