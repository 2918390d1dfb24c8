// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Merging of fanned-out agent responses.

use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::routing::{AgentResponse, AggregatedResult, DedupKey};

/// Object fields that may hold an agent's result list, checked in order.
pub const LIST_FIELDS: [&str; 4] = ["results", "candidates", "items", "data"];

/// Records carried by a list-shaped body, if any.
pub fn extract_records(body: &Value) -> Option<&[Value]> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(map) => LIST_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))
            .map(Vec::as_slice),
        _ => None,
    }
}

/// Concatenate the records of all successful responses, keeping the first
/// occurrence of each identity.
pub fn merge_results(responses: &[AgentResponse], key: &DedupKey) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for response in responses.iter().filter(|r| r.is_success()) {
        let Some(records) = response.body().and_then(extract_records) else {
            continue;
        };
        for record in records {
            if seen.insert(key.identity(record)) {
                merged.push(record.clone());
            }
        }
    }

    merged
}

/// Build an [`AggregatedResult`] from responses in request order.
pub fn aggregate(responses: Vec<AgentResponse>, key: &DedupKey) -> AggregatedResult {
    let successful_count = responses.iter().filter(|r| r.is_success()).count();
    let failed_count = responses.len() - successful_count;
    let results = merge_results(&responses, key);

    AggregatedResult {
        request_id: Uuid::new_v4(),
        responses,
        successful_count,
        failed_count,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::CallOutcome;
    use serde_json::json;

    fn ok(agent: &str, body: Value) -> AgentResponse {
        AgentResponse::new(agent, CallOutcome::from_status(200, Some(body)))
    }

    #[test]
    fn test_extract_records_shapes() {
        assert_eq!(extract_records(&json!([1, 2])).map(<[Value]>::len), Some(2));
        assert_eq!(
            extract_records(&json!({"candidates": [{"id": 1}]})).map(<[Value]>::len),
            Some(1)
        );
        assert_eq!(
            extract_records(&json!({"meta": {}, "data": []})).map(<[Value]>::len),
            Some(0)
        );
        assert!(extract_records(&json!({"status": "ok"})).is_none());
        assert!(extract_records(&json!({"results": "nope"})).is_none());
        assert!(extract_records(&json!("text")).is_none());
    }

    #[test]
    fn test_merge_dedups_by_first_identity_field() {
        let responses = vec![
            ok("a", json!({"results": [{"external_id": "x1", "name": "Ada"}, {"id": 7}]})),
            ok("b", json!([{"external_id": "x1", "name": "Ada L."}, {"id": 7, "extra": true}, {"id": 8}])),
        ];

        let merged = merge_results(&responses, &DedupKey::default());
        assert_eq!(
            merged,
            vec![
                json!({"external_id": "x1", "name": "Ada"}),
                json!({"id": 7}),
                json!({"id": 8}),
            ]
        );
    }

    #[test]
    fn test_records_without_identity_use_structural_equality() {
        let responses = vec![
            ok("a", json!([{"name": "Grace", "skills": ["cobol"]}])),
            ok("b", json!([{"skills": ["cobol"], "name": "Grace"}, {"name": "Linus"}])),
        ];
        let merged = merge_results(&responses, &DedupKey::default());
        assert_eq!(merged.len(), 2);

        let merged = merge_results(&responses, &DedupKey::Structural);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_failures_are_excluded_but_counted() {
        let failed = AgentResponse::new(
            "c",
            CallOutcome::from_status(500, Some(json!([{"id": 99}]))),
        );
        let result = aggregate(
            vec![ok("a", json!([{"id": 1}])), failed, ok("b", json!({"status": "done"}))],
            &DedupKey::default(),
        );

        assert_eq!(result.successful_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.results, vec![json!({"id": 1})]);
        assert_eq!(result.agent_names(), vec!["a", "c", "b"]);
    }
}
