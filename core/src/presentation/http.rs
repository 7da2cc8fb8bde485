// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Debug/introspection HTTP surface (C8, §4.8): a read-only view over the KV
//! store, bound only when `ENV != test` (§6). Every response carries the
//! absolute database path and a dev-vs-test badge so "one agent in the UI,
//! two in my test" confusion has a one-glance answer.

use crate::domain::kind::Kind;
use crate::domain::repository::KvStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct DebugState {
    pub store: Arc<dyn KvStore>,
    pub db_path: String,
}

/// §4.8: a path under `/tmp/` or containing `test` is flagged as a test
/// database; anything else is a dev database.
fn is_test_database(db_path: &str) -> bool {
    db_path.contains("/tmp/") || db_path.contains("test")
}

fn badge(db_path: &str) -> &'static str {
    if is_test_database(db_path) {
        "test database"
    } else {
        "dev database"
    }
}

pub fn router(state: Arc<DebugState>) -> Router {
    Router::new()
        .route("/debug", get(index))
        .route("/debug/{kind}", get(list_kind))
        .route("/debug/{kind}/{id}", get(get_by_id))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn index(State(state): State<Arc<DebugState>>) -> impl IntoResponse {
    Json(json!({
        "db_path": state.db_path,
        "badge": badge(&state.db_path),
        "kinds": Kind::ALL.iter().map(|k| k.wire_name()).collect::<Vec<_>>(),
    }))
}

async fn list_kind(State(state): State<Arc<DebugState>>, Path(kind): Path<String>) -> impl IntoResponse {
    let Some(kind) = Kind::parse(&kind) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": format!("unknown kind '{kind}'")}))).into_response();
    };
    match state.store.list(kind).await {
        Ok(raw) => {
            let values: Vec<serde_json::Value> = raw
                .iter()
                .map(|bytes| serde_json::from_slice(bytes).unwrap_or(serde_json::Value::Null))
                .collect();
            Json(json!({
                "db_path": state.db_path,
                "badge": badge(&state.db_path),
                "kind": kind.wire_name(),
                "count": values.len(),
                "resources": values,
            }))
            .into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()}))).into_response(),
    }
}

async fn get_by_id(State(state): State<Arc<DebugState>>, Path((kind, id)): Path<(String, String)>) -> impl IntoResponse {
    let Some(kind) = Kind::parse(&kind) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": format!("unknown kind '{kind}'")}))).into_response();
    };
    match state.store.get(kind, &id).await {
        Ok(Some(bytes)) => {
            let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            Json(json!({
                "db_path": state.db_path,
                "badge": badge(&state.db_path),
                "kind": kind.wire_name(),
                "resource": value,
            }))
            .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({"error": format!("{kind} '{id}' not found")}))).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()}))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_is_flagged_test() {
        assert!(is_test_database("/tmp/stigmerd-abc123/db"));
        assert_eq!(badge("/tmp/stigmerd-abc123/db"), "test database");
    }

    #[test]
    fn home_path_is_flagged_dev() {
        assert!(!is_test_database("/home/alice/.stigmer/db"));
        assert_eq!(badge("/home/alice/.stigmer/db"), "dev database");
    }
}
