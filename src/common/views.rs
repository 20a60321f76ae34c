//! Ambient routes that aren't part of the archive pipeline itself: the
//! Kubernetes-style health check the teacher's own services expose.

use axum::{Json, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
}

/// Does not touch the registry or the object store; a 200 here only means
/// the process is up and serving, not that its collaborators are healthy.
pub async fn healthz() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!(HealthCheck { status: "ok".to_string() })))
}
