use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{Path as UrlPath, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

pub type ApiError = (StatusCode, Json<Value>);

#[derive(Clone, Debug)]
pub struct ApiState {
    snapshot: Arc<PathBuf>,
}

impl ApiState {
    pub fn new(snapshot: PathBuf) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> &Path {
        &self.snapshot
    }
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

/// `null`, `false`, `0`, `""`, `[]` and `{}` count as no data.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Reads the snapshot file afresh. Missing or unreadable means no data.
pub async fn read_snapshot(path: &Path) -> Option<Value> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::error!(target: "api", "error reading {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(data) => (!is_blank(&data)).then_some(data),
        Err(e) => {
            tracing::error!(target: "api", "error parsing {}: {e}", path.display());
            None
        }
    }
}

pub async fn students(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    tracing::info!(target: "api", "GET /api/students");
    read_snapshot(state.snapshot())
        .await
        .map(Json)
        .ok_or_else(|| not_found("No data available"))
}

pub async fn student(
    State(state): State<ApiState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(target: "api", "GET /api/students/{id}");
    let mut data = read_snapshot(state.snapshot())
        .await
        .ok_or_else(|| not_found("No data available"))?;

    data.get_mut("students")
        .and_then(|students| students.get_mut(&id))
        .map(Value::take)
        .filter(|s| !is_blank(s))
        .map(Json)
        .ok_or_else(|| not_found("Student not found"))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/students", get(students))
        .route("/api/students/{id}", get(student))
        .route("/api/health", get(health))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values() {
        for v in [json!(null), json!({}), json!([]), json!(""), json!(0), json!(false)] {
            assert!(is_blank(&v), "{v}");
        }
        for v in [json!({ "a": 1 }), json!([0]), json!("x"), json!(1), json!(true)] {
            assert!(!is_blank(&v), "{v}");
        }
    }
}
