use axum::{extract::State, http::StatusCode, response::Response};

use crate::handlers::AppState;

pub async fn render(State(state): State<AppState>) -> Result<Response<String>, StatusCode> {
    if let Ok(depth) = state.queue.depth().await {
        state.metrics.set_queue_depth(depth);
    }

    match state.metrics.render() {
        Ok(body) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/plain; version=0.0.4")
            .body(body)
            .unwrap_or_default()),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
