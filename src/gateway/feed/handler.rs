use super::service::FeedService;
use crate::logging::{self, LogLevel};
use crate::twitter::client::Transport;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;

pub struct FeedState<T> {
    pub service: FeedService<T>,
    pub log_level: LogLevel,
}

/// GET /api/tweets
///
/// 成功返回 200 + 归一化后的推文；任何失败都降级为 500 + `{"error": "..."}`。
pub async fn handle_tweets<T: Transport>(State(state): State<Arc<FeedState<T>>>) -> Response {
    let start = Instant::now();

    let resp = match state.service.latest().await {
        Ok(body) => (StatusCode::OK, Json(&*body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "获取推文失败");
            e.into_response()
        }
    };

    if state.log_level.client_enabled() {
        logging::client_response(resp.status().as_u16(), start.elapsed());
    }
    resp
}

pub async fn handle_health() -> &'static str {
    "ok"
}
