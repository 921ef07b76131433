//! 推文接口。
//!
//! - GET /api/tweets：缓存优先，未命中时带 token 轮换拉取 Twitter
//! - GET /health

mod handler;
mod service;

pub use handler::{FeedState, handle_health, handle_tweets};
pub use service::FeedService;

use crate::twitter::client::Transport;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

pub fn router<T: Transport>(state: Arc<FeedState<T>>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/tweets", get(handle_tweets::<T>))
        .with_state(state)
}
