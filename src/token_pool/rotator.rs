use crate::token_pool::selector;
use crate::token_pool::tracker::RateLimitTracker;
use crate::token_pool::types::{AllTokensExhausted, RateLimitState, TokenPool};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tokio::sync::RwLock;

/// Token 轮换器：持有固定的 token 池，以及共享的限流视图和轮询指针。
///
/// 限流表与指针放在同一把锁下，保证并发请求看不到半更新的状态。
#[derive(Debug)]
pub struct TokenRotator {
    pool: TokenPool,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tracker: RateLimitTracker,
    cursor: usize,
}

impl TokenRotator {
    pub fn new(pool: TokenPool) -> Self {
        Self {
            pool,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// 选择下一个 token，并把轮询指针移到它上面。返回 (下标, token)。
    pub async fn select(&self, now: DateTime<Utc>) -> Result<(usize, String), AllTokensExhausted> {
        let mut inner = self.inner.write().await;
        let idx = selector::next(&self.pool, &inner.tracker, inner.cursor, now)?;
        inner.cursor = idx;
        let token = self.pool.get(idx).unwrap_or_default().to_string();
        Ok((idx, token))
    }

    /// 把指针移到 index 的下一个位置。
    pub async fn advance_past(&self, index: usize) {
        let mut inner = self.inner.write().await;
        inner.cursor = (index + 1) % self.pool.len();
    }

    pub async fn observe_headers(&self, token: &str, headers: &HeaderMap) -> bool {
        let mut inner = self.inner.write().await;
        inner.tracker.record_headers(token, headers)
    }

    /// 强制标记耗尽（用于 429）。
    pub async fn mark_exhausted(&self, token: &str, reset_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.tracker.record(token, 0, reset_at);
    }

    pub async fn state(&self, token: &str) -> Option<RateLimitState> {
        let inner = self.inner.read().await;
        inner.tracker.get(token).copied()
    }

    pub async fn earliest_reset(&self) -> Option<DateTime<Utc>> {
        let inner = self.inner.read().await;
        inner.tracker.earliest_reset(&self.pool)
    }

    #[cfg(test)]
    pub(crate) async fn cursor(&self) -> usize {
        self.inner.read().await.cursor
    }
}
