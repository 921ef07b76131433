use crate::cache::ResponseCache;
use crate::error::AppError;
use crate::twitter::client::{TimelineEndpoint, Transport, TwitterClient};
use crate::twitter::types::{NormalizedResponse, TimelineResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// 推文服务：缓存优先，未命中时带 token 轮换拉取上游并归一化。
///
/// 所有可变状态（限流表、轮询指针、缓存槽位）都挂在实例上，进程内构造一次后注入路由。
#[derive(Debug)]
pub struct FeedService<T> {
    client: TwitterClient<T>,
    endpoint: TimelineEndpoint,
    cache: ResponseCache<NormalizedResponse>,
    /// 未命中时串行化刷新，并发请求只触发一次上游调用。
    refresh: Mutex<()>,
}

impl<T: Transport> FeedService<T> {
    pub fn new(client: TwitterClient<T>, endpoint: TimelineEndpoint, cache_ttl: Duration) -> Self {
        Self {
            client,
            endpoint,
            cache: ResponseCache::new(cache_ttl),
            refresh: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &TwitterClient<T> {
        &self.client
    }

    pub async fn latest(&self) -> Result<Arc<NormalizedResponse>, AppError> {
        if let Some(hit) = self.cache.read() {
            tracing::debug!("推文缓存命中");
            return Ok(hit);
        }

        let _guard = self.refresh.lock().await;
        // 等锁期间可能已有其他请求写好了缓存。
        if let Some(hit) = self.cache.read() {
            return Ok(hit);
        }

        let raw: TimelineResponse = self.client.get_json(&self.endpoint.url()).await?;
        let normalized = NormalizedResponse::from(raw);
        if let Some(err) = &normalized.error {
            tracing::warn!(error = %err, "Twitter 返回了部分错误");
        }
        tracing::info!(posts = normalized.posts.len(), "已刷新推文缓存");

        Ok(self.cache.write(normalized))
    }
}
