use crate::error::AppError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// 单个 token 最近一次观测到的限流状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    /// 当前窗口剩余请求数。
    pub remaining: u32,
    /// 窗口重置时间。
    pub reset_at: DateTime<Utc>,
}

impl RateLimitState {
    /// remaining=0 且尚未到 reset_at 时不可用。
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.remaining > 0 || self.reset_at <= now
    }
}

/// 所有 token 均被限流；reset_at 为最早的重置时间。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllTokensExhausted {
    pub reset_at: DateTime<Utc>,
}

/// 进程生命周期内固定不变的 token 池。
#[derive(Debug, Clone)]
pub struct TokenPool {
    tokens: Arc<[String]>,
}

impl TokenPool {
    pub fn new(tokens: Vec<String>) -> Result<Self, AppError> {
        if tokens.is_empty() {
            return Err(AppError::config(
                "未找到可用的 Twitter token，请设置 TWITTER_BEARER_TOKEN_1..3 或 TWITTER_BEARER_TOKENS",
            ));
        }
        Ok(Self {
            tokens: tokens.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}
