use crate::token_pool::types::{RateLimitState, TokenPool};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::collections::HashMap;

pub const HEADER_RATE_LIMIT_REMAINING: &str = "x-rate-limit-remaining";
pub const HEADER_RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

/// token -> 最近一次观测到的限流状态。仅存在内存中，重启后全部视为未知。
#[derive(Debug, Default, Clone)]
pub struct RateLimitTracker {
    limits: HashMap<String, RateLimitState>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, token: &str, remaining: u32, reset_at: DateTime<Utc>) {
        self.limits.insert(
            token.to_string(),
            RateLimitState {
                remaining,
                reset_at,
            },
        );
    }

    /// 从响应头更新状态；任一头缺失或非数字时保留原状态，返回是否写入。
    pub fn record_headers(&mut self, token: &str, headers: &HeaderMap) -> bool {
        match parse_rate_limit_headers(headers) {
            Some((remaining, reset_at)) => {
                self.record(token, remaining, reset_at);
                true
            }
            None => false,
        }
    }

    /// None 表示从未观测过（视为可用）。
    pub fn get(&self, token: &str) -> Option<&RateLimitState> {
        self.limits.get(token)
    }

    pub fn is_available(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.get(token).is_none_or(|s| s.is_available(now))
    }

    /// 池内已记录 token 的最早重置时间。
    pub fn earliest_reset(&self, pool: &TokenPool) -> Option<DateTime<Utc>> {
        pool.iter()
            .filter_map(|t| self.get(t))
            .map(|s| s.reset_at)
            .min()
    }
}

/// 解析 x-rate-limit-remaining / x-rate-limit-reset（epoch 秒）。
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> Option<(u32, DateTime<Utc>)> {
    let remaining = header_number::<u32>(headers, HEADER_RATE_LIMIT_REMAINING)?;
    let reset_secs = header_number::<i64>(headers, HEADER_RATE_LIMIT_RESET)?;
    let reset_at = DateTime::<Utc>::from_timestamp(reset_secs, 0)?;
    Some((remaining, reset_at))
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse::<T>().ok()
}
