//! 选择算法：从轮询指针开始按池顺序扫描，取第一个可用 token。
//!
//! 贪心、偏向轮询，不保证全局公平：并列时总是优先指针处及其之后的 token。

use crate::token_pool::tracker::RateLimitTracker;
use crate::token_pool::types::{AllTokensExhausted, TokenPool};
use chrono::{DateTime, Utc};

/// 返回被选中 token 的池下标。
pub fn next(
    pool: &TokenPool,
    tracker: &RateLimitTracker,
    start: usize,
    now: DateTime<Utc>,
) -> Result<usize, AllTokensExhausted> {
    let len = pool.len();
    for offset in 0..len {
        let idx = (start + offset) % len;
        let Some(token) = pool.get(idx) else {
            continue;
        };
        if tracker.is_available(token, now) {
            return Ok(idx);
        }
    }

    // 走到这里说明每个 token 都有记录，earliest_reset 必然存在。
    let reset_at = tracker.earliest_reset(pool).unwrap_or(now);
    Err(AllTokensExhausted { reset_at })
}
