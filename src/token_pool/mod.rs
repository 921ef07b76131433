//! Token 池模块。
//!
//! 多个 bearer token 共同承载上游请求：按响应头跟踪每个 token 的剩余额度，
//! 轮换时跳过已耗尽且未到重置时间的 token。

mod rotator;
mod selector;
mod tracker;
mod types;

pub use rotator::TokenRotator;
pub use tracker::{HEADER_RATE_LIMIT_REMAINING, HEADER_RATE_LIMIT_RESET, parse_rate_limit_headers};
pub use types::{AllTokensExhausted, RateLimitState, TokenPool};
