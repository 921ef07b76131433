use crate::config::Config;
use crate::logging;
use crate::token_pool::{AllTokensExhausted, TokenRotator, parse_rate_limit_headers};
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = "tweetboard/0.1";

/// 429 且响应头里没有可用的重置时间时，保守地冷却 15 分钟。
const RATE_LIMIT_FALLBACK_SECS: i64 = 15 * 60;

pub fn rate_limit_fallback() -> chrono::Duration {
    chrono::Duration::seconds(RATE_LIMIT_FALLBACK_SECS)
}

/// 看板拉取的固定查询。
#[derive(Debug, Clone)]
pub struct TimelineEndpoint {
    pub api_base: String,
    pub user_id: String,
    pub max_results: u32,
}

impl TimelineEndpoint {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_base: cfg.api_base.clone(),
            user_id: cfg.user_id.clone(),
            max_results: cfg.max_results,
        }
    }

    pub fn url(&self) -> String {
        let max_results = self.max_results.to_string();
        let params = [
            ("max_results", max_results.as_str()),
            (
                "tweet.fields",
                "created_at,public_metrics,referenced_tweets,attachments",
            ),
            (
                "expansions",
                "referenced_tweets.id.author_id,attachments.media_keys",
            ),
            ("user.fields", "name,username,profile_image_url"),
            ("media.fields", "url,preview_image_url,type"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}/2/users/{}/tweets?{query}",
            self.api_base,
            urlencoding::encode(&self.user_id)
        )
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("所有 token 均已被限流，{} 秒后重置", secs_until(.reset_at))]
    Exhausted { reset_at: DateTime<Utc> },

    #[error("Twitter API 错误 {status}: {message}")]
    Http { status: u16, message: String },

    #[error("网络请求失败: {0}")]
    Transport(String),

    #[error("解析 Twitter 响应失败: {0}")]
    Json(#[from] sonic_rs::Error),
}

impl From<AllTokensExhausted> for FetchError {
    fn from(e: AllTokensExhausted) -> Self {
        Self::Exhausted {
            reset_at: e.reset_at,
        }
    }
}

/// 距 reset_at 的秒数（向上取整，不小于 0）。
pub fn secs_until(reset_at: &DateTime<Utc>) -> i64 {
    let ms = (*reset_at - Utc::now()).num_milliseconds().max(0);
    (ms + 999) / 1000
}

/// 一次上游响应（状态码 + 响应头 + 完整 body）。
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 出站 HTTP 的抽象；Err 表示网络层失败（连接/超时等），携带描述。
pub trait Transport: Send + Sync + 'static {
    fn get(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> impl Future<Output = Result<UpstreamResponse, String>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self, anyhow::Error> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90));

        if cfg.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(cfg.timeout_ms));
        }
        if !cfg.proxy.trim().is_empty() {
            builder = builder.proxy(reqwest::Proxy::all(cfg.proxy.trim())?);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<UpstreamResponse, String> {
        let resp = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(describe_reqwest_error)?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(describe_reqwest_error)?;
        Ok(UpstreamResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn describe_reqwest_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        format!("请求超时: {e}")
    } else if e.is_connect() {
        format!("连接失败: {e}")
    } else {
        e.to_string()
    }
}

/// 带 token 轮换的 Twitter 客户端。
#[derive(Debug)]
pub struct TwitterClient<T> {
    transport: T,
    rotator: Arc<TokenRotator>,
    log_level: logging::LogLevel,
}

impl<T: Transport> TwitterClient<T> {
    pub fn new(transport: T, rotator: Arc<TokenRotator>, log_level: logging::LogLevel) -> Self {
        Self {
            transport,
            rotator,
            log_level,
        }
    }

    #[cfg(test)]
    pub(crate) fn rotator(&self) -> &Arc<TokenRotator> {
        &self.rotator
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    fn build_headers(&self, token: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        h.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .unwrap_or(HeaderValue::from_static("")),
        );
        h.insert(ACCEPT, HeaderValue::from_static("application/json"));
        h
    }

    /// GET 并把 2xx 响应体解析为 R。
    pub async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, FetchError> {
        let body = self.fetch_with_rotation(url).await?;
        Ok(sonic_rs::from_slice::<R>(&body)?)
    }

    /// 依次尝试池内 token，每次调用最多尝试 pool.len() 次。
    ///
    /// - 429：标记耗尽后换下一个 token
    /// - 网络错误：换下一个 token
    /// - 其他非 2xx：请求本身有问题，换 token 也一样，直接返回
    pub async fn fetch_with_rotation(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let attempts = self.rotator.pool_size().max(1);
        let mut last_transport: Option<String> = None;
        let mut last_reset: Option<DateTime<Utc>> = None;

        for attempt in 0..attempts {
            let (idx, token) = self.rotator.select(Utc::now()).await?;

            let headers = self.build_headers(&token);
            if self.log_level.backend_enabled() {
                logging::backend_request("GET", url, &headers);
            }

            let start = Instant::now();
            let resp = match self.transport.get(url, headers).await {
                Ok(v) => v,
                Err(msg) => {
                    tracing::warn!(
                        attempt,
                        token_index = idx,
                        error = %msg,
                        "Twitter 请求失败，切换下一个 token"
                    );
                    self.rotator.advance_past(idx).await;
                    last_transport = Some(msg);
                    continue;
                }
            };

            if self.log_level.backend_enabled() {
                if self.log_level.raw_enabled() {
                    logging::backend_response_raw(resp.status, start.elapsed(), &resp.body);
                } else {
                    logging::backend_response(resp.status, start.elapsed(), &resp.body);
                }
            }

            self.rotator.observe_headers(&token, &resp.headers).await;

            if resp.status == 429 {
                let now = Utc::now();
                let reset_at = parse_rate_limit_headers(&resp.headers)
                    .map(|(_, rt)| rt)
                    .filter(|rt| *rt > now)
                    .unwrap_or(now + rate_limit_fallback());
                self.rotator.mark_exhausted(&token, reset_at).await;
                self.rotator.advance_past(idx).await;
                tracing::warn!(
                    attempt,
                    token_index = idx,
                    reset_in_secs = secs_until(&reset_at),
                    "Twitter token 被限流，切换下一个 token"
                );
                last_reset = Some(reset_at);
                continue;
            }

            if !resp.is_success() {
                let err = extract_error_details(resp.status, &resp.body);
                tracing::warn!(
                    token_index = idx,
                    status = resp.status,
                    error = %err,
                    "Twitter 请求失败，不再重试"
                );
                return Err(err);
            }

            return Ok(resp.body);
        }

        if let Some(msg) = last_transport {
            return Err(FetchError::Transport(msg));
        }
        let reset_at = self
            .rotator
            .earliest_reset()
            .await
            .or(last_reset)
            .unwrap_or_else(Utc::now);
        Err(FetchError::Exhausted { reset_at })
    }
}

/// 从错误响应中提取 detail；依次尝试 detail / title / errors[0].message，最后退回状态码描述。
fn extract_error_details(status: u16, body: &[u8]) -> FetchError {
    #[derive(Debug, serde::Deserialize)]
    struct ErrResp {
        #[serde(default)]
        detail: Option<String>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        errors: Vec<crate::twitter::types::Problem>,
    }

    let parsed = sonic_rs::from_slice::<ErrResp>(body).ok();
    let message = parsed
        .and_then(|r| {
            r.detail
                .filter(|s| !s.trim().is_empty())
                .or(r.title.filter(|s| !s.trim().is_empty()))
                .or_else(|| {
                    r.errors
                        .first()
                        .and_then(|p| p.describe())
                        .map(str::to_string)
                })
        })
        .or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown error".to_string());

    FetchError::Http { status, message }
}
