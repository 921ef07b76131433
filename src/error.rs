use crate::twitter::client::{FetchError, secs_until};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// 对外统一的错误形状：`{"error": "..."}`。
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 全部 token 被限流时，距最早重置还剩多少秒（至少 1）。
    pub fn retry_after_secs(&self) -> Option<i64> {
        match self {
            AppError::Fetch(FetchError::Exhausted { reset_at }) => {
                Some(secs_until(reset_at).max(1))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = self.retry_after_secs();
        let body = ErrorBody {
            error: self.to_string(),
        };

        let mut resp = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        if let Some(secs) = retry_after
            && let Ok(v) = HeaderValue::from_str(&secs.to_string())
        {
            resp.headers_mut().insert(RETRY_AFTER, v);
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upstream_error_becomes_500_with_message() {
        let err = AppError::from(FetchError::Http {
            status: 403,
            message: "Forbidden".to_string(),
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(RETRY_AFTER).is_none());

        let body = body_json(resp).await;
        assert_eq!(body["error"], "Twitter API 错误 403: Forbidden");
    }

    #[tokio::test]
    async fn exhausted_error_carries_retry_after() {
        let err = AppError::from(FetchError::Exhausted {
            reset_at: Utc::now() + Duration::seconds(90),
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let secs: i64 = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap();
        assert!((89..=90).contains(&secs));

        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("所有 token 均已被限流"));
    }

    #[test]
    fn past_reset_still_hints_one_second() {
        let err = AppError::from(FetchError::Exhausted {
            reset_at: Utc::now() - Duration::seconds(5),
        });
        assert_eq!(err.retry_after_secs(), Some(1));
    }
}
