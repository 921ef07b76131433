use reqwest::header::HeaderMap;
use std::time::Duration;

/// 日志等级：
/// - off：不输出请求/响应详情
/// - low：输出对外响应的状态与耗时
/// - medium：额外输出上游请求/响应（格式化、脱敏、截断）
/// - high：上游响应体完全原始输出
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl LogLevel {
    pub fn parse(debug: &str) -> Self {
        match debug.trim().to_lowercase().as_str() {
            "low" | "client" => Self::Low,
            "medium" | "backend" => Self::Medium,
            "high" | "all" | "raw" => Self::High,
            _ => Self::Off,
        }
    }

    pub fn client_enabled(self) -> bool {
        self >= Self::Low
    }

    pub fn backend_enabled(self) -> bool {
        self >= Self::Medium
    }

    pub fn raw_enabled(self) -> bool {
        self >= Self::High
    }
}

pub fn format_duration_ms(d: Duration) -> i64 {
    d.as_millis().min(i64::MAX as u128) as i64
}

pub fn client_response(status: u16, duration: Duration) {
    tracing::info!(
        "[客户端响应] GET /api/tweets {} {}ms",
        status,
        format_duration_ms(duration)
    );
}

pub fn backend_request(method: &str, url: &str, headers: &HeaderMap) {
    tracing::info!(
        "\n====================== 后端请求 ========================\n[后端请求] {method} {url}\n[后端请求头]\n{}\n==========================================================",
        format_headers(headers),
    );
}

pub fn backend_response(status: u16, duration: Duration, body: &[u8]) {
    tracing::info!(
        "\n====================== 后端响应 ========================\n[后端响应] {} {}ms\n{}\n==========================================================",
        status,
        format_duration_ms(duration),
        format_body_bytes(body)
    );
}

pub fn backend_response_raw(status: u16, duration: Duration, body: &[u8]) {
    tracing::info!(
        "\n=================== 后端响应（RAW） ===================\n[后端响应] {} {}ms\n{}\n=========================================================",
        status,
        format_duration_ms(duration),
        String::from_utf8_lossy(body),
    );
}

/// 每行一个头；Authorization 一律替换为 `Bearer ***`。
fn format_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers.iter() {
        let key = name.as_str();
        let redacted = key.eq_ignore_ascii_case("authorization")
            || key.eq_ignore_ascii_case("proxy-authorization");
        let val = if redacted {
            "Bearer ***"
        } else {
            value.to_str().unwrap_or("<non-utf8>")
        };
        out.push_str(key);
        out.push_str(": ");
        out.push_str(val);
        out.push('\n');
    }
    out
}

fn format_body_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    // 大包不做 JSON 解析，直接截断。
    const MAX_PARSE_BYTES: usize = 512 * 1024;
    if bytes.len() > MAX_PARSE_BYTES {
        return truncate_text_for_log(&String::from_utf8_lossy(bytes));
    }

    match sonic_rs::from_slice::<sonic_rs::Value>(bytes) {
        Ok(v) => match sonic_rs::to_string_pretty(&v) {
            Ok(s) => truncate_text_for_log(&s),
            Err(_) => truncate_text_for_log(&v.to_string()),
        },
        Err(_) => truncate_text_for_log(&String::from_utf8_lossy(bytes)),
    }
}

fn truncate_text_for_log(s: &str) -> String {
    const MAX_CHARS: usize = 16 * 1024;
    if s.chars().count() <= MAX_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_CHARS).collect();
    out.push_str("...[TRUNCATED]");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, HeaderValue, USER_AGENT};

    #[test]
    fn parse_levels() {
        assert_eq!(LogLevel::parse(" HIGH "), LogLevel::High);
        assert_eq!(LogLevel::parse("backend"), LogLevel::Medium);
        assert_eq!(LogLevel::parse("low"), LogLevel::Low);
        assert_eq!(LogLevel::parse("whatever"), LogLevel::Off);
        assert!(LogLevel::Medium.client_enabled());
        assert!(!LogLevel::Low.backend_enabled());
        assert!(!LogLevel::Medium.raw_enabled());
    }

    #[test]
    fn headers_never_leak_bearer_token() {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret-token"));
        h.insert(USER_AGENT, HeaderValue::from_static("tweetboard/0.1"));

        let out = format_headers(&h);
        assert!(!out.contains("secret-token"));
        assert!(out.contains("authorization: Bearer ***"));
        assert!(out.contains("user-agent: tweetboard/0.1"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(20 * 1024);
        let out = format_body_bytes(body.as_bytes());
        assert!(out.ends_with("...[TRUNCATED]"));
        assert_eq!(out.chars().count(), 16 * 1024 + "...[TRUNCATED]".len());
    }
}
