use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_API_BASE: &str = "https://api.twitter.com";
const DEFAULT_USER_ID: u64 = 44196397;
const DEFAULT_MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub timeout_ms: u64,
    pub proxy: String,

    pub debug: String,

    pub api_base: String,
    pub user_id: String,
    pub max_results: u32,

    /// 按池顺序排列的 bearer token（已去空、去重）。
    pub bearer_tokens: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEnv {
    #[serde(alias = "HOST")]
    host: Option<String>,
    #[serde(alias = "PORT")]
    port: Option<u16>,

    #[serde(alias = "TIMEOUT")]
    timeout: Option<u64>,
    #[serde(alias = "PROXY")]
    proxy: Option<String>,

    #[serde(alias = "DEBUG")]
    debug: Option<String>,

    #[serde(alias = "TWITTER_API_BASE")]
    twitter_api_base: Option<String>,
    #[serde(alias = "TWITTER_USER_ID")]
    twitter_user_id: Option<u64>,
    #[serde(alias = "TWITTER_MAX_RESULTS")]
    twitter_max_results: Option<u32>,

    #[serde(alias = "TWITTER_BEARER_TOKEN_1")]
    twitter_bearer_token_1: Option<String>,
    #[serde(alias = "TWITTER_BEARER_TOKEN_2")]
    twitter_bearer_token_2: Option<String>,
    #[serde(alias = "TWITTER_BEARER_TOKEN_3")]
    twitter_bearer_token_3: Option<String>,
    #[serde(alias = "TWITTER_BEARER_TOKENS")]
    twitter_bearer_tokens: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        load_dotenv();

        let raw = Figment::from(Env::raw())
            .extract::<RawEnv>()
            .unwrap_or_default();

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEnv) -> Self {
        let bearer_tokens = collect_tokens(
            [
                raw.twitter_bearer_token_1.as_deref(),
                raw.twitter_bearer_token_2.as_deref(),
                raw.twitter_bearer_token_3.as_deref(),
            ],
            raw.twitter_bearer_tokens.as_deref(),
        );

        Self {
            host: raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: raw.port.unwrap_or(DEFAULT_PORT),
            timeout_ms: raw.timeout.unwrap_or(DEFAULT_TIMEOUT_MS),
            proxy: raw.proxy.unwrap_or_default(),
            debug: raw.debug.unwrap_or_else(|| "off".to_string()),
            api_base: raw
                .twitter_api_base
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            user_id: raw.twitter_user_id.unwrap_or(DEFAULT_USER_ID).to_string(),
            max_results: raw
                .twitter_max_results
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_RESULTS),
            bearer_tokens,
        }
    }

    pub fn log_level(&self) -> crate::logging::LogLevel {
        crate::logging::LogLevel::parse(&self.debug)
    }
}

/// 固定槽位在前，逗号列表追加在后；空值丢弃，重复值只保留第一次出现的位置。
fn collect_tokens<'a>(
    slots: impl IntoIterator<Item = Option<&'a str>>,
    list: Option<&'a str>,
) -> Vec<String> {
    let extra = list.into_iter().flat_map(|v| v.split(','));
    let mut out: Vec<String> = Vec::new();
    for t in slots.into_iter().flatten().chain(extra) {
        let t = t.trim();
        if t.is_empty() || out.iter().any(|e| e == t) {
            continue;
        }
        out.push(t.to_string());
    }
    out
}

fn load_dotenv() {
    let Some(dotenv_path) = find_dotenv_path() else {
        return;
    };

    let Ok(file) = std::fs::File::open(&dotenv_path) else {
        return;
    };

    let reader = std::io::BufReader::new(file);
    for line in std::io::BufRead::lines(reader).map_while(Result::ok) {
        let Some((key, value)) = parse_dotenv_line(&line) else {
            continue;
        };
        // 已存在的进程环境变量优先于 .env。
        if std::env::var_os(&key).is_some() {
            continue;
        }
        // Rust 2024：set_var 为 unsafe。这里在启动阶段、tokio 工作线程读取环境之前调用。
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

fn find_dotenv_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut dir: &Path = cwd.as_path();

    loop {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }

        // 不越过仓库根目录。
        if dir.join("Cargo.toml").is_file() || dir.join(".git").is_dir() {
            return None;
        }

        let Some(parent) = dir.parent() else {
            break;
        };
        if parent == dir {
            break;
        }
        dir = parent;
    }

    None
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("export ") {
        line = rest.trim_start();
    }

    let eq_idx = line.find('=')?;
    if eq_idx == 0 {
        return None;
    }

    let key = line[..eq_idx].trim();
    if key.is_empty() {
        return None;
    }

    let raw = line[eq_idx + 1..].trim();
    if raw.is_empty() {
        return Some((key.to_string(), String::new()));
    }

    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return Some((key.to_string(), raw[1..raw.len() - 1].to_string()));
        }
    }

    Some((key.to_string(), strip_inline_comment(raw).trim().to_string()))
}

fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'#' {
            continue;
        }
        if i == 0 || bytes[i - 1] == b' ' || bytes[i - 1] == b'\t' {
            return value[..i].trim_end();
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_tokens_keeps_slot_order_and_drops_blanks() {
        let tokens = collect_tokens(
            [Some("t1"), None, Some("  "), Some("t3")],
            Some("t4, t1 ,,t5"),
        );
        assert_eq!(tokens, vec!["t1", "t3", "t4", "t5"]);
    }

    #[test]
    fn from_raw_applies_defaults() {
        let cfg = Config::from_raw(RawEnv {
            twitter_bearer_token_2: Some("only".to_string()),
            twitter_api_base: Some("http://127.0.0.1:9000/".to_string()),
            twitter_max_results: Some(0),
            ..RawEnv::default()
        });
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.api_base, "http://127.0.0.1:9000");
        assert_eq!(cfg.user_id, "44196397");
        assert_eq!(cfg.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(cfg.bearer_tokens, vec!["only"]);
    }

    #[test]
    fn parse_dotenv_line_handles_quotes_and_comments() {
        assert_eq!(
            parse_dotenv_line("export TWITTER_BEARER_TOKEN_1=\"a b\""),
            Some(("TWITTER_BEARER_TOKEN_1".to_string(), "a b".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("PORT=8080 # local"),
            Some(("PORT".to_string(), "8080".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("TOKEN=abc#def"),
            Some(("TOKEN".to_string(), "abc#def".to_string()))
        );
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line("=value"), None);
    }
}
