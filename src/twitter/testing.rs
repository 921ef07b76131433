//! 测试用的脚本化 Transport：按顺序吐出预设响应，并记录每次请求带的 token。

use crate::twitter::client::{Transport, UpstreamResponse};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<UpstreamResponse, String>>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Result<UpstreamResponse, String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, _url: &str, headers: HeaderMap) -> Result<UpstreamResponse, String> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default()
            .to_string();
        self.seen.lock().unwrap().push(token);

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("脚本已耗尽".to_string()))
    }
}

pub fn status_response(status: u16, body: &str) -> UpstreamResponse {
    UpstreamResponse {
        status,
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

pub fn json_response(status: u16, body: &str) -> UpstreamResponse {
    let mut resp = status_response(status, body);
    resp.headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}
