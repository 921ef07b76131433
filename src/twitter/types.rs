use serde::{Deserialize, Serialize};

/// 一条推文（只保留看板用到的字段）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<PublicMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
}

impl Tweet {
    pub fn references(&self, kind: &ReferenceKind) -> bool {
        self.referenced_tweets
            .as_deref()
            .is_some_and(|refs| refs.iter().any(|r| &r.kind == kind))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    RepliedTo,
    Retweeted,
    Quoted,
    /// 未来新增的引用类型，原样透传。
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub media_key: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
}

/// expansions 带回来的附表。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Media>>,
    /// 被回复/转推/引用的推文。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweets: Option<Vec<Tweet>>,
}

/// 上游返回的部分错误（HTTP 200 中的 `errors` 数组）。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Problem {
    pub fn describe(&self) -> Option<&str> {
        [&self.detail, &self.message, &self.title]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

/// GET /2/users/:id/tweets 的原始响应。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineResponse {
    #[serde(default)]
    pub data: Option<Vec<Tweet>>,
    #[serde(default)]
    pub includes: Option<Includes>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Vec<Problem>,
}

/// 对外返回的稳定形状。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedResponse {
    pub posts: Vec<Tweet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<Includes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TimelineResponse> for NormalizedResponse {
    fn from(raw: TimelineResponse) -> Self {
        let error = raw.error.filter(|e| !e.trim().is_empty()).or_else(|| {
            let parts: Vec<&str> = raw.errors.iter().filter_map(Problem::describe).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        });

        Self {
            posts: raw.data.unwrap_or_default(),
            includes: raw.includes,
            error,
        }
    }
}
