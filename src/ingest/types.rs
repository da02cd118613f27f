// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A post as delivered by a source, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_handle: Option<String>,
    #[serde(default)]
    pub text: String, // raw, may contain HTML and links
    #[serde(default)]
    pub created_at: Option<String>, // RFC 3339 or "YYYY-MM-DD HH:MM:SS"
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub reposts: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub bookmarks: u64,
}

#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self) -> Result<Vec<RawPost>>;
    fn name(&self) -> &str;
}
