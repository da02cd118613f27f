// src/model.rs
//! Canonical records flowing through the digest: `Post` and `EventCluster`.
//!
//! A `Post` is owned by the run that built it. Clustering fills `cluster_id`,
//! ranking fills `heat_score`; nothing touches it after the digest is handed out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One collected short-form post with engagement metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_name: String,
    /// Handle including the leading `@`, e.g. `@OpenAI`.
    pub author_handle: String,
    pub text: String,
    /// Language tag, `"en"` | `"zh"` from the normalizer.
    pub lang: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub reposts: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub bookmarks: u64,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_ad_suspect: bool,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub heat_score: f64,
}

impl Post {
    /// Bare post with zero engagement; handy for fixtures and tests.
    pub fn new(id: impl Into<String>, author_handle: impl Into<String>, text: impl Into<String>) -> Self {
        let handle = author_handle.into();
        Self {
            id: id.into(),
            author_name: handle.trim_start_matches('@').to_string(),
            author_handle: handle,
            text: text.into(),
            lang: "en".to_string(),
            created_at: DateTime::<Utc>::default(),
            likes: 0,
            reposts: 0,
            replies: 0,
            bookmarks: 0,
            urls: Vec::new(),
            tags: Vec::new(),
            is_ad_suspect: false,
            cluster_id: None,
            heat_score: 0.0,
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn engagement(mut self, likes: u64, reposts: u64, replies: u64, bookmarks: u64) -> Self {
        self.likes = likes;
        self.reposts = reposts;
        self.replies = replies;
        self.bookmarks = bookmarks;
        self
    }

    pub fn ad_suspect(mut self, flag: bool) -> Self {
        self.is_ad_suspect = flag;
        self
    }

    /// Key used by the per-cluster cap: the cluster id, or the post's own id
    /// when unassigned.
    pub fn cluster_key(&self) -> &str {
        self.cluster_id.as_deref().unwrap_or(&self.id)
    }
}

/// A group of posts judged to describe the same real-world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCluster {
    pub id: String,
    pub title: String,
    pub theme: String,
    pub heat_score: f64,
    /// At most 8, most frequent first.
    pub keywords: Vec<String>,
    /// Representative post ids (at most 3).
    #[serde(rename = "tweet_ids")]
    pub representative_ids: Vec<String>,
    /// Cross-referenced `owner/repo` names (at most 2).
    #[serde(rename = "repo_names", default)]
    pub cross_refs: Vec<String>,
    /// Full membership size; representative ids are capped, this is not.
    #[serde(default)]
    pub member_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_key_falls_back_to_post_id() {
        let mut p = Post::new("t1", "@a", "hello");
        assert_eq!(p.cluster_key(), "t1");
        p.cluster_id = Some("cluster_004".into());
        assert_eq!(p.cluster_key(), "cluster_004");
    }

    #[test]
    fn post_deserializes_with_missing_optional_fields() {
        let raw = r#"{
            "id": "x1",
            "author_name": "A",
            "author_handle": "@a",
            "text": "hi",
            "lang": "en",
            "created_at": "2025-02-01T10:00:00Z"
        }"#;
        let p: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(p.likes, 0);
        assert!(p.urls.is_empty());
        assert!(p.cluster_id.is_none());
        assert_eq!(p.heat_score, 0.0);
    }

    #[test]
    fn cluster_serializes_original_field_names() {
        let c = EventCluster {
            id: "cluster_000".into(),
            title: "t".into(),
            theme: "Coding Agents".into(),
            heat_score: 1.5,
            keywords: vec!["agent".into()],
            representative_ids: vec!["p1".into()],
            cross_refs: vec!["owner/repo".into()],
            member_count: 1,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["tweet_ids"][0], serde_json::json!("p1"));
        assert_eq!(v["repo_names"][0], serde_json::json!("owner/repo"));
    }
}
