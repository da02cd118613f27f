// src/ingest/providers/json_file.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::ingest::types::{PostSource, RawPost};

/// Reads a JSON array of raw posts from disk (an export written by a collector).
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("json")
            .to_string();
        Self { name, path }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl PostSource for JsonFileSource {
    async fn fetch_posts(&self) -> Result<Vec<RawPost>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading posts from {}", self.path.display()))?;
        let posts: Vec<RawPost> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing posts in {}", self.path.display()))?;
        debug!(target: "ingest", source = %self.name, count = posts.len(), "loaded json source");
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
