// src/ingest/providers/memory.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::ingest::types::{PostSource, RawPost};

/// In-memory source for fixtures and tests. `failing` simulates a broken upstream.
pub struct MemorySource {
    name: String,
    posts: Vec<RawPost>,
    fail: bool,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, posts: Vec<RawPost>) -> Self {
        Self {
            name: name.into(),
            posts,
            fail: false,
        }
    }

    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            posts: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PostSource for MemorySource {
    async fn fetch_posts(&self) -> Result<Vec<RawPost>> {
        if self.fail {
            return Err(anyhow!("source `{}` unavailable", self.name));
        }
        Ok(self.posts.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
