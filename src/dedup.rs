// src/dedup.rs
//! Fingerprint engine: exact URL-set matching plus a 64-bit SimHash over
//! whitespace tokens.
//!
//! A post is dropped when
//! - its (non-empty) URL set equals the URL set of an already kept post, or
//! - its fingerprint is within `max_hamming` bits of any kept fingerprint.
//!
//! Comparison is all-pairs against kept posts (O(n²)); fine for a daily batch
//! of a few hundred posts.

use crate::config::DedupParams;
use crate::metrics as m;
use crate::model::Post;
use metrics::counter;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Counts from one dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub input: usize,
    pub kept: usize,
    pub url_duplicates: usize,
    pub near_duplicates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    params: DedupParams,
}

impl Deduplicator {
    pub fn new(params: DedupParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DedupParams {
        &self.params
    }

    /// Order-preserving dedup; returns kept posts only.
    pub fn dedup(&self, posts: Vec<Post>) -> Vec<Post> {
        self.dedup_with_stats(posts).0
    }

    /// Same as [`dedup`](Self::dedup) but also reports what was dropped and why.
    pub fn dedup_with_stats(&self, posts: Vec<Post>) -> (Vec<Post>, DedupStats) {
        let mut stats = DedupStats {
            input: posts.len(),
            ..DedupStats::default()
        };
        let mut seen_urls: HashSet<BTreeSet<&str>> = HashSet::new();
        let mut seen_prints: Vec<u64> = Vec::new();
        let mut keep_mask = Vec::with_capacity(posts.len());

        for post in &posts {
            let urls: BTreeSet<&str> = post.urls.iter().map(String::as_str).collect();
            if !urls.is_empty() && seen_urls.contains(&urls) {
                debug!(target: "dedup", id = %post.id, reason = "url_set", "dropped");
                stats.url_duplicates += 1;
                keep_mask.push(false);
                continue;
            }

            let print = fingerprint(&post.text);
            if let Some(dist) = seen_prints
                .iter()
                .map(|&h| hamming(print, h))
                .find(|&d| d <= self.params.max_hamming)
            {
                debug!(target: "dedup", id = %post.id, reason = "near_text", dist, "dropped");
                stats.near_duplicates += 1;
                keep_mask.push(false);
                continue;
            }

            if !urls.is_empty() {
                seen_urls.insert(urls);
            }
            seen_prints.push(print);
            keep_mask.push(true);
        }
        drop(seen_urls);

        let kept: Vec<Post> = posts
            .into_iter()
            .zip(keep_mask)
            .filter_map(|(p, keep)| keep.then_some(p))
            .collect();
        stats.kept = kept.len();

        counter!(m::DEDUP_INPUT_TOTAL).increment(stats.input as u64);
        counter!(m::DEDUP_KEPT_TOTAL).increment(stats.kept as u64);
        counter!(m::DEDUP_URL_TOTAL).increment(stats.url_duplicates as u64);
        counter!(m::DEDUP_NEAR_TOTAL).increment(stats.near_duplicates as u64);

        (kept, stats)
    }
}

/// Stable 64-bit token hash: leading 8 bytes of SHA-256, big-endian.
pub fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// 64-bit SimHash over lowercased whitespace tokens.
/// Ties (including the empty text) set the bit, so `""` maps to `u64::MAX`.
pub fn fingerprint(text: &str) -> u64 {
    let mut acc = [0i64; 64];
    for token in text.to_lowercase().split_whitespace() {
        let h = token_hash(token);
        for (bit, slot) in acc.iter_mut().enumerate() {
            *slot += if (h >> bit) & 1 == 1 { 1 } else { -1 };
        }
    }

    let mut out = 0u64;
    for (bit, &v) in acc.iter().enumerate() {
        if v >= 0 {
            out |= 1u64 << bit;
        }
    }
    out
}

pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
