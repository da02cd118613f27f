// src/pipeline.rs
//! Wires the three engines (dedup → cluster → rank) over one finalized batch
//! and shapes the day's output document.

use crate::cluster::Clusterer;
use crate::config::DigestConfig;
use crate::dedup::{DedupStats, Deduplicator};
use crate::metrics as m;
use crate::model::{EventCluster, Post};
use crate::rank::{RankReport, Ranker};
use crate::vocab::Vocabulary;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::gauge;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fresh engine state for one run.
#[derive(Debug, Clone)]
pub struct Triad {
    pub dedup: Deduplicator,
    pub clusterer: Clusterer,
    pub ranker: Ranker,
}

/// Result of one triad pass. `deduped` carries cluster ids and heat scores.
#[derive(Debug, Clone)]
pub struct TriadOutput {
    pub deduped: Vec<Post>,
    pub clusters: Vec<EventCluster>,
    pub top: Vec<Post>,
    pub dedup_stats: DedupStats,
    pub rank_report: RankReport,
}

impl Triad {
    pub fn new(vocab: &Vocabulary, cfg: &DigestConfig) -> Self {
        Self {
            dedup: Deduplicator::new(cfg.dedup),
            clusterer: Clusterer::new(vocab, cfg.cluster),
            ranker: Ranker::new(vocab, cfg.rank.clone()),
        }
    }

    pub fn run(&self, posts: Vec<Post>) -> TriadOutput {
        m::ensure_described();

        let (mut deduped, dedup_stats) = self.dedup.dedup_with_stats(posts);
        let clusters = self.clusterer.cluster_events(&mut deduped);
        let (top, rank_report) = self.ranker.rank_with_report(&mut deduped, &clusters);

        gauge!(m::LAST_RUN_TS).set(Utc::now().timestamp() as f64);
        info!(
            target: "digest",
            input = dedup_stats.input,
            kept = dedup_stats.kept,
            clusters = clusters.len(),
            selected = top.len(),
            "triad complete"
        );

        TriadOutput {
            deduped,
            clusters,
            top,
            dedup_stats,
            rank_report,
        }
    }
}

/// Run bookkeeping attached to the digest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub degraded: bool,
    pub degraded_sources: Vec<String>,
    pub message: String,
    pub raw_posts: usize,
    pub deduped_posts: usize,
    pub clusters: usize,
}

impl RunMeta {
    pub fn new(degraded_sources: Vec<String>, raw_posts: usize, out: &TriadOutput) -> Self {
        let degraded = !degraded_sources.is_empty();
        let message = if degraded {
            format!("some sources unavailable: {}", degraded_sources.join(", "))
        } else {
            String::new()
        };
        Self {
            degraded,
            degraded_sources,
            message,
            raw_posts,
            deduped_posts: out.deduped.len(),
            clusters: out.clusters.len(),
        }
    }
}

/// The document written to `daily.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDigest {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "top_tweets")]
    pub top_posts: Vec<Post>,
    pub clusters: Vec<EventCluster>,
    pub meta: RunMeta,
}

impl DailyDigest {
    pub fn from_run(date: NaiveDate, out: TriadOutput, meta: RunMeta) -> Self {
        Self {
            date,
            generated_at: Utc::now(),
            top_posts: out.top,
            clusters: out.clusters,
            meta,
        }
    }
}
