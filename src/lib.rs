// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cluster;
pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod rank;
pub mod vocab;

// ---- Re-exports for stable public API ----
pub use crate::cluster::Clusterer;
pub use crate::config::DigestConfig;
pub use crate::dedup::Deduplicator;
pub use crate::model::{EventCluster, Post};
pub use crate::pipeline::{DailyDigest, RunMeta, Triad, TriadOutput};
pub use crate::rank::Ranker;
pub use crate::vocab::Vocabulary;
