//! Metric names + one-time registration, and the Prometheus recorder used by the binary.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const DEDUP_INPUT_TOTAL: &str = "digest_dedup_input_total";
pub const DEDUP_KEPT_TOTAL: &str = "digest_dedup_kept_total";
pub const DEDUP_URL_TOTAL: &str = "digest_dedup_url_total";
pub const DEDUP_NEAR_TOTAL: &str = "digest_dedup_near_total";
pub const CLUSTERS_TOTAL: &str = "digest_clusters_total";
pub const SINGLETON_CLUSTERS_TOTAL: &str = "digest_singleton_clusters_total";
pub const RANK_SCORED_TOTAL: &str = "digest_rank_scored_total";
pub const RANK_SELECTED_TOTAL: &str = "digest_rank_selected_total";
pub const RANK_LANG_SUBSTITUTIONS_TOTAL: &str = "digest_rank_lang_substitutions_total";
pub const INGEST_SOURCE_ERRORS_TOTAL: &str = "digest_ingest_source_errors_total";
pub const INGEST_RAW_TOTAL: &str = "digest_ingest_raw_total";
pub const LAST_RUN_TS: &str = "digest_last_run_ts";

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(DEDUP_INPUT_TOTAL, "Posts entering deduplication.");
        describe_counter!(DEDUP_KEPT_TOTAL, "Posts kept after deduplication.");
        describe_counter!(DEDUP_URL_TOTAL, "Posts dropped for a repeated URL set.");
        describe_counter!(
            DEDUP_NEAR_TOTAL,
            "Posts dropped as near-duplicates (fingerprint distance)."
        );
        describe_counter!(CLUSTERS_TOTAL, "Event clusters built.");
        describe_counter!(
            SINGLETON_CLUSTERS_TOTAL,
            "Clusters with a single member post."
        );
        describe_counter!(RANK_SCORED_TOTAL, "Posts scored by the ranker.");
        describe_counter!(RANK_SELECTED_TOTAL, "Posts in the final top-K.");
        describe_counter!(
            RANK_LANG_SUBSTITUTIONS_TOTAL,
            "Top-K slots swapped to satisfy the language mix."
        );
        describe_counter!(
            INGEST_SOURCE_ERRORS_TOTAL,
            "Post sources that failed to fetch or parse."
        );
        describe_counter!(INGEST_RAW_TOTAL, "Raw records fetched from all sources.");
        describe_gauge!(LAST_RUN_TS, "Unix ts when the digest last ran.");
    });
}

/// Install the Prometheus recorder globally and describe our series.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing prometheus recorder")?;
    ensure_described();
    Ok(handle)
}
