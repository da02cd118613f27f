// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
use daily_digest::metrics::install_prometheus;
use daily_digest::{DigestConfig, Post, Triad, Vocabulary};

#[test]
fn digest_series_show_up_after_a_run() {
    // Install a local recorder for the test
    let handle = install_prometheus().expect("recorder");

    let posts = vec![
        Post::new("a", "@OpenAI", "OpenAI ships a new model").engagement(5_000, 400, 100, 50),
        Post::new("b", "@x", "OpenAI ships a new model"),
        Post::new("c", "@y", "cursor adds background agents").lang("zh"),
    ];
    let out = Triad::new(&Vocabulary::default_seed(), &DigestConfig::default()).run(posts);
    assert_eq!(out.deduped.len(), 2);

    let text = handle.render();
    for needle in [
        "digest_dedup_input_total",
        "digest_dedup_near_total",
        "digest_clusters_total",
        "digest_rank_scored_total",
        "digest_rank_selected_total",
        "digest_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
