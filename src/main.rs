//! Daily digest batch entrypoint.
//! Reads post exports, runs dedup → cluster → rank, writes `daily.json`.
//!
//! Usage: `daily-digest [INPUT.json ...]`

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use daily_digest::config::load_config_default;
use daily_digest::ingest;
use daily_digest::ingest::normalize::normalize_batch;
use daily_digest::ingest::providers::json_file::JsonFileSource;
use daily_digest::ingest::types::PostSource;
use daily_digest::metrics::install_prometheus;
use daily_digest::pipeline::{DailyDigest, RunMeta, Triad};
use daily_digest::vocab::load_vocab_default;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ENV_OUTPUT_DIR: &str = "DIGEST_OUTPUT_DIR";
const ENV_DATE: &str = "DIGEST_DATE";
const ENV_METRICS_PATH: &str = "DIGEST_METRICS_PATH";
const ENV_LOG_JSON: &str = "DIGEST_LOG_JSON";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_LOG_FILTER: &str = "ingest=info,dedup=info,cluster=info,rank=info,digest=info,warn";

/// Compact logs by default; JSON lines when DIGEST_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

/// DIGEST_DATE (YYYY-MM-DD) or yesterday in UTC.
fn digest_date() -> Result<NaiveDate> {
    match std::env::var(ENV_DATE) {
        Ok(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("{ENV_DATE} must be YYYY-MM-DD, got `{s}`")),
        _ => Ok((Utc::now() - Duration::days(1)).date_naive()),
    }
}

async fn run() -> Result<()> {
    let metrics_path = std::env::var(ENV_METRICS_PATH).ok().map(PathBuf::from);
    let prom = match &metrics_path {
        Some(_) => Some(install_prometheus()?),
        None => None,
    };

    let cfg = load_config_default().context("loading digest config")?;
    let vocab = load_vocab_default().context("loading vocabulary")?;
    let date = digest_date()?;

    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        bail!("no input files; usage: daily-digest [INPUT.json ...]");
    }
    let sources: Vec<Box<dyn PostSource>> = inputs
        .iter()
        .map(|p| Box::new(JsonFileSource::new(p)) as Box<dyn PostSource>)
        .collect();

    let collected = ingest::collect(&sources).await;
    let raw_count = collected.raw.len();
    let posts = normalize_batch(collected.raw, &vocab);

    let out = Triad::new(&vocab, &cfg).run(posts);
    let meta = RunMeta::new(collected.degraded, raw_count, &out);
    if meta.degraded {
        tracing::warn!(target: "digest", sources = ?meta.degraded_sources, "degraded run");
    }
    let digest = DailyDigest::from_run(date, out, meta);

    let out_dir = std::env::var(ENV_OUTPUT_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;
    let out_file = out_dir.join("daily.json");
    let body = serde_json::to_string_pretty(&digest).context("serializing digest")?;
    tokio::fs::write(&out_file, body)
        .await
        .with_context(|| format!("writing {}", out_file.display()))?;
    tracing::info!(
        target: "digest",
        date = %digest.date,
        top = digest.top_posts.len(),
        clusters = digest.clusters.len(),
        path = %out_file.display(),
        "digest written"
    );

    if let (Some(path), Some(handle)) = (metrics_path, prom) {
        tokio::fs::write(&path, handle.render())
            .await
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!(target: "digest", error = ?e, "digest run failed");
        std::process::exit(1);
    }
}
