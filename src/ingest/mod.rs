// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use crate::ingest::types::{PostSource, RawPost};
use crate::metrics as m;
use metrics::counter;

/// Everything the sources produced in one pass, plus the ones that failed.
#[derive(Debug, Default)]
pub struct Collected {
    pub raw: Vec<RawPost>,
    /// Names of sources whose fetch failed; the run continues without them.
    pub degraded: Vec<String>,
}

impl Collected {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Fetch from every source in order. A failing source is logged and recorded
/// in `degraded`; it never aborts the pass.
pub async fn collect(sources: &[Box<dyn PostSource>]) -> Collected {
    m::ensure_described();

    let mut out = Collected::default();
    for s in sources {
        match s.fetch_posts().await {
            Ok(mut v) => {
                tracing::debug!(target: "ingest", source = s.name(), count = v.len(), "source ok");
                out.raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = s.name(), "source error");
                counter!(m::INGEST_SOURCE_ERRORS_TOTAL).increment(1);
                out.degraded.push(s.name().to_string());
            }
        }
    }

    counter!(m::INGEST_RAW_TOTAL).increment(out.raw.len() as u64);
    tracing::info!(
        target: "ingest",
        raw = out.raw.len(),
        degraded = out.degraded.len(),
        "collect complete"
    );
    out
}
