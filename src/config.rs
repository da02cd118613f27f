// src/config.rs
//! Tunable parameters for the three engines.
//!
//! TOML shape (every key optional):
//! ```toml
//! [dedup]
//! max_hamming = 3
//!
//! [cluster]
//! title_max_chars = 60
//! max_keywords = 8
//! max_representatives = 3
//! max_cross_refs = 2
//! heat_cap = 10.0
//!
//! [rank.weights]
//! spread = 0.35
//! discuss = 0.30
//! dev = 0.25
//! ad_penalty = 0.10
//!
//! [rank.boost]
//! official = 0.8
//! multi_keyword = 0.5
//! single_keyword = 0.3
//! cap = 1.5
//!
//! [rank.selection]
//! top_n = 10
//! max_per_cluster = 2
//! min_heat = 0.05
//! min_target_lang = 2
//! target_lang = "zh"
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub dedup: DedupParams,
    pub cluster: ClusterParams,
    pub rank: RankParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupParams {
    /// Fingerprints at this Hamming distance or closer are duplicates.
    pub max_hamming: u32,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self { max_hamming: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub title_max_chars: usize,
    pub max_keywords: usize,
    pub max_representatives: usize,
    pub max_cross_refs: usize,
    /// Upper bound of the engagement-based heat estimate.
    pub heat_cap: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            title_max_chars: 60,
            max_keywords: 8,
            max_representatives: 3,
            max_cross_refs: 2,
            heat_cap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankParams {
    pub weights: RankWeights,
    pub boost: BoostParams,
    pub selection: SelectionParams,
}

/// Linear blend weights for the per-post heat score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub spread: f64,
    pub discuss: f64,
    pub dev: f64,
    pub ad_penalty: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            spread: 0.35,
            discuss: 0.30,
            dev: 0.25,
            ad_penalty: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostParams {
    pub official: f64,
    pub multi_keyword: f64,
    pub single_keyword: f64,
    pub cap: f64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            official: 0.8,
            multi_keyword: 0.5,
            single_keyword: 0.3,
            cap: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    pub top_n: usize,
    pub max_per_cluster: usize,
    pub min_heat: f64,
    pub min_target_lang: usize,
    pub target_lang: String,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            top_n: 10,
            max_per_cluster: 2,
            min_heat: 0.05,
            min_target_lang: 2,
            target_lang: "zh".to_string(),
        }
    }
}

impl DigestConfig {
    /// Clamp values that would break the engines (zero windows, negative caps).
    pub fn sanitized(mut self) -> Self {
        let defaults = ClusterParams::default();
        if self.dedup.max_hamming > 64 {
            self.dedup.max_hamming = 64;
        }
        if self.cluster.title_max_chars == 0 {
            self.cluster.title_max_chars = defaults.title_max_chars;
        }
        if !self.cluster.heat_cap.is_finite() || self.cluster.heat_cap < 0.0 {
            self.cluster.heat_cap = defaults.heat_cap;
        }
        let sel = &mut self.rank.selection;
        if sel.top_n == 0 {
            sel.top_n = 1;
        }
        if sel.max_per_cluster == 0 {
            sel.max_per_cluster = 1;
        }
        if !sel.min_heat.is_finite() {
            sel.min_heat = SelectionParams::default().min_heat;
        }
        sel.target_lang = sel.target_lang.trim().to_ascii_lowercase();
        if !self.rank.boost.cap.is_finite() || self.rank.boost.cap < 0.0 {
            self.rank.boost.cap = BoostParams::default().cap;
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<DigestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading digest config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg: DigestConfig = if ext == "json" {
        serde_json::from_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))?
    };
    Ok(cfg.sanitized())
}

/// Load config using env var + fallbacks:
/// 1) $DIGEST_CONFIG_PATH
/// 2) config/digest.toml
/// 3) config/digest.json
/// 4) defaults
pub fn load_config_default() -> Result<DigestConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for candidate in ["config/digest.toml", "config/digest.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_config_from(&p);
        }
    }
    Ok(DigestConfig::default())
}
