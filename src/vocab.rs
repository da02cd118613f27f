//! # Vocabulary
//!
//! Fixed word lists that drive the heuristics: known entities, theme keywords,
//! stop words, link denylist, code-hosting domains, official handles, boost
//! keywords, ad-signal phrases and tag rules.
//!
//! - Loaded from TOML or JSON; any field missing in the file keeps its seed value.
//! - Lookup order: `$DIGEST_VOCAB_PATH` → `config/vocab.toml` → `config/vocab.json` → `default_seed()`.
//! - Entries are trimmed and lowercased on load, keeping first-declared order
//!   (order matters: first entity wins, first theme wins ties).
//!
//! Engines receive a `&Vocabulary` at construction and copy what they need.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_VOCAB_PATH: &str = "DIGEST_VOCAB_PATH";

/// One theme and the keywords voting for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// One content tag and the phrases that trigger it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub tag: String,
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Entity names for the second clustering pass, in priority order.
    pub entities: Vec<String>,
    /// Themes in declaration order (ties go to the earlier one).
    pub themes: Vec<ThemeRule>,
    /// Theme used when no keyword matches.
    pub default_theme: String,
    pub stop_words: Vec<String>,
    /// Hosts whose links never form a URL group (shorteners, the platform itself).
    pub url_denylist: Vec<String>,
    /// Code-hosting domains: developer signal + cross references.
    pub code_hosts: Vec<String>,
    /// Official accounts, with leading `@`.
    pub official_handles: Vec<String>,
    pub boost_keywords: Vec<String>,
    pub ad_signals: Vec<String>,
    /// Distinct ad-signal hits needed before a post is flagged.
    pub ad_min_signals: usize,
    pub tag_rules: Vec<TagRule>,
    /// Tag used when no rule fires.
    pub default_tag: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::default_seed()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Vocabulary {
    /// Built-in seed for the AI-tooling domain.
    pub fn default_seed() -> Self {
        let themes = [
            (
                "Coding Agents",
                &["agent", "agentic", "coding agent", "autonomous", "自主"][..],
            ),
            (
                "IDE / Copilot Tools",
                &["cursor", "copilot", "ide", "editor", "vscode", "编辑器"][..],
            ),
            (
                "Workflow Automation",
                &["workflow", "automation", "ci/cd", "pipeline", "自动化"][..],
            ),
            (
                "Model Releases & Updates",
                &["released", "launched", "model", "update", "版本", "发布", "模型"][..],
            ),
            (
                "Tooling / Infra",
                &["tool", "infra", "framework", "library", "sdk", "mcp"][..],
            ),
            (
                "Evaluation / Evals",
                &["eval", "benchmark", "leaderboard", "score", "评测"][..],
            ),
            (
                "RAG / Retrieval",
                &["rag", "retrieval", "embedding", "vector", "检索"][..],
            ),
            (
                "Demos / New Apps",
                &["demo", "app", "showcase", "built with", "演示"][..],
            ),
        ]
        .into_iter()
        .map(|(name, kws)| ThemeRule {
            name: name.to_string(),
            keywords: strings(kws),
        })
        .collect();

        let tag_rules = [
            (
                "发布",
                &["released", "launched", "发布", "上线", "announcing"][..],
            ),
            (
                "教程",
                &["tutorial", "教程", "how to", "guide", "step by step"][..],
            ),
            ("repo", &["github.com"][..]),
            ("demo", &["demo", "演示", "showcase", "built with"][..]),
            (
                "观点",
                &["opinion", "观点", "i think", "hot take", "我认为"][..],
            ),
            (
                "工具更新",
                &["update", "更新", "v0.", "v1.", "v2.", "changelog"][..],
            ),
            (
                "模型更新",
                &["model", "模型", "gpt", "claude", "gemini", "llama"][..],
            ),
        ]
        .into_iter()
        .map(|(tag, phrases)| TagRule {
            tag: tag.to_string(),
            phrases: strings(phrases),
        })
        .collect();

        Self {
            entities: strings(&[
                "claude",
                "gpt",
                "gemini",
                "copilot",
                "cursor",
                "codex",
                "llama",
                "mistral",
                "deepseek",
                "qwen",
                "anthropic",
                "openai",
                "langchain",
                "langgraph",
                "vercel",
                "bolt.new",
                "browser-use",
                "mcp",
                "swe-bench",
                "alphacode",
            ]),
            themes,
            default_theme: "Demos / New Apps".to_string(),
            stop_words: strings(&[
                "the", "a", "an", "is", "are", "was", "were", "be", "been", "have", "has", "had",
                "do", "does", "did", "will", "would", "could", "should", "may", "might", "can",
                "shall", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into",
                "through", "during", "before", "after", "and", "but", "or", "not", "no", "so",
                "if", "than", "too", "very", "just", "about", "up", "out", "that", "this", "it",
                "its", "i", "my", "your", "we", "they", "he", "she", "you", "me", "的", "了",
                "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
                "很", "到", "说", "要", "去",
            ]),
            url_denylist: strings(&["t.co", "bit.ly", "x.com", "twitter.com"]),
            code_hosts: strings(&["github.com"]),
            official_handles: strings(&[
                "@openai",
                "@anthropicai",
                "@googledeepmind",
                "@googleai",
                "@xai",
                "@meta",
                "@metaai",
                "@mistralai",
                "@deepseek_ai",
                "@alibaba_qwen",
                "@sama",
                "@darioamodei",
                "@karpathy",
                "@swyx",
                "@emollick",
            ]),
            boost_keywords: strings(&[
                "openai",
                "gpt-5",
                "gpt-4o",
                "o1",
                "o3",
                "o4",
                "anthropic",
                "claude",
                "sonnet",
                "opus",
                "google",
                "gemini",
                "deepmind",
                "meta",
                "llama",
                "mistral",
                "deepseek",
                "xai",
                "grok",
                "sora",
                "dall-e",
                "sam altman",
                "dario amodei",
                "demis hassabis",
            ]),
            ad_signals: strings(&[
                "referral",
                "promo code",
                "discount",
                "合约地址",
                "airdrop claim",
                "limited time",
                "返佣",
                "use my link",
                "sign up with",
                "exclusive offer",
                "free tokens",
                "whitelist spot",
            ]),
            ad_min_signals: 2,
            tag_rules,
            default_tag: "观点".to_string(),
        }
    }

    /// Trim + lowercase every matchable entry, drop empties, keep first occurrence.
    /// Theme and tag names are labels and keep their case.
    pub fn normalized(mut self) -> Self {
        self.entities = clean_list(self.entities);
        self.stop_words = clean_list(self.stop_words);
        self.url_denylist = clean_list(self.url_denylist);
        self.code_hosts = clean_list(self.code_hosts);
        self.official_handles = clean_list(self.official_handles);
        self.boost_keywords = clean_list(self.boost_keywords);
        self.ad_signals = clean_list(self.ad_signals);
        for t in &mut self.themes {
            t.keywords = clean_list(std::mem::take(&mut t.keywords));
        }
        for r in &mut self.tag_rules {
            r.phrases = clean_list(std::mem::take(&mut r.phrases));
        }
        self
    }
}

/// Load vocabulary from an explicit path. Supports TOML or JSON.
pub fn load_vocab_from(path: &Path) -> Result<Vocabulary> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading vocabulary from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_vocab(&content, ext.as_str())
        .with_context(|| format!("parsing vocabulary {}", path.display()))
}

/// Load vocabulary using env var + fallbacks:
/// 1) $DIGEST_VOCAB_PATH
/// 2) config/vocab.toml
/// 3) config/vocab.json
/// 4) built-in seed
pub fn load_vocab_default() -> Result<Vocabulary> {
    if let Ok(p) = std::env::var(ENV_VOCAB_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_vocab_from(&pb);
        }
        return Err(anyhow!("{ENV_VOCAB_PATH} points to non-existent path"));
    }
    for candidate in ["config/vocab.toml", "config/vocab.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_vocab_from(&p);
        }
    }
    Ok(Vocabulary::default_seed().normalized())
}

fn parse_vocab(s: &str, hint_ext: &str) -> Result<Vocabulary> {
    let v: Vocabulary = if hint_ext == "json" {
        serde_json::from_str(s)?
    } else {
        toml::from_str(s)?
    };
    Ok(v.normalized())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_already_normalized() {
        let seed = Vocabulary::default_seed();
        assert_eq!(seed.clone().normalized(), seed);
    }

    #[test]
    fn partial_toml_keeps_seed_for_missing_fields() {
        let toml = r#"
entities = [" Claude ", "", "OpenAI", "openai"]
default_theme = "Misc"
"#;
        let v = parse_vocab(toml, "toml").unwrap();
        assert_eq!(v.entities, vec!["claude".to_string(), "openai".to_string()]);
        assert_eq!(v.default_theme, "Misc");
        assert_eq!(v.url_denylist, Vocabulary::default_seed().url_denylist);
    }

    #[test]
    fn json_themes_keep_label_case() {
        let json = r#"{"themes":[{"name":"Robotics","keywords":["Robot","  ARM "]}]}"#;
        let v = parse_vocab(json, "json").unwrap();
        assert_eq!(v.themes.len(), 1);
        assert_eq!(v.themes[0].name, "Robotics");
        assert_eq!(v.themes[0].keywords, vec!["robot", "arm"]);
    }
}
