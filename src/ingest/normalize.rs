// src/ingest/normalize.rs
//! Raw record → canonical `Post`.
//!
//! Links are pulled from the raw text first, then the text is cleaned (HTML
//! entities decoded, tags stripped, links removed, whitespace folded).
//! Language, tags and the ad flag are read from the raw text (links included)
//! using the injected vocabulary.

use crate::ingest::types::RawPost;
use crate::model::Post;
use crate::vocab::Vocabulary;
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Share of CJK ideographs above which a post is tagged `zh`.
const ZH_RATIO: f64 = 0.3;

fn re_url() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s)<>"]+"#).expect("url regex"))
}

/// Clean post text: HTML decode, strip tags, drop links, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    out = re_url().replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

pub fn extract_urls(s: &str) -> Vec<String> {
    re_url()
        .find_iter(s)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// `"zh"` when CJK ideographs make up more than 30% of the characters.
pub fn detect_lang(text: &str) -> &'static str {
    let total = text.chars().count().max(1);
    let cjk = text.chars().filter(|&c| is_cjk(c)).count();
    if cjk as f64 / total as f64 > ZH_RATIO {
        "zh"
    } else {
        "en"
    }
}

pub fn classify_tags(text: &str, vocab: &Vocabulary) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags: Vec<String> = vocab
        .tag_rules
        .iter()
        .filter(|r| r.phrases.iter().any(|p| lower.contains(p.as_str())))
        .map(|r| r.tag.clone())
        .collect();
    if tags.is_empty() {
        tags.push(vocab.default_tag.clone());
    }
    tags
}

/// Flag as ad-suspect once `ad_min_signals` distinct phrases appear.
/// A lone "discount" or "limited time" is ordinary copy.
pub fn detect_ad(text: &str, vocab: &Vocabulary) -> bool {
    let lower = text.to_lowercase();
    let hits = vocab
        .ad_signals
        .iter()
        .filter(|s| lower.contains(s.as_str()))
        .count();
    hits >= vocab.ad_min_signals.max(1)
}

/// Short content id: first 8 bytes of SHA-256(text + handle) as hex.
pub fn content_id(text: &str, handle: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(handle.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// RFC 3339, then `YYYY-MM-DD HH:MM:SS` as UTC, else `fallback`.
pub fn parse_time(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    debug!(target: "ingest", "unparseable timestamp; using fallback");
    fallback
}

pub fn normalize_post(raw: RawPost, vocab: &Vocabulary, now: DateTime<Utc>) -> Post {
    let handle = raw
        .author_handle
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "@unknown".to_string());
    let id = raw
        .id
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| content_id(&raw.text, &handle));
    let text = clean_text(&raw.text);

    Post {
        id,
        author_name: raw.author_name.unwrap_or_else(|| "Unknown".to_string()),
        lang: detect_lang(&raw.text).to_string(),
        created_at: parse_time(raw.created_at.as_deref(), now),
        likes: raw.likes,
        reposts: raw.reposts,
        replies: raw.replies,
        bookmarks: raw.bookmarks,
        urls: extract_urls(&raw.text),
        tags: classify_tags(&raw.text, vocab),
        is_ad_suspect: detect_ad(&raw.text, vocab),
        cluster_id: None,
        heat_score: 0.0,
        author_handle: handle,
        text,
    }
}

pub fn normalize_batch(raw: Vec<RawPost>, vocab: &Vocabulary) -> Vec<Post> {
    let now = Utc::now();
    raw.into_iter()
        .map(|r| normalize_post(r, vocab, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vocab() -> Vocabulary {
        Vocabulary::default_seed()
    }

    #[test]
    fn clean_text_strips_html_and_links() {
        let s = "<p>New&nbsp;release</p> see https://github.com/a/b now";
        assert_eq!(clean_text(s), "New release see now");
    }

    #[test]
    fn urls_are_taken_from_raw_text() {
        let urls = extract_urls(r#"read (https://a.dev/x) and "http://b.dev/y?z=1""#);
        assert_eq!(urls, vec!["https://a.dev/x", "http://b.dev/y?z=1"]);
    }

    #[test]
    fn detects_chinese_by_ratio() {
        assert_eq!(detect_lang("Claude 发布了新的编程智能体"), "zh");
        assert_eq!(detect_lang("Claude released a coding agent 好"), "en");
        assert_eq!(detect_lang(""), "en");
    }

    #[test]
    fn tags_and_ads() {
        let v = vocab();
        assert_eq!(
            classify_tags("Launched: GPT tutorial", &v),
            vec!["发布", "教程", "模型更新"]
        );
        assert_eq!(classify_tags("just vibes", &v), vec!["观点"]);
        assert!(detect_ad("Use my LINK for free tokens", &v));
        assert!(!detect_ad("Release notes", &v));
    }

    #[test]
    fn one_ad_signal_is_not_enough() {
        let mut v = vocab();
        assert!(!detect_ad("20% discount on the new model", &v));
        assert!(detect_ad("20% discount, limited time only", &v));

        v.ad_min_signals = 1;
        assert!(detect_ad("20% discount on the new model", &v));
    }

    #[test]
    fn language_counts_links_in_raw_text() {
        let raw = RawPost {
            text: "新模型发布 https://example.com/a/very/long/announcement/path".into(),
            ..RawPost::default()
        };
        let p = normalize_post(raw, &vocab(), Utc::now());
        assert_eq!(p.text, "新模型发布");
        assert_eq!(p.lang, "en");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let raw = RawPost {
            text: "hello world".into(),
            created_at: Some("2025-02-28 08:30:00".into()),
            ..RawPost::default()
        };
        let p = normalize_post(raw, &vocab(), now);
        assert_eq!(p.author_handle, "@unknown");
        assert_eq!(p.author_name, "Unknown");
        assert_eq!(p.id, content_id("hello world", "@unknown"));
        assert_eq!(p.id.len(), 16);
        assert_eq!(
            p.created_at,
            Utc.with_ymd_and_hms(2025, 2, 28, 8, 30, 0).unwrap()
        );
        assert_eq!(parse_time(Some("yesterday"), now), now);
    }
}
