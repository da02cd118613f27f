// src/rank.rs
//! Scoring & selection engine.
//!
//! Per-post heat:
//! ```text
//! spread  = (likes + 2·reposts + 1.5·bookmarks) / 1000
//! discuss = replies/100 + distinct_authors_in_cluster/10
//! dev     = 1 if any URL points at a code host
//! penalty = 1 if ad-suspect
//! heat    = (w_spread·spread + w_discuss·discuss + w_dev·dev − w_ad·penalty) · (1 + boost)
//! ```
//! floored at 0 and rounded to 2 decimals. Boost: official handle plus
//! boost-keyword hits (1 hit / 2+ hits), summed then capped.
//!
//! Selection: heat-descending, heat floor, per-cluster cap, then a
//! language-mix pass over the top window.

use crate::cluster::round_to;
use crate::config::{BoostParams, RankParams, RankWeights, SelectionParams};
use crate::metrics as m;
use crate::model::{EventCluster, Post};
use crate::vocab::Vocabulary;
use metrics::counter;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Counts from one ranking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankReport {
    pub scored: usize,
    pub above_floor: usize,
    pub after_cap: usize,
    pub substitutions: usize,
}

#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankWeights,
    boost: BoostParams,
    selection: SelectionParams,
    code_hosts: Vec<String>,
    official_handles: HashSet<String>,
    boost_keywords: Vec<String>,
}

impl Ranker {
    pub fn new(vocab: &Vocabulary, params: RankParams) -> Self {
        Self {
            weights: params.weights,
            boost: params.boost,
            selection: params.selection,
            code_hosts: vocab.code_hosts.clone(),
            official_handles: vocab.official_handles.iter().cloned().collect(),
            boost_keywords: vocab.boost_keywords.clone(),
        }
    }

    pub fn weights(&self) -> &RankWeights {
        &self.weights
    }

    /// Score every post in place and return the selected top posts.
    pub fn rank(&self, posts: &mut [Post], clusters: &[EventCluster]) -> Vec<Post> {
        self.rank_with_report(posts, clusters).0
    }

    pub fn rank_with_report(
        &self,
        posts: &mut [Post],
        clusters: &[EventCluster],
    ) -> (Vec<Post>, RankReport) {
        let authors = cluster_author_counts(posts, clusters);
        for post in posts.iter_mut() {
            post.heat_score = self.heat(post, &authors);
        }

        let mut ranked: Vec<&Post> = posts.iter().collect();
        ranked.sort_by(|a, b| b.heat_score.total_cmp(&a.heat_score));

        let floor = self.selection.min_heat;
        ranked.retain(|p| p.heat_score >= floor);
        let above_floor = ranked.len();

        let capped = cap_per_cluster(ranked, self.selection.max_per_cluster);
        let after_cap = capped.len();

        let (mixed, substitutions) = ensure_language_mix(
            capped,
            &self.selection.target_lang,
            self.selection.min_target_lang,
            self.selection.top_n,
        );

        let top: Vec<Post> = mixed
            .into_iter()
            .take(self.selection.top_n)
            .cloned()
            .collect();

        let report = RankReport {
            scored: posts.len(),
            above_floor,
            after_cap,
            substitutions,
        };
        counter!(m::RANK_SCORED_TOTAL).increment(report.scored as u64);
        counter!(m::RANK_SELECTED_TOTAL).increment(top.len() as u64);
        counter!(m::RANK_LANG_SUBSTITUTIONS_TOTAL).increment(substitutions as u64);
        debug!(
            target: "rank",
            scored = report.scored,
            above_floor,
            after_cap,
            substitutions,
            selected = top.len(),
            "ranked batch"
        );

        (top, report)
    }

    /// Composite heat for one post. `authors` maps cluster id → distinct authors.
    pub fn heat(&self, post: &Post, authors: &HashMap<String, usize>) -> f64 {
        let w = &self.weights;
        let spread = (post.likes as f64 + 2.0 * post.reposts as f64 + 1.5 * post.bookmarks as f64)
            / 1000.0;
        let cluster_authors = post
            .cluster_id
            .as_ref()
            .and_then(|cid| authors.get(cid))
            .copied()
            .unwrap_or(0);
        let discuss = post.replies as f64 / 100.0 + cluster_authors as f64 / 10.0;
        let dev = if self.is_dev_link(post) { 1.0 } else { 0.0 };
        let penalty = if post.is_ad_suspect { 1.0 } else { 0.0 };

        let base = w.spread * spread + w.discuss * discuss + w.dev * dev - w.ad_penalty * penalty;
        let heat = base * (1.0 + self.boost_for(post));
        round_to(heat.max(0.0), 2)
    }

    /// Official-handle and keyword boosts, summed and capped.
    pub fn boost_for(&self, post: &Post) -> f64 {
        let mut boost = 0.0;
        if self
            .official_handles
            .contains(&post.author_handle.to_lowercase())
        {
            boost += self.boost.official;
        }

        let text = post.text.to_lowercase();
        let hits = self
            .boost_keywords
            .iter()
            .filter(|kw| text.contains(kw.as_str()))
            .count();
        boost += match hits {
            0 => 0.0,
            1 => self.boost.single_keyword,
            _ => self.boost.multi_keyword,
        };

        boost.min(self.boost.cap)
    }

    fn is_dev_link(&self, post: &Post) -> bool {
        post.urls.iter().any(|u| {
            let u = u.to_lowercase();
            self.code_hosts.iter().any(|h| u.contains(h.as_str()))
        })
    }
}

/// Distinct author handles per cluster id. Only ids present in `clusters`
/// count; a post outside every known cluster gets 0.
pub fn cluster_author_counts(posts: &[Post], clusters: &[EventCluster]) -> HashMap<String, usize> {
    let known: HashSet<&str> = clusters.iter().map(|c| c.id.as_str()).collect();
    let mut authors: HashMap<&str, HashSet<&str>> = HashMap::new();
    for p in posts {
        if let Some(cid) = p.cluster_id.as_deref() {
            if known.contains(cid) {
                authors
                    .entry(cid)
                    .or_default()
                    .insert(p.author_handle.as_str());
            }
        }
    }
    authors
        .into_iter()
        .map(|(cid, set)| (cid.to_string(), set.len()))
        .collect()
}

/// Keep at most `max_per_cluster` posts per cluster key, preserving order.
pub fn cap_per_cluster(ranked: Vec<&Post>, max_per_cluster: usize) -> Vec<&Post> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    ranked
        .into_iter()
        .filter(|p| {
            let n = seen.entry(p.cluster_key()).or_insert(0);
            *n += 1;
            *n <= max_per_cluster
        })
        .collect()
}

/// Make sure the first `top_n` items hold at least `min_target` posts in
/// `target_lang`, pulling candidates from the remainder in order. Each pulled
/// post replaces the last non-target post of the window; the window is then
/// re-sorted by heat. Replaced posts leave the list.
///
/// Returns the adjusted list and the number of substitutions.
pub fn ensure_language_mix<'a>(
    ranked: Vec<&'a Post>,
    target_lang: &str,
    min_target: usize,
    top_n: usize,
) -> (Vec<&'a Post>, usize) {
    let split = top_n.min(ranked.len());
    let mut top: Vec<&Post> = ranked[..split].to_vec();
    let rest: Vec<&Post> = ranked[split..].to_vec();

    let present = top.iter().filter(|p| p.lang == target_lang).count();
    if present >= min_target {
        return (ranked, 0);
    }

    let needed = min_target - present;
    let candidates: Vec<usize> = rest
        .iter()
        .enumerate()
        .filter(|(_, p)| p.lang == target_lang)
        .map(|(i, _)| i)
        .take(needed)
        .collect();

    let mut pulled: HashSet<usize> = HashSet::new();
    for ci in candidates {
        let Some(slot) = top.iter().rposition(|p| p.lang != target_lang) else {
            break;
        };
        top[slot] = rest[ci];
        pulled.insert(ci);
    }
    let substitutions = pulled.len();

    top.sort_by(|a, b| b.heat_score.total_cmp(&a.heat_score));
    let mut out = top;
    out.extend(
        rest.into_iter()
            .enumerate()
            .filter(|(i, _)| !pulled.contains(i))
            .map(|(_, p)| p),
    );
    (out, substitutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankParams;

    fn ranker() -> Ranker {
        Ranker::new(&Vocabulary::default_seed(), RankParams::default())
    }

    fn scored(id: &str, lang: &str, heat: f64, cluster: Option<&str>) -> Post {
        let mut p = Post::new(id, "@someone", "text").lang(lang);
        p.heat_score = heat;
        p.cluster_id = cluster.map(str::to_string);
        p
    }

    #[test]
    fn official_handle_scenario() {
        let r = ranker();
        let p = Post::new("o", "@OpenAI", "Shipping today").engagement(10, 0, 0, 0);
        // 0.35 · 0.01 = 0.0035 ; × 1.8 = 0.0063 → 0.01
        assert_eq!(r.heat(&p, &HashMap::new()), 0.01);
    }

    #[test]
    fn boost_levels() {
        let r = ranker();
        let none = Post::new("a", "@x", "plain words");
        let one = Post::new("b", "@x", "Mistral shipped");
        let two = Post::new("c", "@x", "Claude vs Gemini");
        let official_two = Post::new("d", "@AnthropicAI", "Claude vs Gemini");
        assert_eq!(r.boost_for(&none), 0.0);
        assert_eq!(r.boost_for(&one), 0.3);
        assert_eq!(r.boost_for(&two), 0.5);
        assert!((r.boost_for(&official_two) - 1.3).abs() < 1e-9);
    }

    #[test]
    fn boost_is_capped() {
        let mut params = RankParams::default();
        params.boost.official = 1.4;
        let r = Ranker::new(&Vocabulary::default_seed(), params);
        let p = Post::new("d", "@openai", "claude and gemini");
        assert_eq!(r.boost_for(&p), 1.5);
    }

    #[test]
    fn ad_penalty_floors_at_zero() {
        let r = ranker();
        let p = Post::new("ad", "@spam", "plain words").ad_suspect(true);
        assert_eq!(r.heat(&p, &HashMap::new()), 0.0);
    }

    #[test]
    fn dev_link_and_cluster_authors_count() {
        let r = ranker();
        let mut p = Post::new("g", "@dev", "plain words").urls(["https://github.com/a/b"]);
        p.cluster_id = Some("cluster_000".into());
        let mut authors = HashMap::new();
        authors.insert("cluster_000".to_string(), 3);
        // 0.25·1 + 0.30·(3/10) = 0.34
        assert_eq!(r.heat(&p, &authors), 0.34);
    }

    #[test]
    fn authors_only_counted_for_known_clusters() {
        let mut a = Post::new("a", "@x", "t");
        a.cluster_id = Some("c1".into());
        let mut b = Post::new("b", "@y", "t");
        b.cluster_id = Some("c1".into());
        let mut c = Post::new("c", "@x", "t");
        c.cluster_id = Some("c1".into());
        let mut d = Post::new("d", "@z", "t");
        d.cluster_id = Some("ghost".into());
        let known = EventCluster {
            id: "c1".into(),
            title: String::new(),
            theme: String::new(),
            heat_score: 0.0,
            keywords: vec![],
            representative_ids: vec![],
            cross_refs: vec![],
            member_count: 3,
        };
        let counts = cluster_author_counts(&[a, b, c, d], &[known]);
        assert_eq!(counts.get("c1"), Some(&2));
        assert_eq!(counts.get("ghost"), None);
    }

    #[test]
    fn cap_uses_post_id_for_unassigned() {
        let posts = vec![
            scored("a", "en", 0.9, Some("k")),
            scored("b", "en", 0.8, Some("k")),
            scored("c", "en", 0.7, Some("k")),
            scored("d", "en", 0.6, None),
            scored("e", "en", 0.5, None),
        ];
        let refs: Vec<&Post> = posts.iter().collect();
        let ids: Vec<_> = cap_per_cluster(refs, 2).iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn language_mix_noop_when_satisfied() {
        let posts = vec![
            scored("a", "zh", 0.9, None),
            scored("b", "zh", 0.8, None),
            scored("c", "en", 0.7, None),
        ];
        let refs: Vec<&Post> = posts.iter().collect();
        let (out, subs) = ensure_language_mix(refs, "zh", 2, 10);
        assert_eq!(subs, 0);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn language_mix_replaces_last_non_target_and_resorts() {
        let posts = vec![
            scored("e1", "en", 0.9, None),
            scored("z1", "zh", 0.8, None),
            scored("e2", "en", 0.7, None),
            scored("e3", "en", 0.6, None),
            scored("z2", "zh", 0.5, None),
        ];
        let refs: Vec<&Post> = posts.iter().collect();
        let (out, subs) = ensure_language_mix(refs, "zh", 2, 3);
        assert_eq!(subs, 1);
        let ids: Vec<_> = out.iter().map(|p| p.id.as_str()).collect();
        // e2 (last English in the window) is dropped, z2 enters, e3 stays in the tail.
        assert_eq!(ids, vec!["e1", "z1", "z2", "e3"]);
    }
}
