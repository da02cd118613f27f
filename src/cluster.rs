// src/cluster.rs
//! Grouping engine: partitions a deduplicated batch into event clusters.
//!
//! Two passes:
//! 1. **Shared link** – posts whose normalized external URL matches land together.
//!    A post with several links joins the first group any of its links (in order)
//!    already names, otherwise it opens a new group; all of its links then
//!    point at that group.
//! 2. **Known entity** – remaining posts are grouped by the first vocabulary
//!    entity found in their lowercased text; the rest become singletons.
//!
//! Construction is split in two phases: [`Clusterer::plan`] is pure and returns
//! summaries + a post→cluster assignment, [`ClusterPlan::apply`] writes the ids.

use crate::config::ClusterParams;
use crate::metrics as m;
use crate::model::{EventCluster, Post};
use crate::vocab::{ThemeRule, Vocabulary};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

static RE_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]{3,}|[\x{4e00}-\x{9fff}]{2,}").expect("keyword regex"));

/// Result of the pure planning phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPlan {
    /// Summaries sorted by heat, descending.
    pub clusters: Vec<EventCluster>,
    /// `assignments[i]` is the cluster id for input post `i`.
    pub assignments: Vec<String>,
}

impl ClusterPlan {
    /// Write cluster ids onto the posts the plan was computed from.
    /// A post that already carries an id keeps it.
    pub fn apply(&self, posts: &mut [Post]) {
        for (post, cid) in posts.iter_mut().zip(&self.assignments) {
            match &post.cluster_id {
                None => post.cluster_id = Some(cid.clone()),
                Some(existing) if existing != cid => {
                    warn!(
                        target: "cluster",
                        id = %post.id,
                        existing = %existing,
                        planned = %cid,
                        "post already assigned; keeping existing cluster"
                    );
                }
                Some(_) => {}
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Clusterer {
    params: ClusterParams,
    entities: Vec<String>,
    themes: Vec<ThemeRule>,
    default_theme: String,
    stop_words: HashSet<String>,
    url_denylist: HashSet<String>,
    cross_ref_patterns: Vec<Regex>,
}

impl Clusterer {
    pub fn new(vocab: &Vocabulary, params: ClusterParams) -> Self {
        let cross_ref_patterns = vocab
            .code_hosts
            .iter()
            .filter_map(|host| {
                let pat = format!(r"(?i){}/([^/\s?#]+/[^/\s?#]+)", regex::escape(host));
                match Regex::new(&pat) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(target: "cluster", %host, error = %e, "skipping code host pattern");
                        None
                    }
                }
            })
            .collect();

        Self {
            params,
            entities: vocab.entities.clone(),
            themes: vocab.themes.clone(),
            default_theme: vocab.default_theme.clone(),
            stop_words: vocab.stop_words.iter().cloned().collect(),
            url_denylist: vocab.url_denylist.iter().cloned().collect(),
            cross_ref_patterns,
        }
    }

    /// Plan, apply, and return the summaries.
    pub fn cluster_events(&self, posts: &mut [Post]) -> Vec<EventCluster> {
        let plan = self.plan(posts);
        plan.apply(posts);
        plan.clusters
    }

    /// Pure grouping: never touches the posts.
    pub fn plan(&self, posts: &[Post]) -> ClusterPlan {
        if posts.is_empty() {
            return ClusterPlan {
                clusters: Vec::new(),
                assignments: Vec::new(),
            };
        }

        let (url_groups, rest) = self.group_by_shared_url(posts);
        let (entity_groups, singles) = self.group_by_entity(posts, rest);

        let url_group_count = url_groups.len();
        let entity_group_count = entity_groups.len();
        let groups: Vec<Vec<usize>> = url_groups
            .into_iter()
            .chain(entity_groups)
            .chain(singles.into_iter().map(|i| vec![i]))
            .collect();

        let mut assignments = vec![String::new(); posts.len()];
        let mut clusters = Vec::with_capacity(groups.len());
        for (gi, members) in groups.iter().enumerate() {
            let cid = format!("cluster_{gi:03}");
            for &i in members {
                assignments[i] = cid.clone();
            }
            let group: Vec<&Post> = members.iter().map(|&i| &posts[i]).collect();
            clusters.push(self.build_cluster(cid, &group));
        }

        clusters.sort_by(|a, b| b.heat_score.total_cmp(&a.heat_score));

        let singletons = clusters.iter().filter(|c| c.member_count == 1).count();
        counter!(m::CLUSTERS_TOTAL).increment(clusters.len() as u64);
        counter!(m::SINGLETON_CLUSTERS_TOTAL).increment(singletons as u64);
        debug!(
            target: "cluster",
            posts = posts.len(),
            url_groups = url_group_count,
            entity_groups = entity_group_count,
            clusters = clusters.len(),
            singletons,
            "clustered batch"
        );

        ClusterPlan {
            clusters,
            assignments,
        }
    }

    /// `scheme://host[:port]/path`, trailing slash trimmed. `None` for
    /// unparseable links and denylisted hosts.
    pub fn normalize_url(&self, raw: &str) -> Option<String> {
        let parsed = url::Url::parse(raw.trim()).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        if self.url_denylist.contains(&host) {
            return None;
        }
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };
        let joined = format!("{}://{}{}", parsed.scheme(), authority, parsed.path());
        Some(joined.trim_end_matches('/').to_string())
    }

    fn group_by_shared_url(&self, posts: &[Post]) -> (Vec<Vec<usize>>, Vec<usize>) {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut ungrouped = Vec::new();

        for (i, post) in posts.iter().enumerate() {
            let keys: Vec<String> = post
                .urls
                .iter()
                .filter_map(|u| self.normalize_url(u))
                .collect();
            if keys.is_empty() {
                ungrouped.push(i);
                continue;
            }

            let gi = match keys.iter().find_map(|k| by_key.get(k).copied()) {
                Some(gi) => {
                    groups[gi].push(i);
                    gi
                }
                None => {
                    groups.push(vec![i]);
                    groups.len() - 1
                }
            };
            // Every link of a member names its group, so later posts sharing
            // any of them land here regardless of order.
            for k in keys {
                by_key.entry(k).or_insert(gi);
            }
        }

        (groups, ungrouped)
    }

    fn group_by_entity(
        &self,
        posts: &[Post],
        candidates: Vec<usize>,
    ) -> (Vec<Vec<usize>>, Vec<usize>) {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_entity: HashMap<&str, usize> = HashMap::new();
        let mut ungrouped = Vec::new();

        for i in candidates {
            let text = posts[i].text.to_lowercase();
            let Some(entity) = self.entities.iter().find(|e| text.contains(e.as_str())) else {
                ungrouped.push(i);
                continue;
            };
            match by_entity.get(entity.as_str()) {
                Some(&gi) => groups[gi].push(i),
                None => {
                    by_entity.insert(entity.as_str(), groups.len());
                    groups.push(vec![i]);
                }
            }
        }

        (groups, ungrouped)
    }

    fn build_cluster(&self, id: String, group: &[&Post]) -> EventCluster {
        let combined = group
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let keywords = self.extract_keywords(&combined);
        let theme = self.assign_theme(&combined);
        let title = self.make_title(group, &keywords);
        let heat_score = self.estimate_heat(group);
        let cross_refs = self.extract_cross_refs(group);

        EventCluster {
            id,
            title,
            theme,
            heat_score,
            keywords,
            representative_ids: group
                .iter()
                .take(self.params.max_representatives)
                .map(|p| p.id.clone())
                .collect(),
            cross_refs,
            member_count: group.len(),
        }
    }

    /// Theme with the most keyword hits; ties keep the first declared.
    pub fn assign_theme(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let mut best: Option<(&str, usize)> = None;
        for theme in &self.themes {
            let score = theme
                .keywords
                .iter()
                .filter(|kw| lower.contains(kw.as_str()))
                .count();
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((theme.name.as_str(), score));
            }
        }
        match best {
            Some((name, score)) if score > 0 => name.to_string(),
            _ => self.default_theme.clone(),
        }
    }

    /// Most frequent non-stop-word tokens; ties keep first appearance.
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut order: Vec<&str> = Vec::new();
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for m in RE_KEYWORD.find_iter(&lower) {
            let w = m.as_str();
            if self.stop_words.contains(w) {
                continue;
            }
            let n = freq.entry(w).or_insert(0);
            if *n == 0 {
                order.push(w);
            }
            *n += 1;
        }
        // Stable sort keeps first-appearance order among equal counts.
        order.sort_by(|a, b| freq[b].cmp(&freq[a]));
        order
            .into_iter()
            .take(self.params.max_keywords)
            .map(str::to_string)
            .collect()
    }

    fn make_title(&self, group: &[&Post], keywords: &[String]) -> String {
        let Some(first) = group.first() else {
            return keywords
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(" / ");
        };
        let max = self.params.title_max_chars;
        if first.text.chars().count() > max {
            let mut t: String = first.text.chars().take(max).collect();
            t.push_str("...");
            t
        } else {
            first.text.clone()
        }
    }

    /// Max member heat if any is set, else the engagement estimate (capped).
    fn estimate_heat(&self, group: &[&Post]) -> f64 {
        let carried = group.iter().map(|p| p.heat_score).fold(0.0_f64, f64::max);
        let heat = if carried > 0.0 {
            carried
        } else {
            engagement_estimate(group).min(self.params.heat_cap)
        };
        round_to(heat.max(0.0), 1)
    }

    fn extract_cross_refs(&self, group: &[&Post]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for url in group.iter().flat_map(|p| p.urls.iter()) {
            for re in &self.cross_ref_patterns {
                if let Some(name) = re.captures(url).and_then(|c| c.get(1)) {
                    let name = name.as_str().to_string();
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            }
        }
        out.truncate(self.params.max_cross_refs);
        out
    }
}

/// `Σ(likes + 2·reposts + replies + 1.5·bookmarks) / 1000`
pub fn engagement_estimate(group: &[&Post]) -> f64 {
    let total: f64 = group
        .iter()
        .map(|p| {
            p.likes as f64 + 2.0 * p.reposts as f64 + p.replies as f64 + 1.5 * p.bookmarks as f64
        })
        .sum();
    total / 1000.0
}

pub(crate) fn round_to(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}
