// tests/common/mod.rs
#![allow(dead_code)]

use daily_digest::Post;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

const WORDS: &[&str] = &[
    "claude", "openai", "cursor", "agent", "release", "benchmark", "workflow", "demo", "vector",
    "retrieval", "model", "framework", "ships", "today", "fast", "new", "open", "source", "tool",
    "编程", "智能体", "发布", "模型", "评测",
];

const LINKS: &[&str] = &[
    "https://github.com/acme/agent",
    "https://github.com/foo/bar/issues/1",
    "https://blog.example.com/post/1",
    "https://blog.example.com/post/1/?utm=x",
    "https://news.example.org/story",
    "https://x.com/someone/status/1",
    "https://t.co/abc",
];

/// Random batch with deliberate repeats so every dedup and cluster path runs.
pub fn random_batch(rng: &mut StdRng, n: usize) -> Vec<Post> {
    let mut posts: Vec<Post> = Vec::with_capacity(n);
    for i in 0..n {
        if i > 0 && rng.random_bool(0.15) {
            let src = &posts[rng.random_range(0..posts.len())];
            let mut copy = src.clone();
            copy.id = format!("p{i:03}");
            posts.push(copy);
            continue;
        }

        let len = rng.random_range(0..10);
        let text = (0..len)
            .filter_map(|_| WORDS.choose(rng).copied())
            .collect::<Vec<_>>()
            .join(" ");
        let links = rng.random_range(0..3);
        let urls: Vec<&str> = (0..links).filter_map(|_| LINKS.choose(rng).copied()).collect();
        let lang = if rng.random_bool(0.3) { "zh" } else { "en" };

        posts.push(
            Post::new(format!("p{i:03}"), format!("@user{}", rng.random_range(0..8)), text)
                .lang(lang)
                .urls(urls)
                .engagement(
                    rng.random_range(0..5_000),
                    rng.random_range(0..500),
                    rng.random_range(0..200),
                    rng.random_range(0..300),
                )
                .ad_suspect(rng.random_bool(0.05)),
        );
    }
    posts
}
