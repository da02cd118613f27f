// tests/dedup_props.rs
mod common;

use daily_digest::config::DedupParams;
use daily_digest::dedup::{fingerprint, hamming};
use daily_digest::Deduplicator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn ids(posts: &[daily_digest::Post]) -> Vec<String> {
    posts.iter().map(|p| p.id.clone()).collect()
}

#[test]
fn dedup_is_idempotent() {
    let d = Deduplicator::default();
    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let batch = common::random_batch(&mut rng, 60);
        let once = d.dedup(batch);
        let twice = d.dedup(once.clone());
        assert_eq!(ids(&once), ids(&twice), "seed {seed}");
    }
}

#[test]
fn retained_pairs_are_far_apart_and_link_distinct() {
    let d = Deduplicator::new(DedupParams { max_hamming: 3 });
    for seed in 100..125 {
        let mut rng = StdRng::seed_from_u64(seed);
        let kept = d.dedup(common::random_batch(&mut rng, 60));

        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                assert!(
                    hamming(fingerprint(&a.text), fingerprint(&b.text)) > 3,
                    "seed {seed}: {} / {} too close",
                    a.id,
                    b.id
                );
                let ua: BTreeSet<&str> = a.urls.iter().map(String::as_str).collect();
                let ub: BTreeSet<&str> = b.urls.iter().map(String::as_str).collect();
                assert!(ua.is_empty() || ua != ub, "seed {seed}: shared link set");
            }
        }
    }
}

#[test]
fn output_is_an_ordered_subsequence() {
    let d = Deduplicator::default();
    let mut rng = StdRng::seed_from_u64(7);
    let batch = common::random_batch(&mut rng, 80);
    let input = ids(&batch);
    let kept = ids(&d.dedup(batch));

    let mut it = input.iter();
    for id in &kept {
        assert!(it.any(|x| x == id), "{id} out of order");
    }
}

#[test]
fn copies_never_survive() {
    let d = Deduplicator::default();
    let mut rng = StdRng::seed_from_u64(42);
    let kept = d.dedup(common::random_batch(&mut rng, 100));
    let texts: BTreeSet<&str> = kept.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts.len(), kept.len());
}
