//! Deterministic corpus sampling.
//!
//! A selection depends only on the corpus key set and the seed. Keys are
//! sorted before the draw, so neither the read order of `corpus.jsonl` nor
//! map iteration order can change which documents are picked.
//!
//! The draw uses `Xoshiro256PlusPlus` seeded through SplitMix64 and a
//! partial Fisher-Yates shuffle over raw `u64` output. Both are fixed
//! algorithms, so a seed selects the same ids on every platform and across
//! dependency upgrades.

use crate::beir::Corpus;
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::{RngCore, SeedableRng};

/// A reproducible random subset of corpus document ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSelection {
    ids: Vec<String>,
    total: usize,
    seed: u64,
}

impl SampleSelection {
    /// Selected ids, sorted.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of selected ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing was selected (empty corpus).
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Size of the key set the sample was drawn from.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Seed the sample was drawn with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether `id` is part of the selection.
    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .binary_search_by(|key| key.as_str().cmp(id))
            .is_ok()
    }

    /// Human-readable progress line for this selection.
    pub fn notice(&self) -> String {
        format!(
            "Sampling {} of {} docs (seed={})",
            self.len(),
            self.total,
            self.seed
        )
    }
}

/// Sample a corpus.
///
/// Returns `None` when no sampling was requested (`requested` is `None` or
/// `Some(0)`); the caller then streams the whole corpus. Otherwise draws
/// `min(requested, corpus.len())` distinct ids.
pub fn sample_corpus(
    corpus: &Corpus,
    requested: Option<usize>,
    seed: u64,
) -> Option<SampleSelection> {
    let requested = requested.filter(|&n| n > 0)?;
    Some(sample_ids(corpus.keys().map(String::as_str), requested, seed))
}

/// Draw `min(requested, n)` distinct ids from `keys` without replacement.
///
/// Duplicate keys are collapsed before drawing.
pub fn sample_ids<'a, I>(keys: I, requested: usize, seed: u64) -> SampleSelection
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keys: Vec<&str> = keys.into_iter().collect();
    keys.sort_unstable();
    keys.dedup();

    let total = keys.len();
    let k = requested.min(total);

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..total).collect();
    for i in 0..k {
        let j = i + bounded(&mut rng, (total - i) as u64) as usize;
        order.swap(i, j);
    }
    order.truncate(k);
    order.sort_unstable();

    let ids: Vec<String> = order.into_iter().map(|i| keys[i].to_string()).collect();
    log::debug!("Sampled {} of {} ids with seed {}", ids.len(), total, seed);

    SampleSelection { ids, total, seed }
}

/// Uniform value in `0..bound` by rejection sampling. `bound` must be non-zero.
fn bounded(rng: &mut impl RngCore, bound: u64) -> u64 {
    let threshold = bound.wrapping_neg() % bound;
    loop {
        let r = rng.next_u64();
        if r >= threshold {
            return r % bound;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beir::CorpusRecord;

    fn corpus_of(n: usize) -> Corpus {
        (0..n)
            .map(|i| (format!("doc-{i:04}"), CorpusRecord::text_only(format!("text {i}"))))
            .collect()
    }

    #[test]
    fn test_no_sample_requested() {
        let corpus = corpus_of(10);
        assert!(sample_corpus(&corpus, None, 42).is_none());
    }

    #[test]
    fn test_zero_sample_means_no_sampling() {
        let corpus = corpus_of(10);
        assert!(sample_corpus(&corpus, Some(0), 42).is_none());
    }

    #[test]
    fn test_sample_size() {
        let corpus = corpus_of(100);
        let selection = sample_corpus(&corpus, Some(10), 42).unwrap();
        assert_eq!(selection.len(), 10);
        assert_eq!(selection.total(), 100);
        assert_eq!(selection.seed(), 42);
    }

    #[test]
    fn test_sample_ids_distinct_and_from_corpus() {
        let corpus = corpus_of(50);
        let selection = sample_corpus(&corpus, Some(20), 7).unwrap();

        let mut seen = std::collections::HashSet::new();
        for id in selection.ids() {
            assert!(corpus.contains_key(id));
            assert!(seen.insert(id.clone()), "duplicate id {id}");
        }
    }

    #[test]
    fn test_sample_is_sorted() {
        let corpus = corpus_of(200);
        let selection = sample_corpus(&corpus, Some(30), 3).unwrap();
        let mut sorted = selection.ids().to_vec();
        sorted.sort();
        assert_eq!(selection.ids(), sorted.as_slice());
    }

    #[test]
    fn test_sample_deterministic() {
        let corpus = corpus_of(1000);
        let a = sample_corpus(&corpus, Some(25), 42).unwrap();
        let b = sample_corpus(&corpus, Some(25), 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_independent_of_key_order() {
        let forward = corpus_of(500);
        let reversed: Corpus = forward
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let a = sample_corpus(&forward, Some(40), 11).unwrap();
        let b = sample_corpus(&reversed, Some(40), 11).unwrap();
        assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn test_different_seeds_differ() {
        let corpus = corpus_of(1000);
        let a = sample_corpus(&corpus, Some(50), 42).unwrap();
        let b = sample_corpus(&corpus, Some(50), 7).unwrap();
        assert_ne!(a.ids(), b.ids());
    }

    #[test]
    fn test_sample_clamps_to_corpus_size() {
        let corpus = corpus_of(2);
        let selection = sample_corpus(&corpus, Some(10), 42).unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.ids(), ["doc-0000", "doc-0001"]);
    }

    #[test]
    fn test_sample_exact_corpus_size_selects_all() {
        let corpus = corpus_of(17);
        let selection = sample_corpus(&corpus, Some(17), 5).unwrap();
        let mut expected: Vec<String> = corpus.keys().cloned().collect();
        expected.sort();
        assert_eq!(selection.ids(), expected.as_slice());
    }

    #[test]
    fn test_sample_empty_corpus() {
        let corpus = Corpus::new();
        let selection = sample_corpus(&corpus, Some(5), 42).unwrap();
        assert!(selection.is_empty());
        assert_eq!(selection.total(), 0);
    }

    #[test]
    fn test_sample_ids_dedups_keys() {
        let selection = sample_ids(["b", "a", "b", "a"], 10, 1);
        assert_eq!(selection.ids(), ["a", "b"]);
        assert_eq!(selection.total(), 2);
    }

    #[test]
    fn test_contains() {
        let corpus = corpus_of(100);
        let selection = sample_corpus(&corpus, Some(10), 42).unwrap();
        for id in selection.ids() {
            assert!(selection.contains(id));
        }
        assert!(!selection.contains("not-a-doc"));
    }

    #[test]
    fn test_pinned_selections() {
        let two: Corpus = [
            ("d1".to_string(), CorpusRecord::new("T1", "X1")),
            ("d2".to_string(), CorpusRecord::text_only("X2")),
        ]
        .into_iter()
        .collect();
        let pick = |seed| sample_corpus(&two, Some(1), seed).unwrap().ids().to_vec();
        assert_eq!(pick(42), ["d2"]);
        assert_eq!(pick(7), ["d2"]);
        assert_eq!(pick(2), ["d1"]);
        assert_eq!(pick(5), ["d1"]);

        let hundred = corpus_of(100);
        let selection = sample_corpus(&hundred, Some(5), 42).unwrap();
        assert_eq!(
            selection.ids(),
            ["doc-0012", "doc-0051", "doc-0056", "doc-0084", "doc-0087"]
        );
        let selection = sample_corpus(&hundred, Some(5), 7).unwrap();
        assert_eq!(
            selection.ids(),
            ["doc-0024", "doc-0026", "doc-0034", "doc-0045", "doc-0061"]
        );

        let ten = corpus_of(10);
        let selection = sample_corpus(&ten, Some(3), 42).unwrap();
        assert_eq!(selection.ids(), ["doc-0001", "doc-0003", "doc-0006"]);
    }

    #[test]
    fn test_bounded_stays_in_range() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        for bound in [1u64, 2, 3, 7, 1000, u64::MAX] {
            for _ in 0..100 {
                assert!(bounded(&mut rng, bound) < bound);
            }
        }
    }

    #[test]
    fn test_notice() {
        let corpus = corpus_of(2);
        let selection = sample_corpus(&corpus, Some(10), 42).unwrap();
        assert_eq!(selection.notice(), "Sampling 2 of 2 docs (seed=42)");
    }
}
