//! Approximate block decision cache.
//!
//! Buckets previously chosen (glyph, fg, bg) matches under block signatures.
//! A signature hit is only a candidate: the eight anchors approximate the
//! four pixels, so every cached match is re-scored against the live pixels
//! and must beat the adaptive threshold to be reused. Buckets may hold
//! several matches per signature; insertion never deduplicates.

use std::collections::HashMap;

use super::signature::Signature;

/// A previously chosen block decision, keyed by palette indices.
///
/// Error is not stored: it depends on the querying block's pixels and edge
/// status and is recomputed on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedMatch {
    pub glyph: u8,
    pub fg: u32,
    pub bg: u32,
}

/// Map from block signature to candidate matches.
#[derive(Debug, Default)]
pub struct ApproximateCache {
    buckets: HashMap<Signature, Vec<CachedMatch>>,
}

impl ApproximateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-score every candidate under `score` and return the best one
    /// strictly below `threshold`, with its recomputed error.
    ///
    /// Returns `None` when the bucket is empty or nothing qualifies, which
    /// callers treat as a miss.
    pub fn lookup<F>(
        &self,
        sig: &Signature,
        threshold: f64,
        mut score: F,
    ) -> Option<(CachedMatch, f64)>
    where
        F: FnMut(&CachedMatch) -> f64,
    {
        let bucket = self.buckets.get(sig)?;
        let mut best: Option<(CachedMatch, f64)> = None;
        for m in bucket {
            let err = score(m);
            if err >= threshold {
                continue;
            }
            match best {
                Some((_, best_err)) if best_err <= err => {}
                _ => best = Some((*m, err)),
            }
        }
        best
    }

    /// Append a match to the signature's bucket.
    pub fn insert(&mut self, sig: Signature, m: CachedMatch) {
        self.buckets.entry(sig).or_default().push(m);
    }

    /// Number of distinct signatures cached.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop all cached decisions.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn sig(n: u8) -> Signature {
        let c = Rgb::new(n, n, n);
        Signature::pack([c; 4], [c; 4])
    }

    #[test]
    fn test_empty_lookup_is_miss() {
        let cache = ApproximateCache::new();
        assert!(cache.lookup(&sig(1), 100.0, |_| 0.0).is_none());
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut cache = ApproximateCache::new();
        cache.insert(sig(1), CachedMatch { glyph: 3, fg: 0, bg: 1 });

        // Error exactly at the threshold does not qualify.
        assert!(cache.lookup(&sig(1), 40.0, |_| 40.0).is_none());
        assert!(cache.lookup(&sig(1), 40.0, |_| 39.99).is_some());
    }

    #[test]
    fn test_best_of_multiple_candidates() {
        let mut cache = ApproximateCache::new();
        let a = CachedMatch { glyph: 1, fg: 0, bg: 1 };
        let b = CachedMatch { glyph: 2, fg: 1, bg: 0 };
        let c = CachedMatch { glyph: 3, fg: 2, bg: 2 };
        cache.insert(sig(1), a);
        cache.insert(sig(1), b);
        cache.insert(sig(1), c);

        // Score by glyph: candidate b scores lowest below the bar.
        let (m, err) = cache
            .lookup(&sig(1), 100.0, |m| match m.glyph {
                1 => 50.0,
                2 => 10.0,
                _ => 60.0,
            })
            .unwrap();
        assert_eq!(m, b);
        assert_eq!(err, 10.0);
    }

    #[test]
    fn test_duplicate_matches_allowed() {
        let mut cache = ApproximateCache::new();
        let m = CachedMatch { glyph: 5, fg: 1, bg: 2 };
        cache.insert(sig(1), m);
        cache.insert(sig(1), m);
        assert_eq!(cache.len(), 1, "same signature, one bucket");
        // Both copies score; lookup still resolves.
        assert!(cache.lookup(&sig(1), 1.0, |_| 0.5).is_some());
    }

    #[test]
    fn test_distinct_signatures_distinct_buckets() {
        let mut cache = ApproximateCache::new();
        cache.insert(sig(1), CachedMatch { glyph: 1, fg: 0, bg: 0 });
        cache.insert(sig(2), CachedMatch { glyph: 2, fg: 0, bg: 0 });
        assert_eq!(cache.len(), 2);
        let (m, _) = cache.lookup(&sig(2), 10.0, |_| 0.0).unwrap();
        assert_eq!(m.glyph, 2);
    }

    #[test]
    fn test_clear() {
        let mut cache = ApproximateCache::new();
        cache.insert(sig(1), CachedMatch { glyph: 1, fg: 0, bg: 0 });
        cache.clear();
        assert!(cache.is_empty());
    }
}
