//! BloomFilter (component A)
//!
//! Approximate set membership over 64-bit hashes. No false negatives, a
//! tunable false positive rate, no deletion.

use bitvec::prelude::*;
use parking_lot::RwLock;

/// A contiguous, byte-packed bit vector sized for `n` expected elements at
/// false-positive rate `p`.
///
/// `has` followed by `add` is exposed as the single atomic
/// [`BloomFilter::check_and_insert`] operation because two concurrent
/// transactions with the same identity must not both observe "absent"
/// (SPEC_FULL.md §5: a plain per-call lock would not make that sequence
/// atomic from another transaction's perspective).
pub struct BloomFilter {
    bits: RwLock<BitVec<u8, Lsb0>>,
    m: u64,
    k: u32,
}

impl BloomFilter {
    /// `m = ceil(-n * ln(p) / ln(2)^2)`, `k = ceil((m/n) * ln(2))`.
    pub fn new(expected_n: usize, false_positive_rate: f64) -> Self {
        assert!(expected_n >= 1, "expected_n must be >= 1");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        let n = expected_n as f64;
        let p = false_positive_rate;
        let m = (-n * p.ln() / (std::f64::consts::LN_2.powi(2))).ceil() as u64;
        let m = m.max(1);
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        Self {
            bits: RwLock::new(bitvec![u8, Lsb0; 0; m as usize]),
            m,
            k,
        }
    }

    /// Bit positions derived from a single 64-bit seed by iterated
    /// rotate-left-1: before each of the `k` steps, rotate the running hash
    /// left by one bit, then emit `h mod m`. Deterministic; duplicates
    /// across the k steps are tolerated.
    fn positions(&self, seed: u64) -> impl Iterator<Item = usize> + '_ {
        let m = self.m;
        let mut h = seed;
        (0..self.k).map(move |_| {
            h = h.rotate_left(1);
            (h % m) as usize
        })
    }

    /// Insert `h` into the filter. After this call, `has(h)` is guaranteed
    /// `true` (no false negatives).
    pub fn add(&self, h: u64) {
        let positions: Vec<usize> = self.positions(h).collect();
        let mut bits = self.bits.write();
        for pos in positions {
            bits.set(pos, true);
        }
    }

    /// Test membership. May return `true` for an element never inserted
    /// (false positive), never `false` for one that was inserted.
    pub fn has(&self, h: u64) -> bool {
        let bits = self.bits.read();
        self.positions(h).all(|pos| bits[pos])
    }

    /// Atomically check-then-insert: returns `true` if `h` was already
    /// present (in which case the filter is left unchanged), `false` if it
    /// was freshly inserted. This is the only way the interceptor touches
    /// the filter, so `has`-then-`add` is never split across two lock
    /// acquisitions.
    pub fn check_and_insert(&self, h: u64) -> bool {
        let positions: Vec<usize> = self.positions(h).collect();
        let mut bits = self.bits.write();
        let already_present = positions.iter().all(|&pos| bits[pos]);
        if !already_present {
            for pos in positions {
                bits.set(pos, true);
            }
        }
        already_present
    }

    /// `(1 - exp(-k*n/m))^k` for `n` elements actually inserted so far.
    pub fn estimate_fpp(&self, n_inserted: u64) -> f64 {
        let k = self.k as f64;
        let m = self.m as f64;
        let n = n_inserted as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    pub fn num_bits(&self) -> u64 {
        self.m
    }

    pub fn num_hash_functions(&self) -> u32 {
        self.k
    }
}
