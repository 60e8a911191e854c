//! Deterministic random number generation for sample data.
//!
//! RULE: sample generation never calls any platform RNG.
//! Each table gets its own stream, seeded from
//! (master_seed XOR stream_index * golden-ratio constant). This means:
//!   - Changing the customer row count never changes transactions.
//!   - Each table is fully reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single table.
pub struct SampleRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SampleRng {
    /// The stream index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Roll an integer in [lo, hi].
    pub fn int_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64_below(hi - lo + 1)
    }

    /// Uniform pick. Panics on an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// Weighted pick over (item, weight) pairs. Weights must not all be zero.
    pub fn weighted<'a, T>(&mut self, items: &'a [(T, u32)]) -> &'a T {
        let total: u64 = items.iter().map(|(_, w)| *w as u64).sum();
        let mut roll = self.next_u64_below(total);
        for (item, w) in items {
            let w = *w as u64;
            if roll < w {
                return item;
            }
            roll -= w;
        }
        &items[items.len() - 1].0
    }
}

/// All table streams for one generation run.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, stream: Stream) -> SampleRng {
        SampleRng::new(self.master_seed, stream as u64).with_name(stream.name())
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries. Append only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Stream {
    Transactions = 0,
    Customers = 1,
}

impl Stream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Customers => "customers",
        }
    }
}
