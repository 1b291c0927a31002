//! Seeded datasets behind the record stores.

pub mod generator;

use std::time::Duration;

use crate::store::{Backend, MemoryStore, Record};

pub use generator::Generator;

/// How the mock backend is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    /// Generator seed.
    pub seed: u64,
    /// Records in the larger datasets; the smaller ones scale from it.
    pub records: usize,
    /// Delay of every store operation.
    pub latency: Duration,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            seed: 42,
            records: 60,
            latency: Duration::ZERO,
        }
    }
}

/// Builds every store the dashboard pages read from.
#[must_use]
pub fn seed_backend(seed: Seed) -> Backend {
    let mut g = Generator::new(seed.seed);
    let n = seed.records;
    let small = (n / 4).max(1);
    let store = |name: &str, records: Vec<Record>| {
        MemoryStore::new(name)
            .with_latency(seed.latency)
            .with_records(records)
    };

    Backend::new()
        .with_store(store("users", g.users(n)))
        .with_store(store("donors", g.donors(n)))
        .with_store(store("programmes", g.programmes(n)))
        .with_store(store("disbursements", g.disbursements(n)))
        .with_store(store("assets", g.assets(small)))
        .with_store(store("liabilities", g.liabilities(small)))
        .with_store(store("receipts", g.receipts(n)))
        .with_store(store("expenses", g.expenses(n)))
        .with_store(store("donations", g.donations(n)))
        .with_store(store("archive", g.archived(small)))
        .with_store(store("staff", g.staff(small)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_backend_sizes() {
        let backend = seed_backend(Seed {
            records: 40,
            ..Seed::default()
        });
        let counts = backend.counts().await;
        assert_eq!(counts.len(), 11);
        assert_eq!(counts["donors"], 40);
        assert_eq!(counts["archive"], 10);
    }
}
