//! A module for defining the [`Workload`] a single logical client issues against the service.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How keys are chosen for the operations of a [`Workload`].
///
/// Values always carry the operation index, regardless of the key distribution.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeyDistribution {
    /// Key and value both equal the operation index: `(0, 0), (1, 1), ...`.
    #[default]
    Sequential,
    /// Keys are drawn uniformly from `0..key_space` using an RNG seeded with `seed`.
    Uniform {
        /// Seed for the key RNG. Every client using the same seed issues the same keys.
        #[serde(default = "default_seed")]
        seed: u64,
        /// Exclusive upper bound of generated keys, at most `i64::MAX`.
        #[serde(default = "default_key_space")]
        key_space: u64,
    },
}

fn default_seed() -> u64 {
    1212
}

fn default_key_space() -> u64 {
    10_000
}

/// A single write-like operation against the key-value service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Operation {
    /// The key to write.
    pub key: i64,
    /// The value to store under `key`.
    pub value: i64,
}

/// A builder for creating a [`Workload`].
#[derive(Debug)]
pub struct WorkloadBuilder {
    total: u64,
    keys: KeyDistribution,
}

impl WorkloadBuilder {
    /// The distribution of keys, see [`KeyDistribution`].
    pub fn key_distribution(mut self, keys: KeyDistribution) -> Self {
        self.keys = keys;
        self
    }

    /// Creates the workload instance.
    pub fn build(self) -> Workload {
        let keys = match self.keys {
            KeyDistribution::Sequential => Keys::Sequential,
            KeyDistribution::Uniform { seed, key_space } => Keys::Uniform {
                rng: SmallRng::seed_from_u64(seed),
                // Sampling panics on an empty range, and keys must fit into an `i64`.
                key_space: key_space.clamp(1, i64::MAX as u64),
            },
        };

        Workload {
            total: self.total,
            index: 0,
            keys,
        }
    }
}

#[derive(Debug)]
enum Keys {
    Sequential,
    Uniform { rng: SmallRng, key_space: u64 },
}

/// The finite, ordered sequence of operations issued by one logical client.
///
/// Operations are produced strictly in index order, each index exactly once, until `total`
/// operations have been yielded.
#[derive(Debug)]
pub struct Workload {
    total: u64,
    index: u64,
    keys: Keys,
}

impl Workload {
    /// Constructs a new workload builder producing `total` operations.
    pub fn builder(total: u64) -> WorkloadBuilder {
        WorkloadBuilder {
            total,
            keys: KeyDistribution::default(),
        }
    }

    /// The number of operations produced so far.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The total number of operations this workload produces.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Iterator for Workload {
    type Item = Operation;

    fn next(&mut self) -> Option<Operation> {
        if self.index >= self.total {
            return None;
        }

        let index = self.index as i64;
        self.index += 1;

        let key = match &mut self.keys {
            Keys::Sequential => index,
            Keys::Uniform { rng, key_space } => rng.random_range(0..*key_space) as i64,
        };

        Some(Operation { key, value: index })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_yields_index_pairs() {
        let ops: Vec<_> = Workload::builder(4).build().collect();
        let expected: Vec<_> = (0..4).map(|i| Operation { key: i, value: i }).collect();
        assert_eq!(ops, expected);
    }

    #[test]
    fn ends_after_total() {
        let mut workload = Workload::builder(2).build();
        assert!(workload.next().is_some());
        assert!(workload.next().is_some());
        assert_eq!(workload.index(), 2);
        assert_eq!(workload.next(), None);
        assert_eq!(workload.next(), None);
        assert_eq!(workload.index(), 2);
    }

    #[test]
    fn empty_workload() {
        let mut workload = Workload::builder(0).build();
        assert_eq!(workload.size_hint(), (0, Some(0)));
        assert_eq!(workload.next(), None);
    }

    #[test]
    fn size_hint_is_exact() {
        let mut workload = Workload::builder(10).build();
        workload.next();
        assert_eq!(workload.size_hint(), (9, Some(9)));
        assert_eq!(workload.count(), 9);
    }

    #[test]
    fn uniform_keys_are_seeded() {
        let keys = KeyDistribution::Uniform {
            seed: 1212,
            key_space: 100,
        };
        let a: Vec<_> = Workload::builder(50).key_distribution(keys).build().collect();
        let b: Vec<_> = Workload::builder(50).key_distribution(keys).build().collect();
        assert_eq!(a, b);

        for (i, op) in a.iter().enumerate() {
            assert!((0..100).contains(&op.key));
            assert_eq!(op.value, i as i64);
        }
    }

    #[test]
    fn uniform_with_empty_key_space() {
        let keys = KeyDistribution::Uniform {
            seed: 1,
            key_space: 0,
        };
        let ops: Vec<_> = Workload::builder(3).key_distribution(keys).build().collect();
        assert!(ops.iter().all(|op| op.key == 0));
    }

    #[test]
    fn uniform_keys_are_never_negative() {
        let keys = KeyDistribution::Uniform {
            seed: 3,
            key_space: u64::MAX,
        };
        let ops: Vec<_> = Workload::builder(1000)
            .key_distribution(keys)
            .build()
            .collect();
        assert!(ops.iter().all(|op| op.key >= 0));
    }
}
