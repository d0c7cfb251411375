//! Test data generation
//!
//! Produces the key/value workloads written to each backend. Workloads come in
//! two encodings: text tokens (`String`) and raw byte buffers (`Vec<u8>`).
//! Keys within a workload are unique; values are drawn independently of keys.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, BackendResult};

/// Number of pairs in a default benchmark workload
pub const DEFAULT_ITEM_COUNT: usize = 10_000;
/// Length of generated keys, in characters or bytes
pub const DEFAULT_KEY_LENGTH: usize = 16;
/// Length of generated values, in characters or bytes
pub const DEFAULT_VALUE_LENGTH: usize = 32;
/// Length of the random part of ephemeral storage names
pub const NAME_TOKEN_LENGTH: usize = 32;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// How keys and values are represented on the wire to a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Text,
    Binary,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Encoding::Text => "text",
            Encoding::Binary => "binary",
        })
    }
}

/// A key or value in one of the supported encodings.
///
/// Equality is content equality for both encodings, so binary pairs compare
/// byte-wise.
pub trait Token: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static {
    const ENCODING: Encoding;

    /// Draw a uniformly distributed token of exactly `length` units
    fn random<R: Rng>(rng: &mut R, length: usize) -> Self;

    /// Number of distinct tokens of the given length
    fn key_space(length: usize) -> f64;

    fn as_bytes(&self) -> &[u8];

    fn from_bytes(bytes: &[u8]) -> BackendResult<Self>;

    /// Printable form used in validation reports
    fn describe(&self) -> String;
}

impl Token for String {
    const ENCODING: Encoding = Encoding::Text;

    fn random<R: Rng>(rng: &mut R, length: usize) -> Self {
        (0..length)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    }

    fn key_space(length: usize) -> f64 {
        (CHARSET.len() as f64).powi(length as i32)
    }

    fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> BackendResult<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|e| BackendError::Decode {
            reason: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl Token for Vec<u8> {
    const ENCODING: Encoding = Encoding::Binary;

    fn random<R: Rng>(rng: &mut R, length: usize) -> Self {
        let mut buf = vec![0u8; length];
        rng.fill(&mut buf[..]);
        buf
    }

    fn key_space(length: usize) -> f64 {
        256f64.powi(length as i32)
    }

    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn from_bytes(bytes: &[u8]) -> BackendResult<Self> {
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("0x{}", hex::encode(self))
    }
}

/// An ordered (key, value) pair; both sides share one encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyValuePair<T> {
    pub key: T,
    pub value: T,
}

impl<T> KeyValuePair<T> {
    pub fn new(key: T, value: T) -> Self {
        Self { key, value }
    }
}

impl<T> From<(T, T)> for KeyValuePair<T> {
    fn from((key, value): (T, T)) -> Self {
        Self { key, value }
    }
}

impl From<(&str, &str)> for KeyValuePair<String> {
    fn from((key, value): (&str, &str)) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// The fixed input of a benchmark run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload<T> {
    pairs: Vec<KeyValuePair<T>>,
}

impl<T: Token> Workload<T> {
    /// Wrap an existing sequence. Callers are expected to supply unique keys.
    pub fn from_pairs<I, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyValuePair<T>>,
    {
        Self {
            pairs: pairs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn pairs(&self) -> &[KeyValuePair<T>] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValuePair<T>> {
        self.pairs.iter()
    }

    pub fn encoding(&self) -> Encoding {
        T::ENCODING
    }

    /// Total payload size of keys and values
    pub fn payload_bytes(&self) -> usize {
        self.pairs
            .iter()
            .map(|p| p.key.as_bytes().len() + p.value.as_bytes().len())
            .sum()
    }
}

impl<'a, T> IntoIterator for &'a Workload<T> {
    type Item = &'a KeyValuePair<T>;
    type IntoIter = std::slice::Iter<'a, KeyValuePair<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// Workload generator with a configurable shape and optional fixed seed
pub struct WorkloadGenerator {
    rng: StdRng,
    key_length: usize,
    value_length: usize,
}

impl WorkloadGenerator {
    pub fn new(key_length: usize, value_length: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            rng,
            key_length,
            value_length,
        }
    }

    /// Generate `count` pairs with pairwise distinct keys.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the number of distinct keys of the configured
    /// length. [`Config::validate`](crate::config::Config::validate) rejects
    /// such shapes up front.
    pub fn generate<T: Token>(&mut self, count: usize) -> Workload<T> {
        assert!(
            count as f64 <= T::key_space(self.key_length),
            "cannot draw {} distinct {} keys of length {}",
            count,
            T::ENCODING,
            self.key_length
        );

        let mut seen = HashSet::with_capacity(count);
        let mut pairs = Vec::with_capacity(count);
        while pairs.len() < count {
            let key = T::random(&mut self.rng, self.key_length);
            if !seen.insert(key.clone()) {
                continue;
            }
            let value = T::random(&mut self.rng, self.value_length);
            pairs.push(KeyValuePair { key, value });
        }

        Workload { pairs }
    }
}

impl Default for WorkloadGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_LENGTH, DEFAULT_VALUE_LENGTH, None)
    }
}

/// Generate `count` text pairs with the default shape
pub fn generate_string_pairs(count: usize) -> Workload<String> {
    WorkloadGenerator::default().generate(count)
}

/// Generate `count` binary pairs with the default shape
pub fn generate_buffer_pairs(count: usize) -> Workload<Vec<u8>> {
    WorkloadGenerator::default().generate(count)
}

/// Uniformly distributed alphanumeric token of exactly `length` characters.
///
/// Draws from the thread-local generator, never from a workload seed, so
/// ephemeral storage names stay distinct across runs.
pub fn generate_random_token(length: usize) -> String {
    String::random(&mut rand::thread_rng(), length)
}
