//! Write/read-back validation
//!
//! Backends are free to return entries in key order, insertion order or any
//! other order, so the comparison ignores order: the two sequences must hold
//! the same `(key, value)` pairs, each the same number of times.

use std::collections::{HashMap, HashSet};

use crate::error::ValidationError;
use crate::workload::{KeyValuePair, Token};

/// Check that `read` holds exactly the pairs in `written`, ignoring order.
///
/// Both sides are compared as multisets of `(key, value)` pairs, so repeated
/// pairs must repeat the same number of times on each side. Reports the first
/// disagreement found: a length difference, a read-back key whose value
/// differs, a read-back key that was never written, or a written key that
/// never came back.
pub fn compare_read_write<T: Token>(
    written: &[KeyValuePair<T>],
    read: &[KeyValuePair<T>],
) -> Result<(), ValidationError> {
    if written.len() != read.len() {
        return Err(ValidationError::LengthMismatch {
            written: written.len(),
            read: read.len(),
        });
    }

    let expected = sorted_pairs(written);
    let actual = sorted_pairs(read);
    if expected == actual {
        return Ok(());
    }

    Err(first_difference(written, read)
        .unwrap_or_else(|| count_difference(&expected, &actual)))
}

fn sorted_pairs<T: Token>(pairs: &[KeyValuePair<T>]) -> Vec<(&T, &T)> {
    let mut sorted: Vec<(&T, &T)> = pairs.iter().map(|p| (&p.key, &p.value)).collect();
    sorted.sort_unstable();
    sorted
}

/// Locate a key-level disagreement, in read-back order
fn first_difference<T: Token>(
    written: &[KeyValuePair<T>],
    read: &[KeyValuePair<T>],
) -> Option<ValidationError> {
    let mut expected: HashMap<&T, Vec<&T>> = HashMap::with_capacity(written.len());
    for pair in written {
        expected.entry(&pair.key).or_default().push(&pair.value);
    }

    let mut seen: HashSet<&T> = HashSet::with_capacity(read.len());
    for pair in read {
        match expected.get(&pair.key) {
            Some(values) if values.contains(&&pair.value) => {
                seen.insert(&pair.key);
            }
            Some(values) => {
                return Some(ValidationError::ValueMismatch {
                    key: pair.key.describe(),
                    written: values[0].describe(),
                    read: pair.value.describe(),
                });
            }
            None => {
                return Some(ValidationError::UnexpectedKey {
                    key: pair.key.describe(),
                });
            }
        }
    }

    written
        .iter()
        .find(|p| !seen.contains(&p.key))
        .map(|missing| ValidationError::MissingKey {
            key: missing.key.describe(),
        })
}

/// Every key and value appears on both sides but a pair repeats a different
/// number of times; report the first sorted position that disagrees
fn count_difference<T: Token>(expected: &[(&T, &T)], actual: &[(&T, &T)]) -> ValidationError {
    let (want, got) = expected
        .iter()
        .zip(actual)
        .find(|(want, got)| want != got)
        .map(|(want, got)| (*want, *got))
        .unwrap_or((expected[0], actual[0]));

    if want.0 == got.0 {
        ValidationError::ValueMismatch {
            key: want.0.describe(),
            written: want.1.describe(),
            read: got.1.describe(),
        }
    } else {
        ValidationError::MissingKey {
            key: want.0.describe(),
        }
    }
}
