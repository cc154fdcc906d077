//! Effective custom-format scores.

use arr_config::DEFAULT_SCORE_SET;
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "score_resolver_tests.rs"]
mod tests;

/// Resolves the score a profile gives a custom format.
///
/// Precedence: the explicit score of the assignment, then the format's score in the
/// profile's score set, then the format's `default` score. `None` means the configuration
/// has no opinion; the profile's reset policy decides what happens then.
pub fn resolve_score(
    score_set: Option<&str>,
    score_sets: &BTreeMap<String, i64>,
    explicit: Option<i64>,
) -> Option<i64> {
    explicit
        .or_else(|| score_set.and_then(|set| score_sets.get(set).copied()))
        .or_else(|| score_sets.get(DEFAULT_SCORE_SET).copied())
}
