//! Version graph: parent references, numbering, and ancestor traversal.
//!
//! Parents are stored next to each version as `(language_code,
//! version_number)` pairs. Within a language the previous tip is always an
//! implicit parent; explicit parents may come from any language of the same
//! video.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, VideoId};

/// A pointer to a version by language and number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    pub language_code: String,
    pub version_number: i32,
}

impl ParentRef {
    pub fn new(language_code: impl Into<String>, version_number: i32) -> Self {
        Self {
            language_code: language_code.into(),
            version_number,
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.language_code, self.version_number)
    }
}

/// The ways a caller may name an explicit parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentSpec {
    /// A loaded version; carries its video so the check needs no lookup.
    Version {
        id: DbId,
        video_id: VideoId,
        language_code: String,
        version_number: i32,
    },
    /// A version primary key.
    Id(DbId),
    /// A `(language_code, version_number)` pair within the same video.
    Ref(ParentRef),
}

impl From<ParentRef> for ParentSpec {
    fn from(r: ParentRef) -> Self {
        ParentSpec::Ref(r)
    }
}

impl From<(&str, i32)> for ParentSpec {
    fn from((lc, n): (&str, i32)) -> Self {
        ParentSpec::Ref(ParentRef::new(lc, n))
    }
}

/// Version number the next version of a language receives.
pub fn next_version_number(tip: Option<i32>) -> i32 {
    tip.map_or(1, |n| n + 1)
}

/// Combine the implicit previous-tip parent with explicit parents.
///
/// The result is deduplicated and ordered with the implicit parent first.
pub fn merge_parents(implicit_tip: Option<ParentRef>, explicit: Vec<ParentRef>) -> Vec<ParentRef> {
    let mut seen = BTreeSet::new();
    let mut merged = Vec::with_capacity(explicit.len() + 1);
    for parent in implicit_tip.into_iter().chain(explicit) {
        if seen.insert(parent.clone()) {
            merged.push(parent);
        }
    }
    merged
}

/// Reject a parent that would point at the version being created or past it.
pub fn validate_parent(
    parent: &ParentRef,
    own_language: &str,
    next_number: i32,
) -> Result<(), CoreError> {
    if parent.version_number < 1 {
        return Err(CoreError::InvalidParent(format!(
            "{parent}: version numbers start at 1"
        )));
    }
    if parent.language_code == own_language && parent.version_number >= next_number {
        return Err(CoreError::InvalidParent(format!(
            "{parent}: a version cannot descend from itself or a later version"
        )));
    }
    Ok(())
}

/// Transitive closure over parent edges, excluding `start` itself.
///
/// `parents_of` returns the stored parents of a version, or `None` when the
/// version is unknown (dangling edges are skipped). The walk is iterative
/// and visits each version once, so it terminates even on malformed input.
pub fn ancestors<F>(start: &ParentRef, mut parents_of: F) -> BTreeSet<ParentRef>
where
    F: FnMut(&ParentRef) -> Option<Vec<ParentRef>>,
{
    let mut visited = BTreeSet::new();
    let mut queue: VecDeque<ParentRef> = parents_of(start).unwrap_or_default().into();
    while let Some(current) = queue.pop_front() {
        if &current == start || !visited.insert(current.clone()) {
            continue;
        }
        if let Some(parents) = parents_of(&current) {
            queue.extend(parents);
        }
    }
    visited
}

/// Check that version numbers are exactly `1..=n` with no gaps.
pub fn validate_contiguous(mut numbers: Vec<i32>) -> Result<(), CoreError> {
    numbers.sort_unstable();
    for (idx, n) in numbers.iter().enumerate() {
        let expected = idx as i32 + 1;
        if *n != expected {
            return Err(CoreError::Internal(format!(
                "Version numbers are not contiguous: expected {expected}, found {n}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn r(lc: &str, n: i32) -> ParentRef {
        ParentRef::new(lc, n)
    }

    #[test]
    fn numbering_starts_at_one() {
        assert_eq!(next_version_number(None), 1);
        assert_eq!(next_version_number(Some(3)), 4);
    }

    #[test]
    fn merge_puts_implicit_first_and_dedups() {
        let merged = merge_parents(Some(r("en", 2)), vec![r("fr", 1), r("en", 2)]);
        assert_eq!(merged, vec![r("en", 2), r("fr", 1)]);
    }

    #[test]
    fn merge_without_tip_keeps_explicit() {
        assert_eq!(merge_parents(None, vec![r("en", 3)]), vec![r("en", 3)]);
        assert!(merge_parents(None, Vec::new()).is_empty());
    }

    #[test]
    fn parent_cannot_be_self_or_future() {
        assert!(validate_parent(&r("en", 3), "en", 3).is_err());
        assert!(validate_parent(&r("en", 4), "en", 3).is_err());
        assert!(validate_parent(&r("en", 2), "en", 3).is_ok());
        assert!(validate_parent(&r("fr", 9), "en", 3).is_ok());
        assert!(validate_parent(&r("fr", 0), "en", 3).is_err());
    }

    #[test]
    fn ancestors_walk_across_languages() {
        let mut graph: HashMap<ParentRef, Vec<ParentRef>> = HashMap::new();
        graph.insert(r("en", 1), vec![]);
        graph.insert(r("en", 2), vec![r("en", 1)]);
        graph.insert(r("en", 3), vec![r("en", 2)]);
        graph.insert(r("fr", 1), vec![r("en", 3)]);
        graph.insert(r("fr", 2), vec![r("fr", 1)]);

        let found = ancestors(&r("fr", 2), |v| graph.get(v).cloned());
        let expected: BTreeSet<_> = [r("fr", 1), r("en", 3), r("en", 2), r("en", 1)]
            .into_iter()
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn ancestors_terminate_on_cycles_and_dangling_edges() {
        let mut graph: HashMap<ParentRef, Vec<ParentRef>> = HashMap::new();
        graph.insert(r("en", 1), vec![r("en", 2), r("xx", 9)]);
        graph.insert(r("en", 2), vec![r("en", 1)]);
        let found = ancestors(&r("en", 2), |v| graph.get(v).cloned());
        assert!(found.contains(&r("en", 1)));
        assert!(found.contains(&r("xx", 9)));
        assert!(!found.contains(&r("en", 2)));
    }

    #[test]
    fn contiguity_check() {
        assert!(validate_contiguous(vec![2, 1, 3]).is_ok());
        assert!(validate_contiguous(vec![]).is_ok());
        assert!(validate_contiguous(vec![1, 3]).is_err());
        assert!(validate_contiguous(vec![2]).is_err());
    }

    #[test]
    fn parent_spec_accepts_tuple_pairs() {
        let spec: ParentSpec = ("en", 3).into();
        assert_eq!(spec, ParentSpec::Ref(r("en", 3)));
    }
}
