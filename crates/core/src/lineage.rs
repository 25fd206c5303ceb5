//! Lineage: a compact summary of a version's ancestry.
//!
//! A lineage maps each language code to the highest version number of that
//! language reachable through the version's parents. It answers "did this
//! translation see source version N?" with a single lookup, so reads never
//! walk the parent graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-version map `language_code -> max ancestor version_number`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lineage(BTreeMap<String, i32>);

/// The three facts about a parent that lineage construction needs.
#[derive(Debug, Clone, Copy)]
pub struct ParentLineage<'a> {
    pub language_code: &'a str,
    pub version_number: i32,
    pub lineage: &'a Lineage,
}

impl Lineage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the lineage of a new version from its parents.
    ///
    /// Folds each parent's own lineage plus the parent's
    /// `(language_code, version_number)` entry, keeping the pointwise
    /// maximum per language.
    pub fn from_parents<'a>(parents: impl IntoIterator<Item = ParentLineage<'a>>) -> Self {
        let mut lineage = Lineage::new();
        for parent in parents {
            for (language_code, version_number) in parent.lineage.iter() {
                lineage.record(language_code, version_number);
            }
            lineage.record(parent.language_code, parent.version_number);
        }
        lineage
    }

    /// Raise the entry for `language_code` to at least `version_number`.
    pub fn record(&mut self, language_code: &str, version_number: i32) {
        self.0
            .entry(language_code.to_string())
            .and_modify(|n| *n = (*n).max(version_number))
            .or_insert(version_number);
    }

    pub fn get(&self, language_code: &str) -> Option<i32> {
        self.0.get(language_code).copied()
    }

    pub fn contains(&self, language_code: &str) -> bool {
        self.0.contains_key(language_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Languages other than `own_language` recorded in this lineage, i.e.
    /// the sources a translation was derived from.
    pub fn foreign_languages<'a>(&'a self, own_language: &'a str) -> impl Iterator<Item = &'a str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(move |lc| *lc != own_language)
    }

    /// Whether the source language has moved past what this lineage saw.
    ///
    /// A language absent from the lineage is never considered stale.
    pub fn is_stale(&self, source_language: &str, source_tip_version: i32) -> bool {
        self.get(source_language)
            .is_some_and(|seen| source_tip_version > seen)
    }
}

impl FromIterator<(String, i32)> for Lineage {
    fn from_iter<T: IntoIterator<Item = (String, i32)>>(iter: T) -> Self {
        let mut lineage = Lineage::new();
        for (lc, n) in iter {
            lineage.record(&lc, n);
        }
        lineage
    }
}

/// Advisory staleness report for a translation against its source.
///
/// Computed on read from lineage; it never triggers a new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationStatus {
    pub language_code: String,
    pub source_language: String,
    pub seen_source_version: i32,
    pub source_tip_version: i32,
    pub is_stale: bool,
}

impl TranslationStatus {
    /// Compare a translation's lineage against the current source tip.
    ///
    /// Returns `None` when the lineage records nothing about the source.
    pub fn evaluate(
        language_code: &str,
        lineage: &Lineage,
        source_language: &str,
        source_tip_version: i32,
    ) -> Option<Self> {
        let seen = lineage.get(source_language)?;
        Some(Self {
            language_code: language_code.to_string(),
            source_language: source_language.to_string(),
            seen_source_version: seen,
            source_tip_version,
            is_stale: source_tip_version > seen,
        })
    }
}
