//! Team language preferences.
//!
//! Rows are stored only for languages that deviate from the default
//! (readable, writable, not preferred). The three derived sets are
//! complements over the language catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One stored preference row, before or after normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePreference {
    pub language_code: String,
    pub preferred: bool,
    pub allow_reads: bool,
    pub allow_writes: bool,
}

impl LanguagePreference {
    pub fn preferred(language_code: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            preferred: true,
            allow_reads: false,
            allow_writes: false,
        }
    }

    pub fn blacklisted(language_code: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            preferred: false,
            allow_reads: false,
            allow_writes: false,
        }
    }

    /// Normalise the flags for saving.
    ///
    /// A preferred row's read/write flags carry no meaning and are zeroed.
    /// A row that is readable, writable and not preferred is the default
    /// state and must be deleted instead of saved.
    pub fn normalized(mut self) -> Result<Self, CoreError> {
        if self.preferred {
            self.allow_reads = false;
            self.allow_writes = false;
        } else if self.allow_reads && self.allow_writes {
            return Err(CoreError::Validation(format!(
                "Preference for '{}' matches the default; delete it instead",
                self.language_code
            )));
        }
        Ok(self)
    }

    pub fn is_blacklisted(&self) -> bool {
        !self.preferred && !self.allow_reads && !self.allow_writes
    }

    pub fn blocks_writes(&self) -> bool {
        !self.preferred && !self.allow_writes
    }

    pub fn blocks_reads(&self) -> bool {
        !self.preferred && !self.allow_reads
    }
}

/// Derived language sets for one team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageSets {
    pub writable: BTreeSet<String>,
    pub readable: BTreeSet<String>,
    pub preferred: BTreeSet<String>,
    pub blacklisted: BTreeSet<String>,
}

impl LanguageSets {
    /// Compute every set from the stored rows and the catalog.
    pub fn compute<'a>(
        all_codes: impl IntoIterator<Item = &'a str>,
        prefs: &[LanguagePreference],
    ) -> Self {
        let unwritable: BTreeSet<&str> = prefs
            .iter()
            .filter(|p| p.blocks_writes())
            .map(|p| p.language_code.as_str())
            .collect();
        let unreadable: BTreeSet<&str> = prefs
            .iter()
            .filter(|p| p.blocks_reads())
            .map(|p| p.language_code.as_str())
            .collect();

        let mut sets = LanguageSets::default();
        for code in all_codes {
            if !unwritable.contains(code) {
                sets.writable.insert(code.to_string());
            }
            if !unreadable.contains(code) {
                sets.readable.insert(code.to_string());
            }
        }
        for pref in prefs {
            if pref.preferred {
                sets.preferred.insert(pref.language_code.clone());
            }
            if pref.is_blacklisted() {
                sets.blacklisted.insert(pref.language_code.clone());
            }
        }
        sets
    }

    pub fn can_write(&self, language_code: &str) -> bool {
        self.writable.contains(language_code)
    }

    pub fn can_read(&self, language_code: &str) -> bool {
        self.readable.contains(language_code)
    }
}

/// Merge a new preferred set and blacklist into the stored rows.
///
/// The two input sets must be disjoint. Rows for languages in neither set
/// keep their partial read/write restrictions; rows that end up at the
/// default state are dropped.
pub fn apply_language_lists(
    existing: &[LanguagePreference],
    preferred: &BTreeSet<String>,
    blacklisted: &BTreeSet<String>,
) -> Result<Vec<LanguagePreference>, CoreError> {
    if let Some(both) = preferred.intersection(blacklisted).next() {
        return Err(CoreError::Validation(format!(
            "Language '{both}' cannot be both preferred and blacklisted"
        )));
    }

    let mut rows = Vec::new();
    for lc in preferred {
        rows.push(LanguagePreference::preferred(lc.clone()));
    }
    for lc in blacklisted {
        rows.push(LanguagePreference::blacklisted(lc.clone()));
    }
    for pref in existing {
        let lc = &pref.language_code;
        if preferred.contains(lc) || blacklisted.contains(lc) {
            continue;
        }
        // Drop previously preferred or blacklisted entries that were not
        // re-submitted; keep partial restrictions.
        if pref.preferred || pref.is_blacklisted() {
            continue;
        }
        if let Ok(row) = pref.clone().normalized() {
            rows.push(row);
        }
    }
    rows.sort_by(|a, b| a.language_code.cmp(&b.language_code));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn partial(lc: &str, reads: bool, writes: bool) -> LanguagePreference {
        LanguagePreference {
            language_code: lc.to_string(),
            preferred: false,
            allow_reads: reads,
            allow_writes: writes,
        }
    }

    #[test]
    fn preferred_rows_drop_their_flags() {
        let row = LanguagePreference {
            allow_reads: true,
            allow_writes: true,
            ..LanguagePreference::preferred("fr")
        };
        let row = row.normalized().unwrap();
        assert!(!row.allow_reads && !row.allow_writes);
    }

    #[test]
    fn default_state_rows_are_illegal() {
        assert!(partial("fr", true, true).normalized().is_err());
        assert!(partial("fr", true, false).normalized().is_ok());
    }

    #[test]
    fn derived_sets_are_complements() {
        let catalog = ["de", "en", "es", "fr"];
        let prefs = vec![
            LanguagePreference::preferred("fr"),
            partial("de", true, false),
            LanguagePreference::blacklisted("es"),
        ];
        let sets = LanguageSets::compute(catalog, &prefs);
        assert_eq!(sets.writable, set(&["en", "fr"]));
        assert_eq!(sets.readable, set(&["de", "en", "fr"]));
        assert_eq!(sets.preferred, set(&["fr"]));
        assert_eq!(sets.blacklisted, set(&["es"]));
        assert!(sets.preferred.is_disjoint(&sets.blacklisted));
    }

    #[test]
    fn overlapping_lists_are_rejected() {
        let err = apply_language_lists(&[], &set(&["fr"]), &set(&["fr", "de"]));
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn applying_lists_keeps_partial_restrictions() {
        let existing = vec![
            LanguagePreference::preferred("it"),
            partial("de", true, false),
            LanguagePreference::blacklisted("ru"),
        ];
        let rows = apply_language_lists(&existing, &set(&["fr"]), &set(&["es"])).unwrap();
        let codes: Vec<_> = rows.iter().map(|r| r.language_code.as_str()).collect();
        assert_eq!(codes, vec!["de", "es", "fr"]);
    }
}
