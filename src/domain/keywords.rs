// ============================================================
// NEGATIVE KEYWORD SET
// ============================================================
// Ordered, deduplicated, trimmed list of negative keywords.
// No I/O here; persistence lives in infrastructure::keyword_store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical negative-keyword set.
///
/// Entries are never empty, never carry leading/trailing whitespace and are
/// unique by exact, case-sensitive comparison. Insertion order is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet {
    entries: Vec<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary input: trim, drop empties, keep first occurrence.
    pub fn normalized<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        set.extend_normalized(entries);
        set
    }

    /// Append entries not already present, in input order. Returns how many were added.
    pub fn extend_normalized<I, S>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: HashSet<String> = self.entries.iter().cloned().collect();
        let before = self.entries.len();

        for entry in entries {
            let trimmed = entry.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_string()) {
                self.entries.push(trimmed.to_string());
            }
        }

        self.entries.len() - before
    }

    /// Copy of this set with `entries` merged in. Existing entries are never removed.
    pub fn merged<I, S>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.clone();
        next.extend_normalized(entries);
        next
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.iter().any(|k| k == keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(entries: Vec<String>) -> Self {
        Self::normalized(entries)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_dedupes_and_trims_in_order() {
        let set = KeywordSet::new().merged(["shoe", "shoe", " hat "]);
        assert_eq!(set.as_slice(), ["shoe", "hat"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let input = ["red", " blue", "red ", "", "   "];
        let once = KeywordSet::new().merged(input);
        let twice = once.merged(input);
        assert_eq!(once, twice);
        assert_eq!(once.as_slice(), ["red", "blue"]);
    }

    #[test]
    fn test_merge_never_removes_existing() {
        let base = KeywordSet::normalized(["sunco", "chandelier"]);
        let next = base.merged(["home depot"]);
        assert_eq!(next.as_slice(), ["sunco", "chandelier", "home depot"]);
    }

    #[test]
    fn test_uniqueness_is_case_sensitive() {
        let set = KeywordSet::normalized(["Red", "red", "RED"]);
        assert_eq!(set.len(), 3);
        assert!(set.contains("red"));
        assert!(!set.contains("rEd"));
    }

    #[test]
    fn test_no_empty_or_untrimmed_entries() {
        let set = KeywordSet::normalized(["", " ", "\t x \n", "y"]);
        for entry in set.iter() {
            assert!(!entry.is_empty());
            assert_eq!(entry, entry.trim());
        }
        assert_eq!(set.as_slice(), ["x", "y"]);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let set: KeywordSet = serde_json::from_str(r#"["a", " a", "", "b"]"#).unwrap();
        assert_eq!(set.as_slice(), ["a", "b"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b"]"#);
    }
}
