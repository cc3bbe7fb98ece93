//! Translation and synonym table for proper nouns.
//!
//! Maps a canonical term (e.g. an English city name) to the spellings and
//! translations students commonly submit instead. The table is plain data so
//! deployments can extend or replace it per locale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical term → known variants. All entries are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct TranslationTable {
    entries: BTreeMap<String, Vec<String>>,
}

const DEFAULT_ENTRIES: &[(&str, &[&str])] = &[
    ("athens", &["athina", "athen", "atene"]),
    ("beijing", &["peking", "pechino"]),
    ("belgrade", &["beograd", "belgrad"]),
    ("brussels", &["bruxelles", "brussel", "brüssel"]),
    ("bucharest", &["bucuresti", "bucurești", "bukarest"]),
    ("copenhagen", &["københavn", "kobenhavn", "köpenhamn", "kopenhagen"]),
    ("florence", &["firenze", "florenz"]),
    ("gothenburg", &["göteborg", "goteborg"]),
    ("helsinki", &["helsingfors"]),
    ("lisbon", &["lisboa", "lissabon"]),
    ("moscow", &["moskva", "moskau", "moskou"]),
    ("munich", &["münchen", "munchen", "monaco di baviera"]),
    ("naples", &["napoli", "neapel"]),
    ("oslo", &["christiania", "kristiania"]),
    ("prague", &["praha", "prag"]),
    ("rome", &["roma"]),
    ("stockholm", &["tukholma", "estocolmo", "stoccolma"]),
    ("turku", &["åbo"]),
    ("venice", &["venezia", "venedig"]),
    ("vienna", &["wien", "vienne", "bécs"]),
    ("warsaw", &["warszawa", "warschau", "varsovie"]),
];

impl TranslationTable {
    /// An empty table; Tier 4 then only applies typo tolerance.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of city names.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (canonical, variants) in DEFAULT_ENTRIES {
            table.insert(canonical, variants.iter().copied());
        }
        table
    }

    /// Add variants for a canonical term, merging with any existing entry.
    pub fn insert<I, S>(&mut self, canonical: &str, variants: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = canonical.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let entry = self.entries.entry(key).or_default();
        for variant in variants {
            let variant = variant.as_ref().trim().to_lowercase();
            if !variant.is_empty() && !entry.contains(&variant) {
                entry.push(variant);
            }
        }
    }

    /// Merge every entry of `other` into this table.
    pub fn extend(&mut self, other: &TranslationTable) {
        for (canonical, variants) in &other.entries {
            self.insert(canonical, variants);
        }
    }

    /// Iterate entries in canonical-term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn variants(&self, canonical: &str) -> Option<&[String]> {
        self.entries
            .get(&canonical.to_lowercase())
            .map(Vec::as_slice)
    }
}

impl From<BTreeMap<String, Vec<String>>> for TranslationTable {
    fn from(entries: BTreeMap<String, Vec<String>>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<TranslationTable> for BTreeMap<String, Vec<String>> {
    fn from(table: TranslationTable) -> Self {
        table.entries
    }
}

impl<S: AsRef<str>> FromIterator<(S, Vec<S>)> for TranslationTable {
    fn from_iter<T: IntoIterator<Item = (S, Vec<S>)>>(iter: T) -> Self {
        let mut table = Self::empty();
        for (canonical, variants) in iter {
            table.insert(canonical.as_ref(), variants);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contains_helsinki() {
        let table = TranslationTable::builtin();
        assert_eq!(
            table.variants("Helsinki"),
            Some(&["helsingfors".to_string()][..])
        );
        assert!(table.len() > 10);
    }

    #[test]
    fn insert_normalizes_and_dedups() {
        let mut table = TranslationTable::empty();
        table.insert(" Paris ", ["PARIGI", "parigi", ""]);
        assert_eq!(table.variants("paris"), Some(&["parigi".to_string()][..]));
    }

    #[test]
    fn extend_merges_variants() {
        let mut table = TranslationTable::builtin();
        let extra: TranslationTable = vec![("helsinki", vec!["helsingi"])].into_iter().collect();
        table.extend(&extra);
        let variants = table.variants("helsinki").unwrap();
        assert!(variants.contains(&"helsingfors".to_string()));
        assert!(variants.contains(&"helsingi".to_string()));
    }

    #[test]
    fn deserializes_from_toml_map() {
        let table: TranslationTable =
            toml::from_str("Kyiv = [\"Kiev\", \"kijów\"]\nparis = [\"parigi\"]").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().next().map(|(k, _)| k), Some("kyiv"));
        assert_eq!(table.variants("kyiv").unwrap()[0], "kiev");
    }
}
