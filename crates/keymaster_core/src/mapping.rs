//! Mod-to-key mapping table.

use crate::error::{Error, Result};
use crate::mods::normalize_mod_name;
use crate::source::RemoteSource;
use indexmap::{IndexMap, IndexSet};

/// Mapping from lowercase mod identifier to the key files it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModMapping {
    entries: IndexMap<String, IndexSet<String>>,
}

impl ModMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mapping file: a JSON object of mod identifier to key file array.
    ///
    /// Mod identifiers are lowercased. Identifiers that differ only in case are
    /// merged into one entry.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: IndexMap<String, Vec<String>> =
            serde_json::from_slice(data).map_err(Error::MappingInvalid)?;

        let mut mapping = Self::new();
        for (mod_name, keys) in raw {
            let normalized = normalize_mod_name(&mod_name);
            if mapping.entries.contains_key(&normalized) {
                tracing::warn!(
                    "Mapping file lists {} more than once (case differs), merging keys",
                    normalized
                );
            }
            mapping.insert(&normalized, keys);
        }
        Ok(mapping)
    }

    /// Download and parse the mapping file at `url`.
    pub fn fetch(source: &dyn RemoteSource, url: &str) -> Result<Self> {
        let data = source.fetch(url).map_err(|source| Error::MappingFetchFailed {
            url: url.to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Add keys for a mod, merging with any existing entry.
    pub fn insert<I, S>(&mut self, mod_name: &str, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(normalize_mod_name(mod_name))
            .or_default()
            .extend(keys.into_iter().map(Into::into));
    }

    /// Keys required by `mod_name` (case-insensitive), if the mod is mapped.
    pub fn keys_for(&self, mod_name: &str) -> Option<impl Iterator<Item = &str>> {
        self.entries
            .get(&normalize_mod_name(mod_name))
            .map(|keys| keys.iter().map(String::as_str))
    }

    pub fn contains(&self, mod_name: &str) -> bool {
        self.entries.contains_key(&normalize_mod_name(mod_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_normalized_on_load() {
        let json = r#"{"@CBA_A3": ["cba_a3.bikey"], "@ace": ["ace.bikey", "ace_2.bikey"]}"#;
        let mapping = ModMapping::from_json(json.as_bytes()).unwrap();

        assert_eq!(mapping.len(), 2);
        assert!(mapping.contains("@cba_a3"));
        assert!(mapping.contains("@CBA_A3"));
        assert_eq!(
            mapping.keys_for("@Ace").unwrap().collect::<Vec<_>>(),
            vec!["ace.bikey", "ace_2.bikey"]
        );
        assert!(mapping.keys_for("@unknown").is_none());
    }

    #[test]
    fn test_case_variants_merged() {
        let json = r#"{"@ACE": ["ace.bikey"], "@ace": ["ace.bikey", "ace_extra.bikey"]}"#;
        let mapping = ModMapping::from_json(json.as_bytes()).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.keys_for("@ace").unwrap().collect::<Vec<_>>(),
            vec!["ace.bikey", "ace_extra.bikey"]
        );
    }

    #[test]
    fn test_invalid_mapping() {
        let err = ModMapping::from_json(br#"{"@ace": "ace.bikey"}"#).unwrap_err();
        assert!(matches!(err, Error::MappingInvalid(_)));
    }
}
