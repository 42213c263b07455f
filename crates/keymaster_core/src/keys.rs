//! Key resolution.
//!
//! Turns a [`ModSet`] into the set of key files to publish, remembering which mods
//! asked for each key so the run can explain itself.

use crate::error::{Error, Result};
use crate::mapping::ModMapping;
use crate::mods::ModSet;
use std::collections::{BTreeMap, BTreeSet};

/// Requester recorded for keys listed in `manualKeys`.
pub const MANUAL_REQUESTER: &str = "Manual";

/// Key file name to the mods (or [`MANUAL_REQUESTER`]) that need it.
///
/// Both levels are sorted, so iteration and display are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredKeys {
    keys: BTreeMap<String, BTreeSet<String>>,
}

impl RequiredKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `requester` needs `key`.
    pub fn add(&mut self, key: &str, requester: &str) {
        self.keys
            .entry(key.to_string())
            .or_default()
            .insert(requester.to_string());
    }

    /// Drop `key`, returning its requesters if it was present.
    pub fn remove(&mut self, key: &str) -> Option<BTreeSet<String>> {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Requesters of `key`, sorted.
    pub fn requesters(&self, key: &str) -> Option<impl Iterator<Item = &str>> {
        self.keys
            .get(key)
            .map(|requesters| requesters.iter().map(String::as_str))
    }

    /// Key file names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// `(key, requesters)` pairs, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.keys.iter().map(|(key, requesters)| (key.as_str(), requesters))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Outcome of looking up every mod in the mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyResolution {
    pub required: RequiredKeys,
    /// Mods with no mapping entry, sorted.
    pub missing: BTreeSet<String>,
}

impl KeyResolution {
    /// The required keys, or [`Error::UnmappedMods`] listing every unmapped mod.
    pub fn into_required(self) -> Result<RequiredKeys> {
        if self.missing.is_empty() {
            Ok(self.required)
        } else {
            Err(Error::UnmappedMods {
                mods: self.missing.into_iter().collect(),
            })
        }
    }
}

/// Resolve the key files required by `mods`.
///
/// Every mod is looked up before anything is reported, so the resolution lists all
/// unmapped mods at once. Manual keys bypass the mapping and are tagged
/// [`MANUAL_REQUESTER`].
pub fn resolve_keys(
    mods: &ModSet,
    mapping: &ModMapping,
    manual_keys: Option<&[String]>,
) -> KeyResolution {
    let mut resolution = KeyResolution::default();

    for mod_name in mods {
        match mapping.keys_for(mod_name) {
            Some(keys) => {
                for key in keys {
                    resolution.required.add(key, mod_name);
                }
            }
            None => {
                resolution.missing.insert(mod_name.to_string());
            }
        }
    }

    for key in manual_keys.unwrap_or_default() {
        resolution.required.add(key, MANUAL_REQUESTER);
    }

    resolution
}
