//! Mapping file generation from a local mod directory.
//!
//! Every `@`-prefixed subdirectory of the input directory is a mod. Its keys are the
//! `.bikey` files found in its `keys` or `key` subdirectory:
//!
//! ```text
//! mods/
//! ├── @CBA_A3/keys/cba_a3.bikey
//! ├── @JSRS/key/jsrs.bikey
//! └── @NoKeys/addons/...
//! ```
//!
//! produces `{"@CBA_A3": ["cba_a3.bikey"], "@JSRS": ["jsrs.bikey"]}`. Mods without
//! keys are left out.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::{BTreeMap, BTreeSet};

/// Subdirectories of a mod searched for key files.
pub const KEY_DIRS: [&str; 2] = ["keys", "key"];

const KEY_EXTENSION: &str = "bikey";

/// A mapping built from a mod directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedMapping {
    /// Mod folder name (case preserved) to its key file names, both sorted.
    pub mods: BTreeMap<String, Vec<String>>,
    /// Paths of every key file found.
    pub key_files: Vec<Utf8PathBuf>,
}

impl GeneratedMapping {
    /// Mapping file content: pretty JSON, four-space indent, sorted keys.
    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.mods.serialize(&mut serializer)?;
        let json = String::from_utf8(buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(json)
    }
}

fn is_key_file(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(KEY_EXTENSION))
}

/// Scan `input_dir` for mods and their key files.
pub fn scan_mod_dir(input_dir: &Utf8Path) -> Result<GeneratedMapping> {
    if !input_dir.is_dir() {
        return Err(Error::InvalidModDir(input_dir.to_path_buf()));
    }

    let mut mapping = GeneratedMapping::default();

    for entry in input_dir.read_dir_utf8()? {
        let entry = entry?;
        let mod_dir = entry.path();
        if !entry.file_name().starts_with('@') || !mod_dir.is_dir() {
            continue;
        }
        tracing::info!("Found mod folder: {}", entry.file_name());

        let mut keys = BTreeSet::new();
        for key_dir_name in KEY_DIRS {
            let key_dir = mod_dir.join(key_dir_name);
            if !key_dir.is_dir() {
                continue;
            }
            tracing::debug!("Examining keys folder: {}", key_dir);

            for key_entry in key_dir.read_dir_utf8()? {
                let key_entry = key_entry?;
                let key_path = key_entry.path();
                if !key_path.is_file() || !is_key_file(key_path) {
                    continue;
                }
                tracing::debug!("Key file found: {}", key_entry.file_name());
                if keys.insert(key_entry.file_name().to_string()) {
                    mapping.key_files.push(key_path.to_path_buf());
                }
            }
        }

        if keys.is_empty() {
            tracing::info!("No keys for {}, leaving it out", entry.file_name());
            continue;
        }
        tracing::info!("Extracted {} key(s) from {}", keys.len(), entry.file_name());
        mapping
            .mods
            .insert(entry.file_name().to_string(), keys.into_iter().collect());
    }

    mapping.key_files.sort();
    Ok(mapping)
}

/// Scan `input_dir`, write the mapping to `output_file` and optionally copy every
/// key file next to it.
pub fn generate_mapping(
    input_dir: &Utf8Path,
    output_file: &Utf8Path,
    capture_keys: bool,
) -> Result<GeneratedMapping> {
    let mapping = scan_mod_dir(input_dir)?;

    let output_dir = match output_file.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(output_file, mapping.to_json()?)?;
    tracing::info!(
        "Wrote mapping for {} mod(s) to {}",
        mapping.mods.len(),
        output_file
    );

    if capture_keys {
        for key_file in &mapping.key_files {
            if let Some(name) = key_file.file_name() {
                std::fs::copy(key_file, output_dir.join(name))?;
            }
        }
        tracing::info!(
            "Captured {} key file(s) into {}",
            mapping.key_files.len(),
            output_dir
        );
    }

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn touch(path: Utf8PathBuf, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn mod_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        touch(root.join("@CBA_A3/keys/cba_a3.bikey"), "cba");
        touch(root.join("@JSRS/key/jsrs.bikey"), "jsrs");
        touch(root.join("@JSRS/key/readme.txt"), "not a key");
        touch(root.join("@ace/keys/ace_b.bikey"), "ace b");
        touch(root.join("@ace/keys/ace_a.bikey"), "ace a");
        touch(root.join("@NoKeys/addons/data.pbo"), "pbo");
        touch(root.join("notamod/keys/other.bikey"), "other");
        touch(root.join("@file.bikey"), "stray file");
        dir
    }

    #[test]
    fn test_scan_mod_dir() {
        let dir = mod_tree();
        let mapping = scan_mod_dir(&utf8(&dir)).unwrap();

        assert_eq!(
            mapping.mods.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["@CBA_A3", "@JSRS", "@ace"]
        );
        assert_eq!(mapping.mods["@ace"], vec!["ace_a.bikey", "ace_b.bikey"]);
        assert_eq!(mapping.mods["@JSRS"], vec!["jsrs.bikey"]);
        assert_eq!(mapping.key_files.len(), 4);
    }

    #[test]
    fn test_to_json_sorted_and_indented() {
        let mut mapping = GeneratedMapping::default();
        mapping.mods.insert("@b".into(), vec!["b.bikey".into()]);
        mapping.mods.insert("@a".into(), vec!["a.bikey".into()]);

        assert_eq!(
            mapping.to_json().unwrap(),
            "{\n    \"@a\": [\n        \"a.bikey\"\n    ],\n    \"@b\": [\n        \"b.bikey\"\n    ]\n}"
        );
    }

    #[test]
    fn test_to_json_keeps_non_ascii_names() {
        let mut mapping = GeneratedMapping::default();
        mapping
            .mods
            .insert("@Ünïcode_Mod".into(), vec!["schlüssel.bikey".into()]);

        let json = mapping.to_json().unwrap();
        assert!(json.contains("\"@Ünïcode_Mod\""));
        assert!(json.contains("\"schlüssel.bikey\""));
    }

    #[test]
    fn test_generate_mapping_with_capture() {
        let mods = mod_tree();
        let out = TempDir::new().unwrap();
        let output_file = utf8(&out).join("mapping/mods.json");

        let mapping = generate_mapping(&utf8(&mods), &output_file, true).unwrap();

        let written: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&std::fs::read_to_string(&output_file).unwrap()).unwrap();
        assert_eq!(written, mapping.mods);
        let output_dir = output_file.parent().unwrap();
        assert_eq!(
            std::fs::read_to_string(output_dir.join("jsrs.bikey")).unwrap(),
            "jsrs"
        );
        assert!(output_dir.join("ace_a.bikey").exists());
        assert!(!output_dir.join("other.bikey").exists());
    }

    #[test]
    fn test_generated_mapping_loads_as_mod_mapping() {
        let mods = mod_tree();
        let json = scan_mod_dir(&utf8(&mods)).unwrap().to_json().unwrap();
        let mapping = crate::mapping::ModMapping::from_json(json.as_bytes()).unwrap();
        assert!(mapping.contains("@cba_a3"));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_invalid_input_dir() {
        let dir = TempDir::new().unwrap();
        let missing = utf8(&dir).join("missing");
        assert!(matches!(
            scan_mod_dir(&missing),
            Err(Error::InvalidModDir(path)) if path == missing
        ));

        let file = utf8(&dir).join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(scan_mod_dir(&file), Err(Error::InvalidModDir(_))));
    }
}
