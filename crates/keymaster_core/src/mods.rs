//! Mod resolution.
//!
//! A run's mod set is the union of the mods listed in a third-party server config
//! and the manually configured mods. Identifiers are compared case-insensitively and
//! stored lowercase.
//!
//! # Server config format
//!
//! The server config is a line-oriented text file. Directive lines start with `:`;
//! `:required_mods:` and `:allowed_mods:` open a block of sequence entries which runs
//! until the next directive line:
//!
//! ```text
//! :name: My Server
//! :required_mods:
//! - "@CBA_A3"
//! - "@ace"
//! :allowed_mods:
//! - "@JSRS"
//! :version: 2
//! ```

use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

static MOD_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*-\s*"(@\w+)""#).expect("valid mod entry pattern"));

const NAME_DIRECTIVE: &str = ":name: ";
const BLOCK_DIRECTIVES: [&str; 2] = [":required_mods:", ":allowed_mods:"];

/// Canonical form of a mod identifier.
pub fn normalize_mod_name(name: &str) -> String {
    name.to_lowercase()
}

/// Insertion-ordered set of lowercase mod identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModSet {
    mods: IndexSet<String>,
}

impl ModSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mod, normalizing its name. Returns `false` if it was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        self.mods.insert(normalize_mod_name(name))
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.mods.contains(&normalize_mod_name(name))
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.insert(name.as_ref());
        }
    }

    /// Mods in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.mods.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Mods of `self` that are not in `other`, keeping `self`'s order.
    pub fn difference(&self, other: &ModSet) -> ModSet {
        Self {
            mods: self.mods.difference(&other.mods).cloned().collect(),
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for ModSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ModSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a ModSet {
    type Item = &'a str;
    type IntoIter = std::iter::Map<indexmap::set::Iter<'a, String>, fn(&String) -> &str>;

    fn into_iter(self) -> Self::IntoIter {
        self.mods.iter().map(String::as_str as fn(&String) -> &str)
    }
}

/// What the server config declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Value of the `:name:` directive, informational only.
    pub name: Option<String>,
    /// Mods from all `:required_mods:` and `:allowed_mods:` blocks.
    pub mods: ModSet,
}

/// Position of the server config scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    OutsideBlock,
    InsideBlock,
}

impl ScanState {
    /// State after reading `line`, before its entry (if any) is captured.
    ///
    /// Inside a block, any directive line closes it; a mod-list directive then
    /// reopens it.
    pub fn next(self, line: &str) -> ScanState {
        let closed = match self {
            ScanState::InsideBlock if line.starts_with(':') => ScanState::OutsideBlock,
            state => state,
        };
        if BLOCK_DIRECTIVES.iter().any(|directive| line.contains(directive)) {
            ScanState::InsideBlock
        } else {
            closed
        }
    }
}

/// Scan a third-party server config for its name and mod list.
pub fn parse_server_config(text: &str) -> ServerConfig {
    let mut config = ServerConfig::default();
    let mut state = ScanState::OutsideBlock;

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(name) = line.strip_prefix(NAME_DIRECTIVE) {
            config.name = Some(name.trim().to_string());
        }

        state = state.next(line);
        if state != ScanState::InsideBlock {
            continue;
        }

        if let Some(captures) = MOD_ENTRY.captures(line) {
            if config.mods.insert(&captures[1]) {
                tracing::debug!("Server config requires {}", &captures[1]);
            }
        }
    }

    config
}

/// Merge the server config mods and the manual mods into one set.
///
/// No mods at all is a valid outcome.
pub fn resolve_mods(server_mods: Option<ModSet>, manual_mods: Option<&[String]>) -> ModSet {
    let mut mods = server_mods.unwrap_or_default();
    if let Some(manual) = manual_mods {
        mods.extend(manual);
    }
    mods
}
