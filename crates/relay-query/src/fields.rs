//! Compilation of flat dotted field paths into a selection tree.
//!
//! `["name", "attrib.fps", "attrib.resolutionWidth"]` becomes
//!
//! ```text
//! attrib
//!   fps              (terminal)
//!   resolutionWidth  (terminal)
//! name               (terminal)
//! ```
//!
//! A terminal entry subsumes every deeper path under it: requesting
//! `"attrib"` together with `"attrib.fps"` selects the whole `attrib` field,
//! whichever order the two paths arrive in.

use std::collections::BTreeMap;

use tracing::warn;

/// One entry of a [`FieldTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEntry {
    /// The field itself was requested.
    Terminal,
    /// Only some sub-fields were requested.
    Nested(FieldTree),
}

/// Nested selection compiled from dotted field paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTree {
    entries: BTreeMap<String, FieldEntry>,
}

impl FieldTree {
    /// Compile a set of dotted paths.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for path in paths {
            tree.insert_path(path.as_ref());
        }
        tree
    }

    /// Add one dotted path to the tree.
    ///
    /// Paths with an empty segment (`""`, `"a..b"`, `"a."`) are ignored.
    pub fn insert_path(&mut self, path: &str) {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            warn!(path, "ignoring malformed field path");
            return;
        }
        let Some((last, parents)) = parts.split_last() else {
            return;
        };

        let mut level = self;
        for part in parents {
            let entry = level
                .entries
                .entry((*part).to_string())
                .or_insert_with(|| FieldEntry::Nested(Self::default()));
            match entry {
                FieldEntry::Terminal => return,
                FieldEntry::Nested(tree) => level = tree,
            }
        }
        level
            .entries
            .insert((*last).to_string(), FieldEntry::Terminal);
    }

    /// Entry for a direct child field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.entries.get(name)
    }

    /// Whether `path` is covered by a terminal entry (itself or an ancestor).
    #[must_use]
    pub fn is_terminal(&self, path: &str) -> bool {
        let mut level = self;
        for part in path.split('.') {
            match level.entries.get(part) {
                Some(FieldEntry::Terminal) => return true,
                Some(FieldEntry::Nested(tree)) => level = tree,
                None => return false,
            }
        }
        false
    }

    /// Whether `path` will be part of the selection.
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        let mut level = self;
        for part in path.split('.') {
            match level.entries.get(part) {
                Some(FieldEntry::Terminal) => return true,
                Some(FieldEntry::Nested(tree)) => level = tree,
                None => return false,
            }
        }
        true
    }

    /// Iterate direct entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Whether nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of direct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S: AsRef<str>> FromIterator<S> for FieldTree {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_paths(iter)
    }
}
