// Override table for names that normalize differently across sources.

use std::collections::HashMap;

use super::normalize::normalize;

const BUILTIN: &[(&str, &str)] = &[("chig okonkwo", "chigoziem okonkwo")];

/// Maps a normalized key to the canonical key it should join as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The aliases known to be needed between the league platform and the
    /// rankings site.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (from, to) in BUILTIN {
            table.insert(from, to);
        }
        table
    }

    /// Add an alias. Both sides are normalized so entries can be written as
    /// display names. Entries that normalize to an empty key are ignored.
    pub fn insert(&mut self, from: &str, to: &str) {
        let from = normalize(from);
        let to = normalize(to);
        if from.is_empty() || to.is_empty() {
            return;
        }
        self.entries.insert(from, to);
    }

    /// Extend with configured entries; later entries override earlier ones.
    pub fn extend<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (from, to) in entries {
            self.insert(from, to);
        }
    }

    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
