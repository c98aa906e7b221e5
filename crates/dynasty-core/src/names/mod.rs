// Player-name reconciliation across data sources.

pub mod aliases;
pub mod normalize;

pub use aliases::AliasTable;
pub use normalize::normalize;

/// Strategy for turning a display name into a join key.
///
/// Two names refer to the same player when their keys are equal and
/// non-empty. Callers only ever compare keys; they never display them.
pub trait NameMatcher: Send + Sync {
    fn key(&self, raw: &str) -> String;

    /// Key for an optional name; a missing name yields the empty key.
    fn key_opt(&self, raw: Option<&str>) -> String {
        raw.map(|r| self.key(r)).unwrap_or_default()
    }
}

/// The default matcher: [`normalize`] followed by the alias override.
#[derive(Debug, Clone, Default)]
pub struct AliasedNormalizer {
    aliases: AliasTable,
}

impl AliasedNormalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }
}

impl NameMatcher for AliasedNormalizer {
    fn key(&self, raw: &str) -> String {
        let key = normalize(raw);
        match self.aliases.resolve(&key) {
            Some(canonical) => canonical.to_string(),
            None => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn okonkwo_variants_share_a_key() {
        let matcher = AliasedNormalizer::new(AliasTable::builtin());
        assert_eq!(
            matcher.key("Chig Okonkwo"),
            matcher.key("Chigoziem Okonkwo")
        );
        assert_eq!(matcher.key("Chig Okonkwo"), "chigoziem okonkwo");
    }

    #[test]
    fn missing_name_is_empty_key() {
        let matcher = AliasedNormalizer::default();
        assert_eq!(matcher.key_opt(None), "");
        assert_eq!(matcher.key_opt(Some("")), "");
    }

    #[test]
    fn unaliased_names_pass_through_normalization() {
        let matcher = AliasedNormalizer::new(AliasTable::builtin());
        assert_eq!(matcher.key("Bijan Robinson"), "bijan robinson");
    }
}
