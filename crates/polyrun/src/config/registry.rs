//! Read-only language catalog
//!
//! Built once from [`Config`](crate::config::Config) at startup and shared
//! behind an `Arc`; nothing mutates it afterwards.

use std::collections::HashMap;

use crate::config::{ConfigError, Language};

/// Ordered, immutable set of language definitions
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
    index: HashMap<String, usize>,
}

impl LanguageRegistry {
    /// Build a registry, keeping the given order for listings
    pub fn new(languages: Vec<Language>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(languages.len());
        for (position, lang) in languages.iter().enumerate() {
            if index.insert(lang.id.clone(), position).is_some() {
                return Err(ConfigError::DuplicateLanguage(lang.id.clone()));
            }
        }
        Ok(Self { languages, index })
    }

    /// Look up a language by ID
    pub fn lookup(&self, id: &str) -> Result<&Language, ConfigError> {
        self.index
            .get(id)
            .map(|&position| &self.languages[position])
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// All languages in stable configuration order
    pub fn list(&self) -> &[Language] {
        &self.languages
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn list_returns_twelve_languages() {
        let registry = Config::default().registry().unwrap();
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn every_language_has_run_command() {
        let registry = Config::default().registry().unwrap();
        for lang in registry.list() {
            assert!(!lang.run.command.is_empty(), "{} has no run command", lang.id);
            assert!(lang.timeout > 0.0);
            assert!(lang.memory_limit_mb > 0);
        }
    }

    #[test]
    fn compiled_languages_have_compile_command() {
        let registry = Config::default().registry().unwrap();
        let compiled: Vec<_> = registry
            .list()
            .iter()
            .filter(|lang| lang.requires_compilation())
            .collect();
        assert_eq!(compiled.len(), 5);
        for lang in compiled {
            let compile = lang.compile.as_ref().unwrap();
            assert!(!compile.command.is_empty(), "{} has no compile command", lang.id);
            assert!(!compile.output_name.is_empty());
        }
    }

    #[test]
    fn list_order_is_stable() {
        let registry = Config::default().registry().unwrap();
        let first: Vec<_> = registry.list().iter().map(|l| l.id.clone()).collect();
        let second: Vec<_> = registry.list().iter().map(|l| l.id.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "python");
    }

    #[test]
    fn lookup_unknown_language() {
        let registry = Config::default().registry().unwrap();
        match registry.lookup("cobol") {
            Err(ConfigError::LanguageNotFound(id)) => assert_eq!(id, "cobol"),
            other => panic!("expected LanguageNotFound, got {other:?}"),
        }
    }

    #[test]
    fn lookup_matches_list_entry() {
        let registry = Config::default().registry().unwrap();
        for lang in registry.list() {
            assert_eq!(registry.lookup(&lang.id).unwrap().name, lang.name);
        }
    }
}
