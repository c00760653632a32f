//! Read-only catalog of starter snippets
//!
//! Independent of the execution path; used only to seed an editor.

use config::{Config as ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in snippets, embedded at compile time
pub const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no '{template_type}' template for language '{language}'")]
    NotFound {
        language: String,
        template_type: String,
    },

    #[error("failed to parse template catalog: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("template '{template_type}' for '{language}' is defined more than once")]
    Duplicate {
        language: String,
        template_type: String,
    },
}

/// One snippet in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub language: String,
    pub template_type: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    templates: Vec<TemplateEntry>,
}

/// Immutable set of templates in catalog order
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    entries: Vec<TemplateEntry>,
}

impl TemplateLibrary {
    /// Load the embedded catalog
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::parse_toml(BUILTIN_CATALOG)
    }

    /// Parse a catalog from a TOML string of `[[templates]]` tables
    pub fn parse_toml(toml: &str) -> Result<Self, TemplateError> {
        let catalog: Catalog = ConfigBuilder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::new(catalog.templates)
    }

    /// Build a library, rejecting duplicate (language, type) pairs
    pub fn new(entries: Vec<TemplateEntry>) -> Result<Self, TemplateError> {
        for (i, entry) in entries.iter().enumerate() {
            let duplicate = entries[..i].iter().any(|earlier| {
                earlier.language == entry.language && earlier.template_type == entry.template_type
            });
            if duplicate {
                return Err(TemplateError::Duplicate {
                    language: entry.language.clone(),
                    template_type: entry.template_type.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Languages with at least one template, in first-seen order
    pub fn list_languages(&self) -> Vec<&str> {
        unique(self.entries.iter().map(|e| e.language.as_str()))
    }

    /// Template types, in first-seen order
    pub fn list_types(&self) -> Vec<&str> {
        unique(self.entries.iter().map(|e| e.template_type.as_str()))
    }

    /// Source code of one template
    pub fn get(&self, language: &str, template_type: &str) -> Result<&str, TemplateError> {
        self.entries
            .iter()
            .find(|e| e.language == language && e.template_type == template_type)
            .map(|e| e.code.as_str())
            .ok_or_else(|| TemplateError::NotFound {
                language: language.to_string(),
                template_type: template_type.to_string(),
            })
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::builtin().expect("embedded template catalog should be valid")
    }
}

fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
