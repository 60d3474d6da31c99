//! Fixed term substitutions applied before text reaches the model

use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::core::errors::{Result, TranslationError};
use crate::processors::files::read_json_object;

/// Ordered source → target term list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glossary {
    entries: Vec<(String, String)>,
}

impl Glossary {
    /// Build from `(source, target)` pairs; empty source terms are skipped
    pub fn new<I, S, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .filter(|(s, _)| !s.is_empty())
                .collect(),
        }
    }

    /// Load the mapping stored under `section` of a JSON object file
    pub fn load(path: &Path, section: &str) -> Result<Self> {
        let root = read_json_object(path)?;

        let Some(table) = root.get(section) else {
            warn!("Glossary {} has no '{}' section, using none", path.display(), section);
            return Ok(Self::default());
        };

        let table = table.as_object().ok_or_else(|| TranslationError::InvalidFormat {
            format: format!("glossary section '{}' must be an object", section),
        })?;

        let mut entries = Vec::with_capacity(table.len());
        for (source, target) in table {
            match target {
                Value::String(target) => entries.push((source.clone(), target.clone())),
                other => warn!("Skipping glossary term '{}': non-string value {}", source, other),
            }
        }

        let glossary = Self::new(entries);
        info!("Loaded {} glossary terms from {}", glossary.len(), path.display());
        Ok(glossary)
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no terms
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every term, one term at a time, in declared order
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (source, target) in &self.entries {
            if out.contains(source.as_str()) {
                out = out.replace(source.as_str(), target);
            }
        }
        out
    }
}
