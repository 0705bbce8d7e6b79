// src/models/desired.rs

//! Desired configuration: the ordered parts list to apply.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

/// One requested component: a category slot and its acceptable descriptions,
/// ordered by preference (first is the primary choice, the rest are backups).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentRequest {
    /// Category key, e.g. "CPU", "case", "GPU"
    pub category: String,

    /// Acceptable option texts, most preferred first.
    /// A bare string in the config file becomes a single-element list.
    #[serde(deserialize_with = "string_or_list")]
    pub options: Vec<String>,
}

impl ComponentRequest {
    pub fn new(category: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            category: category.into(),
            options,
        }
    }

    /// Convenience constructor for a single acceptable text.
    pub fn single(category: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            options: vec![option.into()],
        }
    }
}

/// The full desired configuration, in declaration order.
///
/// Declaration order matters: it decides the middle of the application order
/// and the iteration order of every lookup, so the entries are kept as a
/// sequence rather than a map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DesiredConfiguration {
    entries: Vec<ComponentRequest>,
}

impl DesiredConfiguration {
    pub fn new(entries: Vec<ComponentRequest>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ComponentRequest] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up the acceptable texts for a category.
    pub fn options_for(&self, category: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.options.as_slice())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.options_for(category).is_some()
    }

    /// Validate the desired configuration for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(AppError::validation("No components requested"));
        }

        for entry in &self.entries {
            if entry.category.trim().is_empty() {
                return Err(AppError::validation("Component with empty category"));
            }
            if entry.options.is_empty() {
                return Err(AppError::validation(format!(
                    "Component '{}' has no option texts",
                    entry.category
                )));
            }
            if entry.options.iter().any(|text| text.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "Component '{}' has a blank option text",
                    entry.category
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.category.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate component category '{}'",
                    entry.category
                )));
            }
        }

        Ok(())
    }
}

impl FromIterator<ComponentRequest> for DesiredConfiguration {
    fn from_iter<I: IntoIterator<Item = ComponentRequest>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Accept either a bare string or a list of strings for `options`.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        Single(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::Single(text) => vec![text],
        StringOrList::Many(texts) => texts,
    })
}
