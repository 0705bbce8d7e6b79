// src/models/result.rs

//! Configuration run result and its derived views.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::matcher::text_matches;
use crate::models::{CatalogItem, ComponentRequest, DesiredConfiguration};

/// A catalog item recorded as the applied choice for a category, together
/// with its extracted display title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedComponent {
    pub title: String,
    pub item: CatalogItem,
}

impl AppliedComponent {
    pub fn new(title: impl Into<String>, item: CatalogItem) -> Self {
        Self {
            title: title.into(),
            item,
        }
    }
}

/// Outcome of one configuration run.
///
/// Owns the desired configuration and the applied mapping; the missing
/// components and applied indexes are recomputed every time the applied
/// mapping is reassigned.
#[derive(Debug, Clone)]
pub struct ConfigurationResult {
    desired: DesiredConfiguration,
    url: String,
    price: f64,
    applied: BTreeMap<String, AppliedComponent>,
    missing: BTreeMap<String, Vec<String>>,
    applied_indexes: BTreeMap<String, i64>,
}

impl ConfigurationResult {
    pub fn new(desired: DesiredConfiguration, url: impl Into<String>) -> Self {
        let mut result = Self {
            desired,
            url: url.into(),
            price: -1.0,
            applied: BTreeMap::new(),
            missing: BTreeMap::new(),
            applied_indexes: BTreeMap::new(),
        };
        result.recompute();
        result
    }

    pub fn desired(&self) -> &DesiredConfiguration {
        &self.desired
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn applied(&self) -> &BTreeMap<String, AppliedComponent> {
        &self.applied
    }

    /// Categories requested but not applied, with their option texts.
    pub fn missing_components(&self) -> &BTreeMap<String, Vec<String>> {
        &self.missing
    }

    /// For every applied category, the index of the first option text its
    /// title matches; `-1` when the title matches none of them.
    pub fn applied_indexes(&self) -> &BTreeMap<String, i64> {
        &self.applied_indexes
    }

    /// Replace the applied mapping and recompute the derived views.
    pub fn set_applied(&mut self, applied: BTreeMap<String, AppliedComponent>) {
        self.applied = applied;
        self.recompute();
    }

    /// Parse and record the page's total price text.
    pub fn set_price_from_text(&mut self, text: &str) {
        self.price = parse_price(text);
    }

    pub fn was_fully_applied(&self) -> bool {
        self.missing.is_empty()
            && self
                .desired
                .entries()
                .iter()
                .all(|entry| self.applied.contains_key(&entry.category))
    }

    /// Applied categories that did not land on the primary choice.
    pub fn backup_selections(&self) -> Vec<(String, i64)> {
        self.applied_indexes
            .iter()
            .filter(|(_, index)| **index != 0)
            .map(|(category, index)| (category.clone(), *index))
            .collect()
    }

    fn recompute(&mut self) {
        self.missing = self
            .desired
            .entries()
            .iter()
            .filter(|entry| !self.applied.contains_key(&entry.category))
            .map(|entry| (entry.category.clone(), entry.options.clone()))
            .collect();

        self.applied_indexes = self
            .applied
            .iter()
            .map(|(category, component)| {
                let index = self
                    .desired
                    .options_for(category)
                    .and_then(|options| {
                        options
                            .iter()
                            .position(|text| text_matches(&component.title, text))
                    })
                    .map(|position| position as i64)
                    .unwrap_or(-1);
                (category.clone(), index)
            })
            .collect();
    }

    /// Serialize into the plain report record.
    pub fn to_report(&self) -> ConfigurationReport {
        ConfigurationReport {
            price: self.price,
            configuration: self.desired.entries().to_vec(),
            applied_configuration: self
                .applied
                .iter()
                .map(|(category, component)| (category.clone(), component.title.clone()))
                .collect(),
            missing_components: self.missing.clone(),
            applied_indexes: self.applied_indexes.clone(),
            url: self.url.clone(),
            generated_at: Utc::now(),
        }
    }
}

/// Plain serialized view of a run result, for logging and file output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationReport {
    pub price: f64,
    pub configuration: Vec<ComponentRequest>,
    pub applied_configuration: BTreeMap<String, String>,
    pub missing_components: BTreeMap<String, Vec<String>>,
    pub applied_indexes: BTreeMap<String, i64>,
    pub url: String,
    pub generated_at: DateTime<Utc>,
}

/// Parse a price out of site-rendered currency text.
///
/// Strips everything that is not an ASCII digit or a comma, turns the first
/// comma into a decimal point and reads the leading decimal run. Unparseable
/// text yields the `-1.0` sentinel, never an error.
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);
    let cleaned = cleaned.trim();

    let Ok(prefix) = Regex::new(r"^[0-9]+(?:\.[0-9]*)?") else {
        return -1.0;
    };
    match prefix.find(cleaned) {
        Some(found) => found.as_str().parse().unwrap_or(-1.0),
        None => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desired() -> DesiredConfiguration {
        DesiredConfiguration::new(vec![
            ComponentRequest::new("case", vec!["Case A".into(), "Case B".into()]),
            ComponentRequest::single("CPU", "Ryzen 7"),
        ])
    }

    fn applied_item(id: &str, title: &str) -> AppliedComponent {
        AppliedComponent::new(title, CatalogItem::new(id, format!("<div>{title}</div>")))
    }

    #[test]
    fn test_parse_price_french_format() {
        assert_eq!(parse_price("1 234,56 €"), 1234.56);
    }

    #[test]
    fn test_parse_price_unparseable() {
        assert_eq!(parse_price("N/A"), -1.0);
        assert_eq!(parse_price(""), -1.0);
    }

    #[test]
    fn test_parse_price_plain() {
        assert_eq!(parse_price("549,00 €"), 549.0);
        assert_eq!(parse_price("2 199 €"), 2199.0);
    }

    #[test]
    fn test_parse_price_zero_is_a_price() {
        assert_eq!(parse_price("0,00 €"), 0.0);
    }

    #[test]
    fn test_new_result_has_everything_missing() {
        let result = ConfigurationResult::new(desired(), "https://example.com");
        assert_eq!(result.price(), -1.0);
        assert_eq!(result.missing_components().len(), 2);
        assert!(!result.was_fully_applied());
    }

    #[test]
    fn test_set_applied_recomputes_missing_and_indexes() {
        let mut result = ConfigurationResult::new(desired(), "https://example.com");

        let mut applied = BTreeMap::new();
        applied.insert(
            "case".to_string(),
            applied_item("it-1", "Case B Chalk White"),
        );
        applied.insert("CPU".to_string(), applied_item("it-2", "Ryzen 7 9800X3D"));
        result.set_applied(applied);

        assert!(result.missing_components().is_empty());
        assert!(result.was_fully_applied());
        assert_eq!(result.applied_indexes()["case"], 1);
        assert_eq!(result.applied_indexes()["CPU"], 0);
    }

    #[test]
    fn test_unmatched_applied_title_yields_minus_one() {
        let mut result = ConfigurationResult::new(desired(), "https://example.com");

        let mut applied = BTreeMap::new();
        applied.insert("CPU".to_string(), applied_item("it-9", "Core i5-14400F"));
        result.set_applied(applied);

        assert_eq!(result.applied_indexes()["CPU"], -1);
        assert_eq!(result.missing_components().len(), 1);
        assert!(result.missing_components().contains_key("case"));
    }

    #[test]
    fn test_backup_selections() {
        let mut result = ConfigurationResult::new(desired(), "https://example.com");

        let mut applied = BTreeMap::new();
        applied.insert(
            "case".to_string(),
            applied_item("it-1", "Case B Chalk White"),
        );
        applied.insert("CPU".to_string(), applied_item("it-2", "Ryzen 7 9800X3D"));
        result.set_applied(applied);

        assert_eq!(result.backup_selections(), vec![("case".to_string(), 1)]);
    }

    #[test]
    fn test_report_round_trip() {
        let mut result = ConfigurationResult::new(desired(), "https://example.com/pc");
        result.set_price_from_text("1 499,99 €");

        let report = result.to_report();
        assert_eq!(report.price, 1499.99);
        assert_eq!(report.url, "https://example.com/pc");
        assert_eq!(report.configuration.len(), 2);

        let json = serde_json::to_string(&report).unwrap();
        let parsed: ConfigurationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.price, report.price);
        assert_eq!(parsed.missing_components, report.missing_components);
    }
}
