// src/engine/matcher.rs

//! Catalog item title extraction and text matching.
//!
//! Matching is advisory: a desired text "matches" an item when the item's
//! extracted display title contains it, case-insensitively. Extraction
//! trouble never propagates out of a match check.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{CatalogItem, TitleRule};

/// Normalized substring containment test between an extracted title and a
/// desired text.
pub fn text_matches(title: &str, text: &str) -> bool {
    title
        .trim()
        .to_lowercase()
        .contains(&text.trim().to_lowercase())
}

/// Extracts display titles from option HTML per a site's [`TitleRule`] and
/// runs the normalized containment test against them.
#[derive(Debug, Clone)]
pub struct ItemMatcher {
    rule: TitleRule,
}

impl ItemMatcher {
    pub fn new(rule: TitleRule) -> Self {
        Self { rule }
    }

    /// Matcher that reads the whole option node as its title.
    pub fn whole_text() -> Self {
        Self::new(TitleRule {
            selector: None,
            direct_text_only: false,
        })
    }

    /// Check whether the item's display title contains the desired text.
    ///
    /// Any extraction failure yields `false` rather than an error.
    pub fn matches(&self, item: &CatalogItem, text: &str) -> bool {
        match self.extract_title(item) {
            Ok(title) => text_matches(&title, text),
            Err(error) => {
                log::debug!("Title extraction failed, treating as no match: {error}");
                false
            }
        }
    }

    /// Extract the item's clean display title.
    ///
    /// When the title element carries decorative child elements (price
    /// deltas, badges), `direct_text_only` reads only the text nodes
    /// directly under it, which leaves the parsed fragment untouched. An
    /// option without the title element falls back to its whole text.
    pub fn extract_title(&self, item: &CatalogItem) -> Result<String> {
        let fragment = Html::parse_fragment(&item.html);

        let raw = match &self.rule.selector {
            Some(selector_str) => {
                let selector = parse_selector(selector_str)?;
                match fragment.select(&selector).next() {
                    Some(element) if self.rule.direct_text_only => direct_text(&element),
                    Some(element) => element.text().collect(),
                    None => whole_text(&fragment),
                }
            }
            None => whole_text(&fragment),
        };

        Ok(normalize_whitespace(&raw))
    }

    /// Display title with extraction failures degraded to the whole text.
    pub fn display_title(&self, item: &CatalogItem) -> String {
        self.extract_title(item).unwrap_or_else(|_| {
            normalize_whitespace(&whole_text(&Html::parse_fragment(&item.html)))
        })
    }
}

impl Default for ItemMatcher {
    fn default() -> Self {
        Self::whole_text()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))
}

/// Text nodes directly under the element, skipping child elements entirely.
fn direct_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| text.to_string()))
        .collect()
}

fn whole_text(fragment: &Html) -> String {
    fragment.root_element().text().collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
