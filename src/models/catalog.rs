// src/models/catalog.rs

//! Catalog item snapshots and query flags.

use serde::{Deserialize, Serialize};

/// Adapter-scoped stable identifier for a catalog item.
///
/// The identifier must stay stable across re-queries of the same page so that
/// an item clicked in one snapshot can be recognized in a later one.
pub type ItemId = String;

/// Snapshot of a selectable configuration option on the target page.
///
/// A snapshot is taken at query time and goes stale the moment any item is
/// clicked; callers re-query instead of caching enablement across clicks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    /// Stable identifier within the adapter session
    pub id: ItemId,

    /// Raw outer HTML of the option node, used for title extraction
    pub html: String,

    /// Whether the site currently marks the item compatible/clickable
    pub enabled: bool,

    /// Whether the site currently marks the item selected/checked
    pub selected: bool,
}

impl CatalogItem {
    pub fn new(id: impl Into<ItemId>, html: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            html: html.into(),
            enabled: true,
            selected: false,
        }
    }
}

/// Filter flags for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogQuery {
    pub include_disabled: bool,
    pub only_selected: bool,
}

impl CatalogQuery {
    /// Every option the page renders, compatible or not.
    pub fn full() -> Self {
        Self {
            include_disabled: true,
            only_selected: false,
        }
    }

    /// Only options the page currently allows clicking.
    pub fn enabled() -> Self {
        Self {
            include_disabled: false,
            only_selected: false,
        }
    }

    /// Only options the page currently marks selected.
    ///
    /// Selected items are never disabled, so this forces
    /// `include_disabled = false`.
    pub fn selected() -> Self {
        Self {
            include_disabled: false,
            only_selected: true,
        }
    }

    /// Normalize the flag coupling: `only_selected` implies
    /// `include_disabled = false`.
    pub fn normalized(mut self) -> Self {
        if self.only_selected {
            self.include_disabled = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_selected_forces_enabled_only() {
        let query = CatalogQuery {
            include_disabled: true,
            only_selected: true,
        }
        .normalized();

        assert!(!query.include_disabled);
        assert!(query.only_selected);
    }

    #[test]
    fn test_full_query_keeps_disabled() {
        let query = CatalogQuery::full().normalized();
        assert!(query.include_disabled);
        assert!(!query.only_selected);
    }
}
