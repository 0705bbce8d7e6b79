// src/site/testing.rs

//! In-memory fake site for engine tests.
//!
//! Models the observable behavior of a configurator page: options carry an
//! enabled/selected state, clicking an option deselects the rest of its
//! group, and unlock rules let one selection enable a previously disabled
//! option, reproducing the incompatibility cascades the engine has to ride
//! out.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::matcher::ItemMatcher;
use crate::error::Result;
use crate::models::{CatalogItem, CatalogQuery, ItemId};

use super::SiteAdapter;

struct FakeOption {
    id: ItemId,
    title: String,
    group: String,
    enabled: bool,
    selected: bool,
}

#[derive(Default)]
struct FakeState {
    options: Vec<FakeOption>,
    /// (selected item, item it enables)
    unlocks: Vec<(ItemId, ItemId)>,
    expand_calls: usize,
    clicks: Vec<ItemId>,
}

/// Scriptable [`SiteAdapter`] backed by plain vectors.
pub struct FakeSite {
    url: String,
    price_text: Option<String>,
    matcher: ItemMatcher,
    state: Mutex<FakeState>,
}

impl FakeSite {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            price_text: None,
            matcher: ItemMatcher::whole_text(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_price(mut self, text: impl Into<String>) -> Self {
        self.price_text = Some(text.into());
        self
    }

    /// Add an enabled, unselected option. `group` models the mutual
    /// exclusion set the option belongs to.
    pub fn option(
        self,
        id: impl Into<ItemId>,
        group: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.push_option(id, group, title, true)
    }

    /// Add an option that rejects clicks until something unlocks it.
    pub fn disabled_option(
        self,
        id: impl Into<ItemId>,
        group: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.push_option(id, group, title, false)
    }

    /// Selecting `trigger` enables `target`.
    pub fn unlock(self, trigger: impl Into<ItemId>, target: impl Into<ItemId>) -> Self {
        self.state
            .lock()
            .unwrap()
            .unlocks
            .push((trigger.into(), target.into()));
        self
    }

    pub fn expand_calls(&self) -> usize {
        self.state.lock().unwrap().expand_calls
    }

    /// Every accepted click, in order.
    pub fn clicks(&self) -> Vec<ItemId> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.state
            .lock()
            .unwrap()
            .options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.id.clone())
            .collect()
    }

    fn push_option(
        self,
        id: impl Into<ItemId>,
        group: impl Into<String>,
        title: impl Into<String>,
        enabled: bool,
    ) -> Self {
        self.state.lock().unwrap().options.push(FakeOption {
            id: id.into(),
            title: title.into(),
            group: group.into(),
            enabled,
            selected: false,
        });
        self
    }
}

impl FakeState {
    fn apply_unlocks(&mut self) {
        let selected: Vec<ItemId> = self
            .options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.id.clone())
            .collect();

        for (trigger, target) in &self.unlocks {
            if selected.contains(trigger) {
                if let Some(option) = self.options.iter_mut().find(|o| &o.id == target) {
                    option.enabled = true;
                }
            }
        }
    }
}

#[async_trait]
impl SiteAdapter for FakeSite {
    fn site_name(&self) -> &str {
        "fake"
    }

    fn page_url(&self) -> String {
        self.url.clone()
    }

    fn matcher(&self) -> &ItemMatcher {
        &self.matcher
    }

    async fn expand_groups(&self) -> Result<()> {
        self.state.lock().unwrap().expand_calls += 1;
        Ok(())
    }

    async fn list_options(&self, query: CatalogQuery) -> Result<Vec<CatalogItem>> {
        let query = query.normalized();
        let state = self.state.lock().unwrap();

        Ok(state
            .options
            .iter()
            .filter(|option| query.include_disabled || option.enabled)
            .filter(|option| !query.only_selected || option.selected)
            .map(|option| CatalogItem {
                id: option.id.clone(),
                html: format!("<div>{}</div>", option.title),
                enabled: option.enabled,
                selected: option.selected,
            })
            .collect())
    }

    async fn click_item(&self, item: &CatalogItem) -> Result<bool> {
        let mut state = self.state.lock().unwrap();

        let Some(position) = state.options.iter().position(|o| o.id == item.id) else {
            return Ok(false);
        };
        if !state.options[position].enabled {
            return Ok(false);
        }

        let group = state.options[position].group.clone();
        for option in &mut state.options {
            if option.group == group {
                option.selected = false;
            }
        }
        state.options[position].selected = true;
        state.apply_unlocks();

        let id = state.options[position].id.clone();
        state.clicks.push(id);
        Ok(true)
    }

    async fn price_text(&self) -> Result<Option<String>> {
        Ok(self.price_text.clone())
    }

    async fn scroll_to_price(&self) -> Result<()> {
        Ok(())
    }
}
