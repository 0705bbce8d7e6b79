// src/engine/plan.rs

//! Locating desired components in a catalog snapshot and ordering them for
//! application.
//!
//! The ordering exists to avoid incompatibility cascades: the case goes
//! first, the PSU second and the GPU last, so a large GPU never gets
//! rejected for a case or PSU that was going to change anyway.

use std::collections::{BTreeMap, HashSet};

use crate::models::{AppliedComponent, CatalogItem, DesiredConfiguration, ItemId};

use super::matcher::ItemMatcher;

/// A catalog item located for one of a category's option texts, in
/// preference order.
#[derive(Debug, Clone)]
pub struct LocatedAlternative {
    pub item: CatalogItem,
    pub title: String,
}

/// A category with its located alternatives, most preferred first.
#[derive(Debug, Clone)]
pub struct PlannedCategory {
    pub category: String,
    pub alternatives: Vec<LocatedAlternative>,
}

/// The ordered application plan for one run.
///
/// Built fresh on every attempt; categories with no located item are
/// omitted and surface later as missing components.
#[derive(Debug, Clone)]
pub struct ApplicationPlan {
    categories: Vec<PlannedCategory>,
}

impl ApplicationPlan {
    /// Locate every category's alternatives in the catalog snapshot.
    ///
    /// For each category in declaration order and each option text in
    /// preference order, the first matching item that no earlier lookup has
    /// claimed is taken. A claimed item stays claimed for the rest of the
    /// run, across categories.
    pub fn locate(
        desired: &DesiredConfiguration,
        catalog: &[CatalogItem],
        matcher: &ItemMatcher,
    ) -> Self {
        let mut claimed: HashSet<ItemId> = HashSet::new();
        let mut located = Vec::new();

        for entry in desired.entries() {
            let mut alternatives = Vec::new();

            for text in &entry.options {
                let found = catalog.iter().find(|item| {
                    !claimed.contains(&item.id) && matcher.matches(item, text)
                });

                if let Some(item) = found {
                    claimed.insert(item.id.clone());
                    alternatives.push(LocatedAlternative {
                        item: item.clone(),
                        title: matcher.display_title(item),
                    });
                }
            }

            if !alternatives.is_empty() {
                located.push(PlannedCategory {
                    category: entry.category.clone(),
                    alternatives,
                });
            }
        }

        Self {
            categories: order_categories(located),
        }
    }

    pub fn categories(&self) -> &[PlannedCategory] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total located items across all categories; the bound on application
    /// passes.
    pub fn total_items(&self) -> usize {
        self.categories
            .iter()
            .map(|planned| planned.alternatives.len())
            .sum()
    }
}

/// Case first, PSU second, GPU last, everything else in declaration order.
fn order_categories(mut found: Vec<PlannedCategory>) -> Vec<PlannedCategory> {
    let mut ordered = Vec::with_capacity(found.len());

    if let Some(position) = found.iter().position(|c| c.category == "case") {
        ordered.push(found.remove(position));
    }
    if let Some(position) = found.iter().position(|c| c.category == "PSU") {
        ordered.push(found.remove(position));
    }

    let gpu = found
        .iter()
        .position(|c| c.category == "GPU")
        .map(|position| found.remove(position));

    ordered.extend(found);
    if let Some(gpu) = gpu {
        ordered.push(gpu);
    }

    ordered
}

/// Per-category application bookkeeping across passes.
///
/// Once an alternative is applied for a category, that alternative and every
/// less-preferred one are never attempted again; strictly more preferred
/// alternatives stay attemptable in later passes, so a category can climb
/// toward its primary choice as other selections unlock it.
#[derive(Debug, Default)]
pub struct PassState {
    applied: BTreeMap<String, AppliedChoice>,
}

#[derive(Debug)]
struct AppliedChoice {
    index: usize,
    component: AppliedComponent,
}

impl PassState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the alternative at `index` is still worth clicking.
    pub fn should_attempt(&self, category: &str, index: usize) -> bool {
        match self.applied.get(category) {
            Some(choice) => index < choice.index,
            None => true,
        }
    }

    /// Record a successful click, locking the category at this preference
    /// level.
    pub fn record_success(&mut self, category: &str, index: usize, component: AppliedComponent) {
        self.applied
            .insert(category.to_string(), AppliedChoice { index, component });
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Consume the state into the applied mapping for the result.
    pub fn into_applied(self) -> BTreeMap<String, AppliedComponent> {
        self.applied
            .into_iter()
            .map(|(category, choice)| (category, choice.component))
            .collect()
    }
}
