// src/engine/verify.rs

//! Post-application verification against the selected-only catalog view.

use std::collections::{BTreeMap, HashSet};

use crate::models::{AppliedComponent, CatalogItem, DesiredConfiguration};

use super::matcher::ItemMatcher;

/// Result of checking an applied configuration against the page state.
#[derive(Debug, Clone)]
pub struct Verification {
    /// True only when every desired category passed both checks.
    pub matched: bool,

    /// The applied components as verified, including entries that failed
    /// the check; this replaces the result's applied mapping.
    pub components: BTreeMap<String, AppliedComponent>,
}

/// Verify that each desired category's recorded item still matches one of
/// the acceptable texts and is actually selected on the page.
///
/// Pure over the given snapshot: calling it twice against the same
/// unmodified page state yields the same verdict.
pub fn check_applied(
    desired: &DesiredConfiguration,
    applied: &BTreeMap<String, AppliedComponent>,
    selected: &[CatalogItem],
    matcher: &ItemMatcher,
) -> Verification {
    let selected_ids: HashSet<&str> = selected.iter().map(|item| item.id.as_str()).collect();

    let mut matched = true;
    let mut components = BTreeMap::new();

    for entry in desired.entries() {
        let Some(component) = applied.get(&entry.category) else {
            log::warn!(
                "Configuration item \"{}\" not found in results",
                entry.category
            );
            matched = false;
            continue;
        };

        let component_found = entry.options.iter().any(|text| {
            matcher.matches(&component.item, text)
                && selected_ids.contains(component.item.id.as_str())
        });

        matched = matched && component_found;
        components.insert(entry.category.clone(), component.clone());
    }

    Verification {
        matched,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentRequest;

    fn catalog_item(id: &str, title: &str) -> CatalogItem {
        CatalogItem::new(id, format!("<div>{title}</div>"))
    }

    fn desired() -> DesiredConfiguration {
        DesiredConfiguration::new(vec![
            ComponentRequest::single("CPU", "Ryzen 7"),
            ComponentRequest::new("case", vec!["Case A".into(), "Case B".into()]),
        ])
    }

    fn applied() -> BTreeMap<String, AppliedComponent> {
        let mut map = BTreeMap::new();
        map.insert(
            "CPU".to_string(),
            AppliedComponent::new("Ryzen 7 9800X3D", catalog_item("it-cpu", "Ryzen 7 9800X3D")),
        );
        map.insert(
            "case".to_string(),
            AppliedComponent::new(
                "Case B Chalk White",
                catalog_item("it-case", "Case B Chalk White"),
            ),
        );
        map
    }

    #[test]
    fn test_all_selected_and_matching_passes() {
        let selected = vec![
            catalog_item("it-cpu", "Ryzen 7 9800X3D"),
            catalog_item("it-case", "Case B Chalk White"),
        ];

        let verification = check_applied(
            &desired(),
            &applied(),
            &selected,
            &ItemMatcher::whole_text(),
        );

        assert!(verification.matched);
        assert_eq!(verification.components.len(), 2);
    }

    #[test]
    fn test_item_not_in_selected_set_fails() {
        let selected = vec![catalog_item("it-cpu", "Ryzen 7 9800X3D")];

        let verification = check_applied(
            &desired(),
            &applied(),
            &selected,
            &ItemMatcher::whole_text(),
        );

        assert!(!verification.matched);
        // The failed entry is still reported back.
        assert!(verification.components.contains_key("case"));
    }

    #[test]
    fn test_missing_category_fails_but_keeps_rest() {
        let mut applied = applied();
        applied.remove("case");
        let selected = vec![catalog_item("it-cpu", "Ryzen 7 9800X3D")];

        let verification =
            check_applied(&desired(), &applied, &selected, &ItemMatcher::whole_text());

        assert!(!verification.matched);
        assert_eq!(verification.components.len(), 1);
        assert!(verification.components.contains_key("CPU"));
    }

    #[test]
    fn test_verification_is_idempotent() {
        let selected = vec![
            catalog_item("it-cpu", "Ryzen 7 9800X3D"),
            catalog_item("it-case", "Case B Chalk White"),
        ];
        let matcher = ItemMatcher::whole_text();

        let first = check_applied(&desired(), &applied(), &selected, &matcher);
        let second = check_applied(&desired(), &applied(), &selected, &matcher);

        assert_eq!(first.matched, second.matched);
        assert_eq!(first.components, second.components);
    }
}
