// src/engine/mod.rs

//! Configuration application engine.
//!
//! Drives one bounded state machine per run: expand the option groups,
//! locate every desired component in a full catalog snapshot, apply the
//! located items in dependency order across bounded passes, then verify the
//! page against the selected-only snapshot. Verification failure and
//! backup usage each earn exactly one full retry.

pub mod matcher;
pub mod plan;
pub mod verify;

pub use matcher::ItemMatcher;
pub use plan::{ApplicationPlan, PassState};
pub use verify::{Verification, check_applied};

use crate::error::Result;
use crate::models::{AppliedComponent, CatalogQuery, ConfigurationResult, DesiredConfiguration};
use crate::site::SiteAdapter;

/// Phase of an application run, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Expanding,
    Locating,
    Applying,
    Verifying,
    Retrying,
    Done,
    Failed,
}

/// Outcome of a full engine run, across all attempts.
#[derive(Debug)]
pub struct RunReport {
    /// True only when every desired category passed verification
    pub matched: bool,

    /// Number of full attempts performed (1 or 2)
    pub attempts: u32,

    /// Categories that landed on a non-primary alternative, with the
    /// preference index that was satisfied
    pub backups: Vec<(String, i64)>,

    /// Final attempt's result, as verified
    pub result: ConfigurationResult,
}

/// Applies a desired configuration on a site and verifies convergence.
///
/// The engine is the sole writer to the page, one click in flight at a
/// time; every decision is made against a fresh catalog snapshot.
pub struct ApplicationEngine<'a, A: SiteAdapter + ?Sized> {
    adapter: &'a A,
}

impl<'a, A: SiteAdapter + ?Sized> ApplicationEngine<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self { adapter }
    }

    /// Run the full application state machine.
    ///
    /// Never fails on matching or verification trouble; the report carries
    /// `matched = false` and the missing categories instead. Errors are
    /// reserved for adapter transport failures.
    pub async fn run(&self, desired: &DesiredConfiguration) -> Result<RunReport> {
        let mut attempt = 1u32;

        loop {
            let (result, verification) = self.run_attempt(desired, attempt).await?;

            if verification.matched {
                let backups = result.backup_selections();

                if !backups.is_empty() && attempt == 1 {
                    self.enter(RunPhase::Retrying);
                    log::info!(
                        "Backup components used for {} categories, retrying for primary choices",
                        backups.len()
                    );
                    attempt += 1;
                    continue;
                }

                for (category, index) in &backups {
                    log::info!("{}: choice {} used", category, index + 1);
                }

                self.enter(RunPhase::Done);
                log::info!("Configuration applied successfully");
                return Ok(RunReport {
                    matched: true,
                    attempts: attempt,
                    backups,
                    result,
                });
            }

            if attempt == 1 {
                self.enter(RunPhase::Retrying);
                log::warn!("Verification failed, retrying once");
                attempt += 1;
                continue;
            }

            let missing: Vec<&str> = result
                .missing_components()
                .keys()
                .map(String::as_str)
                .collect();
            self.enter(RunPhase::Failed);
            log::warn!(
                "Some items were not found or could not be applied. Missing elements: {}",
                missing.join(", ")
            );
            let backups = result.backup_selections();
            return Ok(RunReport {
                matched: false,
                attempts: attempt,
                backups,
                result,
            });
        }
    }

    /// One full attempt: expand, locate, apply across bounded passes,
    /// record and verify.
    async fn run_attempt(
        &self,
        desired: &DesiredConfiguration,
        attempt: u32,
    ) -> Result<(ConfigurationResult, Verification)> {
        log::info!(
            "Attempt {}: applying {} components on {}",
            attempt,
            desired.len(),
            self.adapter.site_name()
        );

        self.enter(RunPhase::Expanding);
        self.adapter.expand_groups().await?;

        self.enter(RunPhase::Locating);
        let catalog = self.adapter.list_options(CatalogQuery::full()).await?;
        let plan = ApplicationPlan::locate(desired, &catalog, self.adapter.matcher());
        log::debug!(
            "Located {} items across {} of {} categories",
            plan.total_items(),
            plan.categories().len(),
            desired.len()
        );

        self.enter(RunPhase::Applying);
        let state = self.apply_passes(&plan).await?;

        let mut result = ConfigurationResult::new(desired.clone(), self.adapter.page_url());
        result.set_applied(state.into_applied());

        match self.adapter.price_text().await {
            Ok(Some(text)) => result.set_price_from_text(&text),
            Ok(None) => log::warn!("Price element not found"),
            Err(error) => log::warn!("Price read failed: {error}"),
        }

        self.enter(RunPhase::Verifying);
        let selected = self.adapter.list_options(CatalogQuery::selected()).await?;
        let verification = check_applied(desired, result.applied(), &selected, self.adapter.matcher());
        result.set_applied(verification.components.clone());

        if let Err(error) = self.adapter.scroll_to_price().await {
            log::debug!("Scroll to price failed: {error}");
        }

        Ok((result, verification))
    }

    /// Click located items in plan order, up to one pass per located item.
    ///
    /// The pass bound covers the worst case where each pass newly enables
    /// exactly one previously blocked item. A pass with no accepted click
    /// cannot unblock anything, so the loop stops early at that fixed
    /// point.
    async fn apply_passes(&self, plan: &ApplicationPlan) -> Result<PassState> {
        let total = plan.total_items();
        let mut state = PassState::new();

        for pass in 1..=total {
            let mut accepted = 0usize;

            for planned in plan.categories() {
                for (index, alternative) in planned.alternatives.iter().enumerate() {
                    if !state.should_attempt(&planned.category, index) {
                        continue;
                    }

                    if self.adapter.click_item(&alternative.item).await? {
                        log::debug!(
                            "{}: applied \"{}\" (choice {})",
                            planned.category,
                            alternative.title,
                            index + 1
                        );
                        state.record_success(
                            &planned.category,
                            index,
                            AppliedComponent::new(
                                alternative.title.clone(),
                                alternative.item.clone(),
                            ),
                        );
                        accepted += 1;
                        break;
                    }
                }
            }

            if accepted == 0 {
                log::debug!(
                    "Pass {}/{} accepted no clicks, stopping early ({} categories applied)",
                    pass,
                    total,
                    state.applied_count()
                );
                break;
            }
        }

        Ok(state)
    }

    fn enter(&self, phase: RunPhase) {
        log::debug!("[{}] phase: {:?}", self.adapter.site_name(), phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentRequest;
    use crate::site::testing::FakeSite;

    fn desired(entries: Vec<ComponentRequest>) -> DesiredConfiguration {
        DesiredConfiguration::new(entries)
    }

    #[tokio::test]
    async fn test_all_primary_choices_converge_first_attempt() {
        let site = FakeSite::new("https://example.com/configurator")
            .with_price("1 234,56 €")
            .option("it-case", "case", "Fractal North Chalk White")
            .option("it-psu", "psu", "1000W be quiet Pure Power")
            .option("it-cpu", "cpu", "AMD Ryzen 7 9800X3D")
            .option("it-gpu", "gpu", "Gigabyte RTX 5080 AORUS");

        let wanted = desired(vec![
            ComponentRequest::single("CPU", "Ryzen 7"),
            ComponentRequest::single("case", "Fractal North"),
            ComponentRequest::single("PSU", "be quiet"),
            ComponentRequest::single("GPU", "RTX 5080"),
        ]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(report.matched);
        assert_eq!(report.attempts, 1);
        assert!(report.backups.is_empty());
        assert!(report.result.applied_indexes().values().all(|i| *i == 0));
        assert_eq!(report.result.price(), 1234.56);
        assert_eq!(site.expand_calls(), 1);
    }

    #[tokio::test]
    async fn test_application_order_is_case_psu_middle_gpu() {
        let site = FakeSite::new("https://example.com")
            .option("it-gpu", "gpu", "RTX 5080")
            .option("it-ram", "ram", "32 Go DDR5")
            .option("it-case", "case", "Fractal North")
            .option("it-psu", "psu", "be quiet 1000W");

        // Declaration order deliberately scrambled.
        let wanted = desired(vec![
            ComponentRequest::single("GPU", "RTX 5080"),
            ComponentRequest::single("RAM", "DDR5"),
            ComponentRequest::single("case", "Fractal"),
            ComponentRequest::single("PSU", "be quiet"),
        ]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(report.matched);
        assert_eq!(
            site.clicks(),
            vec![
                "it-case".to_string(),
                "it-psu".to_string(),
                "it-ram".to_string(),
                "it-gpu".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_cpu_selection_unlocks_disabled_case_backup() {
        // "Case B" starts disabled and only becomes clickable once the CPU
        // is chosen; "Case A" does not exist at all.
        let site = FakeSite::new("https://example.com")
            .option("it-cpu", "cpu", "Ryzen 7 9800X3D")
            .disabled_option("it-case-b", "case", "Case B Chalk White")
            .unlock("it-cpu", "it-case-b");

        let wanted = desired(vec![
            ComponentRequest::single("CPU", "Ryzen 7"),
            ComponentRequest::new("case", vec!["Case A".into(), "Case B".into()]),
        ]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(report.matched);
        assert_eq!(report.result.applied_indexes()["CPU"], 0);
        assert_eq!(report.result.applied_indexes()["case"], 1);
        // Backup usage earns exactly one extra full attempt.
        assert_eq!(report.attempts, 2);
        assert_eq!(report.backups, vec![("case".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_unmatched_category_is_missing_after_one_retry() {
        let site = FakeSite::new("https://example.com")
            .option("it-cpu", "cpu", "Ryzen 7 9800X3D");

        let wanted = desired(vec![
            ComponentRequest::single("CPU", "Ryzen 7"),
            ComponentRequest::single("case", "Lian Li O11"),
        ]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(!report.matched);
        assert_eq!(report.attempts, 2);
        assert!(report.result.missing_components().contains_key("case"));
        assert_eq!(report.result.applied_indexes()["CPU"], 0);
    }

    #[tokio::test]
    async fn test_nothing_matches_retries_exactly_once() {
        let site = FakeSite::new("https://example.com")
            .option("it-1", "cpu", "Intel Core i5-14400F");

        let wanted = desired(vec![
            ComponentRequest::single("CPU", "Ryzen 7"),
            ComponentRequest::single("case", "Fractal North"),
        ]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(!report.matched);
        assert!(report.result.applied().is_empty());
        assert_eq!(report.result.missing_components().len(), 2);
        // One regular attempt plus exactly one recursive retry.
        assert_eq!(report.attempts, 2);
        assert_eq!(site.expand_calls(), 2);
    }

    #[tokio::test]
    async fn test_permanently_disabled_primary_settles_on_backup() {
        let site = FakeSite::new("https://example.com")
            .disabled_option("it-case-a", "case", "Vitrum Advanced")
            .option("it-case-b", "case", "Fractal North Chalk White");

        let wanted = desired(vec![ComponentRequest::new(
            "case",
            vec!["Vitrum Advanced".into(), "Fractal North".into()],
        )]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        // The backup verifies fine; the retry hoping for the primary choice
        // changes nothing, and the second attempt reports it instead.
        assert!(report.matched);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.backups, vec![("case".to_string(), 1)]);
        assert_eq!(report.result.applied_indexes()["case"], 1);
    }

    #[tokio::test]
    async fn test_later_pass_climbs_to_primary_within_one_attempt() {
        // Selecting the backup case unlocks the primary one; the bounded
        // pass loop upgrades to it without needing a second attempt.
        let site = FakeSite::new("https://example.com")
            .disabled_option("it-case-a", "case", "Vitrum Advanced")
            .option("it-case-b", "case", "Fractal North Chalk White")
            .unlock("it-case-b", "it-case-a");

        let wanted = desired(vec![ComponentRequest::new(
            "case",
            vec!["Vitrum Advanced".into(), "Fractal North".into()],
        )]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(report.matched);
        assert_eq!(report.attempts, 1);
        assert!(report.backups.is_empty());
        assert_eq!(report.result.applied_indexes()["case"], 0);
        assert_eq!(report.result.applied()["case"].item.id, "it-case-a");
    }

    #[tokio::test]
    async fn test_missing_price_yields_sentinel() {
        let site = FakeSite::new("https://example.com")
            .option("it-cpu", "cpu", "Ryzen 7 9800X3D");

        let wanted = desired(vec![ComponentRequest::single("CPU", "Ryzen 7")]);

        let report = ApplicationEngine::new(&site).run(&wanted).await.unwrap();

        assert!(report.matched);
        assert_eq!(report.result.price(), -1.0);
    }
}
