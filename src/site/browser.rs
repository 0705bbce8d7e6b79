// src/site/browser.rs

//! Chrome DevTools Protocol site adapter.
//!
//! Drives a live configurator page through `chromiumoxide`. All DOM work
//! runs as injected JavaScript built from the site profile, which keeps the
//! page-side semantics identical across sites: option nodes get tagged with
//! a stable `data-autorig-id`, snapshots serialize the tagged nodes, and
//! clicks resolve their target through the profile's click rule.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

use crate::engine::matcher::ItemMatcher;
use crate::error::{AppError, Result};
use crate::models::{
    AccordionRule, CatalogItem, CatalogQuery, ClickRule, CookieBannerRule, SiteProfile,
};

use super::SiteAdapter;

/// Bounds on the adapter's polling waits.
#[derive(Debug, Clone)]
pub struct WaitSettings {
    /// Interval between DOM polls
    pub poll_interval_ms: u64,

    /// Deadline for the post-click loading indicator to clear
    pub settle_timeout_ms: u64,

    /// Deadline for an expected element to appear
    pub element_timeout_ms: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            settle_timeout_ms: 30_000,
            element_timeout_ms: 10_000,
        }
    }
}

/// A running Chrome instance and its event handler task.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch a local Chrome process.
    pub async fn launch(headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(AppError::browser)?;

        let (browser, handler) = Browser::launch(config).await.map_err(AppError::browser)?;
        Ok(Self::spawn_handler(browser, handler))
    }

    /// Attach to an already running Chrome over its DevTools websocket.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (browser, handler) = Browser::connect(ws_url).await.map_err(AppError::browser)?;
        Ok(Self::spawn_handler(browser, handler))
    }

    fn spawn_handler(browser: Browser, mut handler: chromiumoxide::Handler) -> Self {
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        Self {
            browser,
            handler_task,
        }
    }

    /// Open a page and wait for its initial navigation.
    pub async fn open(&self, url: &str) -> Result<Page> {
        let page = self.browser.new_page(url).await.map_err(AppError::browser)?;
        page.wait_for_navigation().await.map_err(AppError::browser)?;
        Ok(page)
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.map_err(AppError::browser)?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

/// Snapshot record returned by the page-side catalog script.
#[derive(Debug, Deserialize)]
struct OptionSnapshot {
    id: String,
    html: String,
    enabled: bool,
    selected: bool,
}

/// [`SiteAdapter`] over a live page, parameterized by a [`SiteProfile`].
pub struct DomConfigurator {
    page: Page,
    profile: SiteProfile,
    matcher: ItemMatcher,
    waits: WaitSettings,
    url: String,
}

impl DomConfigurator {
    pub async fn new(page: Page, profile: SiteProfile, waits: WaitSettings) -> Result<Self> {
        let url = page
            .url()
            .await
            .map_err(AppError::browser)?
            .unwrap_or_default();
        let matcher = ItemMatcher::new(profile.title.clone());

        Ok(Self {
            page,
            profile,
            matcher,
            waits,
            url,
        })
    }

    /// Get the page ready for catalog work: dismiss the cookie banner when
    /// the profile has one, then wait for the option nodes to render.
    ///
    /// A page that never renders any option is reported as a warning, not
    /// an error; the run then degrades to an all-missing result.
    pub async fn prepare(&self) -> Result<()> {
        if let Some(banner) = self.profile.cookie_banner.clone() {
            self.dismiss_cookie_banner(&banner).await?;
        }

        if !self
            .wait_for_element(&self.profile.option_selector, self.waits.element_timeout_ms)
            .await?
        {
            log::warn!(
                "No configurator options appeared within {}ms ({})",
                self.waits.element_timeout_ms,
                self.profile.option_selector
            );
        }
        Ok(())
    }

    /// Evaluate a JS expression on the page and deserialize its value.
    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(AppError::browser)?;

        let outcome = self.page.evaluate(params).await.map_err(AppError::browser)?;
        outcome.into_value().map_err(AppError::browser)
    }

    /// Poll until `selector` matches something, bounded by `timeout_ms`.
    ///
    /// Returns whether the element appeared; a deadline miss is "absent",
    /// never an error.
    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        let selector_js = js_string(selector);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let present: bool = self
                .eval(format!(
                    "document.querySelector({selector_js}) !== null"
                ))
                .await?;
            if present {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(self.waits.poll_interval_ms)).await;
        }
    }

    /// Wait for the site's loading indicator to clear after a click.
    ///
    /// Sites without a loader settle synchronously. A loader that outlives
    /// the deadline is logged and treated as settled so the run can keep
    /// degrading gracefully instead of aborting.
    async fn await_settle(&self) -> Result<()> {
        let Some(loader) = &self.profile.loader_selector else {
            return Ok(());
        };

        let loader_js = js_string(loader);
        let deadline = Instant::now() + Duration::from_millis(self.waits.settle_timeout_ms);

        loop {
            let busy: bool = self
                .eval(format!("document.querySelector({loader_js}) !== null"))
                .await?;
            if !busy {
                return Ok(());
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "Loader {} still present after {}ms, continuing",
                    loader,
                    self.waits.settle_timeout_ms
                );
                return Ok(());
            }
            sleep(Duration::from_millis(self.waits.poll_interval_ms)).await;
        }
    }

    /// Confirm or close every open blocking dialog; a dialog with neither
    /// button is removed outright. Returns whether any dialog was open.
    async fn close_dialogs(&self) -> Result<bool> {
        let Some(dialog) = &self.profile.dialog else {
            return Ok(false);
        };

        let script = format!(
            r#"(() => {{
                const dialogs = Array.from(document.querySelectorAll({dialog_sel}));
                for (const dialog of dialogs) {{
                    const okBtn = dialog.querySelector({confirm_sel});
                    if (okBtn) {{ okBtn.click(); continue; }}
                    const closeBtn = dialog.querySelector({close_sel});
                    if (closeBtn) {{ closeBtn.click(); continue; }}
                    dialog.remove();
                }}
                return dialogs.length > 0;
            }})()"#,
            dialog_sel = js_string(&dialog.dialog_selector),
            confirm_sel = js_string(&dialog.confirm_selector),
            close_sel = js_string(&dialog.close_selector),
        );

        self.eval(script).await
    }

    async fn dismiss_cookie_banner(&self, banner: &CookieBannerRule) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const host = document.querySelector({host_sel});
                if (!host) return false;
                const root = {root_expr};
                if (!root) return false;
                const button = root.querySelector({button_sel});
                if (!button) return false;
                button.click();
                return true;
            }})()"#,
            host_sel = js_string(&banner.host_selector),
            root_expr = if banner.in_shadow_root {
                "host.shadowRoot"
            } else {
                "host"
            },
            button_sel = js_string(&banner.button_selector),
        );

        let deadline = Instant::now() + Duration::from_millis(banner.timeout_ms);
        for _ in 0..banner.max_retries {
            let clicked: bool = self.eval(script.clone()).await?;
            if clicked {
                log::info!("Cookie banner dismissed ({})", banner.host_selector);
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(Duration::from_millis(banner.retry_interval_ms)).await;
        }

        log::debug!("Cookie banner never appeared ({})", banner.host_selector);
        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for DomConfigurator {
    fn site_name(&self) -> &str {
        &self.profile.name
    }

    fn page_url(&self) -> String {
        self.url.clone()
    }

    fn matcher(&self) -> &ItemMatcher {
        &self.matcher
    }

    async fn expand_groups(&self) -> Result<()> {
        let script = match &self.profile.accordion {
            AccordionRule::DetailsOpen { selector } => format!(
                r#"(() => {{
                    const groups = document.querySelectorAll({selector});
                    groups.forEach(item => item.setAttribute('open', 'true'));
                    return groups.length;
                }})()"#,
                selector = js_string(selector),
            ),
            AccordionRule::CollapseClasses {
                button_selector,
                panel_selector,
            } => format!(
                r#"(() => {{
                    const buttons = document.querySelectorAll({buttons});
                    buttons.forEach(el => el.classList.remove('collapsed'));
                    document.querySelectorAll({panels}).forEach(el => el.classList.add('show'));
                    return buttons.length;
                }})()"#,
                buttons = js_string(button_selector),
                panels = js_string(panel_selector),
            ),
        };

        let expanded: u64 = self.eval(script).await?;
        log::debug!("Expanded {expanded} option groups");
        Ok(())
    }

    async fn list_options(&self, query: CatalogQuery) -> Result<Vec<CatalogItem>> {
        let selected_selector = format!(
            "{}{}",
            self.profile.option_selector, self.profile.selected_suffix
        );

        // Tag first so ids stay stable across snapshots of the same page.
        let script = format!(
            r#"(() => {{
                let next = window.__autorigNextId || 0;
                for (const el of document.querySelectorAll({base_sel})) {{
                    if (!el.dataset.autorigId) {{
                        el.dataset.autorigId = 'opt-' + next;
                        next += 1;
                    }}
                }}
                window.__autorigNextId = next;

                return Array.from(document.querySelectorAll({query_sel})).map(el => ({{
                    id: el.dataset.autorigId,
                    html: el.outerHTML,
                    enabled: !el.classList.contains({disabled_class}),
                    selected: el.matches({selected_sel}),
                }}));
            }})()"#,
            base_sel = js_string(&self.profile.option_selector),
            query_sel = js_string(&self.profile.options_selector(query)),
            disabled_class = js_string(&self.profile.disabled_class),
            selected_sel = js_string(&selected_selector),
        );

        let snapshots: Vec<OptionSnapshot> = self.eval(script).await?;
        Ok(snapshots
            .into_iter()
            .map(|snapshot| CatalogItem {
                id: snapshot.id,
                html: snapshot.html,
                enabled: snapshot.enabled,
                selected: snapshot.selected,
            })
            .collect())
    }

    async fn click_item(&self, item: &CatalogItem) -> Result<bool> {
        let target_expr = match &self.profile.click {
            ClickRule::Node => "el".to_string(),
            ClickRule::Inner { selector } => {
                format!("el.querySelector({})", js_string(selector))
            }
        };

        let script = format!(
            r#"(() => {{
                const el = document.querySelector({id_sel});
                if (!el || el.classList.contains({disabled_class})) return false;
                const target = {target_expr};
                if (!target) return false;
                target.click();
                return true;
            }})()"#,
            id_sel = js_string(&format!("[data-autorig-id=\"{}\"]", item.id)),
            disabled_class = js_string(&self.profile.disabled_class),
        );

        let clicked: bool = self.eval(script).await?;
        if !clicked {
            return Ok(false);
        }

        self.await_settle().await?;

        // A click that opened a blocking dialog did not take; the dialog is
        // dismissed and the click reported as rejected.
        let dialog_was_open = self.close_dialogs().await?;
        Ok(!dialog_was_open)
    }

    async fn price_text(&self) -> Result<Option<String>> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({price_sel});
                return el ? el.textContent.trim() : null;
            }})()"#,
            price_sel = js_string(&self.profile.price_selector),
        );

        self.eval(script).await
    }

    async fn scroll_to_price(&self) -> Result<()> {
        let anchor = self
            .profile
            .price_anchor_selector
            .as_deref()
            .unwrap_or(&self.profile.price_selector);

        let script = format!(
            r#"(() => {{
                const el = document.querySelector({anchor_sel});
                if (el) el.scrollIntoView({{ block: 'end' }});
                return el !== null;
            }})()"#,
            anchor_sel = js_string(anchor),
        );

        let found: bool = self.eval(script).await?;
        if !found {
            log::debug!("Price anchor not found ({anchor})");
        }
        Ok(())
    }
}

/// Quote a Rust string as a JS string literal.
fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
