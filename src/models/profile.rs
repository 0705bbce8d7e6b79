// src/models/profile.rs

//! Per-site DOM conventions, expressed as data.
//!
//! A `SiteProfile` captures everything that differs between configurator
//! sites: where the options live, how disabled/selected items are marked,
//! where the option title sits, what to click, and which page chrome
//! (accordions, loaders, dialogs, cookie banners) needs handling. One
//! generic adapter consumes the profile instead of one subclass per site.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::CatalogQuery;

/// Built-in target sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    CslComputer,
    MemoryPc,
}

impl SiteKind {
    pub fn name(&self) -> &'static str {
        match self {
            SiteKind::CslComputer => "csl_computer",
            SiteKind::MemoryPc => "memory_pc",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "csl_computer" => Ok(SiteKind::CslComputer),
            "memory_pc" => Ok(SiteKind::MemoryPc),
            other => Err(AppError::config(format!("Unknown site '{other}'"))),
        }
    }

    pub fn all() -> [SiteKind; 2] {
        [SiteKind::CslComputer, SiteKind::MemoryPc]
    }
}

/// Where an option's display title sits inside the option node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitleRule {
    /// Selector of the title element within the option node.
    /// `None` reads the whole option node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Read only text nodes directly under the title element, skipping
    /// decorative child elements (price deltas, badges).
    #[serde(default)]
    pub direct_text_only: bool,
}

/// What receives the synthetic click for an option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClickRule {
    /// Click the option node itself
    Node,
    /// Click an inner element, e.g. the radio/checkbox input
    Inner { selector: String },
}

/// How collapsed option groups are revealed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccordionRule {
    /// Set the `open` attribute on `<details>` group wrappers
    DetailsOpen { selector: String },
    /// Bootstrap-style collapse: drop `collapsed` from buttons, add `show`
    /// to panels
    CollapseClasses {
        button_selector: String,
        panel_selector: String,
    },
}

/// Confirmation dialogs that can block a click.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogRule {
    /// Selector matching open dialogs
    pub dialog_selector: String,

    /// OK/confirm button within a dialog
    pub confirm_selector: String,

    /// Close icon within a dialog, used when there is no confirm button.
    /// A dialog with neither is removed from the page outright.
    pub close_selector: String,
}

/// Cookie-consent banner dismissal, bounded by retries and a deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieBannerRule {
    /// Selector of the banner host element
    pub host_selector: String,

    /// Deny/dismiss button selector, resolved inside the host's shadow root
    /// when `in_shadow_root` is set
    pub button_selector: String,

    #[serde(default)]
    pub in_shadow_root: bool,

    #[serde(default = "defaults::banner_max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::banner_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "defaults::banner_timeout_ms")]
    pub timeout_ms: u64,
}

/// DOM conventions for one configurator site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteProfile {
    /// Profile name for identification
    pub name: String,

    /// Selector for every option node the configurator renders
    pub option_selector: String,

    /// Class marking an option incompatible with the current selection
    pub disabled_class: String,

    /// Selector suffix restricting to selected options
    pub selected_suffix: String,

    /// Where the option title lives
    pub title: TitleRule,

    /// What to click
    pub click: ClickRule,

    /// How to reveal collapsed groups
    pub accordion: AccordionRule,

    /// Loading indicator to await after a click, if the site has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader_selector: Option<String>,

    /// Blocking dialogs to auto-dismiss, if the site opens any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<DialogRule>,

    /// Selector for the total price text
    pub price_selector: String,

    /// Wrapper element used to scroll the price into view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_anchor_selector: Option<String>,

    /// Cookie banner to dismiss before touching the configurator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_banner: Option<CookieBannerRule>,
}

impl SiteProfile {
    /// Profile for the CSL-Computer configurator.
    pub fn csl_computer() -> Self {
        Self {
            name: SiteKind::CslComputer.name().to_string(),
            option_selector:
                ".upgrade-options > .group > details > .content > .components > .upgrade"
                    .to_string(),
            disabled_class: "incompatible".to_string(),
            selected_suffix: ":has(input:checked)".to_string(),
            title: TitleRule {
                selector: Some("label > span".to_string()),
                direct_text_only: true,
            },
            click: ClickRule::Inner {
                selector: "input[type=\"radio\"], input[type=\"checkbox\"]".to_string(),
            },
            accordion: AccordionRule::DetailsOpen {
                selector: ".upgrade-options > .group > details".to_string(),
            },
            loader_selector: Some(".css_loader.validate".to_string()),
            dialog: Some(DialogRule {
                dialog_selector: ".product-view .configurator > dialog".to_string(),
                confirm_selector: ".toolbar > form > button[type=\"button\"]".to_string(),
                close_selector: ".title > i".to_string(),
            }),
            price_selector: ".configurator .conversion > .price-wrapper > .price-box .price"
                .to_string(),
            price_anchor_selector: Some(".configurator .floatbar".to_string()),
            cookie_banner: None,
        }
    }

    /// Profile for the MemoryPC configurator.
    pub fn memory_pc() -> Self {
        Self {
            name: SiteKind::MemoryPc.name().to_string(),
            option_selector: ".bogx--flexbox.bogx--config.image-list".to_string(),
            disabled_class: "is--disabled".to_string(),
            selected_suffix: ".selected".to_string(),
            title: TitleRule {
                selector: Some(".title".to_string()),
                direct_text_only: false,
            },
            click: ClickRule::Node,
            accordion: AccordionRule::CollapseClasses {
                button_selector: ".accordion-button.collapsed".to_string(),
                panel_selector: ".accordion-collapse".to_string(),
            },
            loader_selector: None,
            dialog: None,
            price_selector: "#bogx_config_total".to_string(),
            price_anchor_selector: Some("#bogx_config_pricebox_wrap".to_string()),
            cookie_banner: Some(CookieBannerRule {
                host_selector: "#usercentrics-root".to_string(),
                button_selector: "button[data-testid='uc-deny-all-button']".to_string(),
                in_shadow_root: true,
                max_retries: defaults::banner_max_retries(),
                retry_interval_ms: defaults::banner_retry_interval_ms(),
                timeout_ms: defaults::banner_timeout_ms(),
            }),
        }
    }

    /// Built-in profile for a site.
    pub fn for_site(kind: SiteKind) -> Self {
        match kind {
            SiteKind::CslComputer => Self::csl_computer(),
            SiteKind::MemoryPc => Self::memory_pc(),
        }
    }

    /// Build the full option selector for a catalog query, appending the
    /// selected/enabled suffixes the way the site markup expects.
    pub fn options_selector(&self, query: CatalogQuery) -> String {
        let query = query.normalized();
        let mut selector = self.option_selector.clone();

        if query.only_selected {
            selector.push_str(&self.selected_suffix);
        }

        if !query.include_disabled {
            selector.push_str(&format!(":not(.{})", self.disabled_class));
        }

        selector
    }
}

mod defaults {
    pub fn banner_max_retries() -> u32 {
        40
    }
    pub fn banner_retry_interval_ms() -> u64 {
        500
    }
    pub fn banner_timeout_ms() -> u64 {
        20_000
    }
}
