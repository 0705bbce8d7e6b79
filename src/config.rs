// src/config.rs

//! Run configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ComponentRequest, DesiredConfiguration, SiteKind, SiteProfile};

/// Root run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target site, by built-in profile name
    #[serde(default = "defaults::site")]
    pub site: String,

    /// Configurator page to open
    #[serde(default = "defaults::url")]
    pub url: String,

    /// File to write the JSON run report to, besides stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Browser session settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Full site profile override; replaces the built-in profile when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<SiteProfile>,

    /// Requested components, in declaration order
    #[serde(default = "defaults::default_components")]
    pub components: Vec<ComponentRequest>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.url)
            .map_err(|e| AppError::validation(format!("url '{}' is invalid: {e}", self.url)))?;

        if self.profile.is_none() {
            SiteKind::from_name(&self.site)
                .map_err(|_| AppError::validation(format!("Unknown site '{}'", self.site)))?;
        }

        if self.browser.poll_interval_ms == 0 {
            return Err(AppError::validation("browser.poll_interval_ms must be > 0"));
        }
        if self.browser.settle_timeout_ms == 0 {
            return Err(AppError::validation("browser.settle_timeout_ms must be > 0"));
        }
        if self.browser.element_timeout_ms == 0 {
            return Err(AppError::validation(
                "browser.element_timeout_ms must be > 0",
            ));
        }

        self.desired().validate()
    }

    /// The desired configuration built from the component entries.
    pub fn desired(&self) -> DesiredConfiguration {
        DesiredConfiguration::new(self.components.clone())
    }

    /// The site profile this run targets: the override when present,
    /// otherwise the built-in profile for `site`.
    pub fn site_profile(&self) -> Result<SiteProfile> {
        if let Some(profile) = &self.profile {
            return Ok(profile.clone());
        }
        Ok(SiteProfile::for_site(SiteKind::from_name(&self.site)?))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: defaults::site(),
            url: defaults::url(),
            output_path: None,
            browser: BrowserSettings::default(),
            profile: None,
            components: defaults::default_components(),
        }
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run Chrome without a visible window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Attach to a running Chrome over this DevTools websocket URL instead
    /// of launching one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_ws: Option<String>,

    /// Interval between DOM polls in milliseconds
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Deadline for the post-click loading indicator to clear
    #[serde(default = "defaults::settle_timeout")]
    pub settle_timeout_ms: u64,

    /// Deadline for an expected element to appear
    #[serde(default = "defaults::element_timeout")]
    pub element_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: defaults::headless(),
            connect_ws: None,
            poll_interval_ms: defaults::poll_interval(),
            settle_timeout_ms: defaults::settle_timeout(),
            element_timeout_ms: defaults::element_timeout(),
        }
    }
}

mod defaults {
    use crate::models::ComponentRequest;

    pub fn site() -> String {
        "csl_computer".into()
    }

    pub fn url() -> String {
        "https://www.csl-computer.com/".into()
    }

    pub fn headless() -> bool {
        true
    }
    pub fn poll_interval() -> u64 {
        100
    }
    pub fn settle_timeout() -> u64 {
        30_000
    }
    pub fn element_timeout() -> u64 {
        10_000
    }

    // Component defaults
    pub fn default_components() -> Vec<ComponentRequest> {
        vec![
            ComponentRequest::new(
                "case",
                vec![
                    "BoostBoxx Vitrum Advanced, blanc, éclairage aRGB avec commande, \
                     partie latérale en verre et façade en verre"
                        .to_string(),
                    "Fractal Design North, Chalk White, mesh partie latérale".to_string(),
                ],
            ),
            ComponentRequest::single(
                "cooler",
                "MSI MAG CoreLiquid A13 240 White refroidissement à eau",
            ),
            ComponentRequest::single(
                "RAM",
                "32 Go DDR5-RAM, Dual Channel (2x 16 Go), 6000 MHz*, Kingston Fury Beast",
            ),
            ComponentRequest::single(
                "PSU",
                "1000 Watt be quiet ! Pure Power 13 M, ATX3.1, 94% d'efficacité, \
                 certifié 80 Plus Gold",
            ),
            ComponentRequest::single(
                "SSD",
                "1000 Go M.2 PCIe 4.0 SSD Western Digital Black SN850X, \
                 lecture/écriture: max. 7300 Mo/s | 6300 Mo/s",
            ),
            ComponentRequest::single(
                "GPU",
                "Gigabyte GeForce RTX 5080, Gigabyte RTX 5080 AORUS Master ICE 16G, \
                 16 Go GDDR7, 1x HDMI, 3x DisplayPort, blanc",
            ),
            ComponentRequest::single("CPU", "AMD Ryzen 7 9800X3D, 8x 4700 MHz"),
            ComponentRequest::single("motherboard", "GIGABYTE X870 AORUS Elite WIFI7 ICE"),
        ]
    }
}
