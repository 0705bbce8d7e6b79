// src/site/mod.rs

//! Site adapter boundary.
//!
//! Everything the application engine needs from a live configurator page is
//! behind [`SiteAdapter`]. The production implementation drives a Chrome
//! page over the DevTools protocol (`browser` feature); tests plug in an
//! in-memory fake.

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;

use crate::engine::matcher::ItemMatcher;
use crate::error::Result;
use crate::models::{CatalogItem, CatalogQuery};

#[cfg(feature = "browser")]
pub use browser::{BrowserSession, DomConfigurator, WaitSettings};

/// Capability contract between the application engine and a target site.
///
/// Catalog snapshots are eager and go stale as soon as any item is clicked;
/// the engine re-queries instead of caching enablement across clicks. The
/// engine is the only writer, one click in flight at a time.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Profile name, for logging.
    fn site_name(&self) -> &str;

    /// URL of the page being configured.
    fn page_url(&self) -> String;

    /// Matcher configured with this site's title extraction rule.
    fn matcher(&self) -> &ItemMatcher;

    /// Reveal all collapsed option groups so catalog queries see the full
    /// option set.
    async fn expand_groups(&self) -> Result<()>;

    /// Snapshot the currently rendered options.
    async fn list_options(&self, query: CatalogQuery) -> Result<Vec<CatalogItem>>;

    /// Click an item and await the site's settle condition.
    ///
    /// Returns `false` when the click was not accepted: the item is
    /// disabled at click time, or a blocking confirmation dialog appeared
    /// (the adapter dismisses dialogs itself and reports the click as
    /// rejected). Errors are reserved for transport failures.
    async fn click_item(&self, item: &CatalogItem) -> Result<bool>;

    /// The page's total price text, if the price element is present.
    async fn price_text(&self) -> Result<Option<String>>;

    /// Scroll the price into view. Convenience only; failures are ignored
    /// by the engine.
    async fn scroll_to_price(&self) -> Result<()>;
}
