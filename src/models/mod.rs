// src/models/mod.rs

//! Domain models for the configurator application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod desired;
mod profile;
mod result;

// Re-export all public types
pub use catalog::{CatalogItem, CatalogQuery, ItemId};
pub use desired::{ComponentRequest, DesiredConfiguration};
pub use profile::{
    AccordionRule, ClickRule, CookieBannerRule, DialogRule, SiteKind, SiteProfile, TitleRule,
};
pub use result::{AppliedComponent, ConfigurationReport, ConfigurationResult, parse_price};
