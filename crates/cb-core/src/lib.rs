//! Core library for the Safari content blocker converter
//!
//! This crate holds everything both the compiler and the CLI need to agree
//! on: the parsed rule model, the content blocker entry model that
//! serializes to the JSON shape WebKit consumes, domain normalization, and
//! url-filter regex construction with the Safari-specific validation rules.
//!
//! # Modules
//!
//! - `types`: parsed rule model and content-type/option bitmasks
//! - `entry`: content blocker trigger/action entry model
//! - `domain`: punycode normalization and domain extraction from rule text
//! - `regexp`: url-filter construction and Safari regex validation
//! - `error`: per-rule conversion error taxonomy

pub mod domain;
pub mod entry;
pub mod error;
pub mod regexp;
pub mod types;

// Re-export commonly used types
pub use entry::{Action, ActionType, Entry, LoadType, ResourceType, Trigger};
pub use error::ConversionError;
pub use types::{ContentType, CssRule, Rule, RuleOption, UrlRule};
