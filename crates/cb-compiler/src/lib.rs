//! Filter list to Safari content blocker conversion
//!
//! This crate converts AdGuard/uBO-style filter lists into the JSON rule
//! format consumed by Safari's content blocker engine.

pub mod compactor;
pub mod exceptions;
pub mod finalizer;
pub mod parser;
pub mod pipeline;
pub mod translator;

pub use compactor::MAX_SELECTORS_PER_WIDE_RULE;
pub use parser::create_rule;
pub use pipeline::{convert_array, convert_line, ConversionResult, RuleInput};
pub use translator::{translate_css, translate_rule, translate_url};
