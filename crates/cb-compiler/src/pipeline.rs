//! Conversion pipeline.
//!
//! Drives a whole filter list through parsing, translation, categorization,
//! exception application, compaction and finalization. Per-rule failures are
//! recorded and never abort the run; the output is always a well-formed
//! content blocker list.

use std::collections::HashSet;

use log::{info, warn};

use cb_core::entry::{ActionType, Entry};
use cb_core::error::ConversionError;
use cb_core::regexp::UrlRegexConfig;
use cb_core::types::{Rule, RuleOption};

use crate::compactor::compact_css_rules;
use crate::exceptions::apply_css_exceptions;
use crate::finalizer::{
    apply_domain_wildcards, drop_conflicting_domain_scopes, enforce_limit, serialize_entries,
};
use crate::parser::create_rule;
use crate::translator::translate_rule;

/// One element of a conversion request: a raw filter list line, or a rule
/// that was already parsed elsewhere.
#[derive(Debug, Clone)]
pub enum RuleInput {
    Line(String),
    Rule(Rule),
}

impl From<&str> for RuleInput {
    fn from(line: &str) -> Self {
        RuleInput::Line(line.to_string())
    }
}

/// Result of converting a filter list.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Entry count before the limit was applied.
    pub total_converted_count: usize,
    /// Entry count actually serialized.
    pub converted_count: usize,
    pub errors_count: usize,
    /// True iff the limit truncated the output.
    pub over_limit: bool,
    /// The serialized content blocker JSON.
    pub converted: String,
    /// Human-readable error lines, in encounter order.
    pub errors: Vec<String>,
}

/// Translated entries grouped into categories.
///
/// The emission order of these categories is the precedence order Safari
/// applies rules in; `into_ordered_entries` must not be reordered.
#[derive(Debug, Default)]
struct ContentBlockerBuckets {
    css_blocking_wide: Vec<Entry>,
    css_blocking_generic_domain_sensitive: Vec<Entry>,
    css_blocking_generic_hide_exceptions: Vec<Entry>,
    css_blocking_domain_sensitive: Vec<Entry>,
    css_elemhide: Vec<Entry>,
    url_blocking: Vec<Entry>,
    other: Vec<Entry>,
    important: Vec<Entry>,
    important_exceptions: Vec<Entry>,
    document_exceptions: Vec<Entry>,
    errors: Vec<String>,
}

impl ContentBlockerBuckets {
    fn into_ordered_entries(self) -> (Vec<Entry>, Vec<String>) {
        let mut entries = Vec::new();
        entries.extend(self.css_blocking_wide);
        entries.extend(self.css_blocking_generic_domain_sensitive);
        entries.extend(self.css_blocking_generic_hide_exceptions);
        entries.extend(self.css_blocking_domain_sensitive);
        entries.extend(self.css_elemhide);
        entries.extend(self.url_blocking);
        entries.extend(self.other);
        entries.extend(self.important);
        entries.extend(self.important_exceptions);
        entries.extend(self.document_exceptions);
        (entries, self.errors)
    }
}

/// Convert a filter list into content blocker JSON.
///
/// `limit` caps the number of emitted entries (0 disables the cap),
/// `optimize` discards wide generic CSS rules.
pub fn convert_array(inputs: Vec<RuleInput>, limit: usize, optimize: bool) -> ConversionResult {
    let config = UrlRegexConfig::default();
    let mut buckets = ContentBlockerBuckets::default();

    let mut rules: Vec<Rule> = Vec::new();
    for input in inputs {
        match input {
            RuleInput::Rule(rule) => rules.push(rule),
            RuleInput::Line(line) => match create_rule(&line) {
                Ok(Some(rule)) => rules.push(rule),
                Ok(None) => {}
                Err(error) => record_error(&mut buckets.errors, &line, &error),
            },
        }
    }

    // $badfilter rules are not translated; they cancel rules by text.
    let mut bad_filter_exceptions: HashSet<String> = HashSet::new();
    let mut ag_rules: Vec<Rule> = Vec::new();
    for rule in rules {
        if rule.is_bad_filter() {
            if let Some(cancelled) = rule.bad_filter() {
                bad_filter_exceptions.insert(cancelled.to_string());
            }
        } else {
            ag_rules.push(rule);
        }
    }

    let mut css_blocking: Vec<Entry> = Vec::new();
    let mut css_exceptions: Vec<Entry> = Vec::new();

    for rule in &ag_rules {
        if bad_filter_exceptions.contains(rule.rule_text()) {
            info!("rule cancelled by badfilter: {}", rule.rule_text());
            continue;
        }
        match translate_rule(rule, &config) {
            Ok(entry) => route_entry(
                rule,
                entry,
                &mut buckets,
                &mut css_blocking,
                &mut css_exceptions,
            ),
            Err(error) => record_error(&mut buckets.errors, rule.rule_text(), &error),
        }
    }

    let css_blocking = apply_css_exceptions(css_blocking, css_exceptions, &mut buckets.errors);
    let compacted = compact_css_rules(css_blocking);
    if optimize {
        info!(
            "optimization discarded {} wide generic CSS entries",
            compacted.css_blocking_wide.len()
        );
    } else {
        buckets.css_blocking_wide = compacted.css_blocking_wide;
    }
    buckets.css_blocking_generic_domain_sensitive = compacted.css_blocking_generic_domain_sensitive;
    buckets.css_blocking_domain_sensitive = compacted.css_blocking_domain_sensitive;

    let (entries, mut errors) = buckets.into_ordered_entries();
    let mut entries = drop_conflicting_domain_scopes(entries, &mut errors);
    apply_domain_wildcards(&mut entries);

    let total_converted_count = entries.len();
    let over_limit = enforce_limit(&mut entries, limit, &mut errors);
    let converted = serialize_entries(&entries, &mut errors);

    ConversionResult {
        total_converted_count,
        converted_count: entries.len(),
        errors_count: errors.len(),
        over_limit,
        converted,
        errors,
    }
}

/// Convert a single rule line; errors are appended to `errors`.
pub fn convert_line(line: &str, errors: &mut Vec<String>) -> Option<Entry> {
    let config = UrlRegexConfig::default();
    match create_rule(line) {
        Ok(Some(rule)) => match translate_rule(&rule, &config) {
            Ok(entry) => Some(entry),
            Err(error) => {
                record_error(errors, rule.rule_text(), &error);
                None
            }
        },
        Ok(None) => None,
        Err(error) => {
            record_error(errors, line, &error);
            None
        }
    }
}

fn record_error(errors: &mut Vec<String>, rule_text: &str, error: &ConversionError) {
    warn!("cannot convert rule \"{rule_text}\": {error}");
    errors.push(format!("Error converting rule \"{rule_text}\": {error}"));
}

/// Place a translated entry into its category, first match wins.
fn route_entry(
    rule: &Rule,
    entry: Entry,
    buckets: &mut ContentBlockerBuckets,
    css_blocking: &mut Vec<Entry>,
    css_exceptions: &mut Vec<Entry>,
) {
    match entry.action.action_type {
        ActionType::Block => {
            if rule.is_important() {
                buckets.important.push(entry);
            } else {
                buckets.url_blocking.push(entry);
            }
        }
        ActionType::CssDisplayNone => css_blocking.push(entry),
        ActionType::IgnorePreviousRules => {
            let has_selector = entry
                .action
                .selector
                .as_deref()
                .is_some_and(|selector| !selector.is_empty());
            if has_selector {
                css_exceptions.push(entry);
            } else if rule.is_single_option(RuleOption::GENERICHIDE) {
                buckets.css_blocking_generic_hide_exceptions.push(entry);
            } else if rule.is_single_option(RuleOption::ELEMHIDE) {
                buckets.css_elemhide.push(entry);
            } else if rule.is_important() {
                buckets.important_exceptions.push(entry);
            } else if rule.is_document_whitelist() {
                buckets.document_exceptions.push(entry);
            } else {
                buckets.other.push(entry);
            }
        }
    }
}
