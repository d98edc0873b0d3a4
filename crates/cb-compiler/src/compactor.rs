//! Wide CSS rule compaction.
//!
//! Un-scoped hide entries all share the same `.*` trigger, so their
//! selectors can be comma-joined into a handful of combined entries. The
//! batch size bounds what Safari's rule compiler has to chew on per entry.

use cb_core::entry::{Action, ActionType, Entry, Trigger};
use cb_core::regexp::URL_FILTER_CSS_RULES;

/// Maximum number of selectors merged into one wide hide entry.
pub const MAX_SELECTORS_PER_WIDE_RULE: usize = 250;

/// CSS hide entries split by domain scoping, wide entries compacted.
#[derive(Debug, Default)]
pub struct CompactedCssRules {
    /// No domain scope; selectors batched into combined entries.
    pub css_blocking_wide: Vec<Entry>,
    /// `unless-domain` scoped generics.
    pub css_blocking_generic_domain_sensitive: Vec<Entry>,
    /// `if-domain` scoped entries.
    pub css_blocking_domain_sensitive: Vec<Entry>,
}

/// Split hide entries by domain scope and compact the wide ones.
pub fn compact_css_rules(rules: Vec<Entry>) -> CompactedCssRules {
    let mut compacted = CompactedCssRules::default();
    let mut wide_selectors: Vec<String> = Vec::new();

    for entry in rules {
        if entry.trigger.has_if_domain() {
            compacted.css_blocking_domain_sensitive.push(entry);
        } else if entry.trigger.has_unless_domain() {
            compacted.css_blocking_generic_domain_sensitive.push(entry);
        } else if let Some(selector) = entry.action.selector {
            wide_selectors.push(selector);
            if wide_selectors.len() >= MAX_SELECTORS_PER_WIDE_RULE {
                compacted.css_blocking_wide.push(combined_entry(&mut wide_selectors));
            }
        }
    }

    if !wide_selectors.is_empty() {
        compacted.css_blocking_wide.push(combined_entry(&mut wide_selectors));
    }

    compacted
}

fn combined_entry(selectors: &mut Vec<String>) -> Entry {
    let selector = selectors.join(", ");
    selectors.clear();
    Entry {
        trigger: Trigger::new(URL_FILTER_CSS_RULES),
        action: Action {
            action_type: ActionType::CssDisplayNone,
            selector: Some(selector),
        },
    }
}
