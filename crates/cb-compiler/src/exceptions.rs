//! Element-hide exception application.
//!
//! A `#@#` exception does not produce its own output entry. Instead its
//! domains are folded into the hide entries sharing the same selector as
//! `unless-domain` exclusions.

use std::collections::HashMap;

use log::warn;

use cb_core::entry::Entry;
use cb_core::error::ConversionError;

/// Fold exception entries into the hide entries with identical selectors.
///
/// Hide entries that end up with both `if-domain` and `unless-domain` are
/// dropped: the content blocker engine refuses such triggers.
pub fn apply_css_exceptions(
    mut rules: Vec<Entry>,
    exceptions: Vec<Entry>,
    errors: &mut Vec<String>,
) -> Vec<Entry> {
    if exceptions.is_empty() {
        return rules;
    }

    let mut rules_map: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, entry) in rules.iter().enumerate() {
        if let Some(selector) = entry.action.selector.as_deref() {
            rules_map.entry(selector).or_default().push(index);
        }
    }

    let mut applications: Vec<(usize, String)> = Vec::new();
    for exception in &exceptions {
        let Some(selector) = exception.action.selector.as_deref() else {
            continue;
        };
        let Some(indices) = rules_map.get(selector) else {
            continue;
        };
        let Some(domains) = &exception.trigger.if_domain else {
            continue;
        };
        for &index in indices {
            for domain in domains {
                applications.push((index, domain.clone()));
            }
        }
    }
    for (index, domain) in applications {
        push_exception_domain(&domain, &mut rules[index]);
    }

    rules.retain(|entry| {
        if entry.trigger.has_if_domain() && entry.trigger.has_unless_domain() {
            let selector = entry.action.selector.as_deref().unwrap_or_default();
            warn!("dropping hide entry with conflicting domain scopes: {selector}");
            errors.push(format!(
                "Error converting CSS rule with selector \"{selector}\": {}",
                ConversionError::ExceptionApplicationDropped
            ));
            false
        } else {
            true
        }
    });

    rules
}

/// Add one exception domain to a hide entry's `unless-domain`.
///
/// For domain-scoped hide entries the exception only applies when one of the
/// permitted domains occurs inside the exception domain (substring, not
/// subdomain, containment).
fn push_exception_domain(domain: &str, entry: &mut Entry) {
    if domain.is_empty() {
        return;
    }

    if let Some(permitted) = &entry.trigger.if_domain {
        if !permitted.is_empty() {
            let applicable = permitted
                .iter()
                .any(|permitted_domain| domain.contains(permitted_domain.as_str()));
            if !applicable {
                return;
            }
        }
    }

    entry
        .trigger
        .unless_domain
        .get_or_insert_with(Vec::new)
        .push(domain.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::entry::{Action, ActionType, Trigger};

    fn hide(selector: &str, if_domain: Option<Vec<&str>>) -> Entry {
        let mut trigger = Trigger::new(".*");
        trigger.if_domain =
            if_domain.map(|domains| domains.into_iter().map(String::from).collect());
        Entry {
            trigger,
            action: Action::hide(selector),
        }
    }

    fn exception(selector: &str, if_domain: Vec<&str>) -> Entry {
        let mut entry = hide(selector, Some(if_domain));
        entry.action.action_type = ActionType::IgnorePreviousRules;
        entry
    }

    #[test]
    fn moves_exception_domain_to_unless_domain() {
        let mut errors = Vec::new();
        let rules = apply_css_exceptions(
            vec![hide(".banner", None)],
            vec![exception(".banner", vec!["example.com"])],
            &mut errors,
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].trigger.unless_domain,
            Some(vec!["example.com".to_string()])
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn different_selectors_are_untouched() {
        let mut errors = Vec::new();
        let rules = apply_css_exceptions(
            vec![hide(".banner", None)],
            vec![exception(".popup", vec!["example.com"])],
            &mut errors,
        );
        assert_eq!(rules[0].trigger.unless_domain, None);
    }

    #[test]
    fn scoped_hide_accepts_matching_exception_domain() {
        let mut errors = Vec::new();
        let rules = apply_css_exceptions(
            vec![hide(".banner", Some(vec!["example.com"]))],
            vec![exception(".banner", vec!["sub.example.com"])],
            &mut errors,
        );
        // The entry now carries both scopes and is dropped.
        assert!(rules.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn scoped_hide_ignores_unrelated_exception_domain() {
        let mut errors = Vec::new();
        let rules = apply_css_exceptions(
            vec![hide(".banner", Some(vec!["example.com"]))],
            vec![exception(".banner", vec!["other.org"])],
            &mut errors,
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger.unless_domain, None);
        assert!(errors.is_empty());
    }

    #[test]
    fn exception_without_domains_is_a_no_op() {
        let mut errors = Vec::new();
        let mut exc = exception(".banner", vec![]);
        exc.trigger.if_domain = None;
        let rules = apply_css_exceptions(vec![hide(".banner", None)], vec![exc], &mut errors);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger.unless_domain, None);
    }
}
