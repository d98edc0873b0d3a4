//! Output finalization.
//!
//! The last steps before serialization: enforce the domain scope invariant,
//! wildcard-prefix every domain so subdomains match, cap the entry count and
//! render tab-indented JSON.

use log::warn;
use serde::Serialize;

use cb_core::entry::Entry;
use cb_core::error::ConversionError;

/// Drop entries carrying both `if-domain` and `unless-domain`.
///
/// Translation never produces such entries on its own, but pre-parsed rules
/// fed directly into the pipeline can.
pub fn drop_conflicting_domain_scopes(entries: Vec<Entry>, errors: &mut Vec<String>) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|entry| {
            if entry.trigger.has_if_domain() && entry.trigger.has_unless_domain() {
                warn!(
                    "dropping entry with both if-domain and unless-domain: {}",
                    entry.trigger.url_filter
                );
                errors.push(format!(
                    "Error in entry \"{}\": {}",
                    entry.trigger.url_filter,
                    ConversionError::DomainScopeConflict
                ));
                false
            } else {
                true
            }
        })
        .collect()
}

/// Prefix every `if-domain`/`unless-domain` value with `*`.
///
/// Content blocker domain triggers match exact hosts; the wildcard makes
/// them cover subdomains the way filter list domains do.
pub fn apply_domain_wildcards(entries: &mut [Entry]) {
    for entry in entries {
        if let Some(domains) = &mut entry.trigger.if_domain {
            wildcard_domains(domains);
        }
        if let Some(domains) = &mut entry.trigger.unless_domain {
            wildcard_domains(domains);
        }
    }
}

fn wildcard_domains(domains: &mut [String]) {
    for domain in domains {
        if !domain.starts_with('*') {
            *domain = format!("*{domain}");
        }
    }
}

/// Truncate to `limit` entries when a positive limit is given.
///
/// Returns true when entries were cut off.
pub fn enforce_limit(entries: &mut Vec<Entry>, limit: usize, errors: &mut Vec<String>) -> bool {
    if limit == 0 || entries.len() <= limit {
        return false;
    }
    warn!("rule limit reached: {} of {} entries kept", limit, entries.len());
    errors.push(format!("{limit} limit is achieved. Next rules will be ignored."));
    entries.truncate(limit);
    true
}

/// Serialize entries as tab-indented JSON.
pub fn serialize_entries(entries: &[Entry], errors: &mut Vec<String>) -> String {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

    if let Err(error) = entries.serialize(&mut serializer) {
        errors.push(format!("Error serializing entries: {error}"));
        return "[]".to_string();
    }

    match String::from_utf8(buffer) {
        Ok(json) => json,
        Err(error) => {
            errors.push(format!("Error serializing entries: {error}"));
            "[]".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::entry::{Action, Trigger};

    fn entry(if_domain: Option<Vec<&str>>, unless_domain: Option<Vec<&str>>) -> Entry {
        let mut trigger = Trigger::new(".*");
        trigger.if_domain = if_domain.map(|d| d.into_iter().map(String::from).collect());
        trigger.unless_domain = unless_domain.map(|d| d.into_iter().map(String::from).collect());
        Entry {
            trigger,
            action: Action::block(),
        }
    }

    #[test]
    fn conflicting_scopes_are_dropped_with_an_error() {
        let mut errors = Vec::new();
        let kept = drop_conflicting_domain_scopes(
            vec![
                entry(Some(vec!["a.com"]), Some(vec!["b.com"])),
                entry(Some(vec!["a.com"]), None),
            ],
            &mut errors,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn wildcards_are_applied_once() {
        let mut entries = vec![entry(Some(vec!["a.com", "*b.com"]), None)];
        apply_domain_wildcards(&mut entries);
        assert_eq!(
            entries[0].trigger.if_domain,
            Some(vec!["*a.com".to_string(), "*b.com".to_string()])
        );
    }

    #[test]
    fn limit_truncates_and_reports() {
        let mut entries = vec![entry(None, None), entry(None, None), entry(None, None)];
        let mut errors = Vec::new();
        let over = enforce_limit(&mut entries, 2, &mut errors);
        assert!(over);
        assert_eq!(entries.len(), 2);
        assert_eq!(errors, vec!["2 limit is achieved. Next rules will be ignored."]);
    }

    #[test]
    fn zero_limit_disables_the_cap() {
        let mut entries = vec![entry(None, None)];
        let mut errors = Vec::new();
        assert!(!enforce_limit(&mut entries, 0, &mut errors));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn serializes_with_tab_indentation() {
        let mut errors = Vec::new();
        let json = serialize_entries(&[entry(None, None)], &mut errors);
        assert!(json.starts_with("[\n\t{\n\t\t\"trigger\""));
        assert!(errors.is_empty());
    }
}
