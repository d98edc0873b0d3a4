//! Filter rule parsing.
//!
//! Turns one line of an AdGuard/uBO-style filter list into the rule model.
//! Comments and rule kinds that can never become content blocker entries
//! are skipped, structurally broken lines are reported as parse errors.

use log::debug;

use cb_core::error::ConversionError;
use cb_core::types::{ContentType, CssRule, Rule, RuleOption, UrlRule};

/// Element-hide markers, most specific first. `@` marks an exception,
/// `?` an extended-CSS selector, `$` a style injection.
const COSMETIC_MARKERS: &[&str] = &[
    "#@$?#", "#$?#", "#@?#", "#@$#", "#?#", "#$#", "#@#", "##",
];

/// Selector fragments that require an extended CSS engine.
const EXTENDED_CSS_FRAGMENTS: &[&str] = &["[-ext-", ":contains(", ":matches-css"];

/// uBO option aliases rewritten into the canonical syntax.
const OPTION_ALIASES: &[(&str, &str)] = &[
    ("1p", "~third-party"),
    ("3p", "third-party"),
    ("xhr", "xmlhttprequest"),
    ("css", "stylesheet"),
    ("frame", "subdocument"),
    ("doc", "document"),
    ("ghide", "generichide"),
    ("ehide", "elemhide"),
];

/// Parse one filter list line.
///
/// Returns `Ok(None)` for comments, blank lines and rule kinds that are
/// skipped wholesale (HTML filters, script injection, content rules);
/// `Err` for lines that look like rules but cannot be parsed.
pub fn create_rule(line: &str) -> Result<Option<Rule>, ConversionError> {
    // Only the end: leading whitespace marks a skipped line.
    let line = line.trim_end();
    if line.trim().is_empty() || line.starts_with(' ') {
        return Ok(None);
    }
    // Artifact of lists assembled from hosts-file sources.
    if line.contains(" - ") {
        return Ok(None);
    }
    if line.starts_with('!') || line.starts_with('[') {
        return Ok(None);
    }
    if line.contains("##^") {
        debug!("ignoring HTML filter: {line}");
        return Ok(None);
    }
    if line.contains("#%#") || line.contains("#@%#") {
        debug!("ignoring script injection rule: {line}");
        return Ok(None);
    }
    if line.contains("$$") || line.contains("$@$") {
        debug!("ignoring content rule: {line}");
        return Ok(None);
    }

    if let Some((marker_index, marker)) = find_cosmetic_marker(line) {
        return parse_css_rule(line, marker_index, marker).map(|rule| Some(Rule::Css(rule)));
    }

    let converted = convert_rule_text(line);
    let text = converted.as_deref().unwrap_or(line);
    parse_url_rule(text, line, converted.clone()).map(|rule| Some(Rule::Url(rule)))
}

/// Rewrite uBO option aliases into the canonical option names.
///
/// Returns `None` when the line is already canonical.
pub fn convert_rule_text(line: &str) -> Option<String> {
    let dollar = line.find('$')?;
    let (pattern, options_text) = (&line[..dollar], &line[dollar + 1..]);

    let mut changed = false;
    let options: Vec<String> = options_text
        .split(',')
        .map(|option| {
            let (negated, name_value) = match option.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, option),
            };
            for (alias, canonical) in OPTION_ALIASES {
                if name_value == *alias {
                    changed = true;
                    return if negated {
                        // `~3p` means first-party; double negation folds away.
                        match canonical.strip_prefix('~') {
                            Some(positive) => positive.to_string(),
                            None => format!("~{canonical}"),
                        }
                    } else {
                        canonical.to_string()
                    };
                }
            }
            option.to_string()
        })
        .collect();

    if !changed {
        return None;
    }
    Some(format!("{pattern}${}", options.join(",")))
}

/// Find the earliest cosmetic marker; on a tie the longest marker wins.
fn find_cosmetic_marker(text: &str) -> Option<(usize, &'static str)> {
    let mut best: Option<(usize, &'static str)> = None;
    for marker in COSMETIC_MARKERS {
        if let Some(index) = text.find(marker) {
            let better = match best {
                Some((best_index, best_marker)) => {
                    index < best_index || (index == best_index && marker.len() > best_marker.len())
                }
                None => true,
            };
            if better {
                best = Some((index, marker));
            }
        }
    }
    best
}

fn parse_css_rule(
    line: &str,
    marker_index: usize,
    marker: &'static str,
) -> Result<CssRule, ConversionError> {
    let domains_part = &line[..marker_index];
    let selector = line[marker_index + marker.len()..].trim();
    if selector.is_empty() {
        return Err(ConversionError::parse(format!("empty CSS selector: {line}")));
    }

    let mut rule = CssRule {
        rule_text: line.to_string(),
        converted_rule_text: None,
        css_selector: selector.to_string(),
        is_whitelist: marker.contains('@'),
        is_inject_rule: marker.contains('$'),
        extended_css: marker.contains('?'),
        permitted_domains: Vec::new(),
        restricted_domains: Vec::new(),
    };

    if !rule.extended_css
        && EXTENDED_CSS_FRAGMENTS
            .iter()
            .any(|fragment| selector.contains(fragment))
    {
        rule.extended_css = true;
    }

    for domain in domains_part.split(',') {
        let domain = domain.trim();
        if domain.is_empty() {
            continue;
        }
        match domain.strip_prefix('~') {
            Some(rest) if !rest.is_empty() => rule.restricted_domains.push(rest.to_string()),
            Some(_) => {}
            None => rule.permitted_domains.push(domain.to_string()),
        }
    }

    Ok(rule)
}

fn parse_url_rule(
    text: &str,
    original: &str,
    converted_rule_text: Option<String>,
) -> Result<UrlRule, ConversionError> {
    let mut rule = UrlRule {
        rule_text: original.to_string(),
        converted_rule_text,
        ..Default::default()
    };

    let mut body = text;
    if let Some(rest) = body.strip_prefix("@@") {
        rule.is_whitelist = true;
        body = rest;
    }

    let (pattern, options_text) = if is_regex_pattern(body) {
        (body, None)
    } else {
        match body.find('$') {
            Some(index) => (&body[..index], Some(&body[index + 1..])),
            None => (body, None),
        }
    };

    if is_regex_pattern(pattern) {
        rule.is_regex_rule = true;
        rule.url_regexp = Some(pattern[1..pattern.len() - 1].to_string());
    }
    // Pattern only: `@@` and `$options` are gone here. Anything deriving a
    // domain from text (a `domain=` clause included) must read `rule_text`.
    rule.url_rule_text = pattern.to_string();

    if let Some(options_text) = options_text {
        parse_options(&mut rule, options_text, pattern)?;
    }

    Ok(rule)
}

fn is_regex_pattern(pattern: &str) -> bool {
    pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/')
}

fn parse_options(
    rule: &mut UrlRule,
    options_text: &str,
    pattern: &str,
) -> Result<(), ConversionError> {
    let mut permitted = ContentType::empty();
    let mut restricted = ContentType::empty();
    let mut kept_options: Vec<&str> = Vec::new();

    for raw in options_text.split(',') {
        let option = raw.trim();
        if option.is_empty() {
            continue;
        }
        if option == "badfilter" {
            rule.is_bad_filter = true;
            continue;
        }
        kept_options.push(raw);

        let (negated, name_value) = match option.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, option),
        };
        let (name, value) = match name_value.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (name_value, None),
        };

        match name {
            "domain" => {
                let value = value
                    .ok_or_else(|| ConversionError::parse(format!("empty $domain option: {pattern}")))?;
                parse_domain_option(rule, value);
            }
            "third-party" => {
                rule.is_check_third_party = true;
                rule.is_third_party = !negated;
            }
            "first-party" => {
                rule.is_check_third_party = true;
                rule.is_third_party = negated;
            }
            "match-case" => rule.is_match_case = !negated,
            "important" => rule.is_important = true,
            "popup" => rule.is_block_popups = true,
            "csp" => rule.is_csp = true,
            "replace" => rule.replace = Some(value.unwrap_or_default().to_string()),
            "document" => {
                if rule.is_whitelist {
                    rule.enabled_options |= RuleOption::DOCUMENT;
                } else if negated {
                    restricted |= ContentType::SUBDOCUMENT;
                } else {
                    permitted |= ContentType::SUBDOCUMENT;
                }
            }
            _ => {
                if let Some(option_flag) = RuleOption::from_option_name(name) {
                    rule.enabled_options |= option_flag;
                } else if let Some(content_type) = ContentType::from_option_name(name) {
                    if negated {
                        restricted |= content_type;
                    } else {
                        permitted |= content_type;
                    }
                } else {
                    return Err(ConversionError::parse(format!("unknown rule option '{name}'")));
                }
            }
        }
    }

    if !permitted.is_empty() {
        rule.permitted_content_type = permitted & !restricted;
    } else if !restricted.is_empty() {
        rule.permitted_content_type = ContentType::ALL & !restricted;
    }
    rule.restricted_content_type = restricted;

    if rule.permitted_content_type.is_empty() {
        return Err(ConversionError::parse(format!(
            "rule permits no content types: {pattern}"
        )));
    }

    if rule.is_bad_filter {
        let prefix = if rule.is_whitelist { "@@" } else { "" };
        rule.bad_filter = Some(if kept_options.is_empty() {
            format!("{prefix}{pattern}")
        } else {
            format!("{prefix}{pattern}${}", kept_options.join(","))
        });
    }

    Ok(())
}

fn parse_domain_option(rule: &mut UrlRule, value: &str) {
    for domain in value.split('|') {
        let domain = domain.trim();
        if domain.is_empty() {
            continue;
        }
        match domain.strip_prefix('~') {
            Some(rest) if !rest.is_empty() => rule.restricted_domains.push(rest.to_string()),
            Some(_) => {}
            None => rule.permitted_domains.push(domain.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_rule(line: &str) -> UrlRule {
        match create_rule(line).unwrap().unwrap() {
            Rule::Url(rule) => rule,
            other => panic!("expected url rule, got {other:?}"),
        }
    }

    fn css_rule(line: &str) -> CssRule {
        match create_rule(line).unwrap().unwrap() {
            Rule::Css(rule) => rule,
            other => panic!("expected css rule, got {other:?}"),
        }
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        assert!(create_rule("! comment").unwrap().is_none());
        assert!(create_rule("[Adblock Plus 2.0]").unwrap().is_none());
        assert!(create_rule("").unwrap().is_none());
        assert!(create_rule("   ").unwrap().is_none());
        assert!(create_rule(" leading space").unwrap().is_none());
        assert!(create_rule("ads - trackers").unwrap().is_none());
    }

    #[test]
    fn skips_unsupported_rule_kinds() {
        assert!(create_rule("example.com##^script:has-text(ads)").unwrap().is_none());
        assert!(create_rule("example.com#%#window.ads = false;").unwrap().is_none());
        assert!(create_rule("example.com#%#//scriptlet('abort-on-property-read', 'ads')")
            .unwrap()
            .is_none());
        assert!(create_rule("example.com$$script[data-src]").unwrap().is_none());
        assert!(create_rule("example.com$@$script[data-src]").unwrap().is_none());
    }

    #[test]
    fn parses_generic_elemhide() {
        let rule = css_rule("##.banner");
        assert_eq!(rule.css_selector, ".banner");
        assert!(!rule.is_whitelist);
        assert!(rule.permitted_domains.is_empty());
    }

    #[test]
    fn parses_domain_scoped_elemhide() {
        let rule = css_rule("example.com,~sub.example.com##.banner");
        assert_eq!(rule.permitted_domains, vec!["example.com"]);
        assert_eq!(rule.restricted_domains, vec!["sub.example.com"]);
    }

    #[test]
    fn parses_elemhide_exception() {
        let rule = css_rule("example.com#@#.banner");
        assert!(rule.is_whitelist);
        assert_eq!(rule.css_selector, ".banner");
    }

    #[test]
    fn flags_extended_css_and_inject_rules() {
        assert!(css_rule("example.com#?#.banner:has(.ad)").extended_css);
        assert!(css_rule("example.com##.banner:contains(sponsored)").extended_css);
        assert!(css_rule("example.com#$#.banner { display: none!important; }").is_inject_rule);
    }

    #[test]
    fn rejects_empty_selector() {
        assert!(create_rule("example.com##").is_err());
    }

    #[test]
    fn parses_basic_url_rule() {
        let rule = url_rule("||example.com^");
        assert_eq!(rule.url_rule_text, "||example.com^");
        assert_eq!(rule.permitted_content_type, ContentType::ALL);
        assert!(!rule.is_whitelist);
    }

    #[test]
    fn parses_whitelist_and_options() {
        let rule = url_rule("@@||example.com^$script,third-party,match-case,important");
        assert!(rule.is_whitelist);
        assert_eq!(rule.permitted_content_type, ContentType::SCRIPT);
        assert!(rule.is_check_third_party);
        assert!(rule.is_third_party);
        assert!(rule.is_match_case);
        assert!(rule.is_important);
    }

    #[test]
    fn negated_content_types_restrict() {
        let rule = url_rule("||example.com^$~image");
        assert_eq!(
            rule.permitted_content_type,
            ContentType::ALL & !ContentType::IMAGE
        );
        assert_eq!(rule.restricted_content_type, ContentType::IMAGE);
    }

    #[test]
    fn first_party_option_flips_load_type() {
        let rule = url_rule("||example.com^$first-party");
        assert!(rule.is_check_third_party);
        assert!(!rule.is_third_party);

        let rule = url_rule("||example.com^$~third-party");
        assert!(rule.is_check_third_party);
        assert!(!rule.is_third_party);
    }

    #[test]
    fn parses_domain_option() {
        let rule = url_rule("||example.com^$domain=a.com|~b.com");
        assert_eq!(rule.permitted_domains, vec!["a.com"]);
        assert_eq!(rule.restricted_domains, vec!["b.com"]);
    }

    #[test]
    fn parses_regex_rule() {
        let rule = url_rule("/banner[0-9]+/");
        assert!(rule.is_regex_rule);
        assert_eq!(rule.url_regexp.as_deref(), Some("banner[0-9]+"));
    }

    #[test]
    fn badfilter_records_cancelled_text() {
        let rule = url_rule("||example.com^$badfilter");
        assert!(rule.is_bad_filter);
        assert_eq!(rule.bad_filter.as_deref(), Some("||example.com^"));

        let rule = url_rule("||example.com^$script,badfilter");
        assert_eq!(rule.bad_filter.as_deref(), Some("||example.com^$script"));

        let rule = url_rule("@@||example.com^$badfilter,image");
        assert_eq!(rule.bad_filter.as_deref(), Some("@@||example.com^$image"));
    }

    #[test]
    fn document_whitelist_sets_option_group() {
        let rule = url_rule("@@||example.com^$document");
        assert!(rule.is_document_whitelist());
    }

    #[test]
    fn document_on_blocking_rule_is_a_content_type() {
        let rule = url_rule("||example.com^$document");
        assert_eq!(rule.permitted_content_type, ContentType::SUBDOCUMENT);
        assert!(!rule.is_document_whitelist());
    }

    #[test]
    fn unknown_option_is_an_error() {
        assert!(create_rule("||example.com^$websocketz").is_err());
    }

    #[test]
    fn contradictory_content_types_are_an_error() {
        assert!(create_rule("||example.com^$script,~script").is_err());
    }

    #[test]
    fn rewrites_ubo_aliases() {
        assert_eq!(
            convert_rule_text("||example.com^$3p,xhr"),
            Some("||example.com^$third-party,xmlhttprequest".to_string())
        );
        assert_eq!(
            convert_rule_text("||example.com^$~3p"),
            Some("||example.com^$~third-party".to_string())
        );
        assert_eq!(
            convert_rule_text("@@||example.com^$ghide"),
            Some("@@||example.com^$generichide".to_string())
        );
        assert_eq!(convert_rule_text("||example.com^$script"), None);
    }

    #[test]
    fn converted_rule_text_is_recorded() {
        let rule = url_rule("||example.com^$1p");
        assert_eq!(
            rule.converted_rule_text.as_deref(),
            Some("||example.com^$~third-party")
        );
        assert!(rule.is_check_third_party);
        assert!(!rule.is_third_party);
        assert_eq!(rule.rule_text, "||example.com^$1p");
    }
}
