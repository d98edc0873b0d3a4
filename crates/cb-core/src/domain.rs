//! Domain normalization and extraction.
//!
//! Safari requires `if-domain`/`unless-domain` values to be lowercase ASCII,
//! so internationalized domains go through punycode. Domain extraction from
//! rule text is used when rewriting whitelist exceptions into
//! `ignore-previous-rules` entries scoped to a domain.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

/// Shape check for extracted domains: label characters, at least one dot,
/// a two-letter-or-longer TLD.
static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-.]*[a-zA-Z0-9]\.[a-zA-Z-]{2,}$").unwrap());

/// Prefixes stripped before extracting a domain from rule text.
const DOMAIN_PREFIXES: &[&str] = &[
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "||",
    "//",
];

/// Lowercase a domain and encode it as punycode.
///
/// Falls back to the lowercased input when IDNA conversion fails; a broken
/// domain in a filter list should not take down the rest of the conversion.
pub fn to_punycode(domain: &str) -> String {
    let lower = domain.to_lowercase();
    if lower.is_ascii() {
        return lower;
    }
    match idna::domain_to_ascii(&lower) {
        Ok(ascii) => ascii,
        Err(_) => {
            warn!("cannot encode domain as punycode: {domain}");
            lower
        }
    }
}

/// A domain extracted from rule text, with whatever followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDomain {
    /// Lowercase punycode domain.
    pub domain: String,
    /// Text from the terminating `/` or `^` to the end, `None` when the
    /// domain runs to the end of the text.
    pub path: Option<String>,
}

/// Extract the domain a rule applies to from its full rule text.
///
/// Strips the `@@` exception mask and a known scheme/mask prefix, or starts
/// after a `domain=` clause when the text carries modifiers, then reads up
/// to the first `/` (or, failing that, `^`). Modifiers are never part of the
/// domain or path. Returns `None` when the remaining text does not look like
/// a plain registrable domain.
pub fn parse_rule_domain(rule_text: &str) -> Option<ParsedDomain> {
    let rule_text = rule_text.strip_prefix("@@").unwrap_or(rule_text);

    let mut start_index = 0;
    for prefix in DOMAIN_PREFIXES {
        if rule_text.starts_with(prefix) {
            start_index = prefix.len();
            break;
        }
    }

    // A domain= modifier overrides the pattern as the domain source.
    if rule_text.contains('$') {
        if let Some(domain_index) = rule_text.find("domain=") {
            start_index = domain_index + "domain=".len();
        }
    }

    let rest = &rule_text[start_index..];
    let rest = match rest.find('$') {
        Some(options_index) => &rest[..options_index],
        None => rest,
    };
    let terminator = rest.find('/').or_else(|| rest.find('^'));

    let (domain, path) = match terminator {
        Some(index) => (&rest[..index], Some(rest[index..].to_string())),
        None => (rest, None),
    };

    if !DOMAIN_RE.is_match(domain) {
        return None;
    }

    Some(ParsedDomain {
        domain: to_punycode(domain),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punycode_passes_ascii_through() {
        assert_eq!(to_punycode("Example.COM"), "example.com");
    }

    #[test]
    fn punycode_encodes_unicode() {
        assert_eq!(to_punycode("почта.рф"), "xn--80a1acny.xn--p1ai");
    }

    #[test]
    fn parses_host_anchor_rule() {
        let parsed = parse_rule_domain("||example.com^").unwrap();
        assert_eq!(parsed.domain, "example.com");
        assert_eq!(parsed.path.as_deref(), Some("^"));
    }

    #[test]
    fn parses_scheme_prefixed_rule() {
        let parsed = parse_rule_domain("https://www.example.com/banner").unwrap();
        assert_eq!(parsed.domain, "example.com");
        assert_eq!(parsed.path.as_deref(), Some("/banner"));
    }

    #[test]
    fn parses_domain_without_terminator() {
        let parsed = parse_rule_domain("||tracker.example.org").unwrap();
        assert_eq!(parsed.domain, "tracker.example.org");
        assert_eq!(parsed.path, None);
    }

    #[test]
    fn prefers_domain_modifier_when_present() {
        let parsed = parse_rule_domain("@@||*$document,domain=example.com").unwrap();
        assert_eq!(parsed.domain, "example.com");
        assert_eq!(parsed.path, None);
    }

    #[test]
    fn strips_exception_mask() {
        let parsed = parse_rule_domain("@@||example.com^$document").unwrap();
        assert_eq!(parsed.domain, "example.com");
        assert_eq!(parsed.path.as_deref(), Some("^"));
    }

    #[test]
    fn modifiers_are_not_part_of_domain_or_path() {
        let parsed = parse_rule_domain("||example.org$urlblock").unwrap();
        assert_eq!(parsed.domain, "example.org");
        assert_eq!(parsed.path, None);

        let parsed = parse_rule_domain("||example.com/page$urlblock").unwrap();
        assert_eq!(parsed.path.as_deref(), Some("/page"));
    }

    #[test]
    fn rejects_non_domain_text() {
        assert_eq!(parse_rule_domain("/banner/*"), None);
        assert_eq!(parse_rule_domain("||*"), None);
        assert_eq!(parse_rule_domain(""), None);
    }

    #[test]
    fn slash_terminator_wins_over_caret() {
        let parsed = parse_rule_domain("||example.com/path^").unwrap();
        assert_eq!(parsed.domain, "example.com");
        assert_eq!(parsed.path.as_deref(), Some("/path^"));
    }
}
