//! URL filter regex construction and validation.
//!
//! Filter patterns use the ABP mask language (`||`, `|`, `^`, `*`); the
//! content blocker engine wants plain regexes, and a restricted dialect at
//! that. Construction turns a pattern into a regex source; validation rejects
//! the regex features Safari's matcher does not compile.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConversionError;

/// Matches any URL. Kept deliberately simple: the matcher compiles this
/// regex once per rule, so a full scheme alternation would be wasted cost.
pub const URL_FILTER_ANY_URL: &str = "^[htpsw]+:\\/\\/";

/// Matches any websocket URL.
pub const URL_FILTER_WS_ANY_URL: &str = "^wss?:\\/\\/";

/// Any-URL filter installed when a whitelist exception is rewritten to a
/// domain scope. Not the same literal as [`URL_FILTER_ANY_URL`].
pub const URL_FILTER_WHITELIST_ANY_URL: &str = "^[htpsw]:\\/\\/";

/// The fixed url-filter used by every CSS rule. Anything more selective
/// measurably slows down the matcher.
pub const URL_FILTER_CSS_RULES: &str = ".*";

/// Replacement for the `||` host-anchor mask.
pub const URL_FILTER_REGEXP_START_URL: &str = "^[htpsw]+:\\/\\/([a-z0-9-]+\\.)?";

/// Replacement for the `^` separator mask.
pub const URL_FILTER_REGEXP_SEPARATOR: &str = "[/:&?]?";

/// Mask replacements used while building url-filter sources.
///
/// Passed explicitly into construction so a conversion never touches shared
/// state; concurrent conversions see their own configuration.
#[derive(Debug, Clone, Copy)]
pub struct UrlRegexConfig {
    pub start_url: &'static str,
    pub separator: &'static str,
}

impl Default for UrlRegexConfig {
    fn default() -> Self {
        Self {
            start_url: URL_FILTER_REGEXP_START_URL,
            separator: URL_FILTER_REGEXP_SEPARATOR,
        }
    }
}

/// Characters escaped before mask replacement. `*`, `^` and `|` are masks
/// and handled separately.
const SPECIAL_CHARACTERS: &[char] = &[
    '.', '?', '$', '+', '{', '}', '(', ')', '[', ']', '/', '\\',
];

/// Build a url-filter regex source from an ABP URL pattern.
///
/// Escapes regex metacharacters, expands `*` and `^` masks, then rewrites
/// the `||`/`|` anchors. Returns an empty string for an empty pattern; the
/// caller substitutes the any-URL filter.
pub fn create_url_filter_source(pattern: &str, config: &UrlRegexConfig) -> String {
    let mut escaped = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        if SPECIAL_CHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    // Masks first: the anchor replacements below contain `^` and `?`
    // themselves and must not be rewritten.
    let expanded = escaped.replace('*', ".*").replace('^', config.separator);

    let mut regex = if let Some(rest) = expanded.strip_prefix("||") {
        format!("{}{}", config.start_url, rest)
    } else if let Some(rest) = expanded.strip_prefix('|') {
        format!("^{rest}")
    } else {
        expanded
    };

    if let Some(stripped) = regex.strip_suffix('|') {
        regex = format!("{stripped}$");
    }

    regex
}

static RE_QUANTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[0-9,]+\}").unwrap());
static RE_ALTERNATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\\]+\|+\S*").unwrap());
static RE_NON_ASCII: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]").unwrap());
static RE_LOOKAHEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\?!.*\)").unwrap());
static RE_METACHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\\]\\[bBdDfnrsStvwW]").unwrap());

/// Reject url-filter sources using regex features Safari does not support.
pub fn validate_url_filter(source: &str) -> Result<(), ConversionError> {
    let reject = |reason: &str| {
        Err(ConversionError::RegexRejected {
            reason: reason.to_string(),
            pattern: source.to_string(),
        })
    };

    if RE_QUANTIFIER.is_match(source) {
        return reject("Safari doesn't support '{digit}' in regex");
    }
    if RE_ALTERNATION.is_match(source) {
        return reject("Safari doesn't support '|' in regex");
    }
    if RE_NON_ASCII.is_match(source) {
        return reject("Safari doesn't support non-ASCII characters in regex");
    }
    if RE_LOOKAHEAD.is_match(source) {
        return reject("Safari doesn't support negative lookahead in regex");
    }
    if RE_METACHARACTERS.is_match(source) {
        return reject("Safari doesn't support metacharacters in regex");
    }

    Ok(())
}
