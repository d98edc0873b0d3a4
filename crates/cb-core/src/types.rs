//! Core type definitions for the converter
//!
//! These types model parsed filter rules as they come out of the rule
//! builder and are consumed by the translator.

// =============================================================================
// Content Types (bit mask for request type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Request content type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContentType: u32 {
        const IMAGE = 1 << 0;
        const STYLESHEET = 1 << 1;
        const SCRIPT = 1 << 2;
        const MEDIA = 1 << 3;
        const XMLHTTPREQUEST = 1 << 4;
        const OTHER = 1 << 5;
        const WEBSOCKET = 1 << 6;
        const FONT = 1 << 7;
        const SUBDOCUMENT = 1 << 8;
        const OBJECT = 1 << 9;
        const OBJECT_SUBREQUEST = 1 << 10;
        const WEBRTC = 1 << 11;

        /// All content types.
        const ALL = 0xFFF;
    }
}

impl ContentType {
    /// Parse from a filter rule option name.
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Self::IMAGE),
            "stylesheet" => Some(Self::STYLESHEET),
            "script" => Some(Self::SCRIPT),
            "media" => Some(Self::MEDIA),
            "xmlhttprequest" => Some(Self::XMLHTTPREQUEST),
            "other" => Some(Self::OTHER),
            "websocket" => Some(Self::WEBSOCKET),
            "font" => Some(Self::FONT),
            "subdocument" => Some(Self::SUBDOCUMENT),
            "object" => Some(Self::OBJECT),
            "object-subrequest" => Some(Self::OBJECT_SUBREQUEST),
            "webrtc" => Some(Self::WEBRTC),
            "all" => Some(Self::ALL),
            _ => None,
        }
    }
}

// =============================================================================
// Rule Options (bit flags for exception behavior)
// =============================================================================

bitflags::bitflags! {
    /// Exception rule option bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleOption: u32 {
        /// $jsinject - disables script injection
        const JSINJECT = 1 << 0;
        /// $urlblock - disables URL blocking on matching pages
        const URLBLOCK = 1 << 1;
        /// $genericblock - disables generic URL blocking
        const GENERICBLOCK = 1 << 2;
        /// $generichide - disables generic element hiding
        const GENERICHIDE = 1 << 3;
        /// $elemhide - disables all element hiding
        const ELEMHIDE = 1 << 4;

        /// Option set implied by a $document whitelist rule.
        const DOCUMENT = Self::JSINJECT.bits() | Self::URLBLOCK.bits() | Self::ELEMHIDE.bits();
    }
}

impl RuleOption {
    /// Parse from a filter rule option name.
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name {
            "jsinject" => Some(Self::JSINJECT),
            "urlblock" => Some(Self::URLBLOCK),
            "genericblock" => Some(Self::GENERICBLOCK),
            "generichide" => Some(Self::GENERICHIDE),
            "elemhide" => Some(Self::ELEMHIDE),
            _ => None,
        }
    }
}

// =============================================================================
// Rule Model
// =============================================================================

/// A parsed filter rule.
///
/// Only `Url` and `Css` rules can be translated to content blocker entries;
/// the remaining kinds exist so that callers feeding pre-parsed rules into
/// the pipeline get a precise "unsupported" error instead of a panic.
#[derive(Debug, Clone)]
pub enum Rule {
    Url(UrlRule),
    Css(CssRule),
    Script(ScriptRule),
    Scriptlet(ScriptletRule),
    Composite(CompositeRule),
}

impl Rule {
    /// Original rule text.
    pub fn rule_text(&self) -> &str {
        match self {
            Rule::Url(rule) => &rule.rule_text,
            Rule::Css(rule) => &rule.rule_text,
            Rule::Script(rule) => &rule.rule_text,
            Rule::Scriptlet(rule) => &rule.rule_text,
            Rule::Composite(rule) => &rule.rule_text,
        }
    }

    pub fn is_whitelist(&self) -> bool {
        match self {
            Rule::Url(rule) => rule.is_whitelist,
            Rule::Css(rule) => rule.is_whitelist,
            _ => false,
        }
    }

    pub fn is_important(&self) -> bool {
        match self {
            Rule::Url(rule) => rule.is_important,
            _ => false,
        }
    }

    pub fn is_bad_filter(&self) -> bool {
        match self {
            Rule::Url(rule) => rule.is_bad_filter,
            _ => false,
        }
    }

    /// The filter text this rule cancels, for `$badfilter` rules.
    pub fn bad_filter(&self) -> Option<&str> {
        match self {
            Rule::Url(rule) => rule.bad_filter.as_deref(),
            _ => None,
        }
    }

    pub fn is_document_whitelist(&self) -> bool {
        match self {
            Rule::Url(rule) => rule.is_document_whitelist(),
            _ => false,
        }
    }

    /// True iff this is a URL rule whose enabled options equal `option` exactly.
    pub fn is_single_option(&self, option: RuleOption) -> bool {
        match self {
            Rule::Url(rule) => rule.is_single_option(option),
            _ => false,
        }
    }
}

/// A request-blocking (or request-whitelisting) rule.
///
/// `Default` yields a rule permitting every content type with nothing
/// restricted, matching an option-less filter line.
#[derive(Debug, Clone)]
pub struct UrlRule {
    pub rule_text: String,
    /// Rewritten rule text when dialect normalization changed it.
    pub converted_rule_text: Option<String>,
    /// The URL pattern part: no `@@` prefix, no `$options` suffix. May be
    /// empty, `*`, `|*` or `||*` for match-anything rules. Domain extraction
    /// from text goes through `rule_text`, which keeps the `domain=` clause.
    pub url_rule_text: String,
    /// Regex source for `/.../` rules, used verbatim as the url-filter.
    pub url_regexp: Option<String>,
    pub is_regex_rule: bool,
    pub is_whitelist: bool,
    pub is_important: bool,
    pub is_bad_filter: bool,
    /// The filter text this rule cancels, set for `$badfilter` rules.
    pub bad_filter: Option<String>,
    pub permitted_content_type: ContentType,
    pub restricted_content_type: ContentType,
    pub enabled_options: RuleOption,
    pub is_third_party: bool,
    pub is_check_third_party: bool,
    pub is_match_case: bool,
    pub is_block_popups: bool,
    pub is_csp: bool,
    pub replace: Option<String>,
    pub permitted_domains: Vec<String>,
    pub restricted_domains: Vec<String>,
}

impl Default for UrlRule {
    fn default() -> Self {
        Self {
            rule_text: String::new(),
            converted_rule_text: None,
            url_rule_text: String::new(),
            url_regexp: None,
            is_regex_rule: false,
            is_whitelist: false,
            is_important: false,
            is_bad_filter: false,
            bad_filter: None,
            permitted_content_type: ContentType::ALL,
            restricted_content_type: ContentType::empty(),
            enabled_options: RuleOption::empty(),
            is_third_party: false,
            is_check_third_party: false,
            is_match_case: false,
            is_block_popups: false,
            is_csp: false,
            replace: None,
            permitted_domains: Vec::new(),
            restricted_domains: Vec::new(),
        }
    }
}

impl UrlRule {
    /// A `@@...$document` whitelist disabling all filtering on a page.
    pub fn is_document_whitelist(&self) -> bool {
        self.is_whitelist && self.enabled_options == RuleOption::DOCUMENT
    }

    /// True iff the enabled options equal `option` exactly (not a subset check).
    pub fn is_single_option(&self, option: RuleOption) -> bool {
        self.enabled_options == option
    }
}

/// An element-hide rule (`##selector` and friends).
#[derive(Debug, Clone, Default)]
pub struct CssRule {
    pub rule_text: String,
    pub converted_rule_text: Option<String>,
    pub css_selector: String,
    pub is_whitelist: bool,
    /// `#$#` CSS injection rules; not expressible as content blocker entries.
    pub is_inject_rule: bool,
    /// `#?#` or `-ext-`-style selectors; require a script engine to evaluate.
    pub extended_css: bool,
    pub permitted_domains: Vec<String>,
    pub restricted_domains: Vec<String>,
}

/// A `#%#` script injection rule. Never translated.
#[derive(Debug, Clone)]
pub struct ScriptRule {
    pub rule_text: String,
}

/// A `//scriptlet(...)` rule. Never translated.
#[derive(Debug, Clone)]
pub struct ScriptletRule {
    pub rule_text: String,
}

/// A rule the upstream normalizer expanded into several sub-rules.
#[derive(Debug, Clone)]
pub struct CompositeRule {
    pub rule_text: String,
    pub rules: Vec<Rule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_all_covers_every_flag() {
        assert_eq!(ContentType::ALL, ContentType::all());
    }

    #[test]
    fn content_type_option_names() {
        assert_eq!(ContentType::from_option_name("script"), Some(ContentType::SCRIPT));
        assert_eq!(
            ContentType::from_option_name("object-subrequest"),
            Some(ContentType::OBJECT_SUBREQUEST)
        );
        assert_eq!(ContentType::from_option_name("all"), Some(ContentType::ALL));
        assert_eq!(ContentType::from_option_name("popup"), None);
    }

    #[test]
    fn single_option_requires_exact_equality() {
        let mut rule = UrlRule {
            enabled_options: RuleOption::GENERICHIDE,
            ..Default::default()
        };
        assert!(rule.is_single_option(RuleOption::GENERICHIDE));

        rule.enabled_options |= RuleOption::JSINJECT;
        assert!(!rule.is_single_option(RuleOption::GENERICHIDE));
    }

    #[test]
    fn document_whitelist_detection() {
        let rule = UrlRule {
            is_whitelist: true,
            enabled_options: RuleOption::DOCUMENT,
            ..Default::default()
        };
        assert!(rule.is_document_whitelist());

        let blocking = UrlRule {
            is_whitelist: false,
            enabled_options: RuleOption::DOCUMENT,
            ..Default::default()
        };
        assert!(!blocking.is_document_whitelist());
    }
}
