//! Per-rule translation into content blocker entries.
//!
//! Each parsed rule becomes at most one trigger/action entry. Shapes the
//! content blocker engine cannot express are rejected with a precise reason
//! so the pipeline can report them.

use log::{debug, warn};

use cb_core::domain::{parse_rule_domain, to_punycode};
use cb_core::entry::{Action, ActionType, Entry, LoadType, ResourceType, Trigger};
use cb_core::error::ConversionError;
use cb_core::regexp::{
    create_url_filter_source, validate_url_filter, UrlRegexConfig, URL_FILTER_ANY_URL,
    URL_FILTER_CSS_RULES, URL_FILTER_WHITELIST_ANY_URL, URL_FILTER_WS_ANY_URL,
};
use cb_core::types::{ContentType, CssRule, Rule, RuleOption, UrlRule};

/// Translate any parsed rule, rejecting the kinds that have no content
/// blocker counterpart.
pub fn translate_rule(rule: &Rule, config: &UrlRegexConfig) -> Result<Entry, ConversionError> {
    match rule {
        Rule::Css(css) => translate_css(css),
        Rule::Url(url) => translate_url(url, config),
        Rule::Script(_) => Err(ConversionError::unsupported(
            "script injection rules are not supported",
        )),
        Rule::Scriptlet(_) => Err(ConversionError::unsupported(
            "scriptlet rules are not supported",
        )),
        Rule::Composite(_) => Err(ConversionError::unsupported(
            "composite rules must be flattened before conversion",
        )),
    }
}

/// Translate an element-hide rule into a `css-display-none` entry.
pub fn translate_css(rule: &CssRule) -> Result<Entry, ConversionError> {
    if rule.is_inject_rule {
        return Err(ConversionError::unsupported(
            "CSS injection rules are not supported",
        ));
    }
    if rule.extended_css {
        return Err(ConversionError::unsupported(
            "extended CSS selectors are not supported",
        ));
    }

    let mut trigger = Trigger::new(URL_FILTER_CSS_RULES);
    add_domain_options(&mut trigger, &rule.permitted_domains, &rule.restricted_domains)?;

    let action_type = if rule.is_whitelist {
        ActionType::IgnorePreviousRules
    } else {
        ActionType::CssDisplayNone
    };

    Ok(Entry {
        trigger,
        action: Action {
            action_type,
            selector: Some(rule.css_selector.clone()),
        },
    })
}

/// Translate a URL rule into a `block` or `ignore-previous-rules` entry.
pub fn translate_url(rule: &UrlRule, config: &UrlRegexConfig) -> Result<Entry, ConversionError> {
    if rule.is_csp {
        return Err(ConversionError::unsupported("$csp rules are not supported"));
    }
    if rule.replace.is_some() {
        return Err(ConversionError::unsupported(
            "$replace rules are not supported",
        ));
    }
    if rule.permitted_content_type == ContentType::OBJECT {
        return Err(ConversionError::unsupported(
            "$object rules are not supported",
        ));
    }
    if rule.permitted_content_type == ContentType::OBJECT_SUBREQUEST {
        return Err(ConversionError::unsupported(
            "$object-subrequest rules are not supported",
        ));
    }
    if rule.permitted_content_type == ContentType::WEBRTC {
        return Err(ConversionError::unsupported(
            "$webrtc rules are not supported",
        ));
    }
    if rule.enabled_options == RuleOption::JSINJECT {
        return Err(ConversionError::unsupported(
            "$jsinject rules are not supported",
        ));
    }

    let url_filter = build_url_filter(rule, config);
    validate_url_filter(&url_filter)?;

    let mut entry = Entry {
        trigger: Trigger::new(url_filter),
        action: Action::block(),
    };

    if rule.is_whitelist {
        entry.action.action_type = ActionType::IgnorePreviousRules;
    }

    add_resource_type(rule, &mut entry.trigger);

    if rule.is_check_third_party {
        entry.trigger.load_type = Some(vec![if rule.is_third_party {
            LoadType::ThirdParty
        } else {
            LoadType::FirstParty
        }]);
    }

    if rule.is_match_case {
        entry.trigger.url_filter_is_case_sensitive = Some(true);
    }

    add_domain_options(&mut entry.trigger, &rule.permitted_domains, &rule.restricted_domains)?;

    check_whitelist_exceptions(rule, &mut entry);

    validate_url_blocking_rule(&entry)?;

    Ok(entry)
}

/// Build the url-filter regex source for a URL rule.
fn build_url_filter(rule: &UrlRule, config: &UrlRegexConfig) -> String {
    let pattern = rule.url_rule_text.as_str();

    // Match-anything patterns skip construction entirely.
    if matches!(pattern, "" | "*" | "|*" | "||*") {
        return any_url_filter(rule).to_string();
    }

    if rule.is_regex_rule {
        if let Some(source) = &rule.url_regexp {
            return source.clone();
        }
    }

    let source = create_url_filter_source(pattern, config);
    if source.is_empty() {
        return any_url_filter(rule).to_string();
    }

    if is_websocket_rule(rule) && !source.starts_with('^') && !source.starts_with("ws") {
        return format!("{URL_FILTER_WS_ANY_URL}.*{source}");
    }

    source
}

fn any_url_filter(rule: &UrlRule) -> &'static str {
    if is_websocket_rule(rule) {
        URL_FILTER_WS_ANY_URL
    } else {
        URL_FILTER_ANY_URL
    }
}

fn is_websocket_rule(rule: &UrlRule) -> bool {
    rule.permitted_content_type == ContentType::WEBSOCKET
}

/// Map the permitted content types onto Safari resource types, in a fixed
/// order. XHR, other and websocket loads collapse into a single `raw` entry.
fn add_resource_type(rule: &UrlRule, trigger: &mut Trigger) {
    let mut types = Vec::new();

    if rule.permitted_content_type == ContentType::ALL
        && rule.restricted_content_type.is_empty()
    {
        // Safari's default resource types already cover everything.
    } else {
        let permitted = rule.permitted_content_type;
        if permitted.contains(ContentType::IMAGE) {
            types.push(ResourceType::Image);
        }
        if permitted.contains(ContentType::STYLESHEET) {
            types.push(ResourceType::StyleSheet);
        }
        if permitted.contains(ContentType::SCRIPT) {
            types.push(ResourceType::Script);
        }
        if permitted.contains(ContentType::MEDIA) {
            types.push(ResourceType::Media);
        }
        if permitted
            .intersects(ContentType::XMLHTTPREQUEST | ContentType::OTHER | ContentType::WEBSOCKET)
        {
            types.push(ResourceType::Raw);
        }
        if permitted.contains(ContentType::FONT) {
            types.push(ResourceType::Font);
        }
        if permitted.contains(ContentType::SUBDOCUMENT) {
            types.push(ResourceType::Document);
        }
    }

    if rule.is_block_popups {
        types = vec![ResourceType::Popup];
    }

    if !types.is_empty() {
        trigger.resource_type = Some(types);
    }
}

/// Lowercase, punycode and attach the rule's domain scope to the trigger.
fn add_domain_options(
    trigger: &mut Trigger,
    permitted: &[String],
    restricted: &[String],
) -> Result<(), ConversionError> {
    let included: Vec<String> = permitted
        .iter()
        .filter(|domain| !domain.is_empty())
        .map(|domain| to_punycode(domain))
        .collect();
    let excluded: Vec<String> = restricted
        .iter()
        .filter(|domain| !domain.is_empty())
        .map(|domain| to_punycode(domain))
        .collect();

    if !included.is_empty() && !excluded.is_empty() {
        return Err(ConversionError::DomainScopeConflict);
    }

    if !included.is_empty() {
        trigger.if_domain = Some(included);
    }
    if !excluded.is_empty() {
        trigger.unless_domain = Some(excluded);
    }
    Ok(())
}

/// Rewrite whitelist exceptions into domain-scoped any-URL entries.
///
/// Applies to document whitelists, single-option URL-block exceptions and
/// single-option CSS exceptions. When the rule pattern carries a real path
/// the original url-filter stays in place.
fn check_whitelist_exceptions(rule: &UrlRule, entry: &mut Entry) {
    if !rule.is_whitelist {
        return;
    }

    let document_rule = rule.is_document_whitelist();
    let url_block_rule = rule.is_single_option(RuleOption::URLBLOCK)
        || rule.is_single_option(RuleOption::GENERICBLOCK);
    let css_exception_rule = rule.is_single_option(RuleOption::GENERICHIDE)
        || rule.is_single_option(RuleOption::ELEMHIDE);

    if !(document_rule || url_block_rule || css_exception_rule) {
        return;
    }

    if document_rule {
        entry.trigger.resource_type = None;
    }

    // rule_text, not url_rule_text: the domain may sit in a `domain=`
    // modifier, and url_rule_text has the `$options` already split off.
    let Some(parsed) = parse_rule_domain(&rule.rule_text) else {
        warn!("whitelist exception has no parseable domain: {}", rule.rule_text);
        return;
    };

    if let Some(path) = &parsed.path {
        if path != "^" && path != "/" {
            debug!("whitelist exception keeps its url filter, pattern has a path: {}", rule.rule_text);
            return;
        }
    }

    entry.trigger.if_domain = Some(vec![parsed.domain]);
    entry.trigger.unless_domain = None;
    entry.trigger.url_filter = URL_FILTER_WHITELIST_ANY_URL.to_string();
    entry.trigger.resource_type = None;
}

/// Document-blocking entries are only allowed with a domain scope or a
/// third-party load type; anything broader would take down whole sites.
fn validate_url_blocking_rule(entry: &Entry) -> Result<(), ConversionError> {
    if entry.action.action_type != ActionType::Block {
        return Ok(());
    }
    let Some(types) = &entry.trigger.resource_type else {
        return Ok(());
    };
    if !types.contains(&ResourceType::Document) {
        return Ok(());
    }
    if entry.trigger.has_if_domain() {
        return Ok(());
    }
    if entry
        .trigger
        .load_type
        .as_ref()
        .is_some_and(|load| load.contains(&LoadType::ThirdParty))
    {
        return Ok(());
    }
    Err(ConversionError::DocumentBlockPolicy)
}
