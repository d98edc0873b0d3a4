//! Safari content blocker entry model
//!
//! The JSON shape consumed by WebKit's content blocker engine: a `trigger`
//! describing which loads a rule applies to and an `action` describing what
//! happens on a match. Absent trigger keys are omitted from the output, never
//! serialized as null.

use serde::Serialize;

/// One entry of the emitted content blocker list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub trigger: Trigger,
    pub action: Action,
}

/// The `trigger` object of a content blocker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    #[serde(rename = "url-filter")]
    pub url_filter: String,

    #[serde(
        rename = "url-filter-is-case-sensitive",
        skip_serializing_if = "Option::is_none"
    )]
    pub url_filter_is_case_sensitive: Option<bool>,

    #[serde(rename = "resource-type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<Vec<ResourceType>>,

    #[serde(rename = "load-type", skip_serializing_if = "Option::is_none")]
    pub load_type: Option<Vec<LoadType>>,

    #[serde(rename = "if-domain", skip_serializing_if = "Option::is_none")]
    pub if_domain: Option<Vec<String>>,

    #[serde(rename = "unless-domain", skip_serializing_if = "Option::is_none")]
    pub unless_domain: Option<Vec<String>>,
}

impl Trigger {
    pub fn new(url_filter: impl Into<String>) -> Self {
        Self {
            url_filter: url_filter.into(),
            url_filter_is_case_sensitive: None,
            resource_type: None,
            load_type: None,
            if_domain: None,
            unless_domain: None,
        }
    }

    pub fn has_if_domain(&self) -> bool {
        self.if_domain.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn has_unless_domain(&self) -> bool {
        self.unless_domain.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// The `action` object of a content blocker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl Action {
    pub fn block() -> Self {
        Self {
            action_type: ActionType::Block,
            selector: None,
        }
    }

    pub fn hide(selector: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::CssDisplayNone,
            selector: Some(selector.into()),
        }
    }
}

/// Action kinds supported by the content blocker engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionType {
    #[serde(rename = "block")]
    Block,
    #[serde(rename = "css-display-none")]
    CssDisplayNone,
    #[serde(rename = "ignore-previous-rules")]
    IgnorePreviousRules,
}

/// Resource types recognized by the `resource-type` trigger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceType {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "style-sheet")]
    StyleSheet,
    #[serde(rename = "script")]
    Script,
    #[serde(rename = "media")]
    Media,
    /// XHR, fetch, websocket and other raw loads.
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "font")]
    Font,
    #[serde(rename = "document")]
    Document,
    #[serde(rename = "popup")]
    Popup,
}

/// First-party / third-party scoping for the `load-type` trigger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadType {
    #[serde(rename = "first-party")]
    FirstParty,
    #[serde(rename = "third-party")]
    ThirdParty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_trigger_keys_are_omitted() {
        let entry = Entry {
            trigger: Trigger::new(".*"),
            action: Action::hide(".banner"),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"trigger":{"url-filter":".*"},"action":{"type":"css-display-none","selector":".banner"}}"#
        );
    }

    #[test]
    fn full_trigger_serialization() {
        let entry = Entry {
            trigger: Trigger {
                url_filter: "^https?:".to_string(),
                url_filter_is_case_sensitive: Some(true),
                resource_type: Some(vec![ResourceType::StyleSheet, ResourceType::Raw]),
                load_type: Some(vec![LoadType::ThirdParty]),
                if_domain: Some(vec!["*example.com".to_string()]),
                unless_domain: None,
            },
            action: Action::block(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""url-filter-is-case-sensitive":true"#));
        assert!(json.contains(r#""resource-type":["style-sheet","raw"]"#));
        assert!(json.contains(r#""load-type":["third-party"]"#));
        assert!(json.contains(r#""if-domain":["*example.com"]"#));
        assert!(!json.contains("unless-domain"));
    }
}
