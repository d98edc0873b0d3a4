//! Conversion error taxonomy.
//!
//! None of these abort a whole conversion; the pipeline records each as a
//! human-readable error line and continues with the next rule.

/// Error type for per-rule conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Rule text could not be parsed into the rule model.
    #[error("failed to parse rule: {0}")]
    Parse(String),

    /// Parsed fine, but the construct has no content blocker counterpart.
    #[error("unsupported rule: {0}")]
    Unsupported(String),

    /// The url-filter regex uses a feature Safari's regex engine rejects.
    #[error("{reason}: {pattern}")]
    RegexRejected { reason: String, pattern: String },

    /// Document-blocking rule without if-domain or third-party load type.
    #[error("document blocking rules must be scoped to a domain or to third-party loads")]
    DocumentBlockPolicy,

    /// A single trigger cannot carry both permitted and restricted domains.
    #[error("both permitted and restricted domains not supported")]
    DomainScopeConflict,

    /// CSS exception application produced an entry with both if-domain
    /// and unless-domain; the entry is dropped.
    #[error("exception application left both if-domain and unless-domain set")]
    ExceptionApplicationDropped,
}

impl ConversionError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    pub fn parse(what: impl Into<String>) -> Self {
        Self::Parse(what.into())
    }
}
