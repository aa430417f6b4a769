//! Error taxonomy for the DOI lifecycle engine.
//!
//! Fatal conditions (malformed input, schema failures, transport problems)
//! are plain variants that abort the current action. Business-rule failures
//! are *not* errors until an action decides they are: the validator returns
//! them as values (see [`crate::validate::ValidationOutcome`]) and the action
//! converts the aggregate into a single [`DoiError::Warning`] when the caller
//! has not requested override.

use thiserror::Error;

/// All errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum DoiError {
    /// The input source could not be parsed as any supported shape.
    #[error("unable to read input '{input}': {reason}")]
    InputFormat { input: String, reason: String },

    /// The submitting node code is not one of the permissible values.
    #[error("unknown discipline node '{0}'")]
    UnknownNode(String),

    /// No transaction exists in the ledger for the requested identifier.
    #[error("no record(s) could be found for identifier {0}")]
    UnknownIdentifier(String),

    /// A ledger row exists but its output artifact is gone. The ledger and
    /// the transaction history are out of sync; the operator must resubmit
    /// the record in reserve or draft.
    #[error(
        "could not find an output label associated with identifier {0}; \
         the ledger and transaction history may be out of sync, please \
         resubmit the record in reserve or draft"
    )]
    NoTransactionHistory(String),

    /// Aggregate of every business-rule failure collected during one action.
    /// Overridable by reissuing the call with `force=true`.
    #[error("warning(s) encountered: {}", messages.join("; "))]
    Warning { messages: Vec<String> },

    /// Unrecoverable failure: schema violations, transcoding faults, or an
    /// unexpected internal condition. Never retried.
    #[error("critical failure: {0}")]
    Critical(String),

    /// Transport-level failure talking to the registration service or
    /// fetching a remote label.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "database")]
    #[error("ledger error: {0}")]
    Ledger(#[from] sqlx::Error),
}

impl DoiError {
    /// Build an `InputFormat` error for the given source description.
    pub fn input_format(input: impl Into<String>, reason: impl ToString) -> Self {
        DoiError::InputFormat {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Collapse a list of collected messages into one aggregate warning.
    pub fn warning(messages: Vec<String>) -> Self {
        DoiError::Warning { messages }
    }

    /// True when this error may be overridden by reissuing with `force`.
    pub fn is_overridable(&self) -> bool {
        matches!(self, DoiError::Warning { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_joins_all_messages() {
        let err = DoiError::warning(vec!["first".into(), "second".into()]);
        let text = err.to_string();
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }

    #[test]
    fn only_warnings_are_overridable() {
        assert!(DoiError::warning(vec![]).is_overridable());
        assert!(!DoiError::Critical("boom".into()).is_overridable());
        assert!(!DoiError::UnknownNode("xyz".into()).is_overridable());
    }
}
