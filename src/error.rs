use thiserror::Error;

/// Errors reported by the knowledge base and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KbError {
    /// `ask` was handed something that is not a fact query
    #[error("invalid ask: {0}")]
    InvalidQuery(String),
    /// A rule was built without any condition
    #[error("rule must have at least one condition")]
    EmptyRule,
    /// The support ledger reached an inconsistent state
    #[error("knowledge base invariant violated: {0}")]
    Invariant(String),
    /// Textual input could not be read as a fact or rule
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KbError>;
