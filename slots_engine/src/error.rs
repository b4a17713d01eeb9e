use thiserror::Error;

/// Error type for Ledger Service calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("ledger unreachable: {0}")]
    Unreachable(String),
    #[error("ledger rejected request ({status}): {}", .reason.as_deref().unwrap_or("no reason given"))]
    Rejected {
        status: reqwest::StatusCode,
        reason: Option<String>,
    },
    #[error("unexpected ledger response: {0}")]
    UnexpectedResponse(String),
    #[error("no access token configured")]
    MissingCredentials,
    #[error("invalid ledger url: {0}")]
    Url(#[from] url::ParseError),
}

impl LedgerError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, LedgerError::Unreachable(_))
    }

    /// Reason reported by the ledger, if it gave one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            LedgerError::Rejected { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
