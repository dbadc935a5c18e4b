use std::time::Duration;

/// Failure classes surfaced to the user. Everything the controller reports
/// is one of these; application plumbing outside the game flows (terminal
/// setup, wallet files, argument parsing) stays on `color_eyre`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A local precondition failed. No network call was made.
    #[error("{0}")]
    Validation(String),
    /// A read query failed (chain or indexer).
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// A write was rejected by the wallet, the node, or the contract.
    #[error("transaction failed: {0}")]
    Transaction(String),
    /// A write outlived its submission deadline.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Error::Fetch(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Error::Transaction(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
