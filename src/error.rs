use std::time::Duration;

use thiserror::Error;

/// Everything a provider session can fail with. No variant is ever
/// swallowed internally; callers decide whether to retry, abort, or tear
/// down the browser.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid transaction field: {0}")]
    Validation(String),
    #[error("timed out after {elapsed:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        elapsed: Duration,
    },
    #[error("login flow did not match the site structure: {0}")]
    Authentication(String),
    #[error("credentials do not fit the site: {0}")]
    Configuration(String),
    #[error("could not parse {what} from {raw:?}: {reason}")]
    Parse {
        what: String,
        raw: String,
        reason: String,
    },
    #[error("pagination control never reported exhaustion after {clicks} clicks")]
    PaginationExhausted { clicks: usize },
    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
