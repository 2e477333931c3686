//! The provider protocol: one abstract contract, one implementation per
//! supported bank. Adapters carry locators and field-mapping rules only;
//! the pagination machinery they all share lives in [`harvest`].

pub mod banregio;
pub mod harvest;
pub mod hsbc;

use std::fmt;

use async_trait::async_trait;

use crate::core::Account;
use crate::error::Result;

pub use banregio::Banregio;
pub use hsbc::Hsbc;

/// Opaque credential pair, write-once at provider construction.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One bank's automation flow over a live browser session.
///
/// Per session the reachable states are
/// `Unauthenticated -> AccountHome -> [AccountDetail]* -> AccountHome`:
/// [`Provider::login_to_account_home`] is the only way out of
/// `Unauthenticated`, [`Provider::back_to_account_home`] the only way back
/// to `AccountHome` from anywhere else, and `AccountDetail` is entered
/// only inside [`Provider::get_transactions`]. Each adapter documents the
/// state it leaves the session in after a harvest.
#[async_trait]
pub trait Provider {
    /// Drives the session from the unauthenticated homepage to the first
    /// page shown after logging in.
    async fn login_to_account_home(&mut self) -> Result<()>;

    /// Returns the browser to account home no matter where the other
    /// methods have taken it. Idempotent when already there.
    async fn back_to_account_home(&mut self) -> Result<()>;

    /// Harvests every account listed on account home to exhaustion.
    ///
    /// Returns a fresh result set on each call; nothing accumulates on
    /// the session, so calling this twice yields two independent lists.
    async fn get_transactions(&mut self) -> Result<Vec<Account>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_password() {
        let creds = Credentials {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };

        let printed = format!("{:?}", creds);

        assert!(printed.contains("user"));
        assert!(!printed.contains("hunter2"));
    }
}
