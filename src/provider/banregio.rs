//! Banregio personal banking.
//!
//! Login is a single credential form. The transaction view pages through
//! history with earlier/later buttons that disable themselves at either
//! end, so the harvest rewinds to the earliest page and walks forward
//! collecting each page's rows.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::browser::{Browser, Element, Locator};
use crate::core::Account;
use crate::error::{Error, Result};
use crate::provider::harvest::{
    self, ExhaustionSignal, HarvestPlan, Pager, RawPolarity, RowRule, Traversal,
};
use crate::provider::{Credentials, Provider};
use crate::wait;

const HOMEPAGE: &str = "https://www.banregio.com/";

const ACCOUNT_LINKS: &str = r#"//*[@class="account-name"]/a"#;

/// Pages hold a month or so each; a history deeper than this means the
/// disabled state stopped firing.
const MAX_PAGE_CLICKS: usize = 200;

pub struct Banregio<B> {
    credentials: Credentials,
    browser: B,
    timeout: Duration,
}

impl<B: Browser> Banregio<B> {
    pub fn new(credentials: Credentials, browser: B) -> Self {
        Self {
            credentials,
            browser,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn require(&self, locator: &Locator) -> Result<B::Elem> {
        self.browser.find(locator).await?.ok_or_else(|| {
            Error::Authentication(format!("expected {} on the page", locator))
        })
    }

    async fn account_count(&self) -> Result<usize> {
        let browser = &self.browser;
        let links = Locator::xpath(ACCOUNT_LINKS);
        let links = &links;

        wait::until("account list", self.timeout, move || async move {
            let found = browser.find_all(links).await?;
            Ok(if found.is_empty() {
                None
            } else {
                Some(found.len())
            })
        })
        .await
    }

    fn plan(&self) -> HarvestPlan {
        HarvestPlan {
            seed: None,
            traversal: Traversal::RewindThenWalk {
                rewind: Pager {
                    control: Locator::id("lnkEarlierBtnMACC"),
                    exhaustion: ExhaustionSignal::Disabled,
                    max_clicks: MAX_PAGE_CLICKS,
                },
                forward: Pager {
                    control: Locator::id("lnkLaterBtnMACC"),
                    exhaustion: ExhaustionSignal::Disabled,
                    max_clicks: MAX_PAGE_CLICKS,
                },
            },
            row: RowRule {
                rows: r#"//*[@class="transaction-details filter_-"]/tr"#.to_string(),
                date_cell: "/td[1]",
                description_cell: "/td[2]",
                amount_cell: "/td[3]",
                date_format: "%d %b %y",
                // Movement lists print deposits positive already.
                polarity: RawPolarity::CreditsPositive,
            },
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl<B: Browser> Provider for Banregio<B> {
    #[tracing::instrument(skip(self))]
    async fn login_to_account_home(&mut self) -> Result<()> {
        self.browser.navigate(HOMEPAGE).await?;

        let username =
            wait::for_element(&self.browser, &Locator::id("Usu_Clave"), self.timeout).await?;
        username.clear().await?;
        username.send_keys(&self.credentials.username).await?;

        let password = self
            .require(&Locator::id("frmLogin:strCustomerLogin_pwd"))
            .await?;
        password.clear().await?;
        password.send_keys(&self.credentials.password).await?;

        self.require(&Locator::name("frmLogin:btnLogin1"))
            .await?
            .click()
            .await?;

        info!("logged in to account home");

        Ok(())
    }

    async fn back_to_account_home(&mut self) -> Result<()> {
        wait::for_element(
            &self.browser,
            &Locator::name("ifCommercial:ifCustomerBar:outputLinkNavHome"),
            self.timeout,
        )
        .await?
        .click()
        .await
    }

    /// Post-state: the session is back on the account list; every account
    /// detail visit ends with a return home.
    #[tracing::instrument(skip(self))]
    async fn get_transactions(&mut self) -> Result<Vec<Account>> {
        let count = self.account_count().await?;
        let mut accounts = Vec::with_capacity(count);

        for i in 0..count {
            // Positional lookup; the list re-renders after returning home.
            let link = self
                .require(&Locator::xpath(format!("({})[{}]", ACCOUNT_LINKS, i + 1)))
                .await?;
            let name = link.text().await?;
            link.click().await?;

            accounts.push(harvest::run(&self.browser, name.trim(), &self.plan()).await?);

            self.back_to_account_home().await?;
        }

        Ok(accounts)
    }
}
