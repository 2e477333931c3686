//! HSBC personal online banking.
//!
//! Login is a multi-step flow ending in a split password: the site
//! presents numbered single-character fields (`pass1`..`passN`) and the
//! credential must cover every enabled slot. The transaction view shows
//! nothing until a date range is requested, then expands in place through
//! a "view more" control that hides itself when the history is complete.

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::browser::{Browser, Element, Locator};
use crate::core::Account;
use crate::error::{Error, Result};
use crate::provider::harvest::{
    self, DateRangeSeed, ExhaustionSignal, HarvestPlan, Pager, RawPolarity, RowRule, Traversal,
};
use crate::provider::{Credentials, Provider};
use crate::wait;

const HOMEPAGE: &str = "https://www.hsbc.com.mx/acceso-banca/";
const ACCOUNT_HOME: &str = "https://www.hsbc.co.uk/1/3/personal/online-banking";

const ACCOUNT_LINKS: &str =
    r#"//*[@class="row accordionContainer accBundleContainer"]//*[@class="itemTitle"]"#;

/// Statement histories run to a few years of monthly pages; anything past
/// this many expansions means the hide signal no longer fires.
const MAX_EXPAND_CLICKS: usize = 500;

lazy_static! {
    static ref PASS_FIELD: Regex = Regex::new(r"^pass([1-9][0-9]*)$").unwrap();
    static ref EARLIEST_DATE: Regex =
        Regex::new(r"The earliest date you can view is (.+?)\.").unwrap();
}

pub struct Hsbc<B> {
    credentials: Credentials,
    browser: B,
    timeout: Duration,
}

impl<B: Browser> Hsbc<B> {
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

    /// An element the current page must already contain; absence means
    /// the site structure changed under us.
    async fn require(&self, locator: &Locator) -> Result<B::Elem> {
        self.browser.find(locator).await?.ok_or_else(|| {
            Error::Authentication(format!("expected {} on the page", locator))
        })
    }

    /// Distributes the password across the site's numbered
    /// single-character fields.
    ///
    /// The slots are collected and checked against the credential length
    /// first: a credential shorter than the highest slot number must fail
    /// loudly before a single character is typed, never silently
    /// under-fill the form.
    async fn fill_split_password(&self) -> Result<()> {
        let fields = self
            .browser
            .find_all(&Locator::css(r#"input[id^="pass"]"#))
            .await?;

        let mut slots = Vec::new();
        for field in fields {
            if field.attr("type").await?.as_deref() != Some("password")
                || !field.is_enabled().await?
            {
                continue;
            }
            let name = field.attr("name").await?.unwrap_or_default();
            if let Some(captures) = PASS_FIELD.captures(&name) {
                let slot: usize = captures[1]
                    .parse()
                    .map_err(|_| Error::Authentication(format!("bad password slot {}", name)))?;
                slots.push((slot, field));
            }
        }

        if slots.is_empty() {
            return Err(Error::Authentication(
                "no password entry fields found".to_string(),
            ));
        }

        let password: Vec<char> = self.credentials.password.chars().collect();
        let highest = slots.iter().map(|(slot, _)| *slot).max().unwrap_or(0);
        if highest > password.len() {
            return Err(Error::Configuration(format!(
                "site presents password slots up to {} but the credential has {} characters",
                highest,
                password.len()
            )));
        }

        for (slot, field) in slots {
            field.send_keys(&password[slot - 1].to_string()).await?;
        }

        Ok(())
    }

    async fn account_links(&self) -> Result<Vec<B::Elem>> {
        let browser = &self.browser;
        let links = Locator::xpath(ACCOUNT_LINKS);
        let links = &links;

        wait::until("account list", self.timeout, move || async move {
            let found = browser.find_all(links).await?;
            Ok(if found.is_empty() { None } else { Some(found) })
        })
        .await
    }

    fn plan(&self) -> HarvestPlan {
        HarvestPlan {
            seed: Some(DateRangeSeed {
                open_search: Locator::xpath(
                    r#"//*[@id="filterPayment_Show_Hide"][@title="Search"]"#,
                ),
                disclaimer: Locator::xpath(r#"//*[@data-dojo-attach-point="_dateDisclaimer"]"#),
                earliest_pattern: &EARLIEST_DATE,
                earliest_format: "%d %b %Y",
                from_field: Locator::xpath(r#"//*[contains(@aria-labelledby, "dateFrom")]"#),
                to_field: Locator::xpath(r#"//*[contains(@aria-labelledby, "dateTo")]"#),
                submit_format: "%d/%m/%Y",
                submit: Locator::xpath(r#"//*[@data-dojo-attach-point="dapViewResults"]"#),
            }),
            traversal: Traversal::ExpandInPlace {
                pager: Pager {
                    control: Locator::xpath(r#"//*[@id="_dapViewMore"]"#),
                    exhaustion: ExhaustionSignal::AttrEquals {
                        name: "aria-hidden",
                        value: "true",
                    },
                    max_clicks: MAX_EXPAND_CLICKS,
                },
            },
            row: RowRule {
                rows: r#"//*[@data-dojo-attach-point="bodyNode"]/div/table/tbody/tr"#.to_string(),
                date_cell: "/td[1]",
                description_cell: r#"/td[2]//*[contains(@class, "payeeItem0")]"#,
                amount_cell: "/td[3]",
                date_format: "%d %b %y",
                // Statement pages print outgoing payments positive.
                polarity: RawPolarity::DebitsPositive,
            },
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl<B: Browser> Provider for Hsbc<B> {
    #[tracing::instrument(skip(self))]
    async fn login_to_account_home(&mut self) -> Result<()> {
        self.browser.navigate(HOMEPAGE).await?;

        wait::for_element(
            &self.browser,
            &Locator::id("content_intro_button_1"),
            self.timeout,
        )
        .await?
        .click()
        .await?;

        let username =
            wait::for_element(&self.browser, &Locator::id("username"), self.timeout).await?;
        username.send_keys(&self.credentials.username).await?;
        self.require(&Locator::id("formSubmitButton"))
            .await?
            .click()
            .await?;

        // Log in without the physical secure key.
        wait::for_element(
            &self.browser,
            &Locator::xpath(r#"//*[@id="innerPage"]/div/div/div/div/div/div[2]/ul/li[2]/a"#),
            self.timeout,
        )
        .await?
        .click()
        .await?;

        let browser = &self.browser;
        let pass_fields = Locator::css(r#"input[id^="pass"]"#);
        let pass_fields = &pass_fields;
        wait::until("password entry fields", self.timeout, move || async move {
            let found = browser.find_all(pass_fields).await?;
            Ok((!found.is_empty()).then_some(()))
        })
        .await?;
        self.fill_split_password().await?;

        self.require(&Locator::xpath(
            r#"//*[@id="dijit_form_Form_0"]/div[3]/div/div/span/input"#,
        ))
        .await?
        .click()
        .await?;

        info!("logged in to account home");

        Ok(())
    }

    async fn back_to_account_home(&mut self) -> Result<()> {
        self.browser.navigate(ACCOUNT_HOME).await
    }

    /// Post-state: the session remains on the last account's detail view;
    /// call [`Provider::back_to_account_home`] before anything else.
    #[tracing::instrument(skip(self))]
    async fn get_transactions(&mut self) -> Result<Vec<Account>> {
        let count = self.account_links().await?.len();
        let mut accounts = Vec::with_capacity(count);

        for i in 0..count {
            if i > 0 {
                self.back_to_account_home().await?;
            }

            // The accordion re-renders after every navigation; stale
            // handles cannot be reused across accounts.
            let link = self
                .account_links()
                .await?
                .into_iter()
                .nth(i)
                .ok_or_else(|| {
                    Error::Authentication("account list shrank while harvesting".to_string())
                })?;
            let name = link.text().await?;
            link.click().await?;

            accounts.push(harvest::run(&self.browser, name.trim(), &self.plan()).await?);
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Just the split-password screen: numbered slots recording what gets
    /// typed into them.
    #[derive(Clone)]
    struct PasswordScreen(Arc<ScreenState>);

    struct ScreenState {
        slots: usize,
        typed: Mutex<Vec<(usize, String)>>,
    }

    impl PasswordScreen {
        fn with_slots(slots: usize) -> Self {
            PasswordScreen(Arc::new(ScreenState {
                slots,
                typed: Mutex::new(Vec::new()),
            }))
        }

        fn typed(&self) -> Vec<(usize, String)> {
            self.0.typed.lock().unwrap().clone()
        }
    }

    struct Slot {
        screen: Arc<ScreenState>,
        number: usize,
    }

    #[async_trait]
    impl crate::browser::Element for Slot {
        async fn text(&self) -> Result<String> {
            Ok(String::new())
        }

        async fn attr(&self, name: &str) -> Result<Option<String>> {
            Ok(match name {
                "type" => Some("password".to_string()),
                "name" => Some(format!("pass{}", self.number)),
                _ => None,
            })
        }

        async fn click(&self) -> Result<()> {
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }

        async fn send_keys(&self, keys: &str) -> Result<()> {
            self.screen
                .typed
                .lock()
                .unwrap()
                .push((self.number, keys.to_string()));

            Ok(())
        }

        async fn is_enabled(&self) -> Result<bool> {
            Ok(true)
        }

        async fn is_visible(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl Browser for PasswordScreen {
        type Elem = Slot;

        async fn navigate(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn find(&self, locator: &Locator) -> Result<Option<Self::Elem>> {
            Ok(self.find_all(locator).await?.into_iter().next())
        }

        async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Elem>> {
            if *locator != Locator::css(r#"input[id^="pass"]"#) {
                return Ok(Vec::new());
            }

            Ok((1..=self.0.slots)
                .map(|number| Slot {
                    screen: Arc::clone(&self.0),
                    number,
                })
                .collect())
        }
    }

    fn provider(screen: &PasswordScreen, password: &str) -> Hsbc<PasswordScreen> {
        Hsbc::new(
            Credentials {
                username: "user".to_string(),
                password: password.to_string(),
            },
            screen.clone(),
        )
    }

    #[tokio::test]
    async fn short_credential_fails_before_any_slot_is_filled() {
        let screen = PasswordScreen::with_slots(8);

        let err = provider(&screen, "sixchr")
            .fill_split_password()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)), "got {:?}", err);
        assert!(screen.typed().is_empty());
    }

    #[tokio::test]
    async fn matching_credential_fills_every_slot_in_order() {
        let screen = PasswordScreen::with_slots(8);

        provider(&screen, "8charpwd")
            .fill_split_password()
            .await
            .unwrap();

        let typed = screen.typed();
        assert_eq!(typed.len(), 8);
        for (slot, key) in typed.iter() {
            assert_eq!(key.chars().count(), 1);
            assert_eq!(
                key.chars().next().unwrap(),
                "8charpwd".chars().nth(slot - 1).unwrap()
            );
        }
    }
}
