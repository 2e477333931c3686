//! The pagination/harvest engine shared by every adapter.
//!
//! Adapters hand over a [`HarvestPlan`]: which control discloses more
//! rows, how that control signals exhaustion, where the rows live once
//! the page is fully expanded, and how each row's cells map onto typed
//! transaction fields. The engine drives the control to exhaustion under
//! the wait discipline, then converts the final row set into records.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use regex::Regex;
use tracing::{debug, info};

use crate::browser::{Browser, Element, Locator};
use crate::core::{Account, Transaction};
use crate::error::{Error, Result};
use crate::wait;

/// A site-specific indicator meaning "no further pages/rows are
/// available".
#[derive(Debug, Clone)]
pub enum ExhaustionSignal {
    /// The control carries an attribute with the given value, e.g.
    /// `aria-hidden="true"`.
    AttrEquals {
        name: &'static str,
        value: &'static str,
    },
    /// The control reports itself disabled.
    Disabled,
    /// The control has been removed from the page.
    Missing,
}

/// One "click until exhausted" control.
#[derive(Debug, Clone)]
pub struct Pager {
    pub control: Locator,
    pub exhaustion: ExhaustionSignal,
    /// Hard cap on clicks. A control whose signal never fires because the
    /// site changed must trip [`Error::PaginationExhausted`] instead of
    /// looping forever.
    pub max_clicks: usize,
}

/// How an adapter's transaction view discloses its full history.
pub enum Traversal {
    /// Rows pile up on a single page; harvest once after the pager
    /// exhausts. The monotonic "view more" shape.
    ExpandInPlace { pager: Pager },
    /// Step back to the earliest page first, then harvest each page while
    /// stepping forward until the forward control exhausts.
    RewindThenWalk { rewind: Pager, forward: Pager },
}

/// Some sites show no rows until a date range is requested explicitly;
/// this seeds the widest range the site permits, earliest through today.
pub struct DateRangeSeed {
    /// Opens the search/filter panel.
    pub open_search: Locator,
    /// Free text disclosing the earliest date the site will serve.
    pub disclaimer: Locator,
    /// Pattern with one capture group around the date inside the
    /// disclaimer text.
    pub earliest_pattern: &'static Regex,
    /// strptime format of the captured date text.
    pub earliest_format: &'static str,
    pub from_field: Locator,
    pub to_field: Locator,
    /// Format dates are typed back into the form fields with.
    pub submit_format: &'static str,
    pub submit: Locator,
}

/// Sign of the amounts as the site prints them. The engine normalizes
/// everything to credit-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPolarity {
    CreditsPositive,
    DebitsPositive,
}

/// Addresses the typed fields inside one row. The cell entries are XPath
/// suffixes appended to an indexed row expression, so heterogeneous
/// markup (nested payee spans, plain cells) maps onto the same shape.
pub struct RowRule {
    /// XPath selecting every transaction row in the fully expanded state.
    pub rows: String,
    pub date_cell: &'static str,
    pub description_cell: &'static str,
    pub amount_cell: &'static str,
    pub date_format: &'static str,
    pub polarity: RawPolarity,
}

impl RowRule {
    /// XPath for one cell of the 1-indexed `nth` row.
    fn cell(&self, nth: usize, suffix: &str) -> Locator {
        Locator::xpath(format!("({})[{}]{}", self.rows, nth, suffix))
    }
}

pub struct HarvestPlan {
    pub seed: Option<DateRangeSeed>,
    pub traversal: Traversal,
    pub row: RowRule,
    /// Budget for each individual wait inside the harvest.
    pub timeout: Duration,
}

/// Expands one account's transaction view to its full extent and converts
/// it into an [`Account`] in row order.
pub async fn run<B: Browser>(browser: &B, account_name: &str, plan: &HarvestPlan) -> Result<Account> {
    let mut account = Account::new(account_name);

    if let Some(seed) = &plan.seed {
        seed_date_range(browser, seed, plan.timeout).await?;
    }

    match &plan.traversal {
        Traversal::ExpandInPlace { pager } => {
            let clicks = click_until_exhausted(browser, pager, plan.timeout).await?;
            debug!(account = account_name, clicks, "view fully expanded");
            harvest_rows(browser, &plan.row, &mut account).await?;
        }
        Traversal::RewindThenWalk { rewind, forward } => {
            let rewinds = click_until_exhausted(browser, rewind, plan.timeout).await?;
            debug!(account = account_name, rewinds, "rewound to earliest page");

            let mut clicks = 0;
            loop {
                harvest_rows(browser, &plan.row, &mut account).await?;

                if is_exhausted(browser, forward, plan.timeout).await? {
                    break;
                }
                if clicks >= forward.max_clicks {
                    return Err(Error::PaginationExhausted { clicks });
                }

                wait::for_element(browser, &forward.control, plan.timeout)
                    .await?
                    .click()
                    .await?;
                clicks += 1;
            }
        }
    }

    info!(
        account = account_name,
        transactions = account.transactions().len(),
        "account harvested"
    );

    Ok(account)
}

async fn seed_date_range<B: Browser>(
    browser: &B,
    seed: &DateRangeSeed,
    timeout: Duration,
) -> Result<()> {
    wait::for_element(browser, &seed.open_search, timeout)
        .await?
        .click()
        .await?;

    // The site discloses its earliest permitted date asynchronously after
    // the panel opens; poll the disclaimer until the pattern matches.
    let disclaimer = &seed.disclaimer;
    let pattern = seed.earliest_pattern;
    let raw = wait::until(
        "earliest permitted date disclosure",
        timeout,
        move || async move {
            match browser.find(disclaimer).await? {
                Some(el) => {
                    let text = el.text().await?;
                    Ok(pattern.captures(&text).map(|c| c[1].to_string()))
                }
                None => Ok(None),
            }
        },
    )
    .await?;

    let earliest =
        NaiveDate::parse_from_str(raw.trim(), seed.earliest_format).map_err(|e| Error::Parse {
            what: "earliest permitted date".to_string(),
            raw: raw.clone(),
            reason: e.to_string(),
        })?;
    let today = Local::now().date_naive();

    let from = wait::for_element(browser, &seed.from_field, timeout).await?;
    from.clear().await?;
    from.send_keys(&earliest.format(seed.submit_format).to_string())
        .await?;

    let to = wait::for_element(browser, &seed.to_field, timeout).await?;
    to.clear().await?;
    to.send_keys(&today.format(seed.submit_format).to_string())
        .await?;

    wait::for_element(browser, &seed.submit, timeout)
        .await?
        .click()
        .await?;

    debug!(%earliest, %today, "seeded widest permitted date range");

    Ok(())
}

/// Clicks the pager until its exhaustion signal fires, returning how many
/// clicks that took. The signal is checked before every click, so a
/// control that is exhausted from the start is never clicked at all.
async fn click_until_exhausted<B: Browser>(
    browser: &B,
    pager: &Pager,
    timeout: Duration,
) -> Result<usize> {
    let mut clicks = 0;

    loop {
        if is_exhausted(browser, pager, timeout).await? {
            return Ok(clicks);
        }
        if clicks >= pager.max_clicks {
            return Err(Error::PaginationExhausted { clicks });
        }

        wait::for_element(browser, &pager.control, timeout)
            .await?
            .click()
            .await?;
        clicks += 1;
    }
}

async fn is_exhausted<B: Browser>(browser: &B, pager: &Pager, timeout: Duration) -> Result<bool> {
    match &pager.exhaustion {
        ExhaustionSignal::Missing => Ok(browser.find(&pager.control).await?.is_none()),
        ExhaustionSignal::Disabled => {
            let control = wait::for_element(browser, &pager.control, timeout).await?;
            Ok(!control.is_enabled().await?)
        }
        ExhaustionSignal::AttrEquals { name, value } => {
            let control = wait::for_element(browser, &pager.control, timeout).await?;
            Ok(control.attr(name).await?.as_deref() == Some(*value))
        }
    }
}

/// Converts every currently visible row into a transaction, appending to
/// `account` in row order. Any row that fails to parse fails the whole
/// harvest; partial or garbled data is never silently coerced.
async fn harvest_rows<B: Browser>(
    browser: &B,
    rule: &RowRule,
    account: &mut Account,
) -> Result<()> {
    let rows = browser
        .find_all(&Locator::xpath(rule.rows.clone()))
        .await?
        .len();

    for nth in 1..=rows {
        // Row numbering in errors is the running position across pages so
        // a failure names the row the caller can actually find.
        let position = account.transactions().len() + 1;

        let date_raw = cell_text(browser, rule, nth, rule.date_cell, position, "date").await?;
        let date = NaiveDate::parse_from_str(date_raw.trim(), rule.date_format).map_err(|e| {
            Error::Parse {
                what: format!("row {} date", position),
                raw: date_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let description = cell_text(
            browser,
            rule,
            nth,
            rule.description_cell,
            position,
            "description",
        )
        .await?
        .trim()
        .to_string();
        if description.is_empty() {
            return Err(Error::Parse {
                what: format!("row {} description", position),
                raw: String::new(),
                reason: "empty text".to_string(),
            });
        }

        let amount_raw = cell_text(browser, rule, nth, rule.amount_cell, position, "amount").await?;
        let amount = parse_amount(&amount_raw, rule.polarity).ok_or_else(|| Error::Parse {
            what: format!("row {} amount", position),
            raw: amount_raw.clone(),
            reason: "not a number".to_string(),
        })?;

        account.push(Transaction::new(date, description, amount)?);
    }

    Ok(())
}

async fn cell_text<B: Browser>(
    browser: &B,
    rule: &RowRule,
    nth: usize,
    suffix: &str,
    position: usize,
    field: &str,
) -> Result<String> {
    match browser.find(&rule.cell(nth, suffix)).await? {
        Some(cell) => cell.text().await,
        None => Err(Error::Parse {
            what: format!("row {} {}", position, field),
            raw: String::new(),
            reason: "cell not found".to_string(),
        }),
    }
}

fn parse_amount(raw: &str, polarity: RawPolarity) -> Option<f64> {
    let amount: f64 = raw.trim().replace(',', "").parse().ok()?;

    match polarity {
        RawPolarity::CreditsPositive => Some(amount),
        RawPolarity::DebitsPositive => Some(-amount),
    }
}
