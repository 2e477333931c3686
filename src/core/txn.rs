use chrono::NaiveDate;

use crate::error::{Error, Result};

/// A single scraped ledger row.
///
/// Day precision only; banks do not expose a time of day on statement
/// rows. Amounts follow one convention across every provider: positive is
/// money into the account (credit), negative is money out (debit).
/// Adapters declare the polarity their site prints and the harvest engine
/// normalizes to this convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    date: NaiveDate,
    description: String,
    amount: f64,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: f64) -> Result<Self> {
        let description = description.into();

        if description.trim().is_empty() {
            return Err(Error::Validation(
                "description must be non-empty text".to_string(),
            ));
        }
        if !amount.is_finite() {
            return Err(Error::Validation(format!(
                "amount must be a finite number, got {}",
                amount
            )));
        }

        Ok(Self {
            date,
            description,
            amount,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn fields_round_trip_unchanged() {
        let tx = Transaction::new(date("2021-03-15"), "Coffee Shop", 1234.50).unwrap();

        assert_eq!(tx.date(), date("2021-03-15"));
        assert_eq!(tx.description(), "Coffee Shop");
        assert_eq!(tx.amount(), 1234.50);
    }

    #[test]
    fn rejects_blank_description() {
        let err = Transaction::new(date("2021-03-15"), "  ", 1.0).unwrap_err();

        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    }

    #[test]
    fn rejects_non_finite_amount() {
        let err = Transaction::new(date("2021-03-15"), "Coffee Shop", f64::NAN).unwrap_err();

        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);

        let err = Transaction::new(date("2021-03-15"), "Coffee Shop", f64::INFINITY).unwrap_err();

        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    }
}
