// 📝 Input Boundary - validated expense submissions
//
// The only place amounts are checked. Anything that reaches the ledger
// went through a Submission.

use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

use crate::ledger::{Entry, ExpenseLedger};

/// Smallest amount a user may submit (currency units)
pub const MIN_AMOUNT: f64 = 1.0;

/// Date format accepted from text input
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("amount must be at least {min}, got {amount}")]
    AmountBelowMinimum { amount: f64, min: f64 },

    #[error("amount must be a finite number")]
    AmountNotFinite,

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("expected DATE,CATEGORY,AMOUNT, got '{0}'")]
    Malformed(String),
}

/// One accepted form submission, ready to be appended
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSubmission")]
pub struct Submission {
    date: NaiveDate,
    category: String,
    amount: f64,
}

impl Submission {
    pub fn new(date: NaiveDate, category: impl Into<String>, amount: f64) -> Result<Self, FormError> {
        if !amount.is_finite() {
            return Err(FormError::AmountNotFinite);
        }
        if amount < MIN_AMOUNT {
            return Err(FormError::AmountBelowMinimum {
                amount,
                min: MIN_AMOUNT,
            });
        }

        Ok(Submission {
            date,
            category: category.into(),
            amount,
        })
    }

    /// Build a submission from raw text fields (date, category, amount)
    pub fn parse(date: &str, category: &str, amount: &str) -> Result<Self, FormError> {
        let date = parse_date(date)?;
        let amount_text = amount.trim();
        let amount = amount_text
            .parse::<f64>()
            .map_err(|_| FormError::InvalidAmount(amount_text.to_string()))?;

        Self::new(date, category.trim(), amount)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Append this submission to `ledger`
    pub fn apply(self, ledger: &mut ExpenseLedger) -> &Entry {
        ledger.append(self.date, self.category, self.amount)
    }
}

pub fn parse_date(text: &str) -> Result<NaiveDate, FormError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| FormError::InvalidDate(text.to_string()))
}

/// `DATE,CATEGORY,AMOUNT`, e.g. `2024-01-01,飲食,1000`
impl FromStr for Submission {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        match parts.as_slice() {
            [date, category, amount] => Submission::parse(date, category, amount),
            _ => Err(FormError::Malformed(s.to_string())),
        }
    }
}

/// Wire shape of a submission (JSON body)
#[derive(Debug, Deserialize)]
struct RawSubmission {
    date: NaiveDate,
    category: String,
    amount: f64,
}

impl TryFrom<RawSubmission> for Submission {
    type Error = FormError;

    fn try_from(raw: RawSubmission) -> Result<Self, Self::Error> {
        Submission::new(raw.date, raw.category, raw.amount)
    }
}

// ============================================================================
// TESTS
// ============================================================================
