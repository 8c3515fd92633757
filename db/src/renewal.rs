use crate::forms::{FieldError, INVALID_DATE, REQUIRED};
use chrono::{Duration, NaiveDate};
use thiserror::Error;

pub const DUE_BACK: &str = "due_back";

/// Renewals may push the due date at most four weeks out.
pub const RENEWAL_WINDOW_DAYS: i64 = 28;

/// Initial value offered on the renewal form.
pub const PROPOSED_RENEWAL_DAYS: i64 = 21;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RenewalError {
    #[error("Invalid date - renewal in past")]
    DateInPast,
    #[error("Invalid date - renewal more than 4 weeks ahead")]
    DateTooFarAhead,
}

impl From<RenewalError> for FieldError {
    fn from(error: RenewalError) -> Self {
        FieldError::new(DUE_BACK, error.to_string())
    }
}

/// Accepts `today..=today + 28 days`, returning the date unchanged.
pub fn validate_renewal(proposed: NaiveDate, today: NaiveDate) -> Result<NaiveDate, RenewalError> {
    if proposed < today {
        return Err(RenewalError::DateInPast);
    }
    if proposed > today + Duration::days(RENEWAL_WINDOW_DAYS) {
        return Err(RenewalError::DateTooFarAhead);
    }
    Ok(proposed)
}

pub fn proposed_renewal(today: NaiveDate) -> NaiveDate {
    today + Duration::days(PROPOSED_RENEWAL_DAYS)
}

/// Validates the raw `due_back` field of a submitted renewal form.
pub fn clean_due_back(raw: &str, today: NaiveDate) -> Result<NaiveDate, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::new(DUE_BACK, REQUIRED));
    }
    let proposed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FieldError::new(DUE_BACK, INVALID_DATE))?;
    Ok(validate_renewal(proposed, today)?)
}
