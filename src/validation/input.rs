//! Request input validation
//!
//! Field checks run at the HTTP boundary before any handler is invoked.
//! Every failing field is collected so the caller sees all problems at once.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::amount::MAX_SCALE;
use crate::domain::{Amount, BlockDecision, CardStatus};

/// Smallest amount accepted for a recharge
pub fn min_recharge() -> Decimal {
    Decimal::new(500, 2)
}

/// One invalid request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All invalid fields of one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Card numbers are four groups of four digits separated by single spaces
pub fn card_number(errors: &mut FieldErrors, field: &str, value: &str) -> Option<String> {
    let groups: Vec<&str> = value.split(' ').collect();
    let valid = groups.len() == 4
        && groups
            .iter()
            .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_digit()));

    if valid {
        Some(value.to_string())
    } else {
        errors.add(field, "must match format 'dddd dddd dddd dddd'");
        None
    }
}

pub fn amount(errors: &mut FieldErrors, field: &str, value: &str) -> Option<Amount> {
    match Amount::from_str(value) {
        Ok(amount) => Some(amount),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

pub fn recharge_amount(errors: &mut FieldErrors, field: &str, value: &str) -> Option<Amount> {
    let amount = amount(errors, field, value)?;
    let minimum = min_recharge();
    if amount.value() < minimum {
        errors.add(field, format!("must be at least {minimum}"));
        return None;
    }
    Some(amount)
}

/// Limit values may be zero but never negative
pub fn limit_value(errors: &mut FieldErrors, field: &str, value: &str) -> Option<Decimal> {
    let parsed = match Decimal::from_str(value.trim()) {
        Ok(parsed) => parsed,
        Err(e) => {
            errors.add(field, format!("invalid decimal: {e}"));
            return None;
        }
    };

    if parsed.is_sign_negative() && !parsed.is_zero() {
        errors.add(field, "must not be negative");
        return None;
    }
    if parsed.normalize().scale() > MAX_SCALE {
        errors.add(field, format!("must have at most {MAX_SCALE} decimal places"));
        return None;
    }
    Some(parsed)
}

pub fn block_decision(errors: &mut FieldErrors, field: &str, value: &str) -> Option<BlockDecision> {
    match value.parse::<BlockDecision>() {
        Ok(decision) => Some(decision),
        Err(_) => {
            errors.add(field, "must be one of COMPLETED, REJECTED");
            None
        }
    }
}

/// Administrators may set ACTIVE or BLOCKED only
pub fn admin_card_status(errors: &mut FieldErrors, field: &str, value: &str) -> Option<CardStatus> {
    match value.parse::<CardStatus>() {
        Ok(status @ (CardStatus::Active | CardStatus::Blocked)) => Some(status),
        _ => {
            errors.add(field, "must be one of ACTIVE, BLOCKED");
            None
        }
    }
}
