//! Spending limits
//!
//! Per-card daily and monthly withdrawal caps, the calendar windows they are
//! measured over, and the pure limit check.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::amount::Amount;
use super::error::DomainError;

/// Which cap a limit value applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPeriod {
    Daily,
    Monthly,
}

impl fmt::Display for LimitPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitPeriod::Daily => f.write_str("daily"),
            LimitPeriod::Monthly => f.write_str("monthly"),
        }
    }
}

/// Withdrawal caps of one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub daily_limit: Decimal,
    pub monthly_limit: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Limit {
    /// Zero-valued caps, as attached to a freshly issued card
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            daily_limit: Decimal::new(0, 2),
            monthly_limit: Decimal::new(0, 2),
            updated_at: now,
        }
    }

    /// Set one of the two caps and stamp the update time
    pub fn set(&mut self, period: LimitPeriod, value: Decimal, now: DateTime<Utc>) {
        match period {
            LimitPeriod::Daily => self.daily_limit = value,
            LimitPeriod::Monthly => self.monthly_limit = value,
        }
        self.updated_at = now;
    }

    pub fn cap(&self, period: LimitPeriod) -> Decimal {
        match period {
            LimitPeriod::Daily => self.daily_limit,
            LimitPeriod::Monthly => self.monthly_limit,
        }
    }
}

/// Sums of successful withdrawals already made in the current windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WithdrawalTotals {
    pub today: Decimal,
    pub this_month: Decimal,
}

impl WithdrawalTotals {
    /// Build totals from aggregate rows; a missing row is a zero sum
    pub fn from_sums(today: Option<Decimal>, this_month: Option<Decimal>) -> Self {
        Self {
            today: today.unwrap_or(Decimal::ZERO),
            this_month: this_month.unwrap_or(Decimal::ZERO),
        }
    }

    fn spent(&self, period: LimitPeriod) -> Decimal {
        match period {
            LimitPeriod::Daily => self.today,
            LimitPeriod::Monthly => self.this_month,
        }
    }
}

/// Half-open UTC ranges `[start, end)` of the current calendar day and month
/// in the reference time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitWindow {
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
    pub month_end: DateTime<Utc>,
}

impl LimitWindow {
    pub fn containing(now: DateTime<Utc>, zone: FixedOffset) -> Self {
        let today = now.with_timezone(&zone).date_naive();
        let first_of_month = today - Duration::days(i64::from(today.day0()));
        let first_of_next_month = first_of_month
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);

        Self {
            day_start: local_midnight(today, zone),
            day_end: local_midnight(today + Duration::days(1), zone),
            month_start: local_midnight(first_of_month, zone),
            month_end: local_midnight(first_of_next_month, zone),
        }
    }

    pub fn bounds(&self, period: LimitPeriod) -> (DateTime<Utc>, DateTime<Utc>) {
        match period {
            LimitPeriod::Daily => (self.day_start, self.day_end),
            LimitPeriod::Monthly => (self.month_start, self.month_end),
        }
    }
}

fn local_midnight(date: NaiveDate, zone: FixedOffset) -> DateTime<Utc> {
    let local = NaiveDateTime::new(date, chrono::NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(zone.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}

/// Check a prospective withdrawal against both caps.
///
/// The daily cap is evaluated first; the first breach determines the error.
pub fn check_limits(
    limit: &Limit,
    totals: &WithdrawalTotals,
    amount: &Amount,
) -> Result<(), DomainError> {
    for period in [LimitPeriod::Daily, LimitPeriod::Monthly] {
        let spent = totals.spent(period);
        let cap = limit.cap(period);

        if spent + amount.value() > cap {
            return Err(DomainError::LimitExceeded {
                period,
                spent,
                amount: amount.value(),
                limit: cap,
            });
        }
    }

    Ok(())
}
