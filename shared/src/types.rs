//! Common types used across the platform

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Decimal places used for money (SAR halalas)
pub const MONEY_SCALE: u32 = 2;

/// Decimal places used for stock quantities
pub const QUANTITY_SCALE: u32 = 3;

/// Supported languages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Arabic,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "en" => Language::English,
            _ => Language::Arabic,
        }
    }
}

/// Round a money amount for reporting
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a stock quantity for reporting
pub fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Inclusive range of business days
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering a single business day
    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Half-open UTC interval `[start 00:00, end + 1 day 00:00)` in the given offset.
    ///
    /// Days at the edge of the calendar have no representable bound and are
    /// reported as an invalid range.
    pub fn utc_bounds(
        &self,
        offset: FixedOffset,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), DomainError> {
        let out_of_range = DomainError::InvalidDateRange {
            start: self.start,
            end: self.end,
        };
        let from = local_midnight_utc(self.start, offset).ok_or_else(|| out_of_range.clone())?;
        let until = local_midnight_utc(self.end, offset)
            .and_then(|t| t.checked_add_signed(Duration::days(1)))
            .ok_or(out_of_range)?;
        Ok((from, until))
    }
}

fn local_midnight_utc(day: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = day.and_time(NaiveTime::MIN);
    let utc = local.checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
    Some(Utc.from_utc_datetime(&utc))
}

/// Current business day in the given offset
pub fn business_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(Decimal::from_str("0.125").unwrap()), Decimal::from_str("0.13").unwrap());
        assert_eq!(round_money(Decimal::from_str("-0.125").unwrap()), Decimal::from_str("-0.13").unwrap());
        assert_eq!(round_money(Decimal::from_str("97.3333").unwrap()), Decimal::from_str("97.33").unwrap());
    }

    #[test]
    fn range_rejects_reversed_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(DateRange::new(start, end).is_err());
    }

    #[test]
    fn riyadh_day_starts_at_21_utc() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let (from, until) = DateRange::single_day(day).utc_bounds(offset).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-04-30T21:00:00+00:00");
        assert_eq!(until.to_rfc3339(), "2024-05-01T21:00:00+00:00");
    }

    #[test]
    fn calendar_edges_are_rejected_not_panicking() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        assert!(matches!(
            DateRange::single_day(NaiveDate::MIN).utc_bounds(offset),
            Err(DomainError::InvalidDateRange { .. })
        ));
        assert!(DateRange::single_day(NaiveDate::MAX).utc_bounds(offset).is_err());
    }
}
