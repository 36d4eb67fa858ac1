/// Common types and utilities shared across handlers and services.
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Rounds a monetary value to 2 decimal places, half away from zero.
///
/// Applied at each sale line and again at the aggregate total; reordering
/// these roundings changes totals, so callers must round exactly where the
/// sale engine does.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Optional `desde` / `hasta` date-range parameters for filtering queries.
///
/// Accepts either an RFC 3339 timestamp or a plain `YYYY-MM-DD` date; a bare
/// date is widened to the start (for `desde`) or end (for `hasta`) of that
/// day. Defaults are chosen by each caller, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRangeParams {
    pub desde: Option<String>,
    pub hasta: Option<String>,
}

impl DateRangeParams {
    pub fn parse(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ServiceError> {
        let desde = self
            .desde
            .as_deref()
            .map(|raw| parse_bound(raw, false))
            .transpose()?;
        let hasta = self
            .hasta
            .as_deref()
            .map(|raw| parse_bound(raw, true))
            .transpose()?;
        Ok((desde, hasta))
    }
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ServiceError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ServiceError::ValidationError(format!("invalid date: {raw}")))?;

    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59).expect("valid time of day")
    } else {
        date.and_hms_opt(0, 0, 0).expect("valid time of day")
    };
    Ok(Utc.from_utc_datetime(&time))
}

/// Start of the current day in UTC, the default lower bound for listings.
pub fn today_start() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.from_utc_datetime(&now.date_naive().and_hms_opt(0, 0, 0).expect("midnight"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round2_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(59.97)), dec!(59.97));
    }

    #[test]
    fn round2_line_subtotal_example() {
        // price 19.99 × qty 3 → 59.97
        assert_eq!(round2(dec!(19.99) * Decimal::from(3)), dec!(59.97));
    }

    #[test]
    fn parses_plain_dates_to_day_bounds() {
        let params = DateRangeParams {
            desde: Some("2026-01-15".to_string()),
            hasta: Some("2026-01-15".to_string()),
        };
        let (desde, hasta) = params.parse().unwrap();
        assert_eq!(desde.unwrap().to_rfc3339(), "2026-01-15T00:00:00+00:00");
        assert_eq!(hasta.unwrap().to_rfc3339(), "2026-01-15T23:59:59+00:00");
    }

    #[test]
    fn rejects_malformed_dates() {
        let params = DateRangeParams {
            desde: Some("15/01/2026".to_string()),
            hasta: None,
        };
        assert!(params.parse().is_err());
    }
}
