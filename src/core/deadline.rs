use crate::core::business_days::{
    add_business_days, add_calendar_days, roll_forward_if_needed, HolidayCalendar,
};
use crate::domain::model::{DeadlineResult, Period, PeriodKind};
use crate::utils::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const CALENDAR_PERIOD_CITATION: &str = "CPR 2.8(5)";
const BUSINESS_PERIOD_CITATION: &str = "CPR 2.8(4)";

/// A named procedural period and the rule it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRule {
    pub name: String,
    pub period: Period,
    pub citation: String,
}

impl DeadlineRule {
    pub fn new(name: &str, period: Period, citation: &str) -> Self {
        Self {
            name: name.to_string(),
            period,
            citation: citation.to_string(),
        }
    }

    pub fn acknowledgment_of_service() -> Self {
        Self::new(
            "acknowledgment-of-service",
            Period {
                days: 14,
                kind: PeriodKind::Calendar,
            },
            "CPR 10.3(1)(b) / CPR 2.8(5)",
        )
    }

    pub fn defence() -> Self {
        Self::new(
            "defence",
            Period {
                days: 28,
                kind: PeriodKind::Calendar,
            },
            "CPR 15.4(1)(b) / CPR 2.8(5)",
        )
    }

    pub fn known() -> Vec<DeadlineRule> {
        vec![Self::acknowledgment_of_service(), Self::defence()]
    }

    /// The named rule for this period if there is one, otherwise a generic
    /// rule citing the CPR 2.8 time-computation provisions.
    pub fn for_period(period_days: i64, kind: PeriodKind) -> Result<Self> {
        let period = Period::new(period_days, kind)?;
        Ok(Self::known()
            .into_iter()
            .find(|rule| rule.period == period)
            .unwrap_or_else(|| {
                let citation = match kind {
                    PeriodKind::Calendar => CALENDAR_PERIOD_CITATION,
                    PeriodKind::Business => BUSINESS_PERIOD_CITATION,
                };
                Self::new("custom", period, citation)
            }))
    }
}

pub fn compute_deadline(
    reference_date: NaiveDate,
    rule: &DeadlineRule,
    calendar: &HolidayCalendar,
) -> Result<DeadlineResult> {
    let period = Period::new(i64::from(rule.period.days), rule.period.kind)?;
    calendar.ensure_covers(reference_date)?;

    let naive_date = match period.kind {
        PeriodKind::Calendar => add_calendar_days(reference_date, period.days)?,
        PeriodKind::Business => add_business_days(reference_date, period.days, calendar)?,
    };
    let (computed_date, rollforward_applied) = roll_forward_if_needed(naive_date, calendar)?;
    calendar.ensure_covers(computed_date)?;

    if rollforward_applied {
        tracing::debug!(
            "{} deadline {} is not a business day, moved to {}",
            rule.name,
            naive_date,
            computed_date
        );
    }

    Ok(DeadlineResult {
        jurisdiction: calendar.jurisdiction(),
        reference_date,
        period,
        naive_date,
        computed_date,
        rollforward_applied,
        rule_citation: rule.citation.clone(),
        holiday_data: calendar.freshness(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Jurisdiction;
    use chrono::Datelike;
    use crate::utils::error::DeadlineError;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn calendar() -> HolidayCalendar {
        HolidayCalendar::from_dates(
            Jurisdiction::EnglandAndWales,
            2023..=2026,
            &[
                d(2023, 12, 25),
                d(2023, 12, 26),
                d(2025, 12, 25),
                d(2025, 12, 26),
                d(2026, 1, 1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_calendar_period_rolls_weekend_forward() {
        let rule = DeadlineRule::acknowledgment_of_service();
        let result = compute_deadline(d(2025, 12, 20), &rule, &calendar()).unwrap();

        assert_eq!(result.naive_date, d(2026, 1, 3));
        assert_eq!(result.computed_date, d(2026, 1, 5));
        assert!(result.rollforward_applied);
        assert_eq!(result.rule_citation, "CPR 10.3(1)(b) / CPR 2.8(5)");
    }

    #[test]
    fn test_calendar_period_on_business_day_is_unchanged() {
        let rule = DeadlineRule::acknowledgment_of_service();
        let result = compute_deadline(d(2023, 10, 5), &rule, &calendar()).unwrap();

        assert_eq!(result.computed_date, d(2023, 10, 19));
        assert!(!result.rollforward_applied);
    }

    #[test]
    fn test_calendar_period_rolls_over_bank_holiday() {
        let rule = DeadlineRule::acknowledgment_of_service();
        let result = compute_deadline(d(2023, 12, 12), &rule, &calendar()).unwrap();

        assert_eq!(result.naive_date, d(2023, 12, 26));
        assert_eq!(result.computed_date, d(2023, 12, 27));
        assert!(result.rollforward_applied);
    }

    #[test]
    fn test_business_period_skips_during_the_count() {
        let rule = DeadlineRule::for_period(5, PeriodKind::Business).unwrap();
        let result = compute_deadline(d(2025, 12, 22), &rule, &calendar()).unwrap();

        // Tue 23, Wed 24, (25, 26 holidays, weekend) Mon 29, Tue 30, Wed 31.
        assert_eq!(result.computed_date, d(2025, 12, 31));
        assert!(!result.rollforward_applied);
        assert_eq!(result.rule_citation, "CPR 2.8(4)");
    }

    #[test]
    fn test_for_period_prefers_named_rules() {
        assert_eq!(
            DeadlineRule::for_period(14, PeriodKind::Calendar).unwrap(),
            DeadlineRule::acknowledgment_of_service()
        );
        assert_eq!(
            DeadlineRule::for_period(28, PeriodKind::Calendar).unwrap(),
            DeadlineRule::defence()
        );
        assert_eq!(
            DeadlineRule::for_period(21, PeriodKind::Calendar)
                .unwrap()
                .citation,
            "CPR 2.8(5)"
        );
    }

    #[test]
    fn test_non_positive_periods_are_rejected() {
        assert!(matches!(
            DeadlineRule::for_period(0, PeriodKind::Calendar),
            Err(DeadlineError::InvalidPeriod { period_days: 0 })
        ));
        assert!(matches!(
            DeadlineRule::for_period(-14, PeriodKind::Business),
            Err(DeadlineError::InvalidPeriod { period_days: -14 })
        ));

        let hand_built = DeadlineRule::new(
            "broken",
            Period {
                days: 0,
                kind: PeriodKind::Calendar,
            },
            "n/a",
        );
        assert!(matches!(
            compute_deadline(d(2025, 1, 6), &hand_built, &calendar()),
            Err(DeadlineError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_oversized_periods_are_rejected_not_computed() {
        assert!(matches!(
            DeadlineRule::for_period(4_000_000_000, PeriodKind::Calendar),
            Err(DeadlineError::InvalidPeriod { period_days: 4_000_000_000 })
        ));
        assert!(matches!(
            DeadlineRule::for_period(1_600, PeriodKind::Business),
            Err(DeadlineError::InvalidPeriod { period_days: 1_600 })
        ));

        let hand_built = DeadlineRule::new(
            "huge",
            Period {
                days: u32::MAX,
                kind: PeriodKind::Calendar,
            },
            "n/a",
        );
        assert!(matches!(
            compute_deadline(d(2025, 1, 6), &hand_built, &calendar()),
            Err(DeadlineError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_deadline_past_the_last_representable_date_is_an_error() {
        let last_year = NaiveDate::MAX.year();
        let calendar =
            HolidayCalendar::from_dates(Jurisdiction::EnglandAndWales, last_year..=last_year, &[])
                .unwrap();
        let result = compute_deadline(
            NaiveDate::from_ymd_opt(last_year, 12, 1).unwrap(),
            &DeadlineRule::defence(),
            &calendar,
        );
        assert!(matches!(result, Err(DeadlineError::InvalidDate { .. })));
    }

    #[test]
    fn test_same_inputs_give_same_result() {
        let rule = DeadlineRule::defence();
        let calendar = calendar();
        let first = compute_deadline(d(2025, 11, 30), &rule, &calendar).unwrap();
        let second = compute_deadline(d(2025, 11, 30), &rule, &calendar).unwrap();
        assert_eq!(first, second);
        assert!(first.computed_date >= first.reference_date);
    }

    #[test]
    fn test_deadline_beyond_the_calendar_is_unavailable() {
        let rule = DeadlineRule::defence();
        assert!(matches!(
            compute_deadline(d(2026, 12, 20), &rule, &calendar()),
            Err(DeadlineError::DataUnavailable { year: 2027, .. })
        ));
    }
}
