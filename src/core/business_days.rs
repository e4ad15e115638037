//! Business-day arithmetic.
//!
//! Everything here is pure: the only input besides dates is a
//! [`BusinessDayPredicate`] saying which weekdays are public holidays. A
//! business day is a Monday to Friday that the predicate does not flag.

use crate::domain::model::{Freshness, HolidaySet, Jurisdiction};
use crate::utils::error::{DeadlineError, Result};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Flags public holidays for a single jurisdiction. Weekends are handled by
/// the calculator, not the predicate.
pub trait BusinessDayPredicate {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

impl<F> BusinessDayPredicate for F
where
    F: Fn(NaiveDate) -> bool,
{
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

impl BusinessDayPredicate for HolidaySet {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.contains(date)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_business_day<P: BusinessDayPredicate + ?Sized>(date: NaiveDate, predicate: &P) -> bool {
    !is_weekend(date) && !predicate.is_holiday(date)
}

/// Smallest business day strictly after `date`.
pub fn next_business_day<P: BusinessDayPredicate + ?Sized>(
    date: NaiveDate,
    predicate: &P,
) -> Result<NaiveDate> {
    let mut current = add_calendar_days(date, 1)?;
    while !is_business_day(current, predicate) {
        current = add_calendar_days(current, 1)?;
    }
    Ok(current)
}

/// Fails with `InvalidDate` when the result is past the last date chrono can
/// represent.
pub fn add_calendar_days(date: NaiveDate, n: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(n)))
        .ok_or_else(|| DeadlineError::InvalidDate {
            message: format!("{} plus {} day(s) is out of range", date, n),
        })
}

pub fn roll_forward_if_needed<P: BusinessDayPredicate + ?Sized>(
    date: NaiveDate,
    predicate: &P,
) -> Result<(NaiveDate, bool)> {
    if is_business_day(date, predicate) {
        Ok((date, false))
    } else {
        Ok((next_business_day(date, predicate)?, true))
    }
}

/// Advances to the next business day `n` times. `date` itself never counts.
pub fn add_business_days<P: BusinessDayPredicate + ?Sized>(
    date: NaiveDate,
    n: u32,
    predicate: &P,
) -> Result<NaiveDate> {
    (0..n).try_fold(date, |current, _| next_business_day(current, predicate))
}

/// Business days in the half-open interval `(start, end]`.
pub fn count_business_days_between<P: BusinessDayPredicate + ?Sized>(
    start: NaiveDate,
    end: NaiveDate,
    predicate: &P,
) -> u32 {
    start
        .iter_days()
        .skip(1)
        .take_while(|d| *d <= end)
        .filter(|d| is_business_day(*d, predicate))
        .count() as u32
}

/// A multi-year holiday snapshot for one jurisdiction.
///
/// Years are contiguous. Queries outside the covered years must not be
/// answered, so engines call [`HolidayCalendar::ensure_covers`] on every date
/// they return.
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    jurisdiction: Jurisdiction,
    years: BTreeMap<i32, Arc<HolidaySet>>,
}

impl HolidayCalendar {
    pub fn new(
        jurisdiction: Jurisdiction,
        sets: impl IntoIterator<Item = Arc<HolidaySet>>,
    ) -> Result<Self> {
        let mut years = BTreeMap::new();
        for set in sets {
            if set.jurisdiction != jurisdiction {
                return Err(DeadlineError::ConfigError {
                    message: format!(
                        "holiday set for {} cannot be used in a {} calendar",
                        set.jurisdiction, jurisdiction
                    ),
                });
            }
            years.insert(set.year, set);
        }

        let (Some(first), Some(last)) = (years.keys().next(), years.keys().next_back()) else {
            return Err(DeadlineError::ConfigError {
                message: format!("holiday calendar for {} has no years", jurisdiction),
            });
        };
        if let Some(gap) = (*first..=*last).find(|y| !years.contains_key(y)) {
            return Err(DeadlineError::DataUnavailable {
                jurisdiction,
                year: gap,
            });
        }

        Ok(Self {
            jurisdiction,
            years,
        })
    }

    /// Builds a fresh snapshot from fixed dates, for callers that already know
    /// their holidays.
    pub fn from_dates(
        jurisdiction: Jurisdiction,
        years: std::ops::RangeInclusive<i32>,
        dates: &[NaiveDate],
    ) -> Result<Self> {
        let fetched_at = chrono::Utc::now();
        let sets = years.map(|year| {
            Arc::new(HolidaySet::new(
                jurisdiction,
                year,
                dates.iter().copied(),
                fetched_at,
                Freshness::Fresh,
            ))
        });
        Self::new(jurisdiction, sets)
    }

    pub fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    pub fn freshness(&self) -> Freshness {
        self.years
            .values()
            .fold(Freshness::Fresh, |acc, set| acc.combine(set.freshness))
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.years.contains_key(&date.year())
    }

    pub fn ensure_covers(&self, date: NaiveDate) -> Result<()> {
        if self.covers(date) {
            Ok(())
        } else {
            Err(DeadlineError::DataUnavailable {
                jurisdiction: self.jurisdiction,
                year: date.year(),
            })
        }
    }
}

impl BusinessDayPredicate for HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.years
            .get(&date.year())
            .is_some_and(|set| set.contains(date))
    }
}
