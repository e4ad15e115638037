use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::DeadlineError;

/// UK legal jurisdictions with distinct bank-holiday calendars. The serialized
/// form matches the GOV.UK division keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Jurisdiction {
    EnglandAndWales,
    Scotland,
    NorthernIreland,
}

impl Jurisdiction {
    pub const ALL: [Jurisdiction; 3] = [
        Jurisdiction::EnglandAndWales,
        Jurisdiction::Scotland,
        Jurisdiction::NorthernIreland,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Jurisdiction::EnglandAndWales => "england-and-wales",
            Jurisdiction::Scotland => "scotland",
            Jurisdiction::NorthernIreland => "northern-ireland",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Jurisdiction {
    type Err = DeadlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Jurisdiction::ALL
            .into_iter()
            .find(|j| j.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DeadlineError::InvalidConfigValueError {
                field: "jurisdiction".to_string(),
                value: s.to_string(),
                reason: "Expected england-and-wales, scotland or northern-ireland".to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Freshness {
    Fresh,
    StaleFallback,
}

impl Freshness {
    /// The degraded of the two; a calculation is only as fresh as its stalest input.
    pub fn combine(self, other: Freshness) -> Freshness {
        self.max(other)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Freshness::StaleFallback)
    }
}

/// Public holidays for one jurisdiction and calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidaySet {
    pub jurisdiction: Jurisdiction,
    pub year: i32,
    pub dates: BTreeSet<NaiveDate>,
    pub fetched_at: DateTime<Utc>,
    pub freshness: Freshness,
}

impl HolidaySet {
    pub fn new(
        jurisdiction: Jurisdiction,
        year: i32,
        dates: impl IntoIterator<Item = NaiveDate>,
        fetched_at: DateTime<Utc>,
        freshness: Freshness,
    ) -> Self {
        Self {
            jurisdiction,
            year,
            dates: dates.into_iter().filter(|d| d.year() == year).collect(),
            fetched_at,
            freshness,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// A copy of this set marked as served from a fallback.
    pub fn into_stale(self) -> Self {
        Self {
            freshness: Freshness::StaleFallback,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceMethod {
    Electronic,
    Post,
    Personal,
}

impl FromStr for ServiceMethod {
    type Err = DeadlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "electronic" | "email" => Ok(ServiceMethod::Electronic),
            "post" => Ok(ServiceMethod::Post),
            "personal" => Ok(ServiceMethod::Personal),
            _ => Err(DeadlineError::InvalidConfigValueError {
                field: "method".to_string(),
                value: s.to_string(),
                reason: "Expected electronic, post or personal".to_string(),
            }),
        }
    }
}

/// A document transmission, timestamped in UK local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionEvent {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub method: ServiceMethod,
}

impl TransmissionEvent {
    pub fn new(date: NaiveDate, time: NaiveTime, method: ServiceMethod) -> Self {
        Self { date, time, method }
    }

    pub fn at(timestamp: NaiveDateTime, method: ServiceMethod) -> Self {
        Self::new(timestamp.date(), timestamp.time(), method)
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeemedServiceResult {
    pub jurisdiction: Jurisdiction,
    pub transmission: TransmissionEvent,
    /// Calendar date the business-day count starts from, after the cutoff rule.
    pub effective_date: NaiveDate,
    pub deemed_date: NaiveDate,
    pub rule_citation: String,
    pub cutoff_applied: bool,
    /// True when non-business days pushed the deemed date past the plain
    /// calendar count.
    pub rollforward_applied: bool,
    pub holiday_data: Freshness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodKind {
    Calendar,
    Business,
}

impl FromStr for PeriodKind {
    type Err = DeadlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" => Ok(PeriodKind::Calendar),
            "business" => Ok(PeriodKind::Business),
            _ => Err(DeadlineError::InvalidConfigValueError {
                field: "kind".to_string(),
                value: s.to_string(),
                reason: "Expected calendar or business".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub days: u32,
    pub kind: PeriodKind,
}

impl Period {
    /// Longest period accepted, in days of either kind. A thousand business
    /// days stays within the five holiday years one computation may load.
    pub const MAX_DAYS: u32 = 1_000;

    pub fn new(period_days: i64, kind: PeriodKind) -> Result<Self, DeadlineError> {
        match u32::try_from(period_days) {
            Ok(days) if (1..=Self::MAX_DAYS).contains(&days) => Ok(Self { days, kind }),
            _ => Err(DeadlineError::InvalidPeriod { period_days }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineResult {
    pub jurisdiction: Jurisdiction,
    pub reference_date: NaiveDate,
    pub period: Period,
    /// The date before any weekend/holiday adjustment.
    pub naive_date: NaiveDate,
    pub computed_date: NaiveDate,
    pub rollforward_applied: bool,
    pub rule_citation: String,
    pub holiday_data: Freshness,
}

/// The three dates a calendar export needs for one served document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTimeline {
    pub transmission: TransmissionEvent,
    pub deemed_service: DeemedServiceResult,
    pub filing_deadline: DeadlineResult,
}

impl ServiceTimeline {
    pub fn holiday_data(&self) -> Freshness {
        self.deemed_service
            .holiday_data
            .combine(self.filing_deadline.holiday_data)
    }
}

/// An amount of sterling held as whole pence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_pence(pence: i64) -> Self {
        Money(pence)
    }

    pub const fn from_pounds(pounds: i64) -> Self {
        Money(pounds * 100)
    }

    pub fn pence(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let pounds = (abs / 100).to_string();
        let mut grouped = String::with_capacity(pounds.len() + pounds.len() / 3);
        for (i, ch) in pounds.chars().enumerate() {
            if i > 0 && (pounds.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{}£{}.{:02}", sign, grouped, abs % 100)
    }
}

impl FromStr for Money {
    type Err = DeadlineError;

    /// Accepts `15000`, `15,000.50` and `£15000.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DeadlineError::InvalidConfigValueError {
            field: "claim_value".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let cleaned: String = s
            .trim()
            .trim_start_matches('£')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("Expected an amount such as 15000 or 15,000.50"));
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("At most two decimal places are allowed"));
        }

        let pounds: i64 = whole
            .parse()
            .map_err(|_| invalid("Amount is too large"))?;
        let pence: i64 = format!("{:0<2}", frac).parse().unwrap_or(0);
        let total = pounds
            .checked_mul(100)
            .and_then(|p| p.checked_add(pence))
            .ok_or_else(|| invalid("Amount is too large"))?;

        Ok(Money(if negative { -total } else { total }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeResult {
    pub claim_value: Money,
    pub fee_amount: Money,
    /// Index of the matched bracket in its table.
    pub bracket_matched: usize,
    pub capped: bool,
}
