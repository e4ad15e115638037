use crate::core::business_days::{add_business_days, add_calendar_days, HolidayCalendar};
use crate::domain::model::{DeemedServiceResult, Period, ServiceMethod, TransmissionEvent};
use crate::utils::error::{DeadlineError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const DEEMED_SERVICE_CITATION: &str = "CPR 6.14/6.26";

/// How one service method turns a transmission into a deemed-service date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRule {
    /// Transmissions strictly after this local time count as sent the next
    /// calendar day.
    pub cutoff: Option<NaiveTime>,
    pub business_days: u32,
    pub citation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRules {
    pub electronic: ServiceRule,
    pub post: ServiceRule,
    pub personal: ServiceRule,
}

impl ServiceRules {
    pub fn standard_cutoff() -> NaiveTime {
        NaiveTime::from_hms_opt(16, 30, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn with_electronic_cutoff(cutoff: NaiveTime) -> Self {
        let second_business_day = |cutoff| ServiceRule {
            cutoff,
            business_days: 2,
            citation: DEEMED_SERVICE_CITATION.to_string(),
        };
        Self {
            electronic: second_business_day(Some(cutoff)),
            post: second_business_day(None),
            personal: second_business_day(None),
        }
    }

    pub fn for_method(&self, method: ServiceMethod) -> &ServiceRule {
        match method {
            ServiceMethod::Electronic => &self.electronic,
            ServiceMethod::Post => &self.post,
            ServiceMethod::Personal => &self.personal,
        }
    }
}

impl Default for ServiceRules {
    fn default() -> Self {
        Self::with_electronic_cutoff(Self::standard_cutoff())
    }
}

/// Deemed service is the rule's n-th business day after the effective
/// transmission date. The effective date itself never counts, even when it is
/// a business day, and the count starts from it even when it is not.
pub fn compute_deemed_service(
    event: &TransmissionEvent,
    rules: &ServiceRules,
    calendar: &HolidayCalendar,
) -> Result<DeemedServiceResult> {
    let rule = rules.for_method(event.method);
    if rule.business_days > Period::MAX_DAYS {
        return Err(DeadlineError::InvalidPeriod {
            period_days: i64::from(rule.business_days),
        });
    }

    let cutoff_applied = rule.cutoff.is_some_and(|cutoff| event.time > cutoff);
    let effective_date = if cutoff_applied {
        add_calendar_days(event.date, 1)?
    } else {
        event.date
    };
    calendar.ensure_covers(effective_date)?;

    let deemed_date = add_business_days(effective_date, rule.business_days, calendar)?;
    calendar.ensure_covers(deemed_date)?;

    let naive_date = add_calendar_days(effective_date, rule.business_days)?;

    tracing::debug!(
        "Deemed service for {:?} at {}: effective {}, deemed {}",
        event.method,
        event.timestamp(),
        effective_date,
        deemed_date
    );

    Ok(DeemedServiceResult {
        jurisdiction: calendar.jurisdiction(),
        transmission: *event,
        effective_date,
        deemed_date,
        rule_citation: rule.citation.clone(),
        cutoff_applied,
        rollforward_applied: deemed_date != naive_date,
        holiday_data: calendar.freshness(),
    })
}
