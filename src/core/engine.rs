use crate::core::business_days::HolidayCalendar;
use crate::core::deadline::{self, DeadlineRule};
use crate::core::deemed_service::{self, ServiceRules};
use crate::core::fees::{self, FeeTable};
use crate::domain::model::{
    DeadlineResult, DeemedServiceResult, FeeResult, Jurisdiction, Money, PeriodKind,
    ServiceTimeline, TransmissionEvent,
};
use crate::domain::ports::HolidayProvider;
use crate::utils::error::{DeadlineError, Result};
use chrono::{Datelike, NaiveDate};

/// Upper bound on how many calendar years past the start date a single
/// computation may pull holidays for.
const MAX_YEAR_SPAN: i32 = 5;

/// Runs the rule engines against holiday data from a [`HolidayProvider`].
///
/// Holiday years are loaded on demand: a computation starts with the year of
/// its first date and is re-run with the following year added whenever its
/// result lands past the loaded years.
pub struct DeadlineEngine<P: HolidayProvider> {
    provider: P,
    service_rules: ServiceRules,
    fee_table: FeeTable,
}

impl<P: HolidayProvider> DeadlineEngine<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            service_rules: ServiceRules::default(),
            fee_table: FeeTable::ex50(),
        }
    }

    pub fn with_service_rules(mut self, rules: ServiceRules) -> Self {
        self.service_rules = rules;
        self
    }

    pub fn with_fee_table(mut self, table: FeeTable) -> Self {
        self.fee_table = table;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn compute_deemed_service(
        &self,
        event: &TransmissionEvent,
        jurisdiction: Jurisdiction,
    ) -> Result<DeemedServiceResult> {
        let result = self
            .with_calendar(jurisdiction, event.date, |calendar| {
                deemed_service::compute_deemed_service(event, &self.service_rules, calendar)
            })
            .await?;

        if result.holiday_data.is_stale() {
            tracing::warn!(
                "Deemed service date {} for {} relies on stale holiday data",
                result.deemed_date,
                jurisdiction
            );
        }
        tracing::info!(
            "Deemed service {} ({}) for transmission at {}",
            result.deemed_date,
            result.rule_citation,
            event.timestamp()
        );
        Ok(result)
    }

    /// Deadline for an ad hoc period. Periods below one day are rejected
    /// before any holiday data is requested.
    pub async fn compute_deadline(
        &self,
        reference_date: NaiveDate,
        period_days: i64,
        kind: PeriodKind,
        jurisdiction: Jurisdiction,
    ) -> Result<DeadlineResult> {
        let rule = DeadlineRule::for_period(period_days, kind)?;
        self.compute_deadline_for_rule(reference_date, &rule, jurisdiction)
            .await
    }

    pub async fn compute_deadline_for_rule(
        &self,
        reference_date: NaiveDate,
        rule: &DeadlineRule,
        jurisdiction: Jurisdiction,
    ) -> Result<DeadlineResult> {
        let result = self
            .with_calendar(jurisdiction, reference_date, |calendar| {
                deadline::compute_deadline(reference_date, rule, calendar)
            })
            .await?;

        if result.holiday_data.is_stale() {
            tracing::warn!(
                "Deadline {} for {} relies on stale holiday data",
                result.computed_date,
                jurisdiction
            );
        }
        tracing::info!(
            "{} deadline {} ({}) from {}",
            rule.name,
            result.computed_date,
            result.rule_citation,
            reference_date
        );
        Ok(result)
    }

    /// Deemed service followed by the acknowledgment-of-service deadline that
    /// runs from it.
    pub async fn compute_service_timeline(
        &self,
        event: &TransmissionEvent,
        jurisdiction: Jurisdiction,
    ) -> Result<ServiceTimeline> {
        let deemed_service = self.compute_deemed_service(event, jurisdiction).await?;
        let filing_deadline = self
            .compute_deadline_for_rule(
                deemed_service.deemed_date,
                &DeadlineRule::acknowledgment_of_service(),
                jurisdiction,
            )
            .await?;

        Ok(ServiceTimeline {
            transmission: *event,
            deemed_service,
            filing_deadline,
        })
    }

    pub fn compute_fee(&self, claim_value: Money) -> Result<FeeResult> {
        fees::compute_fee(claim_value, &self.fee_table)
    }

    async fn with_calendar<T, F>(&self, jurisdiction: Jurisdiction, start: NaiveDate, compute: F) -> Result<T>
    where
        F: Fn(&HolidayCalendar) -> Result<T>,
    {
        let first_year = start.year();
        let mut sets = vec![self.provider.get_holidays(jurisdiction, first_year).await?];

        loop {
            let last_year = first_year + sets.len() as i32 - 1;
            let calendar = HolidayCalendar::new(jurisdiction, sets.iter().cloned())?;

            match compute(&calendar) {
                Err(DeadlineError::DataUnavailable {
                    jurisdiction: missing_jurisdiction,
                    year,
                }) if missing_jurisdiction == jurisdiction && year > last_year => {
                    // Years are loaded one at a time; holidays in the new year
                    // can push the result further out.
                    let next_year = last_year + 1;
                    if next_year - first_year > MAX_YEAR_SPAN {
                        return Err(DeadlineError::SpanTooLong {
                            jurisdiction,
                            from_year: first_year,
                            to_year: year,
                            max_years: MAX_YEAR_SPAN,
                        });
                    }
                    tracing::debug!("Extending {} calendar to {}", jurisdiction, next_year);
                    sets.push(self.provider.get_holidays(jurisdiction, next_year).await?);
                }
                other => return other,
            }
        }
    }
}
