use crate::config::HolidaysConfig;
use crate::domain::model::Jurisdiction;
use crate::domain::ports::HolidaySource;
use crate::utils::error::{DeadlineError, Result};
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

pub const GOV_UK_BANK_HOLIDAYS_URL: &str = "https://www.gov.uk/bank-holidays.json";

/// One division of the GOV.UK bank-holidays document.
#[derive(Debug, Clone, Deserialize)]
pub struct Division {
    pub division: String,
    pub events: Vec<BankHolidayEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankHolidayEvent {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub bunting: bool,
}

/// The full GOV.UK document, keyed by division slug.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BankHolidayPayload(HashMap<String, Division>);

impl BankHolidayPayload {
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| DeadlineError::MalformedPayload {
            message: e.to_string(),
        })
    }

    /// Holidays for one jurisdiction and year. A year without a single event
    /// means the document does not cover it; every UK division has holidays
    /// every year.
    pub fn holidays_for(&self, jurisdiction: Jurisdiction, year: i32) -> Result<BTreeSet<NaiveDate>> {
        let division =
            self.0
                .get(jurisdiction.slug())
                .ok_or_else(|| DeadlineError::MalformedPayload {
                    message: format!("division '{}' is missing", jurisdiction.slug()),
                })?;

        if division.division != jurisdiction.slug() {
            return Err(DeadlineError::MalformedPayload {
                message: format!(
                    "division key '{}' holds data for '{}'",
                    jurisdiction.slug(),
                    division.division
                ),
            });
        }

        let dates: BTreeSet<NaiveDate> = division
            .events
            .iter()
            .map(|event| event.date)
            .filter(|date| date.year() == year)
            .collect();

        if dates.is_empty() {
            return Err(DeadlineError::YearNotCovered { jurisdiction, year });
        }
        Ok(dates)
    }
}

pub struct GovUkHolidaySource {
    client: Client,
    endpoint: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl GovUkHolidaySource {
    /// `retry_attempts` is clamped to one retry.
    pub fn new(
        endpoint: String,
        timeout: Duration,
        retry_attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            max_attempts: 1 + retry_attempts.min(1),
            retry_delay,
        })
    }

    pub fn from_config(config: &HolidaysConfig) -> Result<Self> {
        Self::new(
            config.endpoint().to_string(),
            config.timeout(),
            config.retry_attempts(),
            config.retry_delay(),
        )
    }

    async fn fetch_once(&self) -> Result<BankHolidayPayload> {
        tracing::debug!("Making holiday request to: {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;
        tracing::debug!("Holiday source response status: {}", response.status());

        let status = response.status();
        if !status.is_success() {
            return Err(DeadlineError::RemoteStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = response.text().await?;
        BankHolidayPayload::parse(&body)
    }

    async fn fetch_payload(&self) -> Result<BankHolidayPayload> {
        let mut attempt = 1;
        loop {
            match self.fetch_once().await {
                Ok(payload) => return Ok(payload),
                Err(e) if attempt < self.max_attempts && is_transient(&e) => {
                    tracing::warn!(
                        "Holiday request attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(DeadlineError::ApiError(e)) if e.is_timeout() => {
                    return Err(DeadlineError::RemoteFetchTimeout { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(error: &DeadlineError) -> bool {
    match error {
        DeadlineError::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        DeadlineError::RemoteStatus { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

#[async_trait::async_trait]
impl HolidaySource for GovUkHolidaySource {
    async fn fetch_holidays(
        &self,
        jurisdiction: Jurisdiction,
        year: i32,
    ) -> Result<BTreeSet<NaiveDate>> {
        let payload = self.fetch_payload().await?;
        let dates = payload.holidays_for(jurisdiction, year)?;
        tracing::info!(
            "Fetched {} bank holidays for {} {}",
            dates.len(),
            jurisdiction,
            year
        );
        Ok(dates)
    }
}
