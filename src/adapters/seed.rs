use crate::adapters::http::BankHolidayPayload;
use crate::domain::model::Jurisdiction;
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A GOV.UK-format bank-holidays document shipped alongside the binary, used
/// when neither the remote source nor the durable cache can answer.
#[derive(Debug, Clone)]
pub struct SeedHolidays {
    path: PathBuf,
    payload: BankHolidayPayload,
}

impl SeedHolidays {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let body = tokio::fs::read_to_string(&path).await?;
        let payload = BankHolidayPayload::parse(&body)?;
        tracing::debug!("Loaded seed holidays from {}", path.display());
        Ok(Self { path, payload })
    }

    pub fn from_payload(path: PathBuf, payload: BankHolidayPayload) -> Self {
        Self { path, payload }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn holidays_for(&self, jurisdiction: Jurisdiction, year: i32) -> Result<BTreeSet<NaiveDate>> {
        self.payload.holidays_for(jurisdiction, year)
    }
}
