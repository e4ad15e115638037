use crate::domain::model::{HolidaySet, Jurisdiction};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Remote authority for public holidays. Implementations do no caching.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch_holidays(&self, jurisdiction: Jurisdiction, year: i32)
        -> Result<BTreeSet<NaiveDate>>;
}

/// Durable holiday cache that survives process restarts.
pub trait HolidayStore: Send + Sync {
    fn load(
        &self,
        jurisdiction: Jurisdiction,
        year: i32,
    ) -> impl std::future::Future<Output = Result<Option<HolidaySet>>> + Send;
    fn save(&self, set: &HolidaySet) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait HolidayProvider: Send + Sync {
    async fn get_holidays(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Arc<HolidaySet>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
impl<P: HolidayProvider + ?Sized> HolidayProvider for Arc<P> {
    async fn get_holidays(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Arc<HolidaySet>> {
        (**self).get_holidays(jurisdiction, year).await
    }
}
