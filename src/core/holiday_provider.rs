//! Cache-first holiday lookup.
//!
//! Lookup order for a `(jurisdiction, year)` key:
//!
//! 1. the in-memory cache, while the entry is within its TTL;
//! 2. the durable store, while the entry is young enough to count as fresh;
//! 3. the remote source.
//!
//! When the remote source fails, any durable entry (however old) and then the
//! seed document are served marked [`Freshness::StaleFallback`]. With nothing
//! to fall back on the lookup fails with `DataUnavailable`; an empty holiday
//! set is never substituted.
//!
//! A set for a past year that was fetched fresh is final and never fetched
//! again.

use crate::adapters::{FileHolidayStore, GovUkHolidaySource, SeedHolidays};
use crate::config::HolidaysConfig;
use crate::domain::model::{Freshness, HolidaySet, Jurisdiction};
use crate::domain::ports::{Clock, HolidayProvider, HolidaySource, HolidayStore, SystemClock};
use crate::utils::error::{DeadlineError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// How long a stale fallback is served from memory before the remote source
/// is tried again.
const STALE_RETRY_INTERVAL: Duration = Duration::from_secs(5 * 60);

type CacheKey = (Jurisdiction, i32);

#[derive(Debug, Clone)]
struct CachedEntry {
    set: Arc<HolidaySet>,
    loaded_at: DateTime<Utc>,
}

pub struct ResilientHolidayProvider<S: HolidaySource, C: HolidayStore> {
    source: S,
    store: C,
    seed: Option<SeedHolidays>,
    clock: Arc<dyn Clock>,
    memory_ttl: Duration,
    durable_max_age: Duration,
    memory: RwLock<HashMap<CacheKey, CachedEntry>>,
}

impl ResilientHolidayProvider<GovUkHolidaySource, FileHolidayStore> {
    /// GOV.UK source with the on-disk cache, as configured.
    pub async fn from_config(config: &HolidaysConfig) -> Result<Self> {
        let source = GovUkHolidaySource::from_config(config)?;
        let store = FileHolidayStore::new(config.cache_dir()?);

        let mut provider = Self::new(source, store)
            .with_memory_ttl(config.memory_ttl())
            .with_durable_max_age(config.durable_max_age());
        if let Some(path) = config.seed_file() {
            provider = provider.with_seed(SeedHolidays::from_file(path).await?);
        }
        Ok(provider)
    }
}

impl<S: HolidaySource, C: HolidayStore> ResilientHolidayProvider<S, C> {
    pub fn new(source: S, store: C) -> Self {
        Self {
            source,
            store,
            seed: None,
            clock: Arc::new(SystemClock),
            memory_ttl: Duration::from_secs(24 * 60 * 60),
            durable_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            memory: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_seed(mut self, seed: SeedHolidays) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_memory_ttl(mut self, ttl: Duration) -> Self {
        self.memory_ttl = ttl;
        self
    }

    pub fn with_durable_max_age(mut self, max_age: Duration) -> Self {
        self.durable_max_age = max_age;
        self
    }

    pub async fn get_holidays(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Arc<HolidaySet>> {
        let key = (jurisdiction, year);
        let now = self.clock.now();

        if let Some(entry) = self.memory.read().await.get(&key) {
            if self.memory_entry_usable(entry, now) {
                tracing::debug!("Memory cache hit for {} {}", jurisdiction, year);
                return Ok(entry.set.clone());
            }
        }

        let durable = match self.store.load(jurisdiction, year).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    "Durable holiday cache unreadable for {} {}: {}",
                    jurisdiction,
                    year,
                    e
                );
                None
            }
        };

        if let Some(set) = &durable {
            if self.durable_entry_fresh(set, now) {
                tracing::debug!("Durable cache hit for {} {}", jurisdiction, year);
                let set = Arc::new(HolidaySet {
                    freshness: Freshness::Fresh,
                    ..set.clone()
                });
                self.remember(key, set.clone(), now).await;
                return Ok(set);
            }
        }

        match self.fetch_and_store(jurisdiction, year).await {
            Ok(set) => Ok(set),
            Err(e) => {
                tracing::warn!(
                    "Holiday source failed for {} {}: {}; trying fallbacks",
                    jurisdiction,
                    year,
                    e
                );
                self.fallback(jurisdiction, year, durable, now).await
            }
        }
    }

    /// Forces a remote fetch. On failure the caches are left untouched and the
    /// error is returned.
    pub async fn refresh(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Arc<HolidaySet>> {
        tracing::info!("Refreshing holidays for {} {}", jurisdiction, year);
        self.fetch_and_store(jurisdiction, year).await
    }

    /// Drops the in-memory entry; the durable copy stays as a fallback.
    pub async fn invalidate(&self, jurisdiction: Jurisdiction, year: i32) {
        self.memory.write().await.remove(&(jurisdiction, year));
    }

    pub async fn invalidate_all(&self) {
        self.memory.write().await.clear();
    }

    /// Whether `date` is a business day in `jurisdiction`, using the cached
    /// holidays for its year.
    pub async fn is_business_day(&self, date: NaiveDate, jurisdiction: Jurisdiction) -> Result<bool> {
        let holidays = self.get_holidays(jurisdiction, date.year()).await?;
        Ok(crate::core::business_days::is_business_day(date, holidays.as_ref()))
    }

    async fn fetch_and_store(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Arc<HolidaySet>> {
        let dates = self.source.fetch_holidays(jurisdiction, year).await?;
        let now = self.clock.now();
        let set = Arc::new(HolidaySet::new(
            jurisdiction,
            year,
            dates,
            now,
            Freshness::Fresh,
        ));

        if let Err(e) = self.store.save(&set).await {
            tracing::warn!(
                "Could not write durable holiday cache for {} {}: {}",
                jurisdiction,
                year,
                e
            );
        }
        self.remember((jurisdiction, year), set.clone(), now).await;
        Ok(set)
    }

    async fn fallback(
        &self,
        jurisdiction: Jurisdiction,
        year: i32,
        durable: Option<HolidaySet>,
        now: DateTime<Utc>,
    ) -> Result<Arc<HolidaySet>> {
        let stale = if let Some(set) = durable {
            tracing::warn!(
                "Using cached holidays for {} {} fetched at {}; they may be out of date",
                jurisdiction,
                year,
                set.fetched_at
            );
            Some(set.into_stale())
        } else {
            self.seed.as_ref().and_then(|seed| {
                match seed.holidays_for(jurisdiction, year) {
                    Ok(dates) => {
                        tracing::warn!(
                            "Using seed holidays from {} for {} {}; they may be out of date",
                            seed.path().display(),
                            jurisdiction,
                            year
                        );
                        Some(HolidaySet::new(
                            jurisdiction,
                            year,
                            dates,
                            now,
                            Freshness::StaleFallback,
                        ))
                    }
                    Err(e) => {
                        tracing::debug!("Seed file cannot answer {} {}: {}", jurisdiction, year, e);
                        None
                    }
                }
            })
        };

        match stale {
            Some(set) => {
                let set = Arc::new(set);
                self.remember((jurisdiction, year), set.clone(), now).await;
                Ok(set)
            }
            None => {
                tracing::error!("No holiday data for {} {}", jurisdiction, year);
                Err(DeadlineError::DataUnavailable { jurisdiction, year })
            }
        }
    }

    async fn remember(&self, key: CacheKey, set: Arc<HolidaySet>, now: DateTime<Utc>) {
        self.memory.write().await.insert(
            key,
            CachedEntry {
                set,
                loaded_at: now,
            },
        );
    }

    fn memory_entry_usable(&self, entry: &CachedEntry, now: DateTime<Utc>) -> bool {
        let age = elapsed(entry.loaded_at, now);
        match entry.set.freshness {
            Freshness::Fresh => entry.set.year < now.year() || age < self.memory_ttl,
            Freshness::StaleFallback => age < STALE_RETRY_INTERVAL.min(self.memory_ttl),
        }
    }

    fn durable_entry_fresh(&self, set: &HolidaySet, now: DateTime<Utc>) -> bool {
        set.year < now.year() || elapsed(set.fetched_at, now) < self.durable_max_age
    }
}

impl<S: HolidaySource + 'static, C: HolidayStore + 'static> ResilientHolidayProvider<S, C> {
    /// Refreshes in the background on the current tokio runtime.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        jurisdiction: Jurisdiction,
        year: i32,
    ) -> tokio::task::JoinHandle<Result<Arc<HolidaySet>>> {
        let provider = Arc::clone(self);
        tokio::spawn(async move { provider.refresh(jurisdiction, year).await })
    }
}

#[async_trait::async_trait]
impl<S: HolidaySource, C: HolidayStore> HolidayProvider for ResilientHolidayProvider<S, C> {
    async fn get_holidays(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Arc<HolidaySet>> {
        ResilientHolidayProvider::get_holidays(self, jurisdiction, year).await
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}
