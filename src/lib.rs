pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{FileHolidayStore, GovUkHolidaySource, SeedHolidays};
pub use config::EngineConfig;
pub use core::{
    business_days::HolidayCalendar, deadline::DeadlineRule, deemed_service::ServiceRules,
    engine::DeadlineEngine, fees::FeeTable, holiday_provider::ResilientHolidayProvider,
};
pub use domain::model::{
    DeadlineResult, DeemedServiceResult, FeeResult, Freshness, HolidaySet, Jurisdiction, Money,
    PeriodKind, ServiceMethod, ServiceTimeline, TransmissionEvent,
};
pub use utils::error::{DeadlineError, Result};
