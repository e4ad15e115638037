pub mod business_days;
pub mod deadline;
pub mod deemed_service;
pub mod engine;
pub mod fees;
pub mod holiday_provider;

pub use crate::domain::model::{
    DeadlineResult, DeemedServiceResult, FeeResult, Freshness, HolidaySet, Jurisdiction, Money,
    Period, PeriodKind, ServiceMethod, ServiceTimeline, TransmissionEvent,
};
pub use crate::domain::ports::{Clock, HolidayProvider, HolidaySource, HolidayStore};
pub use crate::utils::error::Result;
