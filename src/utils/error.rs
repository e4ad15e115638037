use crate::domain::model::Jurisdiction;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeadlineError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Holiday source returned HTTP {status} for {url}")]
    RemoteStatus { status: u16, url: String },

    #[error("Holiday source timed out after {attempts} attempt(s)")]
    RemoteFetchTimeout { attempts: u32 },

    #[error("Malformed holiday payload: {message}")]
    MalformedPayload { message: String },

    #[error("Holiday source has no data for {jurisdiction} in {year}")]
    YearNotCovered { jurisdiction: Jurisdiction, year: i32 },

    #[error("Holiday data unavailable for {jurisdiction} in {year}: no remote, cached or seed data")]
    DataUnavailable { jurisdiction: Jurisdiction, year: i32 },

    #[error("Invalid period: {period_days} day(s); periods must be between 1 and 1000 days")]
    InvalidPeriod { period_days: i64 },

    #[error("Invalid claim value: {value_pence} pence; claims must be positive")]
    InvalidClaimValue { value_pence: i64 },

    #[error("Invalid fee table: {message}")]
    InvalidFeeTable { message: String },

    #[error("Invalid date: {message}")]
    InvalidDate { message: String },

    #[error("Computation from {from_year} reaches {to_year}, more than {max_years} years of {jurisdiction} holidays")]
    SpanTooLong {
        jurisdiction: Jurisdiction,
        from_year: i32,
        to_year: i32,
        max_years: i32,
    },
}

impl DeadlineError {
    /// Failures of the remote holiday source. These never escape the provider
    /// on their own; they trigger the cache and seed fallbacks.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            DeadlineError::ApiError(_)
                | DeadlineError::RemoteStatus { .. }
                | DeadlineError::RemoteFetchTimeout { .. }
                | DeadlineError::MalformedPayload { .. }
                | DeadlineError::YearNotCovered { .. }
        )
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DeadlineError::InvalidPeriod { .. }
                | DeadlineError::InvalidClaimValue { .. }
                | DeadlineError::InvalidDate { .. }
                | DeadlineError::SpanTooLong { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_invalid_input() => 2,
            DeadlineError::DataUnavailable { .. } => 3,
            DeadlineError::ConfigError { .. }
            | DeadlineError::InvalidConfigValueError { .. }
            | DeadlineError::MissingConfigError { .. }
            | DeadlineError::InvalidFeeTable { .. } => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeadlineError>;
