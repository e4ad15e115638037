#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::http::GOV_UK_BANK_HOLIDAYS_URL;
use crate::core::deemed_service::ServiceRules;
use crate::core::fees::{FeeBracket, FeeTable};
use crate::utils::error::{DeadlineError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_CACHE_AGE: Duration = Duration::from_secs(366 * 24 * 60 * 60);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub holidays: HolidaysConfig,
    pub service: ServiceConfig,
    pub fees: FeesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HolidaysConfig {
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_millis: Option<u64>,
    pub memory_ttl_seconds: Option<u64>,
    pub durable_max_age_seconds: Option<u64>,
    pub cache_dir: Option<String>,
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Local time, `HH:MM` or `HH:MM:SS`.
    pub electronic_cutoff: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeesConfig {
    pub brackets: Option<Vec<FeeBracket>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: Option<bool>,
}

impl EngineConfig {
    /// Reads and parses a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DeadlineError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DeadlineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left in place.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| DeadlineError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn service_rules(&self) -> Result<ServiceRules> {
        match &self.service.electronic_cutoff {
            Some(raw) => Ok(ServiceRules::with_electronic_cutoff(parse_local_time(
                "service.electronic_cutoff",
                raw,
            )?)),
            None => Ok(ServiceRules::default()),
        }
    }

    pub fn fee_table(&self) -> Result<FeeTable> {
        match &self.fees.brackets {
            Some(brackets) => FeeTable::new(brackets.clone()),
            None => Ok(FeeTable::ex50()),
        }
    }

    pub fn json_logging(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }
}

impl HolidaysConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(GOV_UK_BANK_HOLIDAYS_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(3))
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_millis.unwrap_or(250))
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_seconds.unwrap_or(24 * 60 * 60))
    }

    pub fn durable_max_age(&self) -> Duration {
        Duration::from_secs(self.durable_max_age_seconds.unwrap_or(7 * 24 * 60 * 60))
    }

    /// Configured directory, else `$HOME/.legal_toolkit/holidays`.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(PathBuf::from(dir));
        }
        let home = std::env::var("HOME").ok();
        let home = validation::validate_required_field("holidays.cache_dir", &home)?;
        Ok(Path::new(home).join(".legal_toolkit").join("holidays"))
    }

    pub fn seed_file(&self) -> Option<PathBuf> {
        self.seed_file.as_ref().map(PathBuf::from)
    }
}

/// Parses a local wall-clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_local_time(field: &str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| DeadlineError::InvalidConfigValueError {
            field: field.to_string(),
            value: raw.to_string(),
            reason: format!("Expected HH:MM or HH:MM:SS ({})", e),
        })
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        let holidays = &self.holidays;
        validation::validate_url("holidays.endpoint", holidays.endpoint())?;

        if let Some(timeout) = holidays.timeout_seconds {
            validation::validate_duration_secs("holidays.timeout_seconds", timeout, MAX_TIMEOUT)?;
        }
        if let Some(retries) = holidays.retry_attempts {
            validation::validate_range("holidays.retry_attempts", retries, 0, 1)?;
        }
        if let Some(ttl) = holidays.memory_ttl_seconds {
            validation::validate_duration_secs("holidays.memory_ttl_seconds", ttl, MAX_CACHE_AGE)?;
        }
        if let Some(age) = holidays.durable_max_age_seconds {
            validation::validate_duration_secs("holidays.durable_max_age_seconds", age, MAX_CACHE_AGE)?;
        }
        if let Some(dir) = &holidays.cache_dir {
            validation::validate_path("holidays.cache_dir", dir)?;
        }
        if let Some(seed) = &holidays.seed_file {
            validation::validate_path("holidays.seed_file", seed)?;
        }

        self.service_rules()?;
        self.fee_table()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Money;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();

        assert_eq!(config.holidays.endpoint(), "https://www.gov.uk/bank-holidays.json");
        assert_eq!(config.holidays.timeout(), Duration::from_secs(3));
        assert_eq!(config.holidays.retry_attempts(), 1);
        assert_eq!(config.service_rules().unwrap(), ServiceRules::default());
        assert_eq!(config.fee_table().unwrap(), FeeTable::ex50());
        assert!(!config.json_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[holidays]
endpoint = "https://holidays.example.com/bank-holidays.json"
timeout_seconds = 5
retry_attempts = 0
cache_dir = "/var/cache/cpr"
seed_file = "/usr/share/cpr/bank-holidays.json"

[service]
electronic_cutoff = "16:00"

[[fees.brackets]]
lower = 0
upper = 100000
formula = { type = "flat", amount = 5000 }

[[fees.brackets]]
lower = 100000
formula = { type = "percentage", basis_points = 500, cap = 1000000 }

[logging]
json = true
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.holidays.timeout(), Duration::from_secs(5));
        assert_eq!(config.holidays.retry_attempts(), 0);
        assert_eq!(config.holidays.cache_dir().unwrap(), PathBuf::from("/var/cache/cpr"));
        assert_eq!(
            config.service_rules().unwrap().electronic.cutoff,
            NaiveTime::from_hms_opt(16, 0, 0)
        );
        let table = config.fee_table().unwrap();
        assert_eq!(table.brackets().len(), 2);
        assert_eq!(table.brackets()[0].upper, Some(Money::from_pounds(1_000)));
        assert!(config.json_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CPR_TEST_CACHE_DIR", "/tmp/cpr-cache");

        let config = EngineConfig::from_toml_str(
            r#"
[holidays]
cache_dir = "${CPR_TEST_CACHE_DIR}"
"#,
        )
        .unwrap();
        assert_eq!(config.holidays.cache_dir().unwrap(), PathBuf::from("/tmp/cpr-cache"));

        std::env::remove_var("CPR_TEST_CACHE_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_endpoint = EngineConfig::from_toml_str(
            r#"
[holidays]
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(bad_endpoint.validate().is_err());

        let zero_timeout = EngineConfig::from_toml_str(
            r#"
[holidays]
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(zero_timeout.validate().is_err());

        let year_long_ttl = EngineConfig::from_toml_str(
            r#"
[holidays]
memory_ttl_seconds = 31536000
durable_max_age_seconds = 99999999
"#,
        )
        .unwrap();
        assert!(matches!(
            year_long_ttl.validate(),
            Err(DeadlineError::InvalidConfigValueError { field, .. }) if field == "holidays.durable_max_age_seconds"
        ));

        let too_many_retries = EngineConfig::from_toml_str(
            r#"
[holidays]
retry_attempts = 3
"#,
        )
        .unwrap();
        assert!(too_many_retries.validate().is_err());

        let bad_cutoff = EngineConfig::from_toml_str(
            r#"
[service]
electronic_cutoff = "half four"
"#,
        )
        .unwrap();
        assert!(bad_cutoff.validate().is_err());

        let gappy_fees = EngineConfig::from_toml_str(
            r#"
[[fees.brackets]]
lower = 0
upper = 100
formula = { type = "flat", amount = 10 }

[[fees.brackets]]
lower = 200
formula = { type = "flat", amount = 20 }
"#,
        )
        .unwrap();
        assert!(matches!(
            gappy_fees.validate(),
            Err(DeadlineError::InvalidFeeTable { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[service]\nelectronic_cutoff = \"16:30:00\"\n")
            .unwrap();

        let config = EngineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.service_rules().unwrap(), ServiceRules::default());
    }
}
