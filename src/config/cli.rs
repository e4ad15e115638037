use crate::config::{parse_local_time, EngineConfig};
use crate::domain::model::{Jurisdiction, Money, PeriodKind, ServiceMethod, TransmissionEvent};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "cpr-deadlines")]
#[command(about = "Deemed service, filing deadlines and court fees under the Civil Procedure Rules")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the durable holiday cache directory
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// england-and-wales, scotland or northern-ireland
    #[arg(short, long, default_value = "england-and-wales")]
    pub jurisdiction: Jurisdiction,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Deemed service date for a transmission
    Deemed(TransmissionArgs),

    /// Deemed service plus the acknowledgment-of-service deadline
    Timeline(TransmissionArgs),

    /// Deadline a number of days after a reference date
    Deadline {
        /// Reference date (YYYY-MM-DD)
        reference_date: NaiveDate,

        #[arg(allow_negative_numbers = true)]
        days: i64,

        /// calendar or business
        #[arg(short, long, default_value = "calendar")]
        kind: PeriodKind,
    },

    /// Court issue fee for a money claim
    Fee {
        /// Claim value in pounds, e.g. 15000 or 15,000.50
        #[arg(allow_negative_numbers = true)]
        claim_value: Money,
    },

    /// List the bank holidays used for a year
    Holidays { year: i32 },

    /// Fetch a year's bank holidays from the remote source now
    Refresh { year: i32 },
}

#[derive(Debug, Clone, clap::Args)]
pub struct TransmissionArgs {
    /// Transmission date (YYYY-MM-DD)
    pub date: NaiveDate,

    /// Local transmission time (HH:MM or HH:MM:SS)
    #[arg(value_parser = parse_time_arg)]
    pub time: NaiveTime,

    /// electronic, post or personal
    #[arg(short, long, default_value = "electronic")]
    pub method: ServiceMethod,
}

impl TransmissionArgs {
    pub fn event(&self) -> TransmissionEvent {
        TransmissionEvent::new(self.date, self.time, self.method)
    }
}

fn parse_time_arg(raw: &str) -> std::result::Result<NaiveTime, String> {
    parse_local_time("time", raw).map_err(|e| e.to_string())
}

impl CliConfig {
    /// The engine configuration: the `--config` file if given, otherwise
    /// defaults, with command-line overrides applied.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.holidays.cache_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validation::validate_path("config", path)?;
        }
        if let Some(dir) = &self.cache_dir {
            validation::validate_path("cache_dir", dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deemed_command() {
        let cli = CliConfig::try_parse_from([
            "cpr-deadlines",
            "--jurisdiction",
            "scotland",
            "deemed",
            "2025-01-02",
            "16:31",
        ])
        .unwrap();

        assert_eq!(cli.jurisdiction, Jurisdiction::Scotland);
        match cli.command {
            Command::Deemed(args) => {
                let event = args.event();
                assert_eq!(event.date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
                assert_eq!(event.time, NaiveTime::from_hms_opt(16, 31, 0).unwrap());
                assert_eq!(event.method, ServiceMethod::Electronic);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_deadline_and_fee_commands() {
        let cli = CliConfig::try_parse_from([
            "cpr-deadlines",
            "deadline",
            "2025-12-20",
            "5",
            "--kind",
            "business",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Deadline {
                days: 5,
                kind: PeriodKind::Business,
                ..
            }
        ));

        let cli = CliConfig::try_parse_from(["cpr-deadlines", "fee", "15,000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Fee { claim_value } if claim_value == Money::from_pounds(15_000)
        ));
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(CliConfig::try_parse_from(["cpr-deadlines", "deemed", "2025-01-02", "late"]).is_err());
        assert!(CliConfig::try_parse_from(["cpr-deadlines", "-j", "wales", "holidays", "2025"]).is_err());
    }

    #[test]
    fn test_cache_dir_override() {
        let cli = CliConfig::try_parse_from([
            "cpr-deadlines",
            "--cache-dir",
            "/tmp/holidays",
            "refresh",
            "2026",
        ])
        .unwrap();

        assert!(cli.validate().is_ok());
        let config = cli.engine_config().unwrap();
        assert_eq!(config.holidays.cache_dir.as_deref(), Some("/tmp/holidays"));
    }
}
