use anyhow::Context;
use clap::Parser;
use cpr_deadlines::config::cli::Command;
use cpr_deadlines::utils::{logger, validation::Validate};
use cpr_deadlines::{CliConfig, DeadlineEngine, DeadlineError, EngineConfig, ResilientHolidayProvider};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.engine_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if config.json_logging() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }

    match run(&cli, &config).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            eprintln!("❌ {:#}", e);
            let code = e
                .downcast_ref::<DeadlineError>()
                .map(DeadlineError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run(cli: &CliConfig, config: &EngineConfig) -> anyhow::Result<Value> {
    let provider = Arc::new(
        ResilientHolidayProvider::from_config(&config.holidays)
            .await
            .context("building holiday provider")?,
    );
    let engine = DeadlineEngine::new(Arc::clone(&provider))
        .with_service_rules(config.service_rules()?)
        .with_fee_table(config.fee_table()?);
    let jurisdiction = cli.jurisdiction;

    let output = match &cli.command {
        Command::Deemed(args) => {
            let result = engine.compute_deemed_service(&args.event(), jurisdiction).await?;
            warn_if_stale(result.holiday_data.is_stale());
            serde_json::to_value(result)?
        }
        Command::Timeline(args) => {
            let timeline = engine.compute_service_timeline(&args.event(), jurisdiction).await?;
            warn_if_stale(timeline.holiday_data().is_stale());
            serde_json::to_value(timeline)?
        }
        Command::Deadline {
            reference_date,
            days,
            kind,
        } => {
            let result = engine
                .compute_deadline(*reference_date, *days, *kind, jurisdiction)
                .await?;
            warn_if_stale(result.holiday_data.is_stale());
            serde_json::to_value(result)?
        }
        Command::Fee { claim_value } => {
            let result = engine.compute_fee(*claim_value)?;
            json!({
                "claim_value": result.claim_value.to_string(),
                "fee_amount": result.fee_amount.to_string(),
                "claim_value_pence": result.claim_value,
                "fee_amount_pence": result.fee_amount,
                "bracket_matched": result.bracket_matched,
                "capped": result.capped,
            })
        }
        Command::Holidays { year } => {
            let set = provider.get_holidays(jurisdiction, *year).await?;
            warn_if_stale(set.freshness.is_stale());
            serde_json::to_value(set.as_ref())?
        }
        Command::Refresh { year } => {
            let set = provider
                .refresh(jurisdiction, *year)
                .await
                .with_context(|| format!("refreshing {} {}", jurisdiction, year))?;
            tracing::info!("✅ Refreshed {} holidays for {} {}", set.dates.len(), jurisdiction, year);
            serde_json::to_value(set.as_ref())?
        }
    };

    Ok(output)
}

fn warn_if_stale(stale: bool) {
    if stale {
        eprintln!("⚠️  Holiday data could not be refreshed; the result uses an older copy");
    }
}
