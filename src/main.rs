use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use civicverify_core::config::redact_database_url;
use civicverify_core::{CivicConfig, CivicServices, DatabasePool, SystemClock};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = CivicConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check the CIVIC_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting CivicVerify reputation ledger audit");

    if !config.database.postgres_enabled {
        error!("Ledger audit needs PostgreSQL; set CIVIC_POSTGRES_ENABLED=true");
        return Ok(ExitCode::from(2));
    }

    info!(
        url = %redact_database_url(&config.database.postgres_url),
        "Connecting to PostgreSQL"
    );
    let db = DatabasePool::connect(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.init_schema()
        .await
        .context("Failed to initialize database schema")?;

    let services = CivicServices::with_database(&db, Arc::new(SystemClock), &config);
    let drifted = services
        .ledger
        .verify_all()
        .await
        .context("Ledger audit failed")?;

    if drifted.is_empty() {
        info!("All contributor scores match their reputation logs");
        return Ok(ExitCode::SUCCESS);
    }

    for audit in &drifted {
        error!(
            contributor_id = %audit.contributor_id,
            stored = audit.stored_score,
            replayed = audit.replayed_score,
            log_entries = audit.log_entries,
            "Score does not match replayed log"
        );
    }
    Ok(ExitCode::FAILURE)
}

fn init_logging(config: &CivicConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
