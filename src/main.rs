use clap::Parser;
use licence_broker::utils::error::ErrorSeverity;
use licence_broker::utils::{logger, validation::Validate};
use licence_broker::{BrokerError, CliConfig, ConfigProvider, EngineSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting licence-broker CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match cli.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            report_failure(&e);
            std::process::exit(exit_code(&e));
        }
    };

    if let Err(e) = settings.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    let session = match EngineSession::open(&settings).await {
        Ok(session) => session,
        Err(e) => {
            report_failure(&e);
            std::process::exit(exit_code(&e));
        }
    };

    let result = if settings.acquire_any() {
        session.licensor().acquire_any().await
    } else {
        session.licensor().acquire(&settings.criteria()).await
    };

    match result {
        Ok(licence) => {
            let workers = licence
                .workers
                .map(|w| w.to_string())
                .unwrap_or_else(|| "default".to_string());
            tracing::info!(
                "Congratulations! You've acquired a {} with {} workers",
                licence.short_name,
                workers
            );
            println!(
                "Acquired {} from {} ({} workers)",
                licence.short_name, licence.source.location, workers
            );
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
            Ok(())
        }
    }
}

fn report_failure(e: &BrokerError) {
    tracing::error!(
        "Licence acquisition failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("{}", e.user_friendly_message());
    eprintln!("Suggestion: {}", e.recovery_suggestion());
}

fn exit_code(e: &BrokerError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
