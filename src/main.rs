use anyhow::Context;
use clap::Parser;
use repo_importer::core::normalize::split_batch_input;
use repo_importer::domain::ports::LocatorStore;
use repo_importer::utils::error::ErrorSeverity;
use repo_importer::utils::monitor::SystemMonitor;
use repo_importer::utils::{logger, validation::Validate};
use repo_importer::{
    BatchResult, CliConfig, FileRegistry, HttpValidator, ImportEngine, ImportError, ImportPipeline,
    ImporterConfig, ProgressSnapshot,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

type Engine = ImportEngine<HttpValidator, FileRegistry, SystemMonitor>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let file_config = match &cli.config {
        Some(path) => ImporterConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => ImporterConfig::default(),
    };

    // 初始化日誌
    logger::init_logger(file_config.monitoring.log_format, cli.verbose);

    tracing::info!("Starting repo-importer");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = cli.validate().and_then(|_| file_config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let registry_path = cli
        .registry
        .clone()
        .unwrap_or_else(|| file_config.registry_path().to_string());
    let monitor_enabled = cli.monitor || file_config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let validator = Arc::new(HttpValidator::from_config(&file_config.validator)?);
    let pipeline = ImportPipeline::new(validator, FileRegistry::new(&registry_path), SystemMonitor::new(false))
        .with_settings(file_config.scheduler_settings());
    let engine = ImportEngine::new_with_monitoring(pipeline, monitor_enabled);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("⏹️ Cancellation requested, draining in-flight validations...");
            ctrl_c_token.cancel();
        }
    });

    match execute(&cli, &engine, &cancel).await {
        Ok(result) => {
            if !result.was_cancelled && !result.added_locators.is_empty() {
                let saved = engine.pipeline().existing().persist(&result.added_locators)?;
                tracing::info!("📁 Saved {} repositories to {}", saved, registry_path);
            }

            // --json 時 stdout 只輸出結果
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
            if let Some(report_path) = &cli.report {
                std::fs::write(report_path, serde_json::to_string_pretty(&result)?)
                    .with_context(|| format!("failed to write report to {}", report_path))?;
                tracing::info!("📝 Report written to {}", report_path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Import failed: {} (Severity: {:?}, fatal: {})",
                e,
                e.severity(),
                e.is_fatal()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn execute(
    cli: &CliConfig,
    engine: &Engine,
    cancel: &CancellationToken,
) -> repo_importer::Result<BatchResult> {
    let started = Instant::now();
    let sink = move |snapshot: ProgressSnapshot| {
        tracing::info!(
            "⏳ {}/{} processed ({} ok, {} failed, {} duplicates) - {}",
            snapshot.processed,
            snapshot.total,
            snapshot.succeeded,
            snapshot.failed,
            snapshot.duplicates,
            snapshot.eta_label(started.elapsed())
        );
    };

    if let Some(path) = &cli.retry_from {
        let content = std::fs::read_to_string(path)?;
        let prior: BatchResult = serde_json::from_str(&content)?;
        let selected = if cli.include_non_retryable {
            prior.errors.clone()
        } else {
            prior.retryable_errors()
        };
        if selected.is_empty() {
            return Err(ImportError::InputError {
                message: format!("No failures to retry in {}", path),
            });
        }
        return engine.retry(&selected, &sink, cancel).await;
    }

    let text = match cli.input.as_deref() {
        Some(path) if !cli.reads_stdin() => std::fs::read_to_string(path)?,
        _ => {
            tracing::info!("📥 Reading URLs from stdin");
            std::io::read_to_string(std::io::stdin())?
        }
    };
    let raw_batch = split_batch_input(&text);
    if raw_batch.is_empty() {
        return Err(ImportError::InputError {
            message: "Please enter valid URLs (http:// or https:// only)".to_string(),
        });
    }

    engine.run(&raw_batch, &sink, cancel).await
}

fn print_summary(result: &BatchResult) {
    let summary = result.summary();

    if result.was_cancelled {
        println!("⏹️ Import cancelled - nothing was saved");
    }
    if summary.duplicates > 0 {
        println!("⏭️ Blocked {} duplicate repositories", summary.duplicates);
    }
    if summary.succeeded > 0 {
        println!("✅ Added {} repositories", summary.succeeded);
    }
    if summary.failed > 0 {
        println!(
            "❌ {} repositories failed to import ({} can retry, {} cannot)",
            summary.failed, summary.retryable, summary.non_retryable
        );
        println!(
            "   Network: {}, Validation: {}, Server: {}, Unknown: {}",
            summary.network, summary.validation, summary.server, summary.unknown
        );
        for line in result.export_failures().lines() {
            println!("   {}", line);
        }
    }
}
