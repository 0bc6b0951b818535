//! attachment-sync
//!
//! Usage:
//!     attachment-sync download [--output ./downloads] [--extensions pdf,png]
//!     attachment-sync upload ./inbox --storage bucket --bucket my-staging
//!
//! Settings come from the environment (a `.env` file is loaded first) and can
//! be overridden with flags.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command, LoggingArgs};
use core_runtime::config::{SyncConfig, SyncConfigBuilder};
use core_runtime::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_service::{ServiceError, SyncService};
use core_sync::{DownloadReport, UploadReport, VerificationOutcome};

const EXIT_FATAL: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.logging) {
        eprintln!("error: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn setup_logging(args: &LoggingArgs) -> anyhow::Result<()> {
    let format: LogFormat = args.log_format.parse()?;
    let level: LogLevel = args.log_level.parse()?;

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(level);
    if let Some(filter) = &args.log_filter {
        config = config.with_filter(filter);
    }
    init_logging(config)?;
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<Arc<SyncConfig>> {
    let mut builder = cli.table.apply(SyncConfigBuilder::from_env()?);
    builder = match &cli.command {
        Command::Download(args) => args.apply(builder),
        Command::Upload(args) => args.apply(builder),
    };
    Ok(Arc::new(builder.build()?))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = build_config(&cli)?;
    let service = SyncService::from_config(config)?;

    match &cli.command {
        Command::Download(_) => {
            let report = service.download().await?;
            print_download(&report);
            if report.remote_errors.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_FATAL))
            }
        }
        Command::Upload(args) => {
            let report = service.upload(&args.dir).await?;
            print_upload(&report);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Configuration problems exit with 2, everything else with 1
fn exit_code_for(error: &anyhow::Error) -> u8 {
    if let Some(service) = error.downcast_ref::<ServiceError>() {
        if service.is_config() {
            return EXIT_CONFIG;
        }
    }
    if error.downcast_ref::<core_runtime::Error>().is_some() {
        return EXIT_CONFIG;
    }
    EXIT_FATAL
}

fn print_download(report: &DownloadReport) {
    println!("Download {}", report.run_id);
    println!("  rows fetched:        {}", report.rows_fetched);
    println!(
        "  attachments:         {} accepted of {}",
        report.attachments_accepted, report.attachments_seen
    );
    println!("  files written:       {}", report.files_written.len());
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.filename, failure.reason);
    }
    for error in &report.remote_errors {
        println!("  remote error: {}", error);
    }
}

fn print_upload(report: &UploadReport) {
    println!("Upload {}", report.run_id);
    println!("  files found:         {}", report.files_found);
    println!("  staged:              {}", report.staged);
    println!("  rows created:        {}", report.rows_created.len());
    match report.verification {
        VerificationOutcome::Skipped => {}
        VerificationOutcome::Verified { polls } => {
            println!("  verified after {} poll(s)", polls)
        }
        VerificationOutcome::TimedOut { polls } => {
            println!("  verification timed out after {} poll(s)", polls)
        }
    }
    println!(
        "  staged objects removed: {} ({} failed)",
        report.cleaned_up, report.cleanup_failures
    );
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.filename, failure.reason);
    }
}
