use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use pdf_catalog_sync::app::{App, ProgressSink, RunOptions, RunResult};
use pdf_catalog_sync::catalog::CatalogHttpClient;
use pdf_catalog_sync::config::{ConfigLoader, ConfigOverrides};
use pdf_catalog_sync::error::SyncError;
use pdf_catalog_sync::output::{ConsoleOutput, JsonOutput, OutputMode};
use pdf_catalog_sync::remote::RemoteHttpClient;
use pdf_catalog_sync::sync::SyncDownloader;

#[derive(Parser)]
#[command(name = "pdf-sync")]
#[command(about = "Download every PDF listed by the book catalog, skipping files already complete")]
#[command(version, author)]
struct Cli {
    #[arg(long, help = "Catalog endpoint returning a JSON array of records")]
    url: Option<String>,

    #[arg(long, help = "Directory the PDFs are written to")]
    dir: Option<String>,

    #[arg(long, help = "Path to a JSON config file")]
    config: Option<String>,

    #[arg(long, help = "HTTP timeout in seconds")]
    timeout: Option<u64>,

    #[arg(long, help = "Print a JSON report instead of progress text")]
    json: bool,

    #[arg(long, help = "List the planned downloads without downloading")]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::ConfigRead(_) | SyncError::ConfigParse(_) | SyncError::InvalidConfig(_) => 2,
        SyncError::CatalogHttp { .. } | SyncError::CatalogStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let overrides = ConfigOverrides {
        catalog_url: cli.url,
        download_dir: cli.dir,
        timeout_secs: cli.timeout,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    tracing::debug!(?config, "resolved configuration");

    let catalog = CatalogHttpClient::new(&config)?;
    let remote = RemoteHttpClient::new(&config)?;
    let app = App::new(catalog, SyncDownloader::new(remote, &config));
    let options = RunOptions {
        dry_run: cli.dry_run,
    };

    let console = ConsoleOutput::new();
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Console => &console,
        OutputMode::Json => &JsonOutput,
    };
    let result = app.run(options, sink)?;

    match (output_mode, result) {
        (OutputMode::Console, RunResult::Planned(plan)) => ConsoleOutput::print_plan(&plan),
        (OutputMode::Console, RunResult::Synced(report)) => ConsoleOutput::print_report(&report),
        (OutputMode::Json, RunResult::Planned(plan)) => {
            JsonOutput::print_plan(&plan).into_diagnostic()?
        }
        (OutputMode::Json, RunResult::Synced(report)) => {
            JsonOutput::print_report(&report).into_diagnostic()?
        }
    }
    Ok(())
}
