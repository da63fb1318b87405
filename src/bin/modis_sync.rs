use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use modis_sync::app::SyncApp;
use modis_sync::catalog::CatalogHttpClient;
use modis_sync::config::ConfigLoader;
use modis_sync::error::SyncError;
use modis_sync::output::LineOutput;
use modis_sync::token::TokenProvider;
use modis_sync::transport::select_transport;

#[derive(Parser)]
#[command(name = "modis-sync")]
#[command(about = "Incrementally mirror MODIS products from the LAADS archive")]
#[command(version, author)]
struct Cli {
    /// Do not resume earlier than this date; lowering it forces a recent
    /// window to re-download.
    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date: Option<NaiveDate>,

    /// Increase progress verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to modis-sync.json (defaults to the current directory).
    #[arg(long)]
    config: Option<String>,

    /// Bearer-token file (defaults to ~/.earthdata-app-key).
    #[arg(long)]
    token_file: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(sync) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(sync));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::NoUrls(_) => 2,
        SyncError::CatalogHttp(_)
        | SyncError::CatalogStatus { .. }
        | SyncError::CatalogPayload(_)
        | SyncError::Download { .. } => 3,
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
    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    let token_provider = match cli.token_file {
        Some(path) => TokenProvider::with_path(path),
        None => TokenProvider::new().into_diagnostic()?,
    };
    let token = token_provider.read().into_diagnostic()?;

    let catalog = CatalogHttpClient::new().into_diagnostic()?;
    let transport = select_transport();
    let app = SyncApp::new(config, catalog, transport, token);

    let sink = LineOutput::new(cli.verbose);
    app.run(cli.start_date, &sink).into_diagnostic()?;
    Ok(())
}
