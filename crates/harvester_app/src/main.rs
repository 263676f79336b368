//! Command-line harvester: `harvester_app [settings.ron|settings.json] [url]`.
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use engine_logging::{engine_error, engine_info, engine_warn};
use harvester_core::ErrorKind;
use harvester_engine::{
    render, write_atomic, ExportMeta, HarvestOutcome, Harvester, LogProgressSink, RenderSurface,
    WebDriverSurface,
};
use tokio_util::sync::CancellationToken;

use crate::settings::{AppSettings, DEFAULT_SETTINGS_FILE};

/// Conventional exit status for a run interrupted by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("harvester: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let mut args = std::env::args().skip(1);
    let settings_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let cli_url = args.next();

    let settings = AppSettings::load(&settings_path)?;
    let url = settings.resolve_url(cli_url)?;
    settings
        .harvest
        .validate()
        .context("invalid harvest settings")?;

    engine_logging::initialize(
        settings.log.target.into(),
        engine_logging::parse_level(&settings.log.level),
        &settings.log.file,
    );
    engine_info!("Using settings from {:?}", settings_path);

    let surface = WebDriverSurface::connect(&settings.driver)
        .await
        .with_context(|| format!("connecting to WebDriver at {}", settings.driver.server_url))?;

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let harvester = Harvester::new(surface, settings.harvest.clone());
    let outcome = harvester.harvest(&url, &cancel, &LogProgressSink).await;

    if let Err(err) = harvester.surface().close().await {
        engine_warn!("Closing the browser session failed: {}", err);
    }

    export(&settings, &url, &outcome)?;
    Ok(exit_code(&outcome))
}

fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("Interrupted, stopping after the current step");
            cancel.cancel();
        }
    });
}

/// Partial results are written too; the completion field says how far the run got.
fn export(settings: &AppSettings, url: &str, outcome: &HarvestOutcome) -> anyhow::Result<()> {
    let generated_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let content = render(
        settings.output.format,
        outcome,
        ExportMeta {
            source_url: url,
            generated_utc: &generated_utc,
        },
    )?;

    let filename = settings.output_filename(url);
    let path = write_atomic(&settings.output.dir, &filename, &content)
        .with_context(|| format!("writing {filename} to {:?}", settings.output.dir))?;
    engine_info!(
        "Wrote {} records to {:?} ({})",
        outcome.records.len(),
        path,
        outcome.completion
    );
    Ok(())
}

fn exit_code(outcome: &HarvestOutcome) -> ExitCode {
    match outcome.error_kind() {
        None | Some(ErrorKind::StallExceeded) => ExitCode::SUCCESS,
        Some(ErrorKind::Cancelled) => ExitCode::from(EXIT_INTERRUPTED),
        Some(_) => ExitCode::FAILURE,
    }
}
