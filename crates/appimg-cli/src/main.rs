use std::sync::Arc;

use appimg_core::config_store;
use appimg_core::types::{InstallOptions, PerTargetOutcome};
use appimg_core::{InstallerContext, InstallerError};
use appimg_events::{ChannelSink, EventSinkHandle, InstallerEvent, LogLevel, NullSink};
use clap::Parser;
use cli::{Args, Commands};
use logging::setup_logging;
use progress::IndicatifProgressReporter;
use tracing::{error, info, warn};
use utils::{progress_enabled, COLOR, PROGRESS};

mod catalog;
mod cli;
mod config;
mod logging;
mod progress;
mod utils;

fn catalog_dir() -> std::path::PathBuf {
    appimg_utils::path::xdg_config_home().join("appimg").join("catalog")
}

fn config_dir() -> std::path::PathBuf {
    appimg_utils::path::xdg_config_home().join("appimg")
}

/// Wires an `EventSink` for the duration of one CLI invocation: a channel sink feeding a
/// background thread that turns events into log lines, or a no-op sink with progress disabled.
fn create_event_sink() -> (EventSinkHandle, Option<std::thread::JoinHandle<()>>) {
    if !progress_enabled() {
        return (Arc::new(NullSink), None);
    }

    let (sink, receiver) = ChannelSink::new();
    let handle = std::thread::spawn(move || {
        for event in receiver {
            log_event(&event);
        }
    });
    (Arc::new(sink), Some(handle))
}

fn log_event(event: &InstallerEvent) {
    match event {
        InstallerEvent::Resolving { target, .. } => info!("{target}: resolving release"),
        InstallerEvent::SelectingAsset {
            target,
            candidate_count,
            ..
        } => info!("{target}: selecting asset among {candidate_count} candidates"),
        InstallerEvent::AlreadyInstalled { target, .. } => {
            info!("{target}: already installed")
        }
        InstallerEvent::ConfigWritten { target, .. } => info!("{target}: config written"),
        InstallerEvent::DesktopEntryWritten { target, .. } => {
            info!("{target}: desktop entry written")
        }
        InstallerEvent::OperationComplete { target, .. } => info!("{target}: installed"),
        InstallerEvent::OperationFailed { target, error, .. } => {
            error!("{target}: failed: {error}")
        }
        InstallerEvent::BatchProgress {
            completed,
            total,
            failed,
        } => info!("progress: {completed}/{total} complete, {failed} failed"),
        InstallerEvent::Log { level, message } => match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => info!("{message}"),
            LogLevel::Warning => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        },
        _ => {}
    }
}

async fn run_install(
    targets: &[String],
    force: bool,
    no_verify: bool,
    concurrency: Option<usize>,
) -> miette::Result<()> {
    let global_config = config::GlobalConfig::load(&config::CONFIG_PATH.read().unwrap()).map_err(
        |e| miette::miette!("{e}"),
    )?;

    let options = InstallOptions {
        concurrency: concurrency.unwrap_or_else(|| global_config.concurrency()),
        verify: !no_verify,
        show_progress: progress_enabled(),
        force,
        ..Default::default()
    };

    let (events, event_thread) = create_event_sink();
    let progress = Arc::new(IndicatifProgressReporter::new());
    let ctx = Arc::new(InstallerContext::new(options, events, progress));
    let catalog = Arc::new(catalog::DirectoryCatalog::load(&catalog_dir()));
    let global = Arc::new(global_config);

    let outcomes = appimg_core::install(targets, ctx, catalog, global)
        .await
        .map_err(|e: InstallerError| miette::Report::new(e))?;

    if let Some(handle) = event_thread {
        handle.join().ok();
    }

    let mut failures = 0;
    for outcome in &outcomes {
        match outcome {
            PerTargetOutcome::Installed {
                target,
                path,
                warning,
            } => {
                info!("{target}: installed at {}", path.display());
                if let Some(warning) = warning {
                    warn!("{target}: {warning}");
                }
            }
            PerTargetOutcome::AlreadyInstalled { target } => {
                info!("{target}: already installed");
            }
            PerTargetOutcome::Failed {
                target,
                kind,
                message,
            } => {
                failures += 1;
                error!("{target}: {} ({})", message, kind.as_str());
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn run_remove(name: &str) -> miette::Result<()> {
    let config_dir = config_dir();
    let Some(record) = config_store::read_record(&config_dir, name)
        .map_err(|e| miette::miette!("{e}"))?
    else {
        return Err(miette::miette!("no installed app named '{name}'"));
    };

    appimg_utils::fs::safe_remove(&record.state.installed_path)
        .map_err(|e| miette::miette!("{e}"))?;

    if let Some(icon_path) = &record.state.icon.path {
        appimg_utils::fs::safe_remove(icon_path).ok();
    }

    let desktop_path = appimg_utils::path::desktop_dir().join(format!("{name}.desktop"));
    appimg_utils::fs::safe_remove(&desktop_path).ok();

    config_store::remove_record(&config_dir, name).map_err(|e| miette::miette!("{e}"))?;

    info!("{name}: removed");
    Ok(())
}

fn run_list() -> miette::Result<()> {
    let apps_dir = config_store::apps_dir(&config_dir());
    let Ok(entries) = std::fs::read_dir(&apps_dir) else {
        info!("no applications installed");
        return Ok(());
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                path.file_stem().and_then(|s| s.to_str()).map(String::from)
            } else {
                None
            }
        })
        .collect();
    names.sort();

    if names.is_empty() {
        info!("no applications installed");
    }
    for name in names {
        if let Ok(Some(record)) = config_store::read_record(&config_dir(), &name) {
            info!("{name} {}", record.state.version);
        }
    }
    Ok(())
}

async fn handle_cli() -> miette::Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        *COLOR.write().unwrap() = false;
    }
    if args.no_progress {
        *PROGRESS.write().unwrap() = false;
    }
    if let Some(config_path) = &args.config {
        let path = appimg_utils::path::resolve_path(config_path).map_err(|e| miette::miette!("{e}"))?;
        *config::CONFIG_PATH.write().unwrap() = path;
    }

    match args.command {
        Commands::Install {
            targets,
            force,
            no_verify,
            concurrency,
        } => run_install(&targets, force, no_verify, concurrency).await?,
        Commands::Remove { name } => run_remove(&name)?,
        Commands::List => run_list()?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}
