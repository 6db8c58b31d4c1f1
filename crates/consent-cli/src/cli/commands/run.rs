//! Study session command.

use std::sync::Arc;

use anyhow::{Context, Result};
use consent_core::config::{Config, paths};
use consent_core::launcher::launcher_from_config;
use consent_core::logging;
use consent_core::sink::{NullSink, RecordSink, build_sink};

use crate::cli::RunArgs;

pub async fn run(mut config: Config, args: RunArgs) -> Result<()> {
    if let Some(sites) = args.sites {
        config.sites = sites
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        config.validate().context("invalid --sites")?;
    }

    // The TUI owns the terminal, so logs go to a file.
    let _log_guard = match logging::init(&paths::logs_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    let sink: Arc<dyn RecordSink> = if args.dry_run {
        Arc::new(NullSink)
    } else {
        build_sink(&config.sink).context("configure record sink")?
    };
    let launcher = launcher_from_config(&config.browser);

    tracing::info!(
        sites = config.sites.len(),
        sink = sink.name(),
        dry_run = args.dry_run,
        "starting study session"
    );

    let outcome = consent_tui::run_study(&config, sink, launcher).await?;

    match outcome.participant_id {
        Some(id) if outcome.completed => {
            println!(
                "Participant {id} completed all {} sites. Thank you!",
                outcome.total_sites
            );
        }
        Some(id) => {
            println!(
                "Participant {id} stopped after {} of {} sites.",
                outcome.records.len(),
                outcome.total_sites
            );
        }
        None => println!("Study not started."),
    }
    Ok(())
}
