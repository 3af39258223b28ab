//! Binary entrypoint for the wallpaper rotator.
//!
//! Inbound events arrive as JSON lines on stdin; fetch requests for the
//! batch provider leave as JSON lines on stdout. Rendering is reported
//! through the log.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rust_wallpaper::config::Configuration;
use rust_wallpaper::events::{Displayed, FetchRequest, WallpaperEvent};
use rust_wallpaper::surface::TracingSurface;
use rust_wallpaper::tasks::{display, loader::DecodingLoader, router::EventRouter};
use rust_wallpaper::viewport::Viewport;

#[derive(Debug, Parser)]
#[command(name = "wallpaper", version, about = "Rotating wallpaper display engine")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Display geometry used for orientation and variant selection
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1920x1080")]
    viewport: Viewport,
    /// Deterministic RNG seed for image selection
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // Logs go to stderr; stdout carries fetch requests.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        viewport,
        seed,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::info!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let (event_tx, event_rx) = mpsc::channel::<WallpaperEvent>(64); // Host -> Router
    let (fetch_tx, mut fetch_rx) = mpsc::channel::<FetchRequest>(16); // Router -> Provider
    let (displayed_tx, mut displayed_rx) = mpsc::channel::<Displayed>(16); // Router -> Log

    let cancel = CancellationToken::new();

    // stdin is the event bus; EOF shuts the display down. Kept off the
    // blocking pool, which the runtime joins on exit.
    {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!("stdin read failed: {err}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<WallpaperEvent>(&line) {
                    Ok(event) => {
                        if event_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!("ignoring unparsable event: {err}"),
                }
            }
            tracing::info!("stdin closed; initiating shutdown");
            cancel.cancel();
        });
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Provider bridge
    tasks.spawn(async move {
        let mut stdout = io::stdout();
        while let Some(request) = fetch_rx.recv().await {
            let line = serde_json::to_string(&request).context("serializing fetch request")?;
            writeln!(stdout, "{line}").context("writing fetch request")?;
            stdout.flush().context("flushing stdout")?;
        }
        Ok::<(), anyhow::Error>(())
    });

    tasks.spawn(async move {
        while let Some(Displayed { url, caption }) = displayed_rx.recv().await {
            tracing::info!(%url, caption = ?caption, "now showing");
        }
        Ok(())
    });

    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let router = EventRouter::new(cfg, TracingSurface, viewport, rng);

    display::run(router, DecodingLoader, event_rx, fetch_tx, displayed_tx, cancel.clone())
        .await
        .context("display loop failed")?;
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
