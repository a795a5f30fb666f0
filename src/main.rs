use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use minutewatch::duration::format_duration;
use minutewatch::{render, Format, Line, Overrides, Settings};
use minutewatch_sdk::Monitor;

#[derive(Parser, Debug)]
#[command(name = "minutewatch")]
#[command(about = "Print block height and minute changes of a factomd node")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// factomd v2 API endpoint
    #[arg(short, long)]
    url: Option<String>,

    /// Poll interval (e.g., "1s", "250ms")
    #[arg(short, long)]
    interval: Option<String>,

    /// Per-request deadline (e.g., "5s")
    #[arg(short, long)]
    timeout: Option<String>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            interval: self.interval.clone(),
            timeout: self.timeout.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;
    let config = settings.monitor_config()?;
    let format = if args.json { Format::Json } else { Format::Text };

    info!(
        url = %config.url,
        interval = %format_duration(config.interval),
        timeout = %format_duration(config.timeout),
        "connecting"
    );

    let monitor = Monitor::builder()
        .config(config)
        .connect()
        .await
        .context("could not start monitor")?;

    emit(&Line::Seed(monitor.current_position()), format)?;

    let mut minutes = monitor.subscribe_minutes();
    let mut heights = monitor.subscribe_heights();
    let mut committed = monitor.subscribe_committed_heights();
    let mut errors = monitor.subscribe_errors();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let line = tokio::select! {
            _ = &mut ctrl_c => break,
            Some(event) = minutes.recv() => Line::Minute(event),
            Some(height) = heights.recv() => Line::Height { height },
            Some(committed_height) = committed.recv() => Line::CommittedHeight { committed_height },
            Some(err) = errors.recv() => Line::error(&err),
            else => break,
        };
        emit(&line, format)?;
    }

    monitor.stop();
    monitor.join().await;

    let dropped = monitor.dropped_events();
    if dropped > 0 {
        info!(dropped, "events dropped by slow output");
    }
    Ok(())
}

fn emit(line: &Line, format: Format) -> Result<()> {
    println!("{}", render(line, format)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
