//! ocr-capture - Live capture and text recognition demo
//!
//! Runs a capture session over a synthetic camera and a simulated engine,
//! printing every recognition result as a JSON line on stdout.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ocr_capture::config::{self, get_config_dir};
use ocr_capture::{AppConfig, CaptureApp, DemoOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Recognize on shutter press
    Single,
    /// Recognize frame after frame
    Continuous,
}

/// ocr-capture - Live camera capture for text recognition
#[derive(Parser, Debug)]
#[command(name = "ocr-capture")]
#[command(about = "Coordinates camera capture, autofocus and text recognition")]
struct Args {
    /// Capture mode (overrides the configuration file)
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// How long to run before shutting down
    #[arg(short, long, default_value = "5")]
    duration_secs: u64,

    /// Simulated recognition latency
    #[arg(long, default_value = "300")]
    latency_ms: u64,

    /// Text the simulated engine reports
    #[arg(long, default_value = "OCR CAPTURE DEMO")]
    text: String,

    /// Mean confidence the simulated engine reports
    #[arg(long, default_value = "85")]
    confidence: i32,

    /// Make every n-th recognition fault (0 = never)
    #[arg(long, default_value = "0")]
    fault_every: u64,

    /// Configuration file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_or_create_config(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.capture.continuous = mode == Mode::Continuous;
    }

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("ocr-capture starting...");

    let options = DemoOptions {
        text: args.text,
        confidence: args.confidence,
        latency: Duration::from_millis(args.latency_ms),
        fault_every: args.fault_every,
        bell: config.capture.beep,
    };

    let mut app = CaptureApp::new(config);
    app.start(&options)?;
    app.run_for(Duration::from_secs(args.duration_secs))?;
    app.stop();

    info!("ocr-capture shutdown complete");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_dir) = get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
        }
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}
