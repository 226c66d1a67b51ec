//! smus2mid - convert IFF SMUS scores to Standard MIDI Files
//!
//! Each input `Name.smus` is written next to itself as `Name.mid`. Files
//! are converted independently; a broken file is reported and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use smus::{convert, destination_path, to_smf, ConvertOptions, FeedbackLevel, MidiParams, RoutingMode};
use smusconf::{LoggingConfig, SmusConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smus2mid")]
#[command(about = "Convert SMUS scores to Standard MIDI Files")]
#[command(version)]
struct Cli {
    /// Copyright text to put at the start of every track
    #[arg(short, long)]
    copyright: Option<String>,

    /// One track per instrument instead of one per part
    #[arg(short, long, overrides_with = "no_explode")]
    explode: bool,

    /// One track per part, even if the config says explode
    #[arg(long, overrides_with = "explode")]
    no_explode: bool,

    /// Put each track on its own MIDI channel (skipping percussion)
    #[arg(long, overrides_with = "no_channel_per_track")]
    channel_per_track: bool,

    /// Everything on channel 0, even if the config says otherwise
    #[arg(long, overrides_with = "channel_per_track")]
    no_channel_per_track: bool,

    /// Extension for output files [default: mid]
    #[arg(long)]
    extension: Option<String>,

    /// Config file to use instead of ./smus2mid.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the merged configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// SMUS files to convert
    files: Vec<PathBuf>,
}

/// A `--flag`/`--no-flag` pair over a configured default
fn flag(on: bool, off: bool, configured: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => configured,
    }
}

/// Settings after merging config and command line
struct Settings {
    options: ConvertOptions,
    params: MidiParams,
    extension: String,
}

impl Settings {
    fn new(cli: &Cli, config: &SmusConfig) -> Self {
        let routing = if flag(cli.explode, cli.no_explode, config.convert.explode) {
            RoutingMode::Exploded
        } else {
            RoutingMode::Merged
        };
        let copyright = cli
            .copyright
            .clone()
            .or_else(|| config.convert.copyright().map(str::to_string));

        Settings {
            options: ConvertOptions { routing, copyright },
            params: MidiParams {
                channel_per_track: flag(
                    cli.channel_per_track,
                    cli.no_channel_per_track,
                    config.convert.channel_per_track,
                ),
                ..MidiParams::default()
            },
            extension: cli
                .extension
                .clone()
                .unwrap_or_else(|| config.convert.extension.clone()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = SmusConfig::load_with_sources_from(cli.config.as_deref());
    let level = match &loaded {
        Ok((config, _)) => config.logging.level.clone(),
        Err(_) => LoggingConfig::default().level,
    };
    init_tracing(&level);

    let config = match loaded {
        Ok((config, sources)) => {
            debug!(files = ?sources.files, env = ?sources.env_overrides, "config loaded");
            config
        }
        Err(e) => {
            warn!("{}, using defaults", e);
            SmusConfig::default()
        }
    };

    if cli.print_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    if cli.files.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let settings = Settings::new(&cli, &config);
    for path in &cli.files {
        match convert_file(path, &settings) {
            Ok(destination) => info!("{} -> {}", path.display(), destination.display()),
            Err(e) => eprintln!("{}: {:#}", path.display(), e),
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn convert_file(path: &Path, settings: &Settings) -> Result<PathBuf> {
    info!("converting {}", path.display());

    let bytes = fs::read(path).context("Failed to read input")?;
    let conversion = convert(&bytes, &settings.options).context("Not a usable SMUS file")?;

    let warnings = conversion
        .feedback
        .iter()
        .filter(|f| f.level != FeedbackLevel::Info)
        .count();
    info!(
        song = %conversion.song_name,
        tracks = conversion.tracks.len(),
        warnings,
        "decoded"
    );

    let midi = to_smf(&conversion.tracks, &settings.params).context("Failed to encode MIDI")?;
    let destination = destination_path(path, &settings.extension);
    fs::write(&destination, midi)
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    Ok(destination)
}
