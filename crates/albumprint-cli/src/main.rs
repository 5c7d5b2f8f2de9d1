// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt::Write as _;
use std::path::PathBuf;

use albumprint_application::{AlbumIdentificationService, IdentificationReport};
use albumprint_config::{load as load_config, AppConfig, PositionMatch};
use albumprint_domain::AlbumHypothesis;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Identify the album in a directory of audio files by fingerprint.
#[derive(Parser, Debug)]
#[command(name = "albumprint")]
#[command(version)]
struct Args {
    /// Directory holding one album, one file per track
    dir: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// AcoustID client key (overrides configuration)
    #[arg(long)]
    api_key: Option<String>,

    /// Locate tracks within a release by title instead of recording id
    #[arg(long)]
    match_titles: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    init_tracing(&config.telemetry.log_level);
    log_loaded_config(&config, &args);

    let service = AlbumIdentificationService::from_config(&config)?;
    let report = service
        .identify_directory(&args.dir)
        .await
        .with_context(|| format!("failed to identify {}", args.dir.display()))?;

    info!(target: "cli", albums = report.albums.len(), "done");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    subscriber(default_level, std::io::stderr).init();
}

fn subscriber<W>(default_level: &str, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(writer);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(env_filter).with(fmt_layer)
}

/// Loading happens before the subscriber exists, so it is reported afterwards.
fn log_loaded_config(config: &AppConfig, args: &Args) {
    info!(
        target: "config",
        file = ?args.config,
        position_match = ?config.resolution.position_match,
        max_concurrent_tracks = config.pipeline.max_concurrent_tracks,
        "configuration loaded"
    );
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(api_key) = &args.api_key {
        config.acoustid.api_key = Some(api_key.clone());
    }
    if args.match_titles {
        config.resolution.position_match = PositionMatch::Title;
    }
}

fn render_text(report: &IdentificationReport) -> String {
    let mut out = String::new();

    if report.albums.is_empty() {
        let _ = writeln!(
            out,
            "No release matches all {} tracks.",
            report.observations.len()
        );
        return out;
    }

    for (index, album) in report.albums.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        render_album(&mut out, album);
    }

    out
}

fn render_album(out: &mut String, album: &AlbumHypothesis) {
    let _ = writeln!(out, "{} - {}", album.album_artist, album.release_title);
    let _ = writeln!(out, "  {}", album.release_url);
    if !album.release_dates.is_empty() {
        let _ = writeln!(out, "  released: {}", album.release_dates.join(", "));
    }
    for track in &album.tracks {
        let _ = writeln!(
            out,
            "  {:02}. {} - {} ({})",
            track.position,
            track.artist,
            track.title,
            format_duration(track.duration_ms)
        );
    }
}

/// `m:ss`, rounded to the nearest second.
fn format_duration(duration_ms: u64) -> String {
    let secs = (duration_ms + 500) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
