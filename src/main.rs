//! CLI entry point for the CPD harvester.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cpd_harvester::config::{load_default_file_config, load_file_config};
use cpd_harvester::{
    BatchProgress, HarvestConfig, build_archive, download_batch, extract_metadata, scan_page,
    select_for_download,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, DownloadArgs, MetadataArgs, ScanArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = load_config(args.config.as_deref())?;
    match args.command {
        Command::Scan(scan) => run_scan(config, scan).await,
        Command::Download(download) => run_download(config, download, args.quiet).await,
        Command::Metadata(metadata) => run_metadata(&metadata),
    }
}

/// Defaults, then the config file, then (in each command) CLI flags.
fn load_config(explicit: Option<&Path>) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::default();
    let file = match explicit {
        Some(path) => Some(load_file_config(path)?),
        None => {
            let loaded = load_default_file_config()?;
            if let Some(path) = &loaded.path {
                debug!(
                    path = %path.display(),
                    loaded = loaded.loaded_from_file(),
                    "default config path"
                );
            }
            loaded.config
        }
    };
    if let Some(file) = file {
        file.apply_to(&mut config);
    }
    Ok(config)
}

async fn run_scan(mut config: HarvestConfig, args: ScanArgs) -> Result<()> {
    if let Some(url) = args.url {
        config.page_url = url;
    }
    if args.no_browser {
        config.browser.enabled = false;
    }

    let links = scan_page(&config, &config.page_url).await?;
    let shown = select_for_download(&links, !args.show_all);
    info!(
        found = links.len(),
        english = links.iter().filter(|l| l.is_english).count(),
        "Scan complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        for link in &shown {
            let marker = if link.is_english { "EN" } else { "--" };
            println!("{marker}\t{}\t{}", link.filename, link.url);
        }
    }
    Ok(())
}

async fn run_download(mut config: HarvestConfig, args: DownloadArgs, quiet: bool) -> Result<()> {
    if let Some(url) = args.url {
        config.page_url = url;
    }
    if args.no_browser {
        config.browser.enabled = false;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.download.max_attempts = max_attempts;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.download.delay = Duration::from_millis(delay_ms);
    }

    let links = scan_page(&config, &config.page_url).await?;
    let selected = select_for_download(&links, !args.all);
    if selected.is_empty() {
        warn!(found = links.len(), "No matching PDF links found; nothing to download");
        return Ok(());
    }
    info!(selected = selected.len(), found = links.len(), "Downloading");

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(u64::try_from(selected.len()).unwrap_or(u64::MAX))
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let options = config.download.clone();
    let report = download_batch(&config, &selected, &options, |progress| match progress {
        BatchProgress::Started { filename, .. } => bar.set_message(filename.to_string()),
        BatchProgress::Finished { .. } => bar.inc(1),
    })
    .await;
    bar.finish_and_clear();

    for failure in &report.failures {
        warn!(
            filename = %failure.filename,
            url = %failure.url,
            error = %failure.error,
            "Download failed"
        );
    }

    if report.is_total_failure() {
        warn!(
            requested = report.requested,
            "Every download failed; no archive written"
        );
        return Ok(());
    }

    let archive = build_archive(&report.archive_entries())?;
    fs::write(&args.output, &archive)
        .with_context(|| format!("Failed to write archive '{}'", args.output.display()))?;

    info!(
        path = %args.output.display(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        requested = report.requested,
        "Archive written"
    );
    Ok(())
}

fn run_metadata(args: &MetadataArgs) -> Result<()> {
    let first_pages = read_optional_text(args.first_pages.as_deref())?;
    let full_text = read_optional_text(args.full_text.as_deref())?;
    let metadata = extract_metadata(&args.filename, &first_pages, &full_text);
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

fn read_optional_text(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(String::new());
    };
    fs::read_to_string(path).with_context(|| format!("Failed to read text file '{}'", path.display()))
}
