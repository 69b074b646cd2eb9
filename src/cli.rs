//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use cpd_harvester::DEFAULT_ARCHIVE_NAME;

/// Fetch the English PDFs linked from a document-index page.
///
/// Scans the page, flags links that look English, downloads them through
/// a browser session with HTTP fallbacks, and writes a ZIP archive.
#[derive(Parser, Debug)]
#[command(name = "cpd-harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/cpd-harvester/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a page and list its PDF links
    Scan(ScanArgs),
    /// Scan, download the selected PDFs and write a ZIP archive
    Download(DownloadArgs),
    /// Infer year, country and region for one document
    Metadata(MetadataArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ScanArgs {
    /// Page to scan (default: the configured page URL)
    pub url: Option<String>,

    /// List non-English links too
    #[arg(long)]
    pub show_all: bool,

    /// Print links as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip the browser transport
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// Page to scan (default: the configured page URL)
    pub url: Option<String>,

    /// Download every PDF, not only the English ones
    #[arg(long)]
    pub all: bool,

    /// Output archive path
    #[arg(short, long, default_value = DEFAULT_ARCHIVE_NAME)]
    pub output: PathBuf,

    /// Attempts per transport per file (1-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Base delay between attempts in milliseconds (max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay_ms: Option<u64>,

    /// Skip the browser transport
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MetadataArgs {
    /// Document filename
    pub filename: String,

    /// Text file with the document's first pages
    #[arg(long, value_name = "PATH")]
    pub first_pages: Option<PathBuf>,

    /// Text file with the document's full text
    #[arg(long, value_name = "PATH")]
    pub full_text: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_scan_defaults() {
        let args = Args::try_parse_from(["cpd-harvester", "scan"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        let Command::Scan(scan) = args.command else {
            panic!("expected scan");
        };
        assert!(scan.url.is_none());
        assert!(!scan.show_all);
        assert!(!scan.json);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["cpd-harvester", "-vv", "scan"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["cpd-harvester", "scan", "--verbose"]).unwrap();
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_cli_download_defaults() {
        let args = Args::try_parse_from(["cpd-harvester", "download"]).unwrap();
        let Command::Download(download) = args.command else {
            panic!("expected download");
        };
        assert_eq!(download.output, PathBuf::from("cpd_english_pdfs.zip"));
        assert!(!download.all);
        assert!(download.max_attempts.is_none());
        assert!(download.delay_ms.is_none());
    }

    #[test]
    fn test_cli_download_flags() {
        let args = Args::try_parse_from([
            "cpd-harvester",
            "--config",
            "/tmp/c.toml",
            "download",
            "https://example.org/cpd",
            "--all",
            "-o",
            "out.zip",
            "--max-attempts",
            "5",
            "--delay-ms",
            "250",
            "--no-browser",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        let Command::Download(download) = args.command else {
            panic!("expected download");
        };
        assert_eq!(download.url.as_deref(), Some("https://example.org/cpd"));
        assert!(download.all);
        assert!(download.no_browser);
        assert_eq!(download.output, PathBuf::from("out.zip"));
        assert_eq!(download.max_attempts, Some(5));
        assert_eq!(download.delay_ms, Some(250));
    }

    #[test]
    fn test_cli_max_attempts_out_of_range_rejected() {
        for value in ["0", "11"] {
            let err = Args::try_parse_from(["cpd-harvester", "download", "--max-attempts", value])
                .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_delay_over_max_rejected() {
        let err = Args::try_parse_from(["cpd-harvester", "download", "--delay-ms", "60001"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_metadata_args() {
        let args = Args::try_parse_from([
            "cpd-harvester",
            "metadata",
            "cpd_viet_nam_2020.pdf",
            "--first-pages",
            "first.txt",
        ])
        .unwrap();
        let Command::Metadata(metadata) = args.command else {
            panic!("expected metadata");
        };
        assert_eq!(metadata.filename, "cpd_viet_nam_2020.pdf");
        assert_eq!(metadata.first_pages, Some(PathBuf::from("first.txt")));
        assert!(metadata.full_text.is_none());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Args::try_parse_from(["cpd-harvester"]).is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["cpd-harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
