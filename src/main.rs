//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `linkguard` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process;

use linkguard::initialization::init_logger_with;
use linkguard::{
    LogFormat, LogLevel, ProviderCredentials, ScanRequest, ScannerBuilder, Settings,
    SettingsStore,
};

/// Heuristic malicious-URL scanner.
#[derive(Parser, Debug)]
#[command(name = "linkguard", version, about)]
struct Cli {
    /// URLs to scan.
    urls: Vec<String>,

    /// File with one URL per line (lines starting with '#' are skipped).
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Do not follow redirect chains.
    #[arg(long)]
    no_redirects: bool,

    /// Skip the registration-age lookup.
    #[arg(long)]
    no_age: bool,

    /// Skip the TLS certificate probe.
    #[arg(long)]
    no_certificate: bool,

    /// Skip external threat-intel providers.
    #[arg(long)]
    no_intel: bool,

    /// Enable visual impersonation analysis.
    #[arg(long)]
    visual: bool,

    /// Bypass the cache and force fresh scans.
    #[arg(long)]
    skip_cache: bool,

    /// Print full reports as JSON instead of the summary.
    #[arg(long)]
    json: bool,

    /// SQLite cache path.
    #[arg(long, default_value = linkguard::config::DEFAULT_CACHE_PATH)]
    cache: String,

    /// Minimum domain age in days before a domain stops counting as new.
    #[arg(long, default_value_t = 30)]
    min_domain_age_days: i64,

    /// Log level.
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log output format.
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

fn load_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls = cli.urls.clone();
    if let Some(file) = &cli.file {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read URL file {}", file.display()))?;
        urls.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    Ok(urls)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env (provider API keys live there)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let urls = load_urls(&cli)?;
    if urls.is_empty() {
        eprintln!("No URLs given. Pass URLs as arguments or use --file.");
        process::exit(2);
    }

    let settings = SettingsStore::new(Settings {
        min_domain_age_days: cli.min_domain_age_days,
        enable_vision_ai: cli.visual,
        ..Settings::default()
    });
    let scanner = ScannerBuilder::new()
        .with_cache_path(&cli.cache)
        .with_settings(settings)
        .build()
        .await
        .context("Failed to initialize scanner")?;

    let credentials = ProviderCredentials::from_env();
    let requests: Vec<ScanRequest> = urls
        .into_iter()
        .map(|url| {
            let mut request = ScanRequest::new(url);
            request.skip_cache = cli.skip_cache;
            request.trace_redirects = !cli.no_redirects;
            request.check_age = !cli.no_age;
            request.check_certificate = !cli.no_certificate;
            request.check_intel = !cli.no_intel;
            request.check_visual = cli.visual;
            request.credentials = credentials.clone();
            request
        })
        .collect();

    let results = scanner.scan_batch(&requests).await;
    scanner.shutdown().await;

    let mut any_malicious = false;
    let mut any_error = false;
    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok((report, from_cache)) => {
                any_malicious |= report.is_malicious;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    continue;
                }
                let verdict = if report.is_malicious {
                    "MALICIOUS".red().bold()
                } else {
                    "clean".green()
                };
                let cached = if from_cache { " (cached)" } else { "" };
                println!("{} {}{}", report.url.cyan(), verdict, cached);
                for reason in &report.reasons {
                    println!("    - {reason}");
                }
            }
            Err(e) => {
                any_error = true;
                eprintln!("{}: {e}", request.url);
            }
        }
    }

    if any_malicious {
        process::exit(1);
    }
    if any_error {
        process::exit(2);
    }
    Ok(())
}
