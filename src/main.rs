use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fetchgate::{init_logging, SystemResolver, ValidatorConfig, Verdict};
use serde::Serialize;

/// Check whether URLs are safe for a server to fetch
#[derive(Parser, Debug)]
#[command(name = "fetchgate")]
#[command(version)]
#[command(about = "Check whether URLs are safe for a server to fetch", long_about = None)]
struct Args {
    /// URLs to validate
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Validator config file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// DNS timeout in milliseconds (overrides the config file)
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print one JSON object per URL
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    url: &'a str,
    #[serde(flatten)]
    verdict: &'a Verdict,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => ValidatorConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ValidatorConfig::default(),
    };
    if let Some(ms) = args.timeout_ms {
        config.dns_timeout_ms = ms;
    }
    tracing::debug!(timeout = ?Duration::from_millis(config.dns_timeout_ms), "validator configured");

    let validator = config
        .build_validator(SystemResolver)
        .context("building validator")?;

    let mut all_valid = true;
    for url in &args.urls {
        let verdict = validator.validate(url).await;
        all_valid &= verdict.is_valid();

        if args.json {
            let line = serde_json::to_string(&Report { url, verdict: &verdict })?;
            println!("{}", line);
        } else {
            match verdict.reason() {
                None => println!("allowed  {}", url),
                Some(reason) => println!("denied   {}  ({})", url, reason),
            }
        }
    }

    Ok(if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
