use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::services::poller::DEFAULT_POLL_INTERVAL;

pub const APP_NAME: &str = "shopwise";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "shopwise", about = "Chat with an AI assistant about products you add by URL")]
pub struct Cli {
    /// Base URL of the product Q&A backend.
    #[arg(long, env = "SHOPWISE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Developer option: status poll interval in milliseconds.
    #[arg(long, env = "SHOPWISE_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Developer option: directory for the local preferences database.
    #[arg(long, env = "SHOPWISE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Developer option: disable ANSI colours.
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub color: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let parsed = url::Url::parse(&cli.api_url)
            .with_context(|| format!("Invalid API URL: {}", cli.api_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("API URL must use http or https: {}", cli.api_url);
        }
        if cli.poll_interval_ms == 0 {
            bail!("Poll interval must be greater than zero");
        }

        let data_dir = match cli.data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };

        Ok(Self {
            api_base_url: cli.api_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            request_timeout: REQUEST_TIMEOUT,
            data_dir,
            color: !cli.no_color,
        })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let base = match std::env::var("XDG_DATA_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var("HOME").context("HOME not set")?;
            PathBuf::from(home).join(".local/share")
        }
    };
    Ok(base.join(APP_NAME))
}
