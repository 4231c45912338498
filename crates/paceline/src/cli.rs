use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use paceline_fetch::FetchOptions;

#[derive(Parser, Debug)]
#[command(version, about = "Fetch a URL with live progress, a speed cap and timeouts", long_about = None)]
pub struct Cli {
    /// URL to fetch
    #[arg(required = true, index = 1)]
    pub url: String,

    /// Write the body to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// HTTP method
    #[arg(short = 'X', long, value_name = "METHOD")]
    pub method: Option<String>,

    /// Request body
    #[arg(short, long, value_name = "STRING")]
    pub data: Option<String>,

    /// Custom HTTP header (format: 'Name: Value')
    #[arg(short = 'H', long, value_name = "HEADER", action = ArgAction::Append)]
    pub header: Vec<String>,

    /// Dial and read timeout in seconds
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Dial timeout in seconds, overrides --timeout
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub dial_timeout: Option<Duration>,

    /// Longest tolerated stall in seconds, overrides --timeout
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub read_timeout: Option<Duration>,

    /// Give up if not finished after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub deadline: Option<Duration>,

    /// Progress reporting interval in seconds
    #[arg(long, value_name = "SECONDS", default_value = "1", value_parser = parse_seconds)]
    pub interval: Duration,

    /// Speed cap in bytes per second (supports K, M, G suffixes)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_speed: Option<u64>,

    /// Fail on the first redirect instead of following it
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_redirects: bool,

    /// Neither request nor decode compressed responses
    #[arg(long, action = ArgAction::SetTrue)]
    pub disable_compression: bool,

    /// Print a JSON summary of the finished transfer to stderr
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Quiet mode - no progress bar
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Cli {
    /// Options for the transfer, without callback or control handle.
    pub fn options(&self) -> anyhow::Result<FetchOptions> {
        let mut options = FetchOptions::default()
            .headers(self.headers()?)
            .report_interval(self.interval)
            .follow_redirects(!self.no_redirects)
            .disable_compression(self.disable_compression);

        if let Some(ref method) = self.method {
            options = options.method(method.as_str());
        }
        if let Some(ref data) = self.data {
            options = options.body(data.clone());
        }
        if let Some(timeout) = self.timeout {
            options = options.timeout(timeout);
        }
        if let Some(timeout) = self.dial_timeout {
            options = options.dial_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            options = options.read_timeout(timeout);
        }
        if let Some(within) = self.deadline {
            options = options.deadline_in(within);
        }
        if let Some(speed) = self.max_speed {
            options = options.max_speed(speed);
        }
        Ok(options)
    }

    fn headers(&self) -> anyhow::Result<Vec<(String, String)>> {
        self.header
            .iter()
            .map(|header| {
                let (name, value) = header
                    .split_once(':')
                    .with_context(|| format!("header {header:?} is not 'Name: Value'"))?;
                Ok((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.trim().parse().map_err(|e| format!("{s:?}: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{s:?}: {e}"))
}

fn parse_size(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    let (digits, multiplier) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 1024),
        Some((i, 'm' | 'M')) => (&s[..i], 1024 * 1024),
        Some((i, 'g' | 'G')) => (&s[..i], 1024 * 1024 * 1024),
        Some(_) => (s, 1),
        None => bail!("empty size"),
    };
    let value: u64 = digits.trim().parse().with_context(|| format!("size {s:?}"))?;
    value.checked_mul(multiplier).with_context(|| format!("size {s:?} is too large"))
}
