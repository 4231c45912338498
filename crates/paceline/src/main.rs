mod cli;
mod report;
mod ui;

use anyhow::Context;
use clap::Parser;
use console::style;
use paceline_fetch::{Control, Fetched, Fetcher, ReqwestClient};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::report::Summary;
use crate::ui::ProgressTracker;

const USER_AGENT: &str = concat!("paceline/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let control = Control::new();
    let tracker = (!cli.quiet).then(ProgressTracker::new);

    let mut options = cli.options()?.control(control.clone());
    if let Some(tracker) = tracker.clone() {
        options = options.on_progress(move |progress| {
            tracker.update(progress);
            Ok(())
        });
    }

    let stopper = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.request_stop();
        }
    });

    debug!(url = %cli.url, output = ?cli.output, "starting");
    let fetcher = Fetcher::new(ReqwestClient::new().user_agent(USER_AGENT));
    let result = match cli.output {
        Some(ref path) => fetcher.fetch_file(&cli.url, path, options).await,
        None => {
            let mut stdout = tokio::io::stdout();
            fetcher.write_to(&cli.url, &mut stdout, options).await
        }
    };

    let fetched: Fetched<()> = match result {
        Ok(fetched) => {
            if let Some(ref tracker) = tracker {
                tracker.finish();
            }
            fetched
        }
        Err(e) => {
            if let Some(ref tracker) = tracker {
                tracker.abandon(&e.to_string());
            }
            if e.is_user_initiated() {
                eprintln!("{} {e}", style("stopped:").yellow().bold());
                std::process::exit(130);
            }
            return Err(e).with_context(|| format!("fetching {}", cli.url));
        }
    };

    let summary = Summary::from(&fetched);
    if cli.json {
        eprintln!("{}", summary.to_json()?);
    } else if !cli.quiet {
        eprintln!("{}", summary.line());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
