use clap::{Args, Parser, Subcommand, ValueEnum};
use issue_health::config::AppConfig;
use issue_health::dates::DateRange;
use issue_health::querier::MetricsQuerier;
use issue_health::types::ProjectLang;
use serde::Serialize;
use std::fmt::Display;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Engineering health metrics for a GitHub issue tracker.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Issues created, closed and open plus pull requests created and merged.
    General(RangeArgs),
    /// Median time to close an issue and the close ratio.
    Maintainability(RangeArgs),
}

#[derive(Args)]
struct RangeArgs {
    /// The project language to pull stats for.
    #[arg(value_enum)]
    lang: ProjectLang,

    /// The earliest date for issue creation in format YYYY-MM-DD.
    #[arg(short, long)]
    start_date: Option<String>,

    /// The latest date for issue creation in format YYYY-MM-DD.
    #[arg(short, long)]
    end_date: Option<String>,
}

impl RangeArgs {
    fn range(&self) -> issue_health::Result<DateRange> {
        DateRange::from_bounds(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Loaded before tracing so RUST_LOG from .env is honoured
    let dotenv = dotenvy::dotenv();

    let default_filter = if cli.verbose {
        "issue_health=debug"
    } else {
        "issue_health=info"
    };

    // Initialize tracing (logging); stdout is reserved for the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = dotenv {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let config = AppConfig::from_env()?;
    tracing::debug!(repository = %config.github_repository, "Loaded configuration");

    let querier = MetricsQuerier::new(&config)?;

    match cli.command {
        Command::General(args) => {
            let report = querier.general(args.lang, args.range()?).await?;
            emit(cli.format, &report)?;
        }
        Command::Maintainability(args) => {
            let report = querier.maintainability(args.lang, args.range()?).await?;
            emit(cli.format, &report)?;
        }
    }

    Ok(())
}

fn emit<R: Display + Serialize>(format: Format, report: &R) -> anyhow::Result<()> {
    match format {
        Format::Text => println!("{report}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
