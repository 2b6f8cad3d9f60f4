use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod db;
mod error;
mod models;
mod range;
mod ranking;
mod report;
mod scope;
mod store;
mod trend;
mod wire;

use config::StatsConfig;
use db::{PgTicketListing, PgTicketStore};
use models::Caller;

#[derive(Parser)]
#[command(name = "ticket-dashboard")]
#[command(about = "Dashboard statistics for the ticket workflow system", long_about = None)]
struct Cli {
    /// Logging verbosity (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Deadline in seconds for each store query
    #[arg(
        long,
        global = true,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    #[arg(long, global = true, default_value_t = 5)]
    max_connections: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import tickets from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Daily created/completed/pending counts
    Trend {
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// Anchor day, defaults to today (UTC)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Ticket submitters, fewest tickets first
    Leaderboard {
        #[arg(long, default_value_t = 6)]
        limit: usize,
    },
    /// Ticket totals per visibility scope for a user
    Scopes {
        #[arg(long)]
        user_id: i64,
    },
    /// Processes ranked by tickets created in a range
    Processes {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Full dashboard payload as JSON
    Dashboard {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(true).init();

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the ticket database")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let stats = StatsConfig::default().with_timeout_secs(cli.timeout_secs);
    let timeout = stats.query_timeout;
    let store = PgTicketStore::new(pool.clone());
    let listing = PgTicketListing::new(pool.clone());
    let today = trend::today();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool, today).await?;
            println!("Seed data inserted ({inserted} new tickets).");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} tickets from {}.", csv.display());
        }
        Commands::Trend { days, today: anchor } => {
            let anchor = anchor.unwrap_or(today);
            let buckets = trend::daily_series(&store, anchor, days, timeout)
                .await
                .context("failed to build the daily time series")?;
            print_json(&wire::TimeSeries::from(&buckets[..]))?;
        }
        Commands::Leaderboard { limit } => {
            let ranks = ranking::submit_ranking(&store, limit, timeout)
                .await
                .context("failed to rank submitters")?;
            print_json(&wire::submitters(&ranks))?;
        }
        Commands::Scopes { user_id } => {
            let counts = scope::scope_counts(&listing, Caller { user_id }, timeout)
                .await
                .context("failed to count ticket scopes")?;
            print_json(&wire::ScopeTotals::from(counts))?;
        }
        Commands::Processes { start, end, limit } => {
            let range = range::resolve_range(start.as_deref(), end.as_deref(), today)?;
            let ranks = ranking::process_ranking(&store, range, limit, timeout)
                .await
                .context("failed to rank processes")?;
            print_json(&wire::processes(&ranks))?;
        }
        Commands::Dashboard { user_id, start, end } => {
            let range = range::resolve_range(start.as_deref(), end.as_deref(), today)?;
            let (counts, processes, submitters, buckets) = tokio::try_join!(
                scope::scope_counts(&listing, Caller { user_id }, timeout),
                ranking::process_ranking(&store, range, stats.process_rank_limit, timeout),
                ranking::submit_ranking(&store, stats.leaderboard_size, timeout),
                trend::daily_series(&store, today, stats.window_days, timeout),
            )
            .context("failed to build the dashboard")?;
            print_json(&wire::Dashboard::new(counts, &processes, &submitters, &buckets))?;
        }
        Commands::Report {
            user_id,
            start,
            end,
            out,
        } => {
            let range = range::resolve_range(start.as_deref(), end.as_deref(), today)?;
            let caller = Caller { user_id };
            let buckets = trend::daily_series(&store, today, stats.window_days, timeout).await?;
            let scopes = scope::scope_counts(&listing, caller, timeout).await?;
            let submitters =
                ranking::submit_ranking(&store, stats.leaderboard_size, timeout).await?;
            let processes =
                ranking::process_ranking(&store, range, stats.process_rank_limit, timeout).await?;

            let caller_label = format!("user {user_id}");
            let report = report::build_report(&report::DashboardReport {
                caller_label: &caller_label,
                range,
                buckets: &buckets,
                scopes,
                submitters: &submitters,
                processes: &processes,
            });
            std::fs::write(&out, report)?;
            tracing::info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        let args = ["ticket-dashboard", "--timeout-secs", "0", "seed"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn timeout_flag_sets_the_query_deadline() {
        let args = ["ticket-dashboard", "seed", "--timeout-secs", "3"];
        let cli = Cli::try_parse_from(args).unwrap();
        let stats = StatsConfig::default().with_timeout_secs(cli.timeout_secs);
        assert_eq!(stats.query_timeout, std::time::Duration::from_secs(3));
    }
}
