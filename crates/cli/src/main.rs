//! WildWatch CLI for species lookup and report moderation.
//!
//! Usage:
//!     wildwatch species "Panthera leo"
//!     wildwatch reports list --status pending --search turtle
//!     wildwatch reports export --out reports.csv
//!     wildwatch reports set-status 66f resolved
//!     wildwatch health

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use wildwatch_api::{ApiConfig, HttpReportsApi, ReportsApi, StaticToken};
use wildwatch_board::ReportBoard;
use wildwatch_lookup::{LookupConfig, SpeciesLookupResolver};
use wildwatch_model::{FilterState, ReportStatus, SpeciesRecord, StatusFilter};
use wildwatch_sources::{GbifClient, GbifConfig, WikipediaClient, WikipediaConfig};

#[derive(Parser)]
#[command(name = "wildwatch")]
#[command(about = "Species lookup and conservation report moderation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend API base URL
    #[arg(long, default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer token for the backend (falls back to WILDWATCH_TOKEN)
    #[arg(long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a species by common or scientific name
    Species {
        /// Free-text species name
        query: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Moderate conservation reports
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Check backend health
    Health,
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List reports with stats
    List {
        /// Filter by status (pending, reviewed, resolved)
        #[arg(short, long)]
        status: Option<String>,

        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Export the filtered view as CSV
    Export {
        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        search: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Set the status of one report
    SetStatus {
        /// Report id
        id: String,

        /// New status (pending, reviewed, resolved)
        status: String,
    },

    /// Delete one report
    Delete {
        /// Report id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wildwatch=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var("WILDWATCH_TOKEN").ok());
    let api = HttpReportsApi::new(
        ApiConfig {
            base_url: cli.api_url.clone(),
            ..Default::default()
        },
        Arc::new(StaticToken::new(token)),
    );

    match cli.command {
        Commands::Species { query, format } => {
            run_species(&query, &format).await?;
        }
        Commands::Reports { command } => {
            run_reports(api, command).await?;
        }
        Commands::Health => {
            run_health(&api).await?;
        }
    }

    Ok(())
}

async fn run_species(query: &str, format: &str) -> Result<()> {
    let resolver = SpeciesLookupResolver::new(
        GbifClient::new(GbifConfig::default()),
        WikipediaClient::new(WikipediaConfig::default()),
        LookupConfig::default(),
    );

    let record = resolver.resolve_text(query).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_species(&record);
    }

    Ok(())
}

fn print_species(record: &SpeciesRecord) {
    println!("{} ({})", record.common_name, record.scientific_name);
    println!("---");
    println!("Kingdom: {}  Phylum: {}", record.kingdom, record.phylum);
    println!("Class:   {}  Order:  {}", record.class, record.order);
    println!("Family:  {}  Genus:  {}", record.family, record.genus);
    println!("Rank: {} | Status: {}", record.rank, record.taxonomic_status);
    println!();
    println!("{}", record.description);

    if let Some(url) = &record.source_url {
        println!("\nRead more: {}", url);
    }

    if !record.images.is_empty() {
        println!("\nImages:");
        for image in &record.images {
            println!("  {}", image);
        }
    }
}

fn parse_status(s: &str) -> Result<ReportStatus> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(ReportStatus::Pending),
        "reviewed" => Ok(ReportStatus::Reviewed),
        "resolved" => Ok(ReportStatus::Resolved),
        other => bail!("Unknown status '{}' (expected pending, reviewed or resolved)", other),
    }
}

fn build_filter(status: Option<String>, search: Option<String>) -> Result<FilterState> {
    let status = match status {
        Some(s) => StatusFilter::Only(parse_status(&s)?),
        None => StatusFilter::All,
    };
    Ok(FilterState::new(status, search.unwrap_or_default()))
}

async fn run_reports(api: HttpReportsApi, command: ReportCommands) -> Result<()> {
    let mut board = ReportBoard::new(api);

    match command {
        ReportCommands::List {
            status,
            search,
            format,
        } => {
            board.load().await.context("Failed to load reports")?;

            let filter = build_filter(status, search)?;
            let view = board.filtered_view(&filter);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                let stats = board.stats();
                println!(
                    "Total: {} | Pending: {} | Reviewed: {} | Resolved: {}",
                    stats.total, stats.pending, stats.reviewed, stats.resolved
                );
                println!("---");

                if view.is_empty() {
                    println!("No reports found");
                }
                for report in view {
                    println!(
                        "{}  [{}]  {} - {} ({})",
                        report.id,
                        report.status,
                        report.species_name,
                        report.issue_type,
                        report.reporter()
                    );
                }
            }
        }

        ReportCommands::Export { status, search, out } => {
            board.load().await.context("Failed to load reports")?;

            let filter = build_filter(status, search)?;
            let csv = board.export_csv(&filter);

            match out {
                Some(path) => {
                    std::fs::write(&path, csv).with_context(|| format!("Failed to write {}", path))?;
                    println!("Exported to {}", path);
                }
                None => println!("{}", csv),
            }
        }

        ReportCommands::SetStatus { id, status } => {
            let status = parse_status(&status)?;
            board.load().await.context("Failed to load reports")?;
            board
                .set_status(&id, status)
                .await
                .context("Failed to update status")?;
            println!("Status updated to {}", status);
        }

        ReportCommands::Delete { id, yes } => {
            board.load().await.context("Failed to load reports")?;

            let confirm = || yes || prompt_confirm(&id);
            if board.remove(&id, confirm).await.context("Failed to delete report")? {
                println!("Report {} deleted", id);
            } else {
                println!("Aborted");
            }
        }
    }

    Ok(())
}

fn prompt_confirm(id: &str) -> bool {
    print!("Delete report {}? [y/N] ", id);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y")
}

async fn run_health(api: &HttpReportsApi) -> Result<()> {
    print!("Checking {} backend... ", api.name());

    match api.health().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
