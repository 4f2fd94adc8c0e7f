//! claimlens: review flagged insurance claims from the command line.
//!
//! Usage:
//!   claimlens explain C100
//!   claimlens investigate C100 --json
//!   claimlens batch C100 C200 C300 --concurrency 4
//!   claimlens top --limit 5
//!   claimlens dashboard --bins 20
//!   claimlens analyze --claim "Cardiology, $15,000" --context "provider averages $3,100"
//!   claimlens init-db --db claims.db

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use claimlens_core::{
    dashboard::{DashboardCache, DashboardStats, DEFAULT_HISTOGRAM_BINS},
    gateway::CompletionModel,
    prompt::format_currency,
    CaseReport, CaseReviewer, ClaimStore, OpenAiGateway, ReviewConfig,
};
use serde::Serialize;
use std::fmt::Display;
use std::process::ExitCode;

/// Plain-language explanations and structured investigations of flagged claims
#[derive(Parser)]
#[command(name = "claimlens")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON config file; environment variables still override it
    #[arg(long, global = true)]
    config: Option<String>,

    /// SQLite database with claims, entities and fraud flags
    #[arg(long, global = true)]
    db: Option<String>,

    /// Claims reviewed in parallel during batch commands
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain why one claim was flagged
    Explain {
        claim_id: String,
    },

    /// Produce a structured investigation of one claim
    Investigate {
        claim_id: String,
    },

    /// Explain several claims; output keeps the order given
    Batch {
        #[arg(required = true)]
        claim_ids: Vec<String>,
    },

    /// Investigate the highest-scoring flagged claims
    Top {
        /// Number of cases (default: batch.top_cases_limit from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Summary statistics over every claim in the database
    Dashboard {
        /// Histogram bins for claim amounts
        #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
        bins: usize,
    },

    /// Ad-hoc analysis of free-form claim text
    Analyze {
        #[arg(long)]
        claim: String,

        #[arg(long, default_value = "")]
        context: String,
    },

    /// Create the schema if it does not exist
    InitDb,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ReviewConfig> {
    let mut config = match &cli.config {
        Some(path) => ReviewConfig::load(path)?,
        None => ReviewConfig::from_env()?,
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(n) = cli.concurrency {
        config.batch.concurrency = n;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    log::info!(
        "claimlens v{} db={} model={}",
        env!("CARGO_PKG_VERSION"),
        config.database_path,
        config.model.model
    );
    let reviewer = || -> Result<CaseReviewer<OpenAiGateway>> {
        let gateway = OpenAiGateway::new(&config.model)?;
        Ok(CaseReviewer::from_config(&config, gateway)?)
    };

    match &cli.command {
        Commands::Explain { claim_id } => {
            let report = reviewer()?.explain_case(claim_id)?;
            emit(&report, cli.json)?;
        }
        Commands::Investigate { claim_id } => {
            let report = reviewer()?.investigate_case(claim_id)?;
            emit(&report, cli.json)?;
        }
        Commands::Batch { claim_ids } => {
            let reports = reviewer()?.generate_batch_report(claim_ids.as_slice());
            return emit_batch("FRAUD CASE EXPLANATIONS", &reports, cli.json);
        }
        Commands::Top { limit } => {
            let limit = limit.unwrap_or(config.batch.top_cases_limit);
            let reports = reviewer()?.investigate_top_cases(limit)?;
            return emit_batch("TOP FRAUD CASES", &reports, cli.json);
        }
        Commands::Analyze { claim, context } => {
            let analysis = reviewer()?
                .model()
                .analyze(claim, context)
                .context("analysis request failed")?;
            if cli.json {
                println!("{}", serde_json::json!({ "analysis": analysis }));
            } else {
                println!("{}", analysis.trim());
            }
        }
        Commands::Dashboard { bins } => {
            let store = ClaimStore::new(config.database_path.clone());
            let mut cache = DashboardCache::new(store, *bins);
            let stats = cache.get()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(stats)?);
            } else {
                print_dashboard(stats);
            }
        }
        Commands::InitDb => {
            let store = ClaimStore::new(config.database_path.clone());
            store.migrate()?;
            println!(
                "Database ready at {} ({} claims)",
                store.path(),
                store.claim_count()?
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn emit<T: Serialize + Display>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Print every entry; exit non-zero only if all of them failed.
fn emit_batch<R>(title: &str, reports: &[CaseReport<R>], json: bool) -> Result<ExitCode>
where
    R: Serialize,
    CaseReport<R>: Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        println!("=== {title} ({}) ===", reports.len());
        for (i, report) in reports.iter().enumerate() {
            println!();
            println!("[{}/{}]", i + 1, reports.len());
            println!("{report}");
        }
    }
    let failed = reports.iter().filter(|r| !r.is_success()).count();
    if !reports.is_empty() && failed == reports.len() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_dashboard(stats: &DashboardStats) {
    let m = &stats.metrics;
    println!("=== FRAUD DASHBOARD ===");
    println!("  total claims:   {}", m.total_claims);
    println!("  total amount:   {}", format_currency(m.total_amount));
    println!("  flagged claims: {}", m.fraud_claims);
    println!("  flagged amount: {}", format_currency(m.fraud_amount));
    println!("  fraud rate:     {:.2}%", m.fraud_rate);

    println!();
    println!("=== RULES TRIGGERED ===");
    if stats.rule_counts.is_empty() {
        println!("  (No rules recorded)");
    }
    for rc in &stats.rule_counts {
        println!("  {:<28} {}", rc.rule, rc.count);
    }

    println!();
    println!("=== WEEKLY VOLUME ===");
    for w in &stats.weekly_trend {
        println!(
            "  {} | legitimate: {:>5} | fraud: {:>5}",
            w.week_start, w.legitimate, w.fraud
        );
    }

    println!();
    println!("=== CLAIM AMOUNTS ===");
    for b in &stats.amount_histogram {
        println!(
            "  ${:>12.2} - ${:>12.2} | legitimate: {:>5} | fraud: {:>5}",
            b.lower, b.upper, b.legitimate, b.fraud
        );
    }
}
