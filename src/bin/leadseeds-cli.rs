//! Interactive lead discovery from the terminal.
//!
//! Prompts for a free-text search (or takes it as arguments), runs the pipeline with
//! per-candidate progress, then writes the leads to CSV and an Excel workbook and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadseeds::config::Config;
use leadseeds::export::{render_table, write_csv, write_xlsx, RunSummary};
use leadseeds::core::models::{RunStatus, SearchQuery};
use leadseeds::core::pipeline::{
    Admission, LeadPipeline, PipelineSettings, ProgressEvent, ProgressObserver, SkipReason,
    StageOutcome,
};
use leadseeds::core::query_parser::{fallback_business_type, parse_search_input};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Parser)]
#[command(name = "leadseeds-cli")]
#[command(about = "Find, enrich and score local business leads")]
struct Cli {
    /// What to look for, e.g. "plumbers in Chester". Prompted for when omitted.
    query: Vec<String>,

    /// How many leads to collect (defaults to TARGET_LEAD_COUNT)
    #[arg(short = 'n', long)]
    target: Option<usize>,

    /// Directory the CSV and workbook are written to
    #[arg(short, long, default_value = "leads")]
    output_dir: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

/// Prints one line per candidate and stage, like a progress log.
struct ConsoleObserver;

impl ProgressObserver for ConsoleObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { query, .. } => {
                println!("\n🔍  Searching: \"{}\"\n", query.directory_phrase())
            }
            ProgressEvent::CandidatesCollected { count } => {
                println!("📋  Found {} listings.", count)
            }
            ProgressEvent::CandidateSkipped { name, reason, .. } => match reason {
                SkipReason::BigBrand(_) => println!("\n  ⏭️  Skipped (big brand): {}", name),
                SkipReason::NoName => println!("\n  ⏭️  Skipped a listing with no name"),
                SkipReason::ListingUnavailable => println!("\n  ⚠️  Skipped a listing"),
            },
            ProgressEvent::CandidateStarted { index, name } => {
                println!("\n  [{}] {}", index + 1, name)
            }
            ProgressEvent::StageFinished { stage, outcome, .. } => {
                let outcome = match outcome {
                    StageOutcome::Found => "found",
                    StageOutcome::NotFound => "not found",
                    StageOutcome::Skipped => "skipped",
                };
                println!("       {:<9} {}", stage.label(), outcome);
            }
            ProgressEvent::CandidateScored {
                score, admission, ..
            } => {
                println!("       ⭐ Score: {}/10", score);
                if !matches!(admission, Admission::Admitted(_)) {
                    println!("       ↩️  Skipped: score too low or bucket full");
                }
            }
            ProgressEvent::RunFinished { .. } => {}
        }
    }
}

fn prompt(text: &str) -> Result<String> {
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(text)
        .allow_empty(true)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

/// Parses the request, asking for whatever the parser could not find.
fn resolve_query(cli: &Cli) -> Result<SearchQuery> {
    let raw = if cli.query.is_empty() {
        println!("  You can type naturally, e.g.:");
        println!("    \"plumbers in Chester\"");
        println!("    \"I need to find new trade businesses in Chester\"");
        println!("    \"accountants near Manchester\"\n");
        prompt("What are you looking for?")?
    } else {
        cli.query.join(" ")
    };
    if raw.is_empty() {
        anyhow::bail!("Please enter a search.");
    }

    let mut query = parse_search_input(&raw);
    if query.location.trim().is_empty() {
        let detected = if query.business_type.is_empty() {
            raw.as_str()
        } else {
            query.business_type.as_str()
        };
        println!("  Detected business type: \"{}\"", detected);
        query.location = prompt("Which town or city?")?;
    }
    if query.business_type.trim().is_empty() {
        query.business_type = fallback_business_type(&raw);
    }
    if query.location.trim().is_empty() {
        anyhow::bail!("Could not determine a location. Please try again.");
    }

    Ok(query)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadseeds=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    println!("{}", RULE);
    println!("  🌱  LeadSeeds: local business lead finder");
    println!("{}\n", RULE);

    let query = resolve_query(&cli)?;
    println!(
        "\n  Searching for: \"{}\" in \"{}\"\n",
        query.business_type, query.location
    );

    if !cli.yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Start the search?")
            .default(true)
            .interact()?
    {
        return Ok(());
    }

    if config.companies_house_api_key.is_none() {
        println!("  ℹ️  No COMPANIES_HOUSE_API_KEY set: registration dates will be skipped.\n");
    }

    let mut settings = PipelineSettings::from_config(&config);
    if let Some(target) = cli.target {
        settings = settings.with_target(target);
    }
    let pipeline = LeadPipeline::from_config(&config)?.with_settings(settings);

    // Ctrl-C stops at the next candidate boundary; admitted leads are still saved
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n  ✋ Stopping after the current listing...");
            on_interrupt.cancel();
        }
    });

    let report = pipeline.run(&query, &ConsoleObserver, &cancel).await;

    match report.status {
        RunStatus::NoCandidates => {
            println!("\n❌  No listings found. Try a broader search term or different location.");
            return Ok(());
        }
        RunStatus::Cancelled => println!("\n  Run cancelled."),
        RunStatus::TargetMet | RunStatus::Exhausted => {}
    }
    if report.is_empty() {
        println!("\n❌  No leads extracted. Try a broader search term or different location.");
        return Ok(());
    }

    let date = chrono::Local::now().date_naive();
    let csv_path = write_csv(&report, &cli.output_dir, date).context("Failed to save CSV")?;
    let excel_path =
        write_xlsx(&report, &cli.output_dir, date).context("Failed to save Excel workbook")?;

    println!("\n{}", RULE);
    println!("  ✅  {} leads saved:", report.leads.len());
    println!("  📊  Excel → {}", excel_path.display());
    println!("  📄  CSV   → {}", csv_path.display());
    println!("{}\n", RULE);

    println!("{}\n", render_table(&report.leads));
    println!("{}\n", RunSummary::from_report(&report));

    Ok(())
}
