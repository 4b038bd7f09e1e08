use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use pdf_quizgen::config::Settings;
use pdf_quizgen::db::{self, SqliteSink};
use pdf_quizgen::reader::{DocumentReader, PdfReader};
use pdf_quizgen::{
    FailurePolicy, ItemKind, OpenAiClient, PageRange, Pipeline, PipelineError, RetryingClient,
};

#[derive(Parser)]
#[command(name = "pdf_quizgen", about = "Generate quiz questions from PDF page ranges")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the questions database
    Init,
    /// Read a PDF, generate questions for a page range and store them
    Generate {
        /// PDF file to read
        file: PathBuf,
        /// First page (0-based, inclusive)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        start: i64,
        /// End page (exclusive, default: last page)
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,
        /// Keep going when a request fails and store what was generated
        #[arg(long)]
        best_effort: bool,
        /// Split the range into segments of at most this many characters
        #[arg(long)]
        max_chars: Option<usize>,
        /// Print generated questions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show stored questions
    List {
        /// Filter by kind (multiple_choice, true_false, fill_blank)
        #[arg(short, long)]
        kind: Option<ItemKind>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show question counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            println!("Database ready at {:?}", settings.db_path);
            Ok(())
        }
        Commands::Generate { file, start, end, best_effort, max_chars, json } => {
            if best_effort {
                settings.failure_policy = FailurePolicy::BestEffort;
            }
            if max_chars.is_some() {
                settings.max_segment_chars = max_chars;
            }
            generate(&settings, &file, PageRange::new(start, end), json).await
        }
        Commands::List { kind, limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_questions(&conn, kind, limit)?;
            if rows.is_empty() {
                println!("No questions stored. Run 'generate' first.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<15} | {:<60} | {:<16} | {:<14}",
                "#", "Kind", "Question", "Answer", "Source"
            );
            println!("{}", "-".repeat(118));
            for r in &rows {
                println!(
                    "{:>4} | {:<15} | {:<60} | {:<16} | {:<14}",
                    r.id,
                    r.kind,
                    truncate(&r.content, 60),
                    truncate(&r.answer, 16),
                    truncate(&r.source, 14)
                );
            }
            println!("\n{} questions", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:           {}", s.total);
            println!("Runs:            {}", s.runs);
            println!("Multiple choice: {}", s.multiple_choice);
            println!("True/false:      {}", s.true_false);
            println!("Fill in blank:   {}", s.fill_blank);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn generate(
    settings: &Settings,
    file: &Path,
    range: PageRange,
    json: bool,
) -> anyhow::Result<()> {
    let pages = PdfReader.read_file(file).map_err(PipelineError::from)?;

    let api_key = settings
        .api_key
        .clone()
        .context("No API key: set QUIZGEN_API_KEY or OPENAI_API_KEY")?;
    let client = OpenAiClient::new(
        settings.api_base.as_str(),
        api_key,
        settings.model.as_str(),
        settings.request_timeout(),
    )?;
    let pipeline = Pipeline::new(RetryingClient::new(client, settings.max_retries, settings.backoff()))
        .with_segment_policy(settings.segment_policy())
        .with_failure_policy(settings.failure_policy);

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let source = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let mut sink = SqliteSink::new(&conn, source, settings.difficulty.as_str());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Generating questions with {}...", settings.model));
    pb.enable_steady_tick(Duration::from_millis(120));
    let outcome = pipeline.run(&pages, range, &mut sink).await;
    pb.finish_and_clear();
    let report = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.items)?);
        return Ok(());
    }

    println!(
        "Generated {} questions from {} pages ({} segments), run {}.",
        report.items.len(),
        report.pages,
        report.segments,
        sink.run_id()
    );
    for f in &report.failures {
        println!("  failed: segment {} ({}): {}", f.pair.segment, f.pair.kind, f.error);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    let single_line = s.replace('\n', " ");
    if single_line.chars().count() <= max {
        single_line
    } else {
        let truncated: String = single_line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
