use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hirematch::{
    Document, LexicalScorer, MatchingPipeline, ResumeSubmission, Settings, SnapshotStatus,
    VectorIndex,
};

#[derive(Parser)]
#[command(name = "hirematch")]
#[command(version = "0.1")]
#[command(about = "Score resumes against a job and search them by similarity", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one resume against a job; reads {"job": {...}, "resume": "..."} from stdin
    Score,
    /// Score and index resumes; reads {"candidate_id", "text"} JSON lines from stdin
    Ingest {
        /// JSON file with the job: {"text": "...", "required_skills": [...]}
        #[arg(long)]
        job: PathBuf,
    },
    /// Find indexed candidates closest to the text on stdin
    Search {
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// List indexed candidate ids in insertion order
    List,
    /// Print the effective configuration
    Config,
    /// Rebuild the id list from the committed vector store after an interrupted write
    Repair,
}

#[derive(Deserialize)]
struct ScoreRequest {
    job: Document,
    resume: String,
}

fn open_pipeline(settings: &Settings) -> Result<MatchingPipeline> {
    let (index, status) = VectorIndex::open(settings).with_context(|| {
        format!(
            "Failed to open index at '{}' (try `hirematch repair` if a write was interrupted)",
            settings.index_path.display()
        )
    })?;
    if let SnapshotStatus::Loaded { entries } = status {
        log::debug!("index holds {} entries", entries);
    }
    Ok(MatchingPipeline::new(Arc::new(index)))
}

fn score_command(settings: &Settings) -> Result<()> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let request: ScoreRequest =
        serde_json::from_str(&input).context("Failed to parse score request JSON")?;

    let result = LexicalScorer::from_settings(settings).score_breakdown(
        &request.job.text,
        &request.job.required_skills,
        &request.resume,
    );
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn ingest_command(settings: &Settings, job_path: &Path) -> Result<()> {
    let job_json = fs::read_to_string(job_path)
        .with_context(|| format!("Failed to read job file '{}'", job_path.display()))?;
    let job: Document = serde_json::from_str(&job_json).context("Failed to parse job JSON")?;

    let resumes = io::stdin()
        .lock()
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| -> Result<ResumeSubmission> {
            let line = line?;
            serde_json::from_str(&line).context("Failed to parse resume JSON line")
        })
        .collect::<Result<Vec<_>>>()?;

    let pipeline = open_pipeline(settings)?;
    for scored in pipeline.process_batch(&job, &resumes)? {
        println!("{}", serde_json::to_string(&scored)?);
    }
    Ok(())
}

fn search_command(settings: &Settings, top_k: Option<usize>) -> Result<()> {
    let mut query = String::new();
    io::stdin().read_to_string(&mut query)?;
    let top_k = top_k.unwrap_or(settings.top_k);

    let pipeline = open_pipeline(settings)?;
    let hits = pipeline.find_similar(&query, top_k)?;

    let output = serde_json::json!({
        "index_record_count": pipeline.index().len(),
        "results": hits,
        "actual_results_count": hits.len(),
        "requested_results_count": top_k,
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn list_command(settings: &Settings) -> Result<()> {
    let pipeline = open_pipeline(settings)?;
    for id in pipeline.index().ids() {
        println!("{}", id);
    }
    Ok(())
}

fn config_command(settings: &Settings) -> Result<()> {
    settings.print_config();
    Ok(())
}

fn repair_command(settings: &Settings) -> Result<()> {
    let entries = VectorIndex::repair(settings).with_context(|| {
        format!(
            "Vector store '{}' is not intact; it cannot be repaired from itself",
            settings.index_path.display()
        )
    })?;
    println!("restored {} entries", entries);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;

    match args.command {
        Commands::Score => score_command(&settings)?,
        Commands::Ingest { job } => ingest_command(&settings, &job)?,
        Commands::Search { top_k } => search_command(&settings, top_k)?,
        Commands::List => list_command(&settings)?,
        Commands::Config => config_command(&settings)?,
        Commands::Repair => repair_command(&settings)?,
    }
    Ok(())
}
