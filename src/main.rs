//! Command-line entrypoint.
//!
//! `finsum summarize` reads pre-extracted report text, runs the pipeline, and writes the two-page
//! and one-page summaries as Markdown. `finsum search` queries the indexed chunks.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use finsum::{
    config::{self, Config},
    logging,
    processing::{Document, PipelineError, SearchError, SummaryPipeline},
    render::{
        COMPREHENSIVE_FILE_NAME, COMPREHENSIVE_TITLE, CONCISE_FILE_NAME, CONCISE_TITLE,
        MarkdownRenderer,
    },
};
use walkdir::WalkDir;

const INPUT_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Parser)]
#[command(
    name = "finsum",
    about = "Summarize financial reports into two-page and one-page briefs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize text files (or directories of `.txt`/`.md` files).
    Summarize {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_parser = parse_positive)]
        num_clusters: Option<usize>,
        #[arg(long, value_parser = parse_positive)]
        chunk_size: Option<usize>,
        #[arg(long)]
        collection: Option<String>,
    },
    /// Return the stored chunks most similar to a query.
    Search {
        query: String,
        #[arg(long, default_value_t = 5, value_parser = parse_positive)]
        top_k: usize,
        #[arg(long)]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        if is_validation(&err) {
            tracing::error!(error = %err, "Validation error");
            eprintln!("error: {err}");
        } else {
            tracing::error!(error = ?err, "An error occurred");
            eprintln!("error: {err:?}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    // RUST_LOG and FINSUM_LOG_FILE may come from .env.
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let mut config = config::init_config()
        .context("failed to load configuration")?
        .clone();

    match cli.command {
        Command::Summarize {
            paths,
            output_dir,
            num_clusters,
            chunk_size,
            collection,
        } => {
            if let Some(value) = num_clusters {
                config.num_clusters = value;
            }
            if let Some(value) = chunk_size {
                config.chunk_size = value;
            }
            if let Some(value) = collection {
                config.collection_name = value;
            }
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.output_dir));
            summarize(&config, &paths, &output_dir).await
        }
        Command::Search {
            query,
            top_k,
            collection,
        } => {
            if let Some(value) = collection {
                config.collection_name = value;
            }
            search(&config, &query, top_k).await
        }
    }
}

async fn summarize(config: &Config, paths: &[PathBuf], output_dir: &Path) -> Result<()> {
    let documents = load_documents(paths)?;
    let pipeline = SummaryPipeline::from_config(config).context("failed to build pipeline")?;

    let outcome = pipeline.run(documents).await?;

    let renderer = MarkdownRenderer;
    let comprehensive_path = output_dir.join(COMPREHENSIVE_FILE_NAME);
    let concise_path = output_dir.join(CONCISE_FILE_NAME);
    renderer.render(
        &outcome.comprehensive_summary,
        &comprehensive_path,
        COMPREHENSIVE_TITLE,
    )?;
    renderer.render(&outcome.concise_summary, &concise_path, CONCISE_TITLE)?;

    let snapshot = pipeline.metrics_snapshot();
    tracing::info!(
        metrics = %serde_json::to_string(&snapshot)?,
        "Pipeline metrics"
    );
    println!(
        "Wrote {} and {} ({} chunks, {} clusters, {} generation calls)",
        comprehensive_path.display(),
        concise_path.display(),
        outcome.chunk_count,
        outcome.cluster_count,
        outcome.generation_calls
    );
    Ok(())
}

async fn search(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let pipeline = SummaryPipeline::from_config(config).context("failed to build pipeline")?;
    let hits = pipeline.find_similar(query, top_k).await?;

    if hits.is_empty() {
        println!("No matching chunks in '{}'", config.collection_name);
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. {} (score {:.4})", rank + 1, hit.id, hit.score);
        if let Some(text) = &hit.text {
            println!("   {}", preview(text, 160));
        }
    }
    Ok(())
}

/// Expand paths into input files: files are taken as-is, directories are walked for
/// `.txt`/`.md` files in file-name order.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
                let candidate = entry.path();
                let matches = candidate
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext));
                if entry.file_type().is_file() && matches {
                    inputs.push(candidate.to_path_buf());
                }
            }
        } else {
            inputs.push(path.clone());
        }
    }

    if inputs.is_empty() {
        bail!(PipelineError::Extraction {
            source_id: "<input>".into(),
            reason: "no .txt or .md files found".into(),
        });
    }
    Ok(inputs)
}

fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    collect_inputs(paths)?
        .into_iter()
        .map(|path| {
            let source_id = path.display().to_string();
            tracing::info!(file = %source_id, "Processing file");
            let text = fs::read_to_string(&path).map_err(|err| PipelineError::Extraction {
                source_id: source_id.clone(),
                reason: err.to_string(),
            })?;
            Ok(Document::new(source_id, text))
        })
        .collect()
}

fn is_validation(err: &anyhow::Error) -> bool {
    if let Some(error) = err.downcast_ref::<PipelineError>() {
        return error.is_validation();
    }
    matches!(err.downcast_ref::<SearchError>(), Some(SearchError::EmptyQuery))
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(format!("expected a positive integer, got '{value}'")),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}
