//! Command-line entrypoint: summarize a single PDF and print the result.
//!
//! Progress is narrated on stderr while the request runs; the summary alone goes to stdout so
//! it can be redirected into a file.
use anyhow::{Context, Result};
use clap::Parser;
use papersum::{
    config, logging,
    processing::{DEFAULT_SUMMARY_QUERY, PipelineApi, SummaryOptions, SummaryPipeline},
    progress::{ProgressEvent, WaitReason},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "summarize-pdf",
    about = "Summarize a research paper PDF with a hosted model"
)]
struct Cli {
    /// Path to the PDF to summarize.
    path: PathBuf,
    /// Retrieval query used to pick the chunks sent to the model.
    #[arg(long, default_value = DEFAULT_SUMMARY_QUERY)]
    query: String,
    /// Number of chunks to retrieve (defaults to RETRIEVAL_TOP_K).
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Summary failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_cli_tracing();

    let bytes = tokio::fs::read(&cli.path)
        .await
        .with_context(|| format!("failed to read {}", cli.path.display()))?;
    eprintln!("File: {}", cli.path.display());

    let pipeline = SummaryPipeline::from_config(&config)?;
    let report = pipeline
        .summarize_document(
            bytes,
            SummaryOptions {
                query: cli.query,
                top_k: cli.top_k,
            },
            &narrate,
        )
        .await?;

    println!("{}", report.summary);
    Ok(())
}

fn narrate(event: &ProgressEvent) {
    match event {
        ProgressEvent::PagesExtracted { pages, preview } => {
            eprintln!("Extracted {pages} pages from PDF");
            if let Some(preview) = preview {
                eprintln!("Preview of first page: {preview}");
            }
        }
        ProgressEvent::ChunksIndexed {
            chunks,
            duplicates_skipped,
        } => eprintln!("Created {chunks} chunks ({duplicates_skipped} duplicates skipped)"),
        ProgressEvent::ChunksRetrieved { retrieved } => {
            eprintln!("Retrieved {retrieved} relevant chunks for summarization")
        }
        ProgressEvent::ContextPrepared { chunks, characters } => {
            eprintln!("Processing {chunks} chunks of text (total length: {characters} chars)")
        }
        ProgressEvent::AttemptStarted {
            attempt,
            max_retries,
            timeout,
        } => eprintln!(
            "Attempt {} of {max_retries}: sending request with {}s timeout...",
            attempt + 1,
            timeout.as_secs_f64()
        ),
        ProgressEvent::ResponseReceived { status, .. } => eprintln!("Response status: {status}"),
        ProgressEvent::RequestFailed {
            timed_out, message, ..
        } => {
            if *timed_out {
                eprintln!("Request timed out");
            } else {
                eprintln!("Request error: {message}");
            }
        }
        ProgressEvent::Waiting { reason, delay, .. } => {
            let why = match reason {
                WaitReason::ModelLoading => "Model is loading",
                WaitReason::WarmingUp => "Model is warming up",
                WaitReason::Backoff => "Backing off",
            };
            eprintln!("{why}, waiting {}s before retry...", delay.as_secs_f64());
        }
        ProgressEvent::AttemptFinished(_) => {}
    }
}
