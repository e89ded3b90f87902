use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pagelens_core::{
    assemble_podcast, discover_pdf_files, merge_untitled_chunks, parse_folder, rank_chunks,
    AnalysisPipeline, CharacterNgramEmbedder, GeneratorConfig, HttpSynthesizer,
    HttpTextGenerator, LopdfSpanExtractor, RankingOptions, SentenceIndex, SynthesizerConfig,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pagelens", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank document sections against a persona/task and emit the analysis envelope.
    Analyze {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: String,
        /// Persona role, e.g. "travel planner".
        #[arg(long)]
        persona: String,
        /// Job to be done, e.g. "plan a 4-day trip for college friends".
        #[arg(long)]
        task: String,
        /// Number of sections to return.
        #[arg(long, default_value = "10")]
        top_k: usize,
        /// Minimum cosine similarity; omit to keep a fixed top-K regardless of score.
        #[arg(long)]
        score_threshold: Option<f32>,
        /// Directory to write the JSON envelope into (also printed to stdout).
        #[arg(long)]
        output: Option<String>,
    },
    /// Rank chunks (or sentences) against a free-text query.
    Search {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: String,
        /// Search query.
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value = "10")]
        top_k: usize,
        /// Minimum cosine similarity; omit to keep a fixed top-K regardless of score.
        #[arg(long)]
        score_threshold: Option<f32>,
        /// Search at sentence granularity instead of whole chunks.
        #[arg(long, default_value_t = false)]
        sentences: bool,
        /// Drop the single best hit and start ranks at 2.
        #[arg(long, default_value_t = false)]
        exclude_top_hit: bool,
    },
    /// Generate a two-speaker podcast script (and audio, when TTS is configured) for a topic.
    Podcast {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: String,
        /// Topic or selected text to build the episode around.
        #[arg(long)]
        topic: String,
        /// Directory to write the audio file into.
        #[arg(long, default_value = "output/audio")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    // The embedding provider is constructed once per process and shared
    // immutably from here on.
    let embedder = CharacterNgramEmbedder::default();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pagelens boot"
    );

    match cli.command {
        Command::Analyze {
            folder,
            persona,
            task,
            top_k,
            score_threshold,
            output,
        } => {
            let documents = discover_pdf_files(Path::new(&folder));
            if documents.is_empty() {
                warn!(folder = %folder, "no pdf documents found");
            }

            let mut pipeline = AnalysisPipeline::new(LopdfSpanExtractor, embedder)
                .with_options(RankingOptions {
                    top_k,
                    score_threshold,
                    exclude_top_hit: false,
                });
            if let Some(config) = GeneratorConfig::from_env() {
                pipeline = pipeline.with_generator(Box::new(HttpTextGenerator::new(config)?));
            } else {
                info!("no generation endpoint configured; ranking against the raw persona query");
            }

            let envelope = pipeline.analyze(&documents, &persona, &task).await?;
            let rendered = serde_json::to_string_pretty(&envelope)?;
            println!("{rendered}");

            if let Some(output) = output {
                let path = write_artifact(&output, "analysis", "json", rendered.as_bytes())?;
                info!(path = %path.display(), "analysis envelope written");
            }
        }
        Command::Search {
            folder,
            query,
            top_k,
            score_threshold,
            sentences,
            exclude_top_hit,
        } => {
            let report = parse_folder(Path::new(&folder), &LopdfSpanExtractor);
            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            let chunks = merge_untitled_chunks(report.chunks);
            let options = RankingOptions {
                top_k,
                score_threshold,
                exclude_top_hit,
            };

            let results = if sentences {
                let index = SentenceIndex::build(&chunks, &embedder)?;
                index.search(&query, &embedder, &options)?
            } else {
                rank_chunks(&query, &chunks, &embedder, &options)?
            };

            println!("query: {query}");
            if results.is_empty() {
                println!("no sections above the configured threshold");
            }
            for section in results {
                println!(
                    "[{}] score={:.4} document={} page={} title={}",
                    section.rank,
                    section.score,
                    section.document_name,
                    section.page_number,
                    section.title
                );
                println!("  {}", section.text);
            }
        }
        Command::Podcast {
            folder,
            topic,
            output,
        } => {
            let documents = discover_pdf_files(Path::new(&folder));
            let config = GeneratorConfig::from_env()
                .context("podcast generation needs PAGELENS_LLM_ENDPOINT to be set")?;
            let pipeline = AnalysisPipeline::new(LopdfSpanExtractor, embedder)
                .with_generator(Box::new(HttpTextGenerator::new(config)?));

            let script = pipeline.podcast_script(&documents, &topic).await?;
            println!("{script}");

            match SynthesizerConfig::from_env() {
                Some(tts_config) => {
                    let synthesizer = HttpSynthesizer::new(tts_config)?;
                    let track = assemble_podcast(&script, &synthesizer).await?;
                    let path = write_artifact(&output, "podcast", "mp3", &track.into_bytes())?;
                    println!("podcast audio written to {}", path.display());
                }
                None => {
                    info!("no TTS endpoint configured; emitting the script only");
                }
            }
        }
    }

    Ok(())
}

fn write_artifact(
    directory: &str,
    prefix: &str,
    extension: &str,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("creating output directory {directory}"))?;
    let path = Path::new(directory).join(format!("{prefix}_{}.{extension}", Uuid::new_v4()));
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
