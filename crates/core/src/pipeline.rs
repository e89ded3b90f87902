use crate::chunking::merge_untitled_chunks;
use crate::embeddings::Embedder;
use crate::error::AnalysisError;
use crate::extractor::SpanExtractor;
use crate::generation::{
    counterpoints_prompt, did_you_know_prompt, key_insights_prompt, normalize_counterpoints,
    clean_bullet_lines, persona_query, podcast_script_prompt, query_expansion_prompt,
    topic_query, TextGenerator,
};
use crate::index::SentenceIndex;
use crate::ingest::parse_documents;
use crate::models::{
    AnalysisMetadata, AnalysisOutput, ExtractedSection, RankedSection, RankingOptions,
    SectionChunk, SubSectionAnalysis,
};
use crate::ranking::rank_chunks;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, info};

/// Request-scoped orchestration over the chunking and ranking pipeline plus
/// the external collaborators. Holds no per-request state itself; every
/// operation builds its corpus and index fresh.
pub struct AnalysisPipeline<X, E> {
    extractor: X,
    embedder: E,
    generator: Option<Box<dyn TextGenerator>>,
    options: RankingOptions,
}

impl<X, E> AnalysisPipeline<X, E>
where
    X: SpanExtractor,
    E: Embedder,
{
    pub fn new(extractor: X, embedder: E) -> Self {
        Self {
            extractor,
            embedder,
            generator: None,
            options: RankingOptions::default(),
        }
    }

    /// Attaches a text generator used for query expansion and derivative
    /// content. Without one, ranking runs against the raw query and the
    /// derivative operations are unavailable.
    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_options(mut self, options: RankingOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses and merges the given documents into ranked-search-ready chunks.
    pub fn load_chunks(&self, documents: &[PathBuf]) -> Vec<SectionChunk> {
        let report = parse_documents(documents, &self.extractor);
        if !report.skipped.is_empty() {
            info!(skipped = report.skipped.len(), "documents skipped during parse");
        }
        merge_untitled_chunks(report.chunks)
    }

    async fn expand_query(
        &self,
        base_query: &str,
        chunks: &[SectionChunk],
    ) -> Result<String, AnalysisError> {
        match &self.generator {
            Some(generator) if !chunks.is_empty() => {
                let expanded = generator
                    .generate(&query_expansion_prompt(base_query, chunks))
                    .await?;
                debug!(query = %expanded, "expanded search query");
                Ok(expanded)
            }
            _ => Ok(base_query.to_string()),
        }
    }

    /// Full persona/task analysis: parse, merge, expand the persona query,
    /// rank at chunk granularity, and wrap the survivors in the response
    /// envelope.
    pub async fn analyze(
        &self,
        documents: &[PathBuf],
        persona: &str,
        task: &str,
    ) -> Result<AnalysisOutput, AnalysisError> {
        let chunks = self.load_chunks(documents);
        let base_query = persona_query(persona, task);
        let query = self.expand_query(&base_query, &chunks).await?;
        let ranked = rank_chunks(&query, &chunks, &self.embedder, &self.options)?;

        Ok(AnalysisOutput {
            metadata: AnalysisMetadata {
                input_documents: documents
                    .iter()
                    .map(|path| {
                        path.file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string())
                    })
                    .collect(),
                persona: persona.to_string(),
                job_to_be_done: task.to_string(),
                processing_timestamp: Utc::now(),
            },
            extracted_sections: ranked.iter().map(ExtractedSection::from).collect(),
            sub_section_analysis: ranked.iter().map(SubSectionAnalysis::from).collect(),
        })
    }

    /// Chunk-granularity ranking for a free-text topic.
    pub async fn rank_for_topic(
        &self,
        documents: &[PathBuf],
        text: &str,
    ) -> Result<Vec<RankedSection>, AnalysisError> {
        let chunks = self.load_chunks(documents);
        let query = self.expand_query(&topic_query(text), &chunks).await?;
        rank_chunks(&query, &chunks, &self.embedder, &self.options)
    }

    /// Sentence-granularity search over the given documents.
    pub fn search_sentences(
        &self,
        documents: &[PathBuf],
        query: &str,
    ) -> Result<Vec<RankedSection>, AnalysisError> {
        let chunks = self.load_chunks(documents);
        let index = SentenceIndex::build(&chunks, &self.embedder)?;
        index.search(query, &self.embedder, &self.options)
    }

    fn require_generator(&self) -> Result<&dyn TextGenerator, AnalysisError> {
        self.generator
            .as_deref()
            .ok_or_else(|| AnalysisError::Request("no text generator configured".to_string()))
    }

    pub async fn key_insights(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let output = self
            .require_generator()?
            .generate(&key_insights_prompt(text))
            .await?;
        Ok(clean_bullet_lines(&output))
    }

    pub async fn did_you_know(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let output = self
            .require_generator()?
            .generate(&did_you_know_prompt(text))
            .await?;
        Ok(clean_bullet_lines(&output))
    }

    pub async fn counterpoints(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let output = self
            .require_generator()?
            .generate(&counterpoints_prompt(text))
            .await?;
        Ok(normalize_counterpoints(&output))
    }

    /// Builds the two-speaker podcast script: ranked context for the topic,
    /// key insights, and counterpoints, combined into one generation prompt.
    pub async fn podcast_script(
        &self,
        documents: &[PathBuf],
        text: &str,
    ) -> Result<String, AnalysisError> {
        let generator = self.require_generator()?;

        let ranked = self.rank_for_topic(documents, text).await?;
        let insights = self.key_insights(text).await?;
        let counterpoints = self.counterpoints(text).await?;

        let combined = combine_podcast_context(&ranked, &insights, &counterpoints);
        generator
            .generate(&podcast_script_prompt(text, &combined))
            .await
    }
}

fn combine_podcast_context(
    ranked: &[RankedSection],
    insights: &[String],
    counterpoints: &[String],
) -> String {
    let mut parts: Vec<String> = ranked
        .iter()
        .map(|section| {
            format!(
                "Document: {}\nTitle: {}\nContent:\n{}\n--------------------------------------",
                section.document_name, section.title, section.text
            )
        })
        .collect();

    parts.push(format!("Key Insights:\n{}", insights.join("\n")));
    parts.push(format!(
        "Counterpoints / Contradictions:\n{}",
        counterpoints.join("\n")
    ));
    parts.join("\n\n")
}
