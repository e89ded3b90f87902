use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page's worth of extracted heading + body text from a source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionChunk {
    pub document_name: String,
    /// 1-based page number within the source document.
    pub page_number: u32,
    /// Detected section heading; empty when no heading was confidently found.
    pub title: String,
    /// Body text with whitespace collapsed to single spaces, heading excluded.
    pub content: String,
}

/// Originating-chunk metadata carried alongside each indexed sentence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionRef {
    pub document_name: String,
    pub page_number: u32,
    pub title: String,
}

impl From<&SectionChunk> for SectionRef {
    fn from(chunk: &SectionChunk) -> Self {
        Self {
            document_name: chunk.document_name.clone(),
            page_number: chunk.page_number,
            title: chunk.title.clone(),
        }
    }
}

/// A search hit, at either chunk or sentence granularity.
///
/// Serializes with the field names every downstream consumer expects:
/// `document`, `page_number`, `section_title`, `refined_text`, `score`,
/// `importance_rank`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedSection {
    #[serde(rename = "document")]
    pub document_name: String,
    pub page_number: u32,
    #[serde(rename = "section_title")]
    pub title: String,
    /// Full chunk content at chunk granularity, a single sentence otherwise.
    #[serde(rename = "refined_text")]
    pub text: String,
    /// Cosine similarity between query and text embeddings, in [-1, 1].
    pub score: f32,
    /// 1-based dense rank among the threshold-filtered survivors.
    #[serde(rename = "importance_rank")]
    pub rank: usize,
}

/// Configuration for the embed-and-rank primitive.
///
/// The two historical ranking variants are expressed here as named options
/// instead of separate code paths: `score_threshold: None` keeps a fixed
/// top-K regardless of score, `Some(t)` filters before ranking, and
/// `exclude_top_hit` reproduces the rank-starts-at-2 behavior by dropping
/// the single best survivor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingOptions {
    pub top_k: usize,
    pub score_threshold: Option<f32>,
    pub exclude_top_hit: bool,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            score_threshold: None,
            exclude_top_hit: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub importance_rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSectionAnalysis {
    pub document: String,
    pub section_title: String,
    pub page_number: u32,
    pub refined_text: String,
}

/// The full response envelope for one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub metadata: AnalysisMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub sub_section_analysis: Vec<SubSectionAnalysis>,
}

impl From<&RankedSection> for ExtractedSection {
    fn from(section: &RankedSection) -> Self {
        Self {
            document: section.document_name.clone(),
            page_number: section.page_number,
            section_title: section.title.clone(),
            importance_rank: section.rank,
        }
    }
}

impl From<&RankedSection> for SubSectionAnalysis {
    fn from(section: &RankedSection) -> Self {
        Self {
            document: section.document_name.clone(),
            section_title: section.title.clone(),
            page_number: section.page_number,
            refined_text: section.text.clone(),
        }
    }
}
