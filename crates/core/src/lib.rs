pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod podcast;
pub mod ranking;

pub use chunking::{chunk_page, merge_untitled_chunks, normalize_whitespace, select_heading_span};
pub use embeddings::{
    l2_normalize, CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{AnalysisError, IngestError};
pub use extractor::{LopdfSpanExtractor, PageSpans, Span, SpanExtractor};
pub use generation::{GeneratorConfig, HttpTextGenerator, TextGenerator};
pub use index::{split_sentences, SentenceIndex, VectorIndex};
pub use ingest::{
    discover_pdf_files, parse_documents, parse_folder, IngestionReport, SkippedDocument,
};
pub use models::{
    AnalysisMetadata, AnalysisOutput, ExtractedSection, RankedSection, RankingOptions,
    SectionChunk, SectionRef, SubSectionAnalysis,
};
pub use pipeline::AnalysisPipeline;
pub use podcast::{
    assemble_podcast, parse_dialogue, AudioSegment, AudioTrack, DialogueLine, HttpSynthesizer,
    Speaker, SpeechSynthesizer, SynthesizerConfig,
};
pub use ranking::rank_chunks;
