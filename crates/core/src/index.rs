use crate::embeddings::{l2_normalize, Embedder};
use crate::error::AnalysisError;
use crate::models::{RankedSection, RankingOptions, SectionChunk, SectionRef};
use crate::ranking::assign_ranks;
use unicode_segmentation::UnicodeSegmentation;

/// Exact brute-force nearest-neighbor index over L2-normalized vectors.
///
/// Inner product over unit vectors equals cosine similarity, and per-request
/// corpora stay small (tens to low thousands of entries), so a linear scan
/// is both correct and fast enough.
pub struct VectorIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Normalizes and stores a vector. Insertion order is significant: it is
    /// the tie-break order for equal scores.
    pub fn add(&mut self, mut vector: Vec<f32>) -> Result<(), AnalysisError> {
        if vector.len() != self.dimensions {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        l2_normalize(&mut vector);
        self.vectors.push(vector);
        Ok(())
    }

    pub fn add_batch(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), AnalysisError> {
        for vector in vectors {
            self.add(vector)?;
        }
        Ok(())
    }

    /// Returns the `top_k` highest inner products as `(insertion index,
    /// score)`, descending by score. The sort is stable, so equal scores
    /// keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>, AnalysisError> {
        if query.len() != self.dimensions {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut unit_query = query.to_vec();
        l2_normalize(&mut unit_query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| {
                let score = vector
                    .iter()
                    .zip(unit_query.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (position, score)
            })
            .collect();

        scored.sort_by(|left, right| right.1.total_cmp(&left.1));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Splits text on UAX #29 sentence boundaries, discarding blank sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Per-request sentence-level search structure: an ordered sentence list, an
/// index-aligned list of originating-chunk metadata, and a vector index over
/// the sentence embeddings. Never shared or persisted across requests.
pub struct SentenceIndex {
    sentences: Vec<String>,
    sources: Vec<SectionRef>,
    index: VectorIndex,
}

impl SentenceIndex {
    /// Re-splits every chunk into sentences and embeds them in one batched
    /// call. An embedding failure fails the whole build; no partial index
    /// is returned.
    pub fn build<E>(chunks: &[SectionChunk], embedder: &E) -> Result<Self, AnalysisError>
    where
        E: Embedder + ?Sized,
    {
        let mut sentences = Vec::new();
        let mut sources = Vec::new();

        for chunk in chunks {
            for sentence in split_sentences(&chunk.content) {
                sentences.push(sentence);
                sources.push(SectionRef::from(chunk));
            }
        }

        let embeddings = embedder.embed_batch(&sentences)?;
        let mut index = VectorIndex::new(embedder.dimensions());
        index.add_batch(embeddings)?;

        Ok(Self {
            sentences,
            sources,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn sources(&self) -> &[SectionRef] {
        &self.sources
    }

    /// Embeds the query and returns the surviving sentences as ranked
    /// results, each carrying its originating chunk's metadata.
    pub fn search<E>(
        &self,
        query: &str,
        embedder: &E,
        options: &RankingOptions,
    ) -> Result<Vec<RankedSection>, AnalysisError>
    where
        E: Embedder + ?Sized,
    {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query)?;
        let hits = self.index.search(&query_vector, options.top_k)?;

        Ok(assign_ranks(hits, options)
            .into_iter()
            .map(|hit| {
                let source = &self.sources[hit.index];
                RankedSection {
                    document_name: source.document_name.clone(),
                    page_number: source.page_number,
                    title: source.title.clone(),
                    text: self.sentences[hit.index].clone(),
                    score: hit.score,
                    rank: hit.rank,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;

    fn chunk(document: &str, page: u32, title: &str, content: &str) -> SectionChunk {
        SectionChunk {
            document_name: document.to_string(),
            page_number: page,
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn add_rejects_wrong_dimension() {
        let mut index = VectorIndex::new(4);
        let error = index.add(vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(
            error,
            AnalysisError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn search_on_empty_index_returns_nothing() {
        let index = VectorIndex::new(3);
        let hits = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn search_orders_by_inner_product() {
        let mut index = VectorIndex::new(2);
        index.add(vec![0.0, 1.0]).unwrap();
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![1.0, 1.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 2);
        assert_eq!(hits[2].0, 0);
        assert!(hits[0].1 > hits[1].1 && hits[1].1 > hits[2].1);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut index = VectorIndex::new(2);
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![2.0, 0.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 1);
    }

    #[test]
    fn sentences_split_on_boundaries_and_drop_blanks() {
        let sentences = split_sentences("First point. Second point!   ");
        assert_eq!(sentences, vec!["First point.", "Second point!"]);
    }

    #[test]
    fn blank_content_yields_no_sentences() {
        assert!(split_sentences("   \n  ").is_empty());
    }

    #[test]
    fn sentence_index_aligns_sentences_with_sources() {
        let embedder = CharacterNgramEmbedder::default();
        let chunks = vec![
            chunk("a.pdf", 1, "Intro", "One sentence here. Another sentence here."),
            chunk("b.pdf", 2, "Body", "A third sentence."),
        ];

        let index = SentenceIndex::build(&chunks, &embedder).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.sentences().len(), index.sources().len());
        assert_eq!(index.sources()[0].document_name, "a.pdf");
        assert_eq!(index.sources()[2].document_name, "b.pdf");
        assert_eq!(index.sources()[2].page_number, 2);
    }

    #[test]
    fn sentence_search_returns_sentence_granularity_hits() {
        let embedder = CharacterNgramEmbedder::default();
        let chunks = vec![chunk(
            "a.pdf",
            1,
            "Intro",
            "Machine learning improves efficiency. Bananas are yellow.",
        )];

        let index = SentenceIndex::build(&chunks, &embedder).unwrap();
        let results = index
            .search("efficiency", &embedder, &RankingOptions::default())
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].document_name, "a.pdf");
        assert_eq!(results[0].title, "Intro");
        // Sentence-level text, not the whole chunk.
        assert!(results[0].text.ends_with('.'));
        assert!(results[0].text.len() < chunks[0].content.len());
    }

    #[test]
    fn empty_corpus_search_is_empty_not_an_error() {
        let embedder = CharacterNgramEmbedder::default();
        let index = SentenceIndex::build(&[], &embedder).unwrap();
        let results = index
            .search("anything", &embedder, &RankingOptions::default())
            .unwrap();
        assert!(results.is_empty());
    }
}
