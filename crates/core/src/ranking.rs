use crate::embeddings::Embedder;
use crate::error::AnalysisError;
use crate::index::VectorIndex;
use crate::models::{RankedSection, RankingOptions, SectionChunk};

/// A surviving hit after threshold filtering, with its dense rank assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RankedHit {
    pub index: usize,
    pub score: f32,
    pub rank: usize,
}

/// Applies the configured ranking policy to score-ordered candidates:
/// threshold filtering, optional best-hit exclusion, then dense 1-based (or
/// 2-based when excluding) rank assignment in score order.
pub(crate) fn assign_ranks(hits: Vec<(usize, f32)>, options: &RankingOptions) -> Vec<RankedHit> {
    let mut survivors: Vec<(usize, f32)> = match options.score_threshold {
        Some(threshold) => hits
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .collect(),
        None => hits,
    };

    let mut first_rank = 1;
    if options.exclude_top_hit && !survivors.is_empty() {
        survivors.remove(0);
        first_rank = 2;
    }

    survivors
        .into_iter()
        .enumerate()
        .map(|(offset, (index, score))| RankedHit {
            index,
            score,
            rank: first_rank + offset,
        })
        .collect()
}

/// Ranks whole chunks against a query: every chunk's full content is
/// embedded and scored, trading snippet granularity for coverage.
///
/// An empty chunk list yields an empty result, not an error.
pub fn rank_chunks<E>(
    query: &str,
    chunks: &[SectionChunk],
    embedder: &E,
    options: &RankingOptions,
) -> Result<Vec<RankedSection>, AnalysisError>
where
    E: Embedder + ?Sized,
{
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let contents: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let embeddings = embedder.embed_batch(&contents)?;

    let mut index = VectorIndex::new(embedder.dimensions());
    index.add_batch(embeddings)?;

    let query_vector = embedder.embed(query)?;
    let hits = index.search(&query_vector, options.top_k)?;

    Ok(assign_ranks(hits, options)
        .into_iter()
        .map(|hit| {
            let chunk = &chunks[hit.index];
            RankedSection {
                document_name: chunk.document_name.clone(),
                page_number: chunk.page_number,
                title: chunk.title.clone(),
                text: chunk.content.clone(),
                score: hit.score,
                rank: hit.rank,
            }
        })
        .collect())
}
