use crate::extractor::{PageSpans, Span};
use crate::models::SectionChunk;
use std::cmp::Ordering;

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strict total order for heading selection: largest font size first, bold
/// before non-bold among ties, topmost (smallest y) among remaining ties.
fn heading_order(left: &Span, right: &Span) -> Ordering {
    right
        .font_size
        .total_cmp(&left.font_size)
        .then_with(|| right.bold.cmp(&left.bold))
        .then_with(|| left.y.total_cmp(&right.y))
}

/// Picks the heading span for a page; `None` only when the page has no spans.
/// Full ties keep the first span in extraction order, so repeated runs over
/// the same input select the same heading.
pub fn select_heading_span(spans: &[Span]) -> Option<&Span> {
    spans.iter().min_by(|left, right| heading_order(left, right))
}

/// Builds the chunk for one page: the heading span's trimmed text becomes the
/// title, every other span (excluding exact matches of the heading text)
/// becomes single-space-joined content.
pub fn chunk_page(document_name: &str, page: &PageSpans) -> Option<SectionChunk> {
    let heading = select_heading_span(&page.spans)?;
    let title = heading.text.trim().to_string();

    let content_parts: Vec<&str> = page
        .spans
        .iter()
        .map(|span| span.text.trim())
        .filter(|text| !text.is_empty() && *text != title)
        .collect();

    Some(SectionChunk {
        document_name: document_name.to_string(),
        page_number: page.number,
        title,
        content: normalize_whitespace(&content_parts.join(" ")),
    })
}

/// Folds chunks whose heading detection failed (empty title) into the
/// preceding chunk's content.
///
/// Content of an empty-titled chunk that arrives before any titled chunk is
/// dropped; callers relying on leading untitled pages must repair titles
/// upstream.
pub fn merge_untitled_chunks(chunks: Vec<SectionChunk>) -> Vec<SectionChunk> {
    let mut merged: Vec<SectionChunk> = Vec::new();

    for chunk in chunks {
        if chunk.title.trim().is_empty() {
            if let Some(last) = merged.last_mut() {
                last.content.push(' ');
                last.content.push_str(&chunk.content);
            }
        } else {
            merged.push(chunk);
        }
    }

    merged
}
