use crate::chunking::chunk_page;
use crate::error::IngestError;
use crate::extractor::SpanExtractor;
use crate::models::SectionChunk;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub chunks: Vec<SectionChunk>,
    pub skipped: Vec<SkippedDocument>,
}

/// Parses documents in caller order into page chunks.
///
/// A document that cannot be opened or parsed is logged, recorded in the
/// report, and skipped; the batch never aborts. Pages without extractable
/// spans emit no chunk. An empty path list yields an empty report.
pub fn parse_documents<X>(paths: &[PathBuf], extractor: &X) -> IngestionReport
where
    X: SpanExtractor + ?Sized,
{
    let mut chunks = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        let document_name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_string(),
            None => {
                let reason =
                    IngestError::MissingFileName(path.display().to_string()).to_string();
                warn!(path = %path.display(), reason = %reason, "skipping document");
                skipped.push(SkippedDocument {
                    path: path.clone(),
                    reason,
                });
                continue;
            }
        };

        match extractor.extract_pages(path) {
            Ok(pages) => {
                for page in &pages {
                    if let Some(chunk) = chunk_page(&document_name, page) {
                        chunks.push(chunk);
                    }
                }
            }
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "skipping document");
                skipped.push(SkippedDocument {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    IngestionReport { chunks, skipped }
}

/// Folder convenience wrapper: discovers PDFs (sorted for determinism) and
/// parses them best-effort.
pub fn parse_folder<X>(folder: &Path, extractor: &X) -> IngestionReport
where
    X: SpanExtractor + ?Sized,
{
    let files = discover_pdf_files(folder);
    parse_documents(&files, extractor)
}
