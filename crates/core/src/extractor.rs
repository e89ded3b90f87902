use crate::error::IngestError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;

/// Fallback page height when no MediaBox is present (US Letter, points).
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// One positioned run of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub font_size: f32,
    pub bold: bool,
    /// Baseline distance from the top of the page; smaller means higher up.
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSpans {
    /// 1-based page number.
    pub number: u32,
    pub spans: Vec<Span>,
}

/// Source of positioned text spans for heading detection.
///
/// Heading detection is heuristic; keeping extraction behind this trait lets
/// an alternative segmentation strategy replace the lopdf walker without
/// touching the chunker or indexer.
pub trait SpanExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageSpans>, IngestError>;
}

/// Span extractor that walks lopdf content streams, tracking the text state
/// machine (`Tf`, `Tm`, `Td`/`TD`, `TL`, `T*`) well enough to attribute a
/// font size, boldness flag, and vertical position to every shown string.
#[derive(Default)]
pub struct LopdfSpanExtractor;

impl SpanExtractor for LopdfSpanExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageSpans>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, page_id) in document.get_pages() {
            let spans = extract_page_spans(&document, page_id)
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !spans.is_empty() {
                pages.push(PageSpans {
                    number: page_no,
                    spans,
                });
            }
        }

        Ok(pages)
    }
}

fn extract_page_spans(document: &Document, page_id: ObjectId) -> Result<Vec<Span>, lopdf::Error> {
    let data = document.get_page_content(page_id)?;
    let content = Content::decode(&data)?;
    let fonts = page_font_weights(document, page_id);
    let height = page_height(document, page_id);

    let mut spans = Vec::new();
    let mut font_size = 0.0f32;
    let mut bold = false;
    let mut baseline = 0.0f32;
    let mut leading = 0.0f32;

    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "BT" => {
                baseline = 0.0;
                leading = 0.0;
            }
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (operands.first(), operands.get(1).and_then(number))
                {
                    bold = fonts.get(name).copied().unwrap_or(false);
                    font_size = size;
                }
            }
            "Tm" => {
                if let Some(ty) = operands.get(5).and_then(number) {
                    baseline = ty;
                }
            }
            "Td" => {
                if let Some(ty) = operands.get(1).and_then(number) {
                    baseline += ty;
                }
            }
            "TD" => {
                if let Some(ty) = operands.get(1).and_then(number) {
                    leading = -ty;
                    baseline += ty;
                }
            }
            "TL" => {
                if let Some(value) = operands.first().and_then(number) {
                    leading = value;
                }
            }
            "T*" => {
                baseline -= leading;
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    push_span(&mut spans, bytes, font_size, bold, height - baseline);
                }
            }
            "'" => {
                baseline -= leading;
                if let Some(Object::String(bytes, _)) = operands.first() {
                    push_span(&mut spans, bytes, font_size, bold, height - baseline);
                }
            }
            "\"" => {
                baseline -= leading;
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    push_span(&mut spans, bytes, font_size, bold, height - baseline);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut text = String::new();
                    for item in items {
                        if let Object::String(bytes, _) = item {
                            text.push_str(&decode_text_bytes(bytes));
                        }
                    }
                    if !text.is_empty() {
                        spans.push(Span {
                            text,
                            font_size,
                            bold,
                            y: height - baseline,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn push_span(spans: &mut Vec<Span>, bytes: &[u8], font_size: f32, bold: bool, y: f32) {
    let text = decode_text_bytes(bytes);
    if !text.is_empty() {
        spans.push(Span {
            text,
            font_size,
            bold,
            y,
        });
    }
}

/// UTF-16BE when the string carries a BOM, lossy single-byte text otherwise.
fn decode_text_bytes(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    if let Ok(id) = object.as_reference() {
        if let Ok(resolved) = document.get_object(id) {
            return resolved;
        }
    }
    object
}

/// Walks the page's (possibly inherited) dictionary chain for `key`.
fn find_inherited<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    loop {
        let dict: &Dictionary = document.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(document, value));
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

/// Maps font resource names to whether their BaseFont declares a bold face.
fn page_font_weights(document: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, bool> {
    let mut weights = HashMap::new();

    let font_dict = find_inherited(document, page_id, b"Resources")
        .and_then(|resources| resources.as_dict().ok())
        .and_then(|resources| resources.get(b"Font").ok())
        .and_then(|fonts| resolve(document, fonts).as_dict().ok());

    if let Some(font_dict) = font_dict {
        for (name, value) in font_dict.iter() {
            let bold = resolve(document, value)
                .as_dict()
                .ok()
                .and_then(|font| font.get(b"BaseFont").ok())
                .and_then(|base| base.as_name().ok())
                .map(|base| String::from_utf8_lossy(base).contains("Bold"))
                .unwrap_or(false);
            weights.insert(name.clone(), bold);
        }
    }

    weights
}

fn page_height(document: &Document, page_id: ObjectId) -> f32 {
    find_inherited(document, page_id, b"MediaBox")
        .and_then(|media_box| media_box.as_array().ok())
        .and_then(|values| {
            let bottom = values.get(1).and_then(number)?;
            let top = values.get(3).and_then(number)?;
            Some(top - bottom)
        })
        .unwrap_or(DEFAULT_PAGE_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::chunk_page;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};
    use tempfile::tempdir;

    /// One US Letter page: an 18pt Helvetica-Bold heading at baseline 720
    /// and a 10pt Helvetica body line one Td move below it. Resources and
    /// MediaBox live on the Pages node so the inherited lookup is exercised.
    fn write_minimal_pdf(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => bold_id,
                "F2" => regular_id,
            },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal("Introduction")]),
                Operation::new("Tf", vec!["F2".into(), 10.into()]),
                Operation::new("Td", vec![0.into(), (-20).into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal("Machine learning improves efficiency")],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("pdf saves");
    }

    #[test]
    fn spans_carry_font_size_weight_and_position() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("report.pdf");
        write_minimal_pdf(&path);

        let pages = LopdfSpanExtractor.extract_pages(&path).expect("pdf parses");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);

        let spans = &pages[0].spans;
        assert_eq!(spans.len(), 2);

        assert_eq!(spans[0].text, "Introduction");
        assert_eq!(spans[0].font_size, 18.0);
        assert!(spans[0].bold);
        assert!((spans[0].y - 72.0).abs() < 1e-3);

        assert_eq!(spans[1].text, "Machine learning improves efficiency");
        assert_eq!(spans[1].font_size, 10.0);
        assert!(!spans[1].bold);
        assert!((spans[1].y - 92.0).abs() < 1e-3);
    }

    #[test]
    fn extraction_is_idempotent_and_chunks_cleanly() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("report.pdf");
        write_minimal_pdf(&path);

        let first = LopdfSpanExtractor.extract_pages(&path).expect("pdf parses");
        let second = LopdfSpanExtractor.extract_pages(&path).expect("pdf parses");
        assert_eq!(first, second);

        let chunk = chunk_page("report.pdf", &first[0]).expect("page has spans");
        assert_eq!(chunk.title, "Introduction");
        assert_eq!(chunk.content, "Machine learning improves efficiency");
    }

    #[test]
    fn plain_bytes_decode_as_utf8() {
        assert_eq!(decode_text_bytes(b"Introduction"), "Introduction");
    }

    #[test]
    fn bom_prefixed_bytes_decode_as_utf16be() {
        let bytes = [0xFEu8, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_bytes(&bytes), "Hi");
    }

    #[test]
    fn empty_string_yields_no_text() {
        assert_eq!(decode_text_bytes(b""), "");
    }
}
