//! Core data model for recognition results.
//!
//! Everything here is a plain value type: produced once by the pipeline,
//! immutable afterwards, and safe to share read-only across export calls.
//! Words keep their membership in lines and tables by value (cells own
//! copies of the text), never by back-reference.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Axis-aligned rectangle `(x0, y0, x1, y1)` in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union over a non-empty iterator of boxes; `None` when empty.
    pub fn union_all<'a, I: IntoIterator<Item = &'a BoundingBox>>(boxes: I) -> Option<BoundingBox> {
        let mut iter = boxes.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(b)))
    }
}

/// A single word as reported by an OCR provider.
///
/// Immutable once created; confidence is the provider-reported probability
/// in `0..=1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl RecognizedWord {
    pub fn new<S: Into<String>>(text: S, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }
}

/// Semantic role of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Title,
    Heading,
    Caption,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Title => "title",
            BlockType::Heading => "heading",
            BlockType::Caption => "caption",
        }
    }
}

/// A line-level text block derived from one or more recognized words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub block_type: BlockType,
}

/// One cell of a reconstructed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// An ordered row of table cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// A table reconstructed from spatially consistent rows of words.
///
/// Words consumed into a table are removed from the flat block stream;
/// a word never appears both here and in `OcrResult::blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructure {
    pub rows: Vec<TableRow>,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl TableStructure {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.cells.len()).unwrap_or(0)
    }
}

/// Text flow direction of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingOrder {
    Ltr,
    Rtl,
    Ttb,
}

/// Descriptive page-layout metadata; never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub orientation_degrees: f32,
    pub text_angle: f32,
    pub is_handwriting: bool,
    pub reading_order: ReadingOrder,
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self {
            orientation_degrees: 0.0,
            text_angle: 0.0,
            is_handwriting: false,
            reading_order: ReadingOrder::Ltr,
        }
    }
}

/// Result of one successful pipeline run.
///
/// Created once, immutable, shareable read-only across export calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Full extracted text: words joined by spaces, lines by newlines.
    pub text: String,
    /// Provider-reported mean confidence over all returned words.
    pub confidence: f64,
    /// Detected or hinted ISO language code.
    pub language: String,
    /// Line-level blocks not consumed by a table.
    pub blocks: Vec<TextBlock>,
    /// Reconstructed tables.
    pub tables: Vec<TableStructure>,
    pub layout: LayoutInfo,
    pub processing_time_ms: u64,
    /// Name of the provider that produced the words.
    pub provider: String,
}

/// One file in a batch request. Owned by the batch run for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: Uuid,
    pub file_name: String,
    /// Declared MIME type; validated against the supported set.
    pub mime_type: String,
    #[serde(with = "serde_bytes_vec")]
    pub bytes: Vec<u8>,
}

impl BatchItem {
    pub fn new<S: Into<String>, M: Into<String>>(file_name: S, mime_type: M, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

// Serialize raw bytes as base64 rather than a JSON integer array.
mod serde_bytes_vec {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

/// Per-item failure entry of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    pub file_name: String,
    /// Stable kind string, see `KlartextError::kind`.
    pub kind: String,
    pub message: String,
}

/// Outcome of a batch run: successes and isolated failures, never a throw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<OcrResult>,
    pub errors: Vec<BatchError>,
    pub total_processed: usize,
    pub total_errors: usize,
}

/// Entry of the supported-language catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
}

/// Languages advertised to capability-listing collaborators.
pub fn supported_languages() -> &'static [LanguageInfo] {
    const LANGUAGES: &[LanguageInfo] = &[
        LanguageInfo { code: "en", name: "English", native_name: "English" },
        LanguageInfo { code: "es", name: "Spanish", native_name: "Español" },
        LanguageInfo { code: "fr", name: "French", native_name: "Français" },
        LanguageInfo { code: "de", name: "German", native_name: "Deutsch" },
        LanguageInfo { code: "it", name: "Italian", native_name: "Italiano" },
        LanguageInfo { code: "pt", name: "Portuguese", native_name: "Português" },
        LanguageInfo { code: "ru", name: "Russian", native_name: "Русский" },
        LanguageInfo { code: "ja", name: "Japanese", native_name: "日本語" },
        LanguageInfo { code: "ko", name: "Korean", native_name: "한국어" },
        LanguageInfo { code: "zh", name: "Chinese", native_name: "中文" },
        LanguageInfo { code: "ar", name: "Arabic", native_name: "العربية" },
        LanguageInfo { code: "hi", name: "Hindi", native_name: "हिन्दी" },
    ];
    LANGUAGES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 30.0);
        let b = BoundingBox::new(40.0, 5.0, 90.0, 25.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(10.0, 5.0, 90.0, 30.0));
    }

    #[test]
    fn test_bbox_union_all() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(20.0, 20.0, 30.0, 30.0),
            BoundingBox::new(5.0, -5.0, 8.0, 2.0),
        ];
        let u = BoundingBox::union_all(boxes.iter()).unwrap();
        assert_eq!(u, BoundingBox::new(0.0, -5.0, 30.0, 30.0));

        let empty: [BoundingBox; 0] = [];
        assert!(BoundingBox::union_all(empty.iter()).is_none());
    }

    #[test]
    fn test_bbox_dimensions() {
        let b = BoundingBox::new(10.0, 20.0, 110.0, 60.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 40.0);
    }

    #[test]
    fn test_block_type_serde_lowercase() {
        let json = serde_json::to_string(&BlockType::Heading).unwrap();
        assert_eq!(json, "\"heading\"");
        let back: BlockType = serde_json::from_str("\"caption\"").unwrap();
        assert_eq!(back, BlockType::Caption);
    }

    #[test]
    fn test_layout_info_default() {
        let layout = LayoutInfo::default();
        assert_eq!(layout.orientation_degrees, 0.0);
        assert_eq!(layout.reading_order, ReadingOrder::Ltr);
        assert!(!layout.is_handwriting);
    }

    #[test]
    fn test_table_structure_counts() {
        let cell = TableCell {
            text: "x".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        };
        let table = TableStructure {
            rows: vec![
                TableRow { cells: vec![cell.clone(), cell.clone()] },
                TableRow { cells: vec![cell.clone(), cell] },
            ],
            confidence: 0.9,
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        };
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_batch_item_bytes_roundtrip_as_base64() {
        let item = BatchItem::new("scan.png", "image/png", vec![1, 2, 3, 255]);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(&base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            [1u8, 2, 3, 255]
        )));
        let back: BatchItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bytes, vec![1, 2, 3, 255]);
        assert_eq!(back.file_name, "scan.png");
    }

    #[test]
    fn test_supported_languages_catalog() {
        let langs = supported_languages();
        assert_eq!(langs.len(), 12);
        assert!(langs.iter().any(|l| l.code == "en"));
        assert!(langs.iter().any(|l| l.code == "zh" && l.native_name == "中文"));
    }
}
