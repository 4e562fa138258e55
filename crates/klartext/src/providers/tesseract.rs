//! Tesseract invocation for the local engine (`tesseract` feature).
//!
//! Page segmentation is `Auto` when table detection is requested (word
//! geometry must survive for the detector) and `SingleBlock` otherwise;
//! recognition is restricted to the neural LSTM path and inter-word
//! spacing is preserved. Words are parsed out of the TSV output at word
//! level (level 5).

use crate::error::{KlartextError, Result};
use crate::providers::ProviderId;
use crate::types::{BoundingBox, RecognizedWord};
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use std::path::Path;

/// TSV rows of interest: level 5 is word level.
const TSV_WORD_LEVEL: u32 = 5;
const TSV_MIN_FIELDS: usize = 12;

const PSM_AUTO: i32 = 3;
const PSM_SINGLE_BLOCK: i32 = 6;
/// tessedit_ocr_engine_mode 1 = LSTM only.
const OEM_LSTM_ONLY: &str = "1";

pub fn recognize_blocking(
    image_bytes: &[u8],
    language_hint: &str,
    enable_table_detection: bool,
) -> Result<Vec<RecognizedWord>> {
    let img = image::load_from_memory(image_bytes).map_err(|e| {
        KlartextError::provider_runtime_with_source(
            ProviderId::LocalEngine,
            "failed to decode image",
            e,
        )
    })?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let api = TesseractAPI::new();
    let tessdata = resolve_tessdata_path();
    let language = map_language(language_hint);

    api.init(&tessdata, language).map_err(|e| {
        KlartextError::provider_runtime(
            ProviderId::LocalEngine,
            format!("failed to initialize language '{language}': {e}"),
        )
    })?;

    let psm = if enable_table_detection {
        PSM_AUTO
    } else {
        PSM_SINGLE_BLOCK
    };
    api.set_page_seg_mode(TessPageSegMode::from_int(psm))
        .map_err(|e| runtime(format!("failed to set PSM mode: {e}")))?;
    api.set_variable("tessedit_ocr_engine_mode", OEM_LSTM_ONLY)
        .map_err(|e| runtime(format!("failed to set engine mode: {e}")))?;
    api.set_variable("preserve_interword_spaces", "1")
        .map_err(|e| runtime(format!("failed to set interword spacing: {e}")))?;

    let bytes_per_pixel = 3u32;
    api.set_image(
        rgb.as_raw(),
        width as i32,
        height as i32,
        bytes_per_pixel as i32,
        (width * bytes_per_pixel) as i32,
    )
    .map_err(|e| runtime(format!("failed to set image: {e}")))?;

    api.recognize()
        .map_err(|e| runtime(format!("recognition failed: {e}")))?;

    let tsv = api
        .get_tsv_text(0)
        .map_err(|e| runtime(format!("failed to extract TSV: {e}")))?;

    Ok(words_from_tsv(&tsv))
}

fn runtime(message: String) -> KlartextError {
    KlartextError::provider_runtime(ProviderId::LocalEngine, message)
}

fn resolve_tessdata_path() -> String {
    let fallback_paths = [
        "/opt/homebrew/share/tessdata",
        "/usr/share/tesseract-ocr/5/tessdata",
        "/usr/share/tesseract-ocr/4/tessdata",
        "/usr/share/tessdata",
        "/usr/local/share/tessdata",
    ];
    std::env::var("TESSDATA_PREFIX").ok().unwrap_or_else(|| {
        fallback_paths
            .iter()
            .find(|p| Path::new(p).exists())
            .map(|p| (*p).to_string())
            .unwrap_or_default()
    })
}

/// ISO 639-1 pipeline codes to Tesseract traineddata names.
fn map_language(hint: &str) -> &'static str {
    match hint {
        "es" => "spa",
        "fr" => "fra",
        "de" => "deu",
        "it" => "ita",
        "pt" => "por",
        "ru" => "rus",
        "ja" => "jpn",
        "ko" => "kor",
        "zh" => "chi_sim",
        "ar" => "ara",
        "hi" => "hin",
        _ => "eng",
    }
}

/// Parse word-level rows out of Tesseract TSV output.
///
/// Confidences arrive as 0..100 and are scaled to 0..1; rows with
/// negative confidence (layout elements) and empty text are skipped.
fn words_from_tsv(tsv: &str) -> Vec<RecognizedWord> {
    let mut words = Vec::new();
    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }
        if fields[0].parse::<u32>().unwrap_or(0) != TSV_WORD_LEVEL {
            continue;
        }
        let conf = fields[10].parse::<f64>().unwrap_or(-1.0);
        if conf < 0.0 {
            continue;
        }
        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }
        let left = fields[6].parse::<f32>().unwrap_or(0.0);
        let top = fields[7].parse::<f32>().unwrap_or(0.0);
        let width = fields[8].parse::<f32>().unwrap_or(0.0);
        let height = fields[9].parse::<f32>().unwrap_or(0.0);
        words.push(RecognizedWord::new(
            text,
            conf / 100.0,
            BoundingBox::new(left, top, left + width, top + height),
        ));
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_from_tsv_basic() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   5\t1\t0\t0\t0\t0\t100\t50\t80\t30\t95.5\tHello\n\
                   5\t1\t0\t0\t0\t1\t190\t50\t70\t30\t92.0\tWorld";
        let words = words_from_tsv(tsv);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hello");
        assert_eq!(words[0].bbox, BoundingBox::new(100.0, 50.0, 180.0, 80.0));
        assert!((words[0].confidence - 0.955).abs() < 1e-9);
    }

    #[test]
    fn test_words_from_tsv_skips_non_word_levels() {
        let tsv = "header\n\
                   3\t1\t0\t0\t0\t0\t0\t0\t10\t10\t95.0\tParagraph\n\
                   5\t1\t0\t0\t0\t0\t0\t0\t10\t10\t95.0\tWord";
        let words = words_from_tsv(tsv);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "Word");
    }

    #[test]
    fn test_words_from_tsv_skips_negative_confidence_and_empty() {
        let tsv = "header\n\
                   5\t1\t0\t0\t0\t0\t0\t0\t10\t10\t-1\tGhost\n\
                   5\t1\t0\t0\t0\t1\t0\t0\t10\t10\t80.0\t \n\
                   5\t1\t0\t0\t0\t2\t0\t0\t10\t10\t80.0\tKept";
        let words = words_from_tsv(tsv);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "Kept");
    }

    #[test]
    fn test_map_language_defaults_to_english() {
        assert_eq!(map_language("auto"), "eng");
        assert_eq!(map_language("de"), "deu");
        assert_eq!(map_language("zh"), "chi_sim");
    }
}
