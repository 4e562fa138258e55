//! Heuristic text classification.
//!
//! Two concerns: labeling a line of text as title, heading, caption, or
//! plain text, and guessing the document language from code-point ranges.
//! Both are cheap lexical heuristics; no model, no network.

use crate::types::BlockType;

/// Classify one line of text.
///
/// Rules apply in order; the first match wins:
/// very short fragments are plain text, short lines of nothing but
/// uppercase letters and spaces are titles, capitalized lines ending in
/// a colon are headings, lines mentioning a figure or table are
/// captions, everything else is text.
pub fn block_type(text: &str) -> BlockType {
    let trimmed = text.trim();
    if trimmed.len() < 3 {
        return BlockType::Text;
    }
    if trimmed.len() < 50
        && trimmed.chars().any(|c| c.is_alphabetic())
        && trimmed.chars().all(|c| c == ' ' || c.is_uppercase())
    {
        return BlockType::Title;
    }
    if trimmed.len() < 100
        && trimmed.ends_with(':')
        && trimmed.chars().next().is_some_and(|c| c.is_uppercase())
    {
        return BlockType::Heading;
    }
    let lower = trimmed.to_lowercase();
    if lower.contains("figure") || lower.contains("table") {
        return BlockType::Caption;
    }
    BlockType::Text
}

/// Accented characters that only occur in one of the three supported
/// Latin-script languages. Shared vowels are assigned to the language
/// they are most distinctive for, so each set stays disjoint.
const FRENCH_CHARS: &[char] = &[
    'é', 'è', 'ê', 'ë', 'à', 'â', 'î', 'ï', 'ô', 'û', 'ù', 'ç', 'œ', 'É', 'È', 'Ê', 'Ë', 'À',
    'Â', 'Î', 'Ï', 'Ô', 'Û', 'Ù', 'Ç', 'Œ',
];
const GERMAN_CHARS: &[char] = &['ä', 'ö', 'ü', 'ß', 'Ä', 'Ö', 'Ü'];
const SPANISH_CHARS: &[char] = &['ñ', 'á', 'í', 'ó', 'ú', '¿', '¡', 'Ñ', 'Á', 'Í', 'Ó', 'Ú'];

/// Guess a two-letter language code from the extracted text.
///
/// Categories are tested over the whole text in fixed priority order:
/// CJK ideographs, then kana, Hangul, Cyrillic, then the accented Latin
/// sets for French, German, and Spanish, with English as the default.
/// The first category with any match anywhere in the text wins.
pub fn detect_language(text: &str) -> &'static str {
    if text.chars().any(|c| matches!(c, '\u{4e00}'..='\u{9fff}')) {
        return "zh";
    }
    if text.chars().any(|c| matches!(c, '\u{3040}'..='\u{30ff}')) {
        return "ja";
    }
    if text.chars().any(|c| matches!(c, '\u{ac00}'..='\u{d7af}')) {
        return "ko";
    }
    if text.chars().any(|c| matches!(c, '\u{0400}'..='\u{04ff}')) {
        return "ru";
    }
    if text.chars().any(|c| FRENCH_CHARS.contains(&c)) {
        return "fr";
    }
    if text.chars().any(|c| GERMAN_CHARS.contains(&c)) {
        return "de";
    }
    if text.chars().any(|c| SPANISH_CHARS.contains(&c)) {
        return "es";
    }
    "en"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_fragment_is_text() {
        assert_eq!(block_type("ab"), BlockType::Text);
        assert_eq!(block_type("  x "), BlockType::Text);
    }

    #[test]
    fn test_short_all_caps_is_title() {
        assert_eq!(block_type("ANNUAL REPORT"), BlockType::Title);
        assert_eq!(block_type("INVOICE"), BlockType::Title);
    }

    #[test]
    fn test_title_requires_letters_and_spaces_only() {
        // Digits and punctuation disqualify the title rule.
        assert_eq!(block_type("ANNUAL REPORT 2024"), BlockType::Text);
        assert_eq!(block_type("Q3 RESULTS"), BlockType::Text);
    }

    #[test]
    fn test_long_all_caps_is_not_title() {
        let long = "A".repeat(60);
        assert_eq!(block_type(&long), BlockType::Text);
    }

    #[test]
    fn test_capitalized_colon_line_is_heading() {
        assert_eq!(block_type("Payment details:"), BlockType::Heading);
        // The trailing colon also keeps an all-caps line out of the
        // title rule, so the heading rule picks it up.
        assert_eq!(block_type("SUMMARY:"), BlockType::Heading);
    }

    #[test]
    fn test_figure_and_table_mentions_are_captions() {
        assert_eq!(
            block_type("Figure 3 shows the quarterly trend"),
            BlockType::Caption
        );
        assert_eq!(
            block_type("see Table 2 for the full breakdown"),
            BlockType::Caption
        );
    }

    #[test]
    fn test_plain_sentence_is_text() {
        assert_eq!(
            block_type("The quick brown fox jumps over the lazy dog."),
            BlockType::Text
        );
    }

    #[test]
    fn test_script_based_detection() {
        assert_eq!(detect_language("这是一份中文文档"), "zh");
        assert_eq!(detect_language("これはにほんごです"), "ja");
        assert_eq!(detect_language("한국어 문서입니다"), "ko");
        assert_eq!(detect_language("Это русский текст"), "ru");
    }

    #[test]
    fn test_category_priority_over_character_position() {
        // Cyrillic appears first in the text, but kana outranks it.
        assert_eq!(detect_language("Привет これは"), "ja");
        // Ideographs outrank kana regardless of position.
        assert_eq!(detect_language("これは 日本語"), "zh");
    }

    #[test]
    fn test_accented_latin_detection() {
        assert_eq!(detect_language("café déjà vu"), "fr");
        assert_eq!(detect_language("über die Straße"), "de");
        assert_eq!(detect_language("mañana señor"), "es");
        assert_eq!(detect_language("¿Donde esta?"), "es");
    }

    #[test]
    fn test_defaults_to_english() {
        assert_eq!(detect_language("hello world from nowhere"), "en");
        assert_eq!(detect_language(""), "en");
        assert_eq!(detect_language("plain unaccented latin"), "en");
    }
}
