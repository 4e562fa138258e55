//! Word-to-line clustering.

use crate::types::{BoundingBox, RecognizedWord};

/// Words sharing a vertical band, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub words: Vec<RecognizedWord>,
}

impl Line {
    /// Mean top edge of the member words. The cluster criterion compares
    /// candidates against this running value, not the first word alone,
    /// so a slowly drifting baseline still reads as one line.
    pub fn mean_y0(&self) -> f32 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|w| w.bbox.y0).sum::<f32>() / self.words.len() as f32
    }

    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn confidence(&self) -> f64 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|w| w.confidence).sum::<f64>() / self.words.len() as f64
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::union_all(self.words.iter().map(|w| &w.bbox))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// Cluster words into reading lines.
///
/// Words are visited in ascending top-edge order; each joins the first
/// line whose mean top edge is within `tolerance_px`, otherwise it opens
/// a new line. Words inside a line are then sorted by left edge and lines
/// by their mean top edge, giving natural reading order.
pub fn group_into_lines(words: &[RecognizedWord], tolerance_px: f32) -> Vec<Line> {
    let mut sorted: Vec<&RecognizedWord> = words.iter().collect();
    sorted.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));

    let mut lines: Vec<Line> = Vec::new();
    for word in sorted {
        match lines
            .iter_mut()
            .find(|line| (word.bbox.y0 - line.mean_y0()).abs() <= tolerance_px)
        {
            Some(line) => line.words.push(word.clone()),
            None => lines.push(Line {
                words: vec![word.clone()],
            }),
        }
    }

    for line in &mut lines {
        line.words.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    }
    lines.sort_by(|a, b| a.mean_y0().total_cmp(&b.mean_y0()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f32, y0: f32) -> RecognizedWord {
        RecognizedWord::new(text, 0.9, BoundingBox::new(x0, y0, x0 + 20.0, y0 + 12.0))
    }

    #[test]
    fn test_close_tops_merge_far_tops_split() {
        let words = vec![
            word("a", 0.0, 100.0),
            word("b", 30.0, 102.0),
            word("c", 60.0, 105.0),
            word("d", 0.0, 200.0),
        ];
        let lines = group_into_lines(&words, 10.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "a b c");
        assert_eq!(lines[1].text(), "d");
    }

    #[test]
    fn test_words_ordered_left_to_right_within_line() {
        let words = vec![
            word("second", 50.0, 10.0),
            word("first", 5.0, 12.0),
            word("third", 120.0, 11.0),
        ];
        let lines = group_into_lines(&words, 10.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "first second third");
    }

    #[test]
    fn test_lines_ordered_top_to_bottom() {
        let words = vec![word("low", 0.0, 300.0), word("high", 0.0, 20.0), word("mid", 0.0, 150.0)];
        let lines = group_into_lines(&words, 10.0);
        let texts: Vec<String> = lines.iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_empty_input_yields_no_lines() {
        assert!(group_into_lines(&[], 10.0).is_empty());
    }

    #[test]
    fn test_line_aggregates() {
        let words = vec![word("a", 0.0, 10.0), word("b", 40.0, 12.0)];
        let lines = group_into_lines(&words, 10.0);
        let line = &lines[0];
        assert_eq!(line.mean_y0(), 11.0);
        assert_eq!(line.bbox(), BoundingBox::new(0.0, 10.0, 60.0, 24.0));
        assert!((line.confidence() - 0.9).abs() < 1e-9);
    }
}
