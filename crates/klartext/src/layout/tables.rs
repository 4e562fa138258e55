//! Table detection over clustered lines.
//!
//! Purely geometric: a run of consecutive lines whose word counts stay
//! close to the first line of the run is read as a table, each word
//! becoming one cell. The caller receives both the tables and a consumed
//! mask so table words can be excluded from the flat block stream.

use crate::layout::lines::Line;
use crate::types::{BoundingBox, TableCell, TableRow, TableStructure};

/// Minimum words per line for a line to open or extend a table run.
const MIN_ROW_WORDS: usize = 2;

/// Minimum consecutive qualifying lines to accept a run as a table.
const MIN_TABLE_ROWS: usize = 2;

/// Scan `lines` for table runs.
///
/// A run opens at a line with at least two words and extends while the
/// next line also has at least two words and its word count deviates from
/// the opening line's count by at most `column_variation` (a fraction,
/// e.g. `0.30`). Accepted runs mark their lines in the returned mask;
/// scanning resumes after the run, so no line belongs to two tables.
pub fn detect_tables(lines: &[Line], column_variation: f32) -> (Vec<TableStructure>, Vec<bool>) {
    let mut tables = Vec::new();
    let mut consumed = vec![false; lines.len()];

    let mut i = 0;
    while i < lines.len() {
        let anchor_count = lines[i].words.len();
        if anchor_count < MIN_ROW_WORDS {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < lines.len() {
            let count = lines[j].words.len();
            if count < MIN_ROW_WORDS {
                break;
            }
            let deviation =
                (count as f32 - anchor_count as f32).abs() / anchor_count as f32;
            if deviation > column_variation {
                break;
            }
            j += 1;
        }

        if j - i >= MIN_TABLE_ROWS {
            tables.push(build_table(&lines[i..j]));
            for slot in &mut consumed[i..j] {
                *slot = true;
            }
            i = j;
        } else {
            i += 1;
        }
    }

    (tables, consumed)
}

fn build_table(run: &[Line]) -> TableStructure {
    let rows: Vec<TableRow> = run
        .iter()
        .map(|line| TableRow {
            cells: line
                .words
                .iter()
                .map(|w| TableCell {
                    text: w.text.clone(),
                    confidence: w.confidence,
                    bbox: w.bbox,
                })
                .collect(),
        })
        .collect();

    let cell_count: usize = rows.iter().map(|r| r.cells.len()).sum();
    let confidence = if cell_count == 0 {
        0.0
    } else {
        rows.iter()
            .flat_map(|r| r.cells.iter())
            .map(|c| c.confidence)
            .sum::<f64>()
            / cell_count as f64
    };
    let bbox = BoundingBox::union_all(
        rows.iter().flat_map(|r| r.cells.iter()).map(|c| &c.bbox),
    )
    .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0));

    TableStructure {
        rows,
        confidence,
        bbox,
    }
}
