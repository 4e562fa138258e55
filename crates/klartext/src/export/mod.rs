//! Result rendering into download formats.
//!
//! Four formats over the same [`OcrResult`]: plain text, pretty JSON, a
//! flat CSV of blocks and table cells, and a self-contained HTML page.
//! Rendering is pure; the payload carries the content type and a
//! filename-bearing disposition for whatever transport serves it.

use crate::error::Result;
use crate::types::{OcrResult, TableStructure};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Txt,
    Json,
    Csv,
    Html,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "html" => Ok(ExportFormat::Html),
            _ => Err(format!("Unknown export format: {s}")),
        }
    }
}

/// A rendered export ready to be written to disk or served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPayload {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub content_disposition: String,
}

/// Render `result` in the requested format.
pub fn render(result: &OcrResult, format: ExportFormat) -> Result<Vec<u8>> {
    Ok(match format {
        ExportFormat::Txt => result.text.clone().into_bytes(),
        ExportFormat::Json => serde_json::to_vec_pretty(result)?,
        ExportFormat::Csv => render_csv(result).into_bytes(),
        ExportFormat::Html => render_html(result).into_bytes(),
    })
}

/// Render plus transport metadata.
///
/// `stem` is the output filename without extension, typically derived
/// from the input filename.
pub fn download(result: &OcrResult, format: ExportFormat, stem: &str) -> Result<DownloadPayload> {
    Ok(DownloadPayload {
        body: render(result, format)?,
        content_type: format.content_type(),
        content_disposition: format!(
            "attachment; filename=\"{}.{}\"",
            sanitize_stem(stem),
            format.extension()
        ),
    })
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "extraction".to_string()
    } else {
        cleaned
    }
}

fn render_csv(result: &OcrResult) -> String {
    let mut out = String::from("Type,Text,Confidence,X1,Y1,X2,Y2\n");
    for block in &result.blocks {
        write_csv_row(
            &mut out,
            block.block_type.as_str(),
            &block.text,
            block.confidence,
            block.bbox.x0,
            block.bbox.y0,
            block.bbox.x1,
            block.bbox.y1,
        );
    }
    for table in &result.tables {
        for row in &table.rows {
            for cell in &row.cells {
                write_csv_row(
                    &mut out,
                    "table_cell",
                    &cell.text,
                    cell.confidence,
                    cell.bbox.x0,
                    cell.bbox.y0,
                    cell.bbox.x1,
                    cell.bbox.y1,
                );
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn write_csv_row(
    out: &mut String,
    kind: &str,
    text: &str,
    confidence: f64,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
) {
    let _ = writeln!(
        out,
        "{},{},{:.4},{},{},{},{}",
        csv_field(kind),
        csv_field(text),
        confidence,
        x0,
        y0,
        x1,
        y1
    );
}

/// Quote a field when it contains a delimiter, quote, or newline;
/// embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_html(result: &OcrResult) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Extraction Result</title>\n\
         <style>\n\
         body { font-family: sans-serif; margin: 2em; }\n\
         table { border-collapse: collapse; margin: 1em 0; }\n\
         th, td { border: 1px solid #999; padding: 4px 8px; }\n\
         .meta { color: #555; font-size: 0.9em; }\n\
         </style>\n</head>\n<body>\n",
    );

    let _ = writeln!(out, "<h1>Extraction Result</h1>");
    let _ = writeln!(
        out,
        "<p class=\"meta\">Provider: {} | Language: {} | Confidence: {:.2}% | Processing: {} ms</p>",
        html_escape(&result.provider),
        html_escape(&result.language),
        result.confidence * 100.0,
        result.processing_time_ms
    );

    let _ = writeln!(out, "<h2>Text</h2>\n<pre>{}</pre>", html_escape(&result.text));

    if !result.tables.is_empty() {
        let _ = writeln!(out, "<h2>Tables</h2>");
        for table in &result.tables {
            out.push_str(&render_html_table(table));
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_html_table(table: &TableStructure) -> String {
    let mut out = String::from("<table>\n");
    for (i, row) in table.rows.iter().enumerate() {
        let tag = if i == 0 { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in &row.cells {
            let _ = write!(out, "<{tag}>{}</{tag}>", html_escape(&cell.text));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
