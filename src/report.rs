//! Legacy line-oriented text report.
//!
//! Older tooling produced a human-readable report instead of JSON:
//!
//! ```text
//! ----Analyzing layout from page #1----
//! Page has width: 8.5 and height: 11, measured with unit: inch
//! ...Line # 0 has word count 2 and text 'Hello world' within bounding polygon '[1, 1], [4, 1], [4, 2], [1, 2]'
//! ...Word 'Hello' has confidence 0.95 within bounding polygon '[1, 1], [2, 1], [2, 2], [1, 2]'
//! ...Selection mark is 'selected' within bounding polygon '[5, 5], [5.2, 5], [5.2, 5.2], [5, 5.2]' and has confidence 0.8
//! ----------------------------------------
//! Table # 0 has 2 rows and 1 columns
//! Table # 0 location on page: 1 is '[1, 3], [2, 3], [2, 5], [1, 5]'
//! ...Cell[0][0] has content 'a'
//! ...content on page 1 is within bounding polygon '[1, 3], [2, 3], [2, 4], [1, 4]'
//! ```
//!
//! [`write_report`] produces this format from an [`AnalysisDocument`];
//! [`parse_report`] reads it back (leniently: indentation, missing `----`
//! decorations and unknown lines are tolerated) so the overlay renderer can
//! consume old reports. JSON remains the canonical format; the report carries
//! no spans, paragraphs or handwriting flag.

use crate::error::LayoutError;
use crate::geometry::{Point, Polygon};
use crate::model::{
    self, AnalysisDocument, BoundingRegion, Cell, LengthUnit, Line, Page, SelectionMark,
    SelectionState, Table, Word,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

// ── Polygon text ─────────────────────────────────────────────────────────────

/// Render a polygon as `"[x, y], [x, y], ..."`, or `"N/A"` when empty.
pub fn format_polygon_text(polygon: &Polygon) -> String {
    if polygon.is_empty() {
        return "N/A".to_string();
    }
    polygon
        .points()
        .iter()
        .map(|p| format!("[{}, {}]", p.x, p.y))
        .collect::<Vec<_>>()
        .join(", ")
}

static RE_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\s*(-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?)\s*,\s*(-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?)\s*\]",
    )
    .unwrap()
});

/// Parse `"[x, y], [x, y], ..."` back into a polygon. `"N/A"` and text
/// without any pair yield an empty polygon.
pub fn parse_polygon_text(text: &str) -> Polygon {
    RE_POINT
        .captures_iter(text)
        .filter_map(|c| {
            let x = c[1].parse::<f64>().ok()?;
            let y = c[2].parse::<f64>().ok()?;
            Some(Point::new(x, y))
        })
        .collect()
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Render `analysis` as a text report.
pub fn write_report(analysis: &AnalysisDocument) -> String {
    let mut out = String::new();

    if analysis.has_handwritten_content {
        out.push_str(HANDWRITTEN);
        out.push('\n');
    } else {
        out.push_str("Document does not contain handwritten content\n");
    }

    for page in &analysis.pages {
        let _ = writeln!(out, "----Analyzing layout from page #{}----", page.page_number);
        if let (Some(w), Some(h)) = (page.width, page.height) {
            let unit = match page.unit {
                Some(LengthUnit::Pixel) => "pixel",
                _ => "inch",
            };
            let _ = writeln!(
                out,
                "Page has width: {w} and height: {h}, measured with unit: {unit}"
            );
        }

        for (i, line) in page.lines.iter().enumerate() {
            let _ = writeln!(
                out,
                "...Line # {} has word count {} and text '{}' within bounding polygon '{}'",
                i,
                line.content.split_whitespace().count(),
                line.content,
                format_polygon_text(&line.polygon)
            );
        }

        for word in &page.words {
            let _ = writeln!(
                out,
                "...Word '{}' has confidence {} within bounding polygon '{}'",
                word.content,
                word.confidence,
                format_polygon_text(&word.polygon)
            );
        }

        for mark in &page.selection_marks {
            let _ = writeln!(
                out,
                "...Selection mark is '{}' within bounding polygon '{}' and has confidence {}",
                mark.state.as_str(),
                format_polygon_text(&mark.polygon),
                mark.confidence
            );
        }
    }

    out.push_str("----------------------------------------\n");

    for (t, table) in analysis.tables.iter().enumerate() {
        let _ = writeln!(
            out,
            "Table # {} has {} rows and {} columns",
            t, table.row_count, table.column_count
        );
        for region in &table.bounding_regions {
            let _ = writeln!(
                out,
                "Table # {} location on page: {} is '{}'",
                t,
                region.page_number,
                format_polygon_text(&region.polygon)
            );
        }
        for cell in &table.cells {
            let _ = writeln!(
                out,
                "...Cell[{}][{}] has content '{}'",
                cell.row_index, cell.column_index, cell.content
            );
            for region in &cell.bounding_regions {
                let _ = writeln!(
                    out,
                    "...content on page {} is within bounding polygon '{}'",
                    region.page_number,
                    format_polygon_text(&region.polygon)
                );
            }
        }
    }

    out
}

/// Write the text report for `analysis` to `path`, creating parent
/// directories.
pub fn save_report(analysis: &AnalysisDocument, path: &Path) -> Result<(), LayoutError> {
    let text = write_report(analysis);
    model::write_atomic(path, text.as_bytes(), "txt.tmp")?;
    debug!("Wrote text report ({} bytes) to {}", text.len(), path.display());
    Ok(())
}

// ── Parser ───────────────────────────────────────────────────────────────────

// Every record pattern is anchored to the whole trimmed line, so element
// text that reads like another record stays inside its own record.
static RE_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-*Analyzing layout from page #(\d+)-*$").unwrap());
static RE_PAGE_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^Page has width: ([0-9.eE+-]+) and height: ([0-9.eE+-]+), measured with unit: (\w+)$",
    )
    .unwrap()
});
static RE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\.\.\.)?Line # \d+ has word count \d+ and text '(.*)' within bounding polygon '([^']*)'$",
    )
    .unwrap()
});
static RE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\.\.\.)?Word '(.*)' has confidence ([0-9.eE+-]+) within bounding polygon '([^']*)'$",
    )
    .unwrap()
});
static RE_MARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\.\.\.)?Selection mark is '(\w+)' within bounding polygon '([^']*)' and has confidence ([0-9.eE+-]+)$",
    )
    .unwrap()
});
static RE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Table # \d+ has (\d+) rows and (\d+) columns$").unwrap());
static RE_TABLE_REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Table # \d+ location on page: (\d+) is '([^']*)'$").unwrap());
static RE_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\.\.\.)?Cell\[(\d+)\]\[(\d+)\] has content '(.*)'$").unwrap()
});
static RE_CELL_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\.\.\.)?content on page (\d+) is within bounding polygon '([^']*)'$").unwrap()
});

const HANDWRITTEN: &str = "Document contains handwritten content";

/// Parse a text report into an Analysis Document.
///
/// Page-level records seen before any page header belong to page 1. Numbers
/// that fail to parse are reported as an error naming the line.
pub fn parse_report(text: &str) -> Result<AnalysisDocument, String> {
    let mut doc = AnalysisDocument::default();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let bad = |what: &str| format!("line {}: invalid {} in '{}'", lineno + 1, what, line);

        if let Some(c) = RE_LINE.captures(line) {
            current_page(&mut doc).lines.push(Line {
                content: c[1].to_string(),
                polygon: parse_polygon_text(&c[2]),
                spans: Vec::new(),
            });
        } else if let Some(c) = RE_WORD.captures(line) {
            let confidence = c[2].parse().map_err(|_| bad("confidence"))?;
            current_page(&mut doc).words.push(Word {
                content: c[1].to_string(),
                confidence,
                polygon: parse_polygon_text(&c[3]),
                span: None,
            });
        } else if let Some(c) = RE_MARK.captures(line) {
            let state = match &c[1] {
                "selected" => SelectionState::Selected,
                "unselected" => SelectionState::Unselected,
                _ => return Err(bad("selection state")),
            };
            let confidence = c[3].parse().map_err(|_| bad("confidence"))?;
            current_page(&mut doc).selection_marks.push(SelectionMark {
                state,
                confidence,
                polygon: parse_polygon_text(&c[2]),
            });
        } else if let Some(c) = RE_PAGE.captures(line) {
            let page_number = c[1].parse().map_err(|_| bad("page number"))?;
            doc.pages.push(Page {
                page_number,
                ..Page::default()
            });
        } else if let Some(c) = RE_PAGE_SIZE.captures(line) {
            let page = current_page(&mut doc);
            page.width = Some(c[1].parse().map_err(|_| bad("width"))?);
            page.height = Some(c[2].parse().map_err(|_| bad("height"))?);
            page.unit = match &c[3] {
                "pixel" => Some(LengthUnit::Pixel),
                _ => Some(LengthUnit::Inch),
            };
        } else if let Some(c) = RE_TABLE.captures(line) {
            doc.tables.push(Table {
                row_count: c[1].parse().map_err(|_| bad("row count"))?,
                column_count: c[2].parse().map_err(|_| bad("column count"))?,
                ..Table::default()
            });
        } else if let Some(c) = RE_TABLE_REGION.captures(line) {
            let region = BoundingRegion {
                page_number: c[1].parse().map_err(|_| bad("page number"))?,
                polygon: parse_polygon_text(&c[2]),
            };
            match doc.tables.last_mut() {
                Some(table) => table.bounding_regions.push(region),
                None => return Err(bad("table location without a table")),
            }
        } else if let Some(c) = RE_CELL.captures(line) {
            let cell = Cell {
                row_index: c[1].parse().map_err(|_| bad("row index"))?,
                column_index: c[2].parse().map_err(|_| bad("column index"))?,
                content: c[3].to_string(),
                ..Cell::default()
            };
            match doc.tables.last_mut() {
                Some(table) => table.cells.push(cell),
                None => return Err(bad("cell without a table")),
            }
        } else if let Some(c) = RE_CELL_REGION.captures(line) {
            let region = BoundingRegion {
                page_number: c[1].parse().map_err(|_| bad("page number"))?,
                polygon: parse_polygon_text(&c[2]),
            };
            match doc.tables.last_mut().and_then(|t| t.cells.last_mut()) {
                Some(cell) => cell.bounding_regions.push(region),
                None => return Err(bad("cell region without a cell")),
            }
        } else if line == HANDWRITTEN {
            doc.has_handwritten_content = true;
        }
    }

    Ok(doc)
}

fn current_page(doc: &mut AnalysisDocument) -> &mut Page {
    if doc.pages.is_empty() {
        doc.pages.push(Page {
            page_number: 1,
            ..Page::default()
        });
    }
    let last = doc.pages.len() - 1;
    &mut doc.pages[last]
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// Load an Analysis Document from `path`, accepting either the JSON schema or
/// a text report. Text whose first non-blank character is `{` is JSON.
pub fn load_analysis(path: &Path) -> Result<AnalysisDocument, LayoutError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LayoutError::AnalysisNotFound {
            path: path.to_path_buf(),
        },
        _ => LayoutError::AnalysisParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let parse_err = |detail: String| LayoutError::AnalysisParse {
        path: path.to_path_buf(),
        detail,
    };

    if text.trim_start().starts_with('{') {
        return model::from_json_str(&text).map_err(parse_err);
    }

    let doc = parse_report(&text).map_err(parse_err)?;
    if doc.pages.is_empty() && doc.tables.is_empty() {
        return Err(parse_err("no layout records found".into()));
    }
    debug!(
        "Parsed text report: {} pages, {} words, {} tables",
        doc.pages.len(),
        doc.word_count(),
        doc.tables.len()
    );
    Ok(doc)
}
