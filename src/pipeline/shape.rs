//! Shaping: wire result → [`AnalysisDocument`].
//!
//! One pass over the service result that copies every element into the
//! persisted schema, runs each polygon through
//! [`crate::geometry::format_polygon`], and enforces the only mandatory
//! fields: `confidence` on words and selection marks. A missing mandatory
//! field fails the whole document so a half-shaped file is never written.
//!
//! Element order is exactly the service's order; nothing is re-sorted.

use crate::error::LayoutError;
use crate::geometry::format_optional_polygon;
use crate::model::{
    AnalysisDocument, BoundingRegion, Cell, Line, Page, Paragraph, SelectionMark, Span, Table,
    Word,
};
use crate::pipeline::wire::{
    AnalyzeResult, WireBoundingRegion, WirePage, WireSpan, WireStyle, WireTable,
};
use tracing::debug;

/// Shape a service result into an Analysis Document.
pub fn shape_result(result: &AnalyzeResult) -> Result<AnalysisDocument, LayoutError> {
    let pages = result
        .pages
        .iter()
        .map(shape_page)
        .collect::<Result<Vec<_>, _>>()?;

    let paragraphs = result
        .paragraphs
        .iter()
        .flatten()
        .map(|p| Paragraph {
            role: p.role.clone(),
            content: p.content.clone(),
            bounding_regions: shape_regions(p.bounding_regions.as_deref()),
        })
        .collect();

    let tables = result.tables.iter().flatten().map(shape_table).collect();

    let analysis = AnalysisDocument {
        pages,
        paragraphs,
        tables,
        has_handwritten_content: has_handwriting(result.styles.as_deref()),
    };

    debug!(
        "Shaped {} pages, {} paragraphs, {} tables",
        analysis.pages.len(),
        analysis.paragraphs.len(),
        analysis.tables.len()
    );
    Ok(analysis)
}

/// True iff any style hint declares handwriting.
pub fn has_handwriting(styles: Option<&[WireStyle]>) -> bool {
    styles
        .unwrap_or_default()
        .iter()
        .any(|s| s.is_handwritten == Some(true))
}

fn shape_page(page: &WirePage) -> Result<Page, LayoutError> {
    let lines = page
        .lines
        .iter()
        .flatten()
        .map(|line| Line {
            content: line.content.clone(),
            polygon: format_optional_polygon(line.polygon.as_deref()),
            spans: line.spans.iter().flatten().map(shape_span).collect(),
        })
        .collect();

    let words = page
        .words
        .iter()
        .flatten()
        .enumerate()
        .map(|(index, word)| {
            let confidence = word.confidence.ok_or(LayoutError::MissingField {
                element: "word",
                page: page.page_number,
                index,
                field: "confidence",
            })?;
            Ok(Word {
                content: word.content.clone(),
                confidence,
                polygon: format_optional_polygon(word.polygon.as_deref()),
                span: word.span.as_ref().map(shape_span),
            })
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;

    let selection_marks = page
        .selection_marks
        .iter()
        .flatten()
        .enumerate()
        .map(|(index, mark)| {
            let confidence = mark.confidence.ok_or(LayoutError::MissingField {
                element: "selection mark",
                page: page.page_number,
                index,
                field: "confidence",
            })?;
            Ok(SelectionMark {
                state: mark.state,
                confidence,
                polygon: format_optional_polygon(mark.polygon.as_deref()),
            })
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;

    Ok(Page {
        page_number: page.page_number,
        width: page.width,
        height: page.height,
        unit: page.unit,
        lines,
        words,
        selection_marks,
    })
}

fn shape_table(table: &WireTable) -> Table {
    Table {
        row_count: table.row_count,
        column_count: table.column_count,
        cells: table
            .cells
            .iter()
            .map(|cell| Cell {
                row_index: cell.row_index,
                column_index: cell.column_index,
                row_span: cell.row_span,
                column_span: cell.column_span,
                content: cell.content.clone(),
                bounding_regions: shape_regions(cell.bounding_regions.as_deref()),
            })
            .collect(),
        bounding_regions: shape_regions(table.bounding_regions.as_deref()),
    }
}

fn shape_regions(regions: Option<&[WireBoundingRegion]>) -> Vec<BoundingRegion> {
    regions
        .unwrap_or_default()
        .iter()
        .map(|r| BoundingRegion {
            page_number: r.page_number,
            polygon: format_optional_polygon(r.polygon.as_deref()),
        })
        .collect()
}

fn shape_span(span: &WireSpan) -> Span {
    Span {
        offset: span.offset,
        length: span.length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::{LengthUnit, SelectionState};

    fn result(json: &str) -> AnalyzeResult {
        serde_json::from_str(json).expect("valid wire json")
    }

    const ONE_PAGE: &str = r#"{
        "pages": [{
            "pageNumber": 1, "width": 8.5, "height": 11, "unit": "inch",
            "words": [
                {"content": "Hello", "polygon": [1,1,2,1,2,2,1,2], "confidence": 0.95,
                 "span": {"offset": 0, "length": 5}},
                {"content": "world", "polygon": [3,1,4,1,4,2,3,2], "confidence": 0.5,
                 "span": {"offset": 6, "length": 5}}
            ],
            "lines": [{"content": "Hello world", "polygon": [1,1,4,1,4,2,1,2],
                       "spans": [{"offset": 0, "length": 11}]}],
            "selectionMarks": [{"state": "selected", "polygon": [5,5,5.2,5,5.2,5.2,5,5.2],
                                "confidence": 0.8}]
        }],
        "paragraphs": [{"role": "title", "content": "Hello world",
                        "boundingRegions": [{"pageNumber": 1, "polygon": [1,1,4,1,4,2,1,2]}]}],
        "tables": [{"rowCount": 2, "columnCount": 1,
                    "cells": [
                        {"rowIndex": 0, "columnIndex": 0, "content": "a",
                         "boundingRegions": [{"pageNumber": 1, "polygon": [1,3,2,3,2,4,1,4]}]},
                        {"rowIndex": 1, "columnIndex": 0, "rowSpan": 1, "content": "b"}
                    ],
                    "boundingRegions": [{"pageNumber": 1, "polygon": [1,3,2,3,2,5,1,5]}]}],
        "styles": [{"isHandwritten": false, "confidence": 0.9}]
    }"#;

    #[test]
    fn shapes_pages_words_lines_and_marks() {
        let doc = shape_result(&result(ONE_PAGE)).unwrap();
        let page = &doc.pages[0];
        assert_eq!(page.page_number, 1);
        assert_eq!(page.width, Some(8.5));
        assert_eq!(page.height, Some(11.0));
        assert_eq!(page.unit, Some(LengthUnit::Inch));

        assert_eq!(page.words.len(), 2);
        assert_eq!(page.words[0].content, "Hello");
        assert_eq!(page.words[0].confidence, 0.95);
        assert_eq!(page.words[0].polygon.points()[1], Point::new(2.0, 1.0));
        assert_eq!(page.words[0].span, Some(Span { offset: 0, length: 5 }));

        assert_eq!(page.lines[0].spans, vec![Span { offset: 0, length: 11 }]);
        assert_eq!(page.selection_marks[0].state, SelectionState::Selected);
        assert_eq!(page.selection_marks[0].polygon.len(), 4);
    }

    #[test]
    fn preserves_service_order() {
        let doc = shape_result(&result(ONE_PAGE)).unwrap();
        let words: Vec<&str> = doc.pages[0].words.iter().map(|w| w.content.as_str()).collect();
        assert_eq!(words, ["Hello", "world"]);
        let cells: Vec<&str> = doc.tables[0].cells.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(cells, ["a", "b"]);
    }

    #[test]
    fn shapes_tables_and_cells() {
        let doc = shape_result(&result(ONE_PAGE)).unwrap();
        let table = &doc.tables[0];
        assert_eq!((table.row_count, table.column_count), (2, 1));
        assert_eq!(table.bounding_regions[0].page_number, 1);
        assert_eq!(table.cells[1].row_index, 1);
        assert_eq!(table.cells[1].row_span, Some(1));
        assert!(table.cells[1].bounding_regions.is_empty());
    }

    #[test]
    fn shapes_paragraphs_at_document_level() {
        let doc = shape_result(&result(ONE_PAGE)).unwrap();
        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(doc.paragraphs[0].role.as_deref(), Some("title"));
        assert_eq!(doc.paragraphs[0].bounding_regions[0].polygon.len(), 4);
    }

    #[test]
    fn word_without_confidence_fails() {
        let err = shape_result(&result(
            r#"{"pages": [{"pageNumber": 2, "words": [
                {"content": "ok", "confidence": 0.9},
                {"content": "bad", "polygon": [1,1,2,2]}
            ]}]}"#,
        ))
        .unwrap_err();
        match err {
            LayoutError::MissingField {
                element,
                page,
                index,
                field,
            } => {
                assert_eq!((element, page, index, field), ("word", 2, 1, "confidence"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn selection_mark_without_confidence_fails() {
        let err = shape_result(&result(
            r#"{"pages": [{"pageNumber": 1, "selectionMarks": [{"state": "unselected"}]}]}"#,
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::MissingField {
                element: "selection mark",
                ..
            }
        ));
    }

    #[test]
    fn odd_or_missing_polygons_become_empty() {
        let doc = shape_result(&result(
            r#"{"pages": [{"pageNumber": 1, "words": [
                {"content": "odd", "polygon": [1,2,3], "confidence": 0.9},
                {"content": "none", "confidence": 0.9}
            ]}]}"#,
        ))
        .unwrap();
        assert!(doc.pages[0].words.iter().all(|w| w.polygon.is_empty()));
    }

    #[test]
    fn handwriting_flag() {
        assert!(!has_handwriting(None));
        assert!(!has_handwriting(Some(&[][..])));
        let styles = vec![
            WireStyle {
                is_handwritten: Some(false),
                confidence: None,
            },
            WireStyle {
                is_handwritten: Some(true),
                confidence: Some(0.7),
            },
        ];
        assert!(has_handwriting(Some(styles.as_slice())));
        assert!(!shape_result(&result(ONE_PAGE)).unwrap().has_handwritten_content);
    }

    #[test]
    fn table_without_cells_shapes_to_empty_cells() {
        let doc = shape_result(&result(
            r#"{"pages": [], "tables": [{"rowCount": 0, "columnCount": 0,
                "boundingRegions": [{"pageNumber": 1, "polygon": [0,0,1,0,1,1,0,1]}]}]}"#,
        ))
        .unwrap();
        assert!(doc.tables[0].cells.is_empty());
        assert_eq!(doc.tables[0].bounding_regions.len(), 1);
    }
}
