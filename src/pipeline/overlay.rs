//! Overlay planning: which outlines to draw, in what color, in what order.
//!
//! The plan is pure data: a list of closed device-point paths with their
//! category and color. Painting it onto an actual page goes through the
//! [`OverlayCanvas`] trait, implemented for pdfium in
//! [`crate::pipeline::render`].
//!
//! ## Layering
//!
//! Shapes are emitted back to front in the fixed order of
//! [`CATEGORY_STYLES`]: paragraphs, lines, words, tables (each table's
//! boundary, then its cells), selection marks. Small elements therefore stay
//! visible on top of the containers around them. The order is part of the
//! output's meaning and is not configurable.

use crate::error::ShapeError;
use crate::geometry::{device_path, Point, Polygon};
use crate::model::{AnalysisDocument, BoundingRegion, LengthUnit};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Fill opacity of every overlay shape.
pub const FILL_OPACITY: f64 = 0.2;

/// Stroke width of every overlay shape, in device points.
pub const STROKE_WIDTH: f64 = 1.0;

/// RGB color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled to `0..=255`.
    pub fn to_u8(self) -> [u8; 3] {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

/// Kind of layout element an overlay shape outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Paragraph,
    Line,
    Word,
    Table,
    Cell,
    SelectionMark,
}

impl ElementCategory {
    pub fn label(self) -> &'static str {
        match self {
            ElementCategory::Paragraph => "paragraph",
            ElementCategory::Line => "line",
            ElementCategory::Word => "word",
            ElementCategory::Table => "table",
            ElementCategory::Cell => "cell",
            ElementCategory::SelectionMark => "selection_mark",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        CATEGORY_STYLES
            .iter()
            .map(|s| s.category)
            .find(|c| c.label() == label)
    }

    pub fn style(self) -> &'static CategoryStyle {
        &CATEGORY_STYLES[self.draw_priority() as usize]
    }

    pub fn color(self) -> Rgb {
        self.style().color
    }

    /// Position in the back-to-front drawing order.
    pub fn draw_priority(self) -> u8 {
        match self {
            ElementCategory::Paragraph => 0,
            ElementCategory::Line => 1,
            ElementCategory::Word => 2,
            ElementCategory::Table => 3,
            ElementCategory::Cell => 4,
            ElementCategory::SelectionMark => 5,
        }
    }
}

impl fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Color for a category label; labels that name no category draw black.
pub fn color_for_label(label: &str) -> Rgb {
    ElementCategory::from_label(label)
        .map(ElementCategory::color)
        .unwrap_or(Rgb::BLACK)
}

/// One row of the fixed category table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStyle {
    pub category: ElementCategory,
    pub color: Rgb,
    pub draw_priority: u8,
}

/// Number of element categories.
pub const CATEGORY_COUNT: usize = 6;

/// Every category exactly once, back to front.
pub static CATEGORY_STYLES: [CategoryStyle; CATEGORY_COUNT] = [
    CategoryStyle {
        category: ElementCategory::Paragraph,
        color: Rgb::new(0.0, 0.7, 0.0),
        draw_priority: 0,
    },
    CategoryStyle {
        category: ElementCategory::Line,
        color: Rgb::new(0.0, 0.0, 1.0),
        draw_priority: 1,
    },
    CategoryStyle {
        category: ElementCategory::Word,
        color: Rgb::new(1.0, 0.0, 0.0),
        draw_priority: 2,
    },
    CategoryStyle {
        category: ElementCategory::Table,
        color: Rgb::new(0.7, 0.0, 0.7),
        draw_priority: 3,
    },
    CategoryStyle {
        category: ElementCategory::Cell,
        color: Rgb::new(1.0, 0.5, 0.0),
        draw_priority: 4,
    },
    CategoryStyle {
        category: ElementCategory::SelectionMark,
        color: Rgb::new(0.0, 0.7, 0.7),
        draw_priority: 5,
    },
];

/// A closed outline ready to paint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayShape {
    pub category: ElementCategory,
    /// Index of the element within its category on this page.
    pub index: usize,
    pub color: Rgb,
    /// Device points, top-left origin, first point repeated at the end.
    pub path: Vec<Point>,
    /// Text of the element, for logs.
    pub content: String,
}

/// Everything to draw on one page, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayPlan {
    pub page_number: u32,
    pub shapes: Vec<OverlayShape>,
    /// Polygons with fewer than two distinct points.
    pub skipped: usize,
}

impl OverlayPlan {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shapes per category, in drawing order.
    pub fn counts(&self) -> Vec<(ElementCategory, usize)> {
        CATEGORY_STYLES
            .iter()
            .map(|s| {
                let n = self.shapes.iter().filter(|sh| sh.category == s.category).count();
                (s.category, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

struct PlanBuilder {
    plan: OverlayPlan,
    counters: [usize; CATEGORY_COUNT],
}

impl PlanBuilder {
    fn push(&mut self, category: ElementCategory, polygon: &Polygon, content: &str) {
        let slot = category.draw_priority() as usize;
        let index = self.counters[slot];
        self.counters[slot] += 1;

        match device_path(polygon) {
            Some(path) => self.plan.shapes.push(OverlayShape {
                category,
                index,
                color: category.color(),
                path,
                content: content.to_string(),
            }),
            None => {
                debug!("Skipping degenerate {category} #{index} ({} points)", polygon.len());
                self.plan.skipped += 1;
            }
        }
    }

    fn push_regions(
        &mut self,
        category: ElementCategory,
        regions: &[BoundingRegion],
        page_number: u32,
        content: &str,
    ) {
        for region in regions.iter().filter(|r| r.page_number == page_number) {
            self.push(category, &region.polygon, content);
        }
    }
}

/// Plan the overlay of the document's first page.
///
/// Paragraphs and tables are document-level; only their bounding regions on
/// the first page are drawn. A document without pages yields an empty plan.
pub fn plan_first_page(analysis: &AnalysisDocument) -> OverlayPlan {
    let Some(page) = analysis.first_page() else {
        return OverlayPlan::default();
    };
    let page_number = page.page_number;

    if page.unit == Some(LengthUnit::Pixel) {
        warn!(
            "Page {page_number} is measured in pixels; geometry is still scaled as inches \
             (72 pt per unit)"
        );
    }

    let mut builder = PlanBuilder {
        plan: OverlayPlan {
            page_number,
            ..OverlayPlan::default()
        },
        counters: [0; CATEGORY_COUNT],
    };

    for paragraph in &analysis.paragraphs {
        builder.push_regions(
            ElementCategory::Paragraph,
            &paragraph.bounding_regions,
            page_number,
            &paragraph.content,
        );
    }
    for line in &page.lines {
        builder.push(ElementCategory::Line, &line.polygon, &line.content);
    }
    for word in &page.words {
        builder.push(ElementCategory::Word, &word.polygon, &word.content);
    }
    for table in &analysis.tables {
        builder.push_regions(ElementCategory::Table, &table.bounding_regions, page_number, "");
        for cell in &table.cells {
            builder.push_regions(
                ElementCategory::Cell,
                &cell.bounding_regions,
                page_number,
                &cell.content,
            );
        }
    }
    for mark in &page.selection_marks {
        builder.push(ElementCategory::SelectionMark, &mark.polygon, mark.state.as_str());
    }

    builder.plan
}

/// A surface overlay shapes can be committed to, one at a time.
pub trait OverlayCanvas {
    /// Draw `shape` filled at [`FILL_OPACITY`] and stroked at
    /// [`STROKE_WIDTH`], both in `shape.color`, and commit it to the page.
    fn draw_shape(&mut self, shape: &OverlayShape) -> Result<(), String>;
}

/// Outcome of painting a plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayStats {
    pub page_number: u32,
    pub drawn: usize,
    pub skipped: usize,
    pub failures: Vec<ShapeError>,
}

/// Paint every shape of `plan`, in order.
///
/// A shape that fails is logged and recorded; the remaining shapes are
/// still drawn.
pub fn paint(plan: &OverlayPlan, canvas: &mut dyn OverlayCanvas) -> OverlayStats {
    let mut stats = OverlayStats {
        page_number: plan.page_number,
        skipped: plan.skipped,
        ..OverlayStats::default()
    };

    for shape in &plan.shapes {
        debug!(
            "Drawing {} #{} ({} points) '{}'",
            shape.category,
            shape.index,
            shape.path.len(),
            shape.content
        );
        match canvas.draw_shape(shape) {
            Ok(()) => stats.drawn += 1,
            Err(detail) => {
                warn!("Failed to draw {} #{}: {}", shape.category, shape.index, detail);
                stats.failures.push(ShapeError::DrawFailed {
                    category: shape.category,
                    index: shape.index,
                    detail,
                });
            }
        }
    }

    stats
}
