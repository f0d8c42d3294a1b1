//! Polygon normalization and inch → device-point projection.
//!
//! The layout service reports every polygon as a flat coordinate array
//! `[x0, y0, x1, y1, ...]` in page-relative units. For PDF input those units
//! are **inches**, top-left origin. Nothing here infers units: the persisted
//! Analysis Document keeps inches, and only [`device_path`] converts to
//! device points (72 per inch) when an overlay is drawn.
//!
//! ## Accepted polygon shapes
//!
//! A persisted [`Polygon`] is written as `[[x, y], ...]`, but any producer of
//! the schema may feed the renderer, so reading also accepts:
//!
//! | JSON                        | Meaning                                   |
//! |-----------------------------|-------------------------------------------|
//! | `[[x, y], ...]`             | point list (canonical)                    |
//! | `[x0, y0, x1, y1, ...]`     | flat pairs; odd length → empty            |
//! | `[[[x, y], ...], ...]`      | segments, shared vertices dropped         |
//! | `null`                      | empty                                     |
//!
//! Duplicate points in a point list are kept on read and only removed by
//! [`device_path`], so a load/save cycle never changes canonical data.

use serde::{Deserialize, Serialize};

/// Device points per inch of page-relative geometry.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Width of the overlay canvas in device points (8.5 in).
pub const CANVAS_WIDTH_PT: f64 = 8.5 * POINTS_PER_INCH;

/// Height of the overlay canvas in device points (11 in).
pub const CANVAS_HEIGHT_PT: f64 = 11.0 * POINTS_PER_INCH;

/// A 2-D point, serialized as a `[x, y]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Multiply both coordinates by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// An ordered outline of an element on a page, in page-relative units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolygonRepr", into = "Vec<Point>")]
pub struct Polygon(Vec<Point>);

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The points with exact duplicates removed, first occurrence kept.
    pub fn deduplicated(&self) -> Vec<Point> {
        dedup_points(self.0.iter().copied())
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.0
    }
}

impl FromIterator<Point> for Polygon {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Wire shapes a polygon may arrive in. Variant order matters for
/// `untagged`: `[]` must land on `Flat`, and `[[x, y]]` must not be read as
/// a single segment.
#[derive(Deserialize)]
#[serde(untagged)]
enum PolygonRepr {
    Missing,
    Flat(Vec<f64>),
    Points(Vec<Point>),
    Segments(Vec<Vec<Point>>),
}

impl From<PolygonRepr> for Polygon {
    fn from(repr: PolygonRepr) -> Self {
        match repr {
            PolygonRepr::Missing => Polygon::default(),
            PolygonRepr::Flat(values) => format_polygon(&values),
            PolygonRepr::Points(points) => Polygon(points),
            PolygonRepr::Segments(segments) => Polygon(flatten_segments(&segments)),
        }
    }
}

/// Convert a flat `[x0, y0, x1, y1, ...]` array into points.
///
/// Values pass through unchanged. An empty or odd-length array yields an
/// empty polygon; callers treat that as "no renderable geometry".
pub fn format_polygon(flat: &[f64]) -> Polygon {
    if flat.is_empty() || flat.len() % 2 != 0 {
        return Polygon::default();
    }
    flat.chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect()
}

/// [`format_polygon`] for an optional array; `None` yields an empty polygon.
pub fn format_optional_polygon(flat: Option<&[f64]>) -> Polygon {
    flat.map(format_polygon).unwrap_or_default()
}

/// Flatten nested segments into one point list, dropping points equal to an
/// earlier one (same `x` and `y`) and keeping first-occurrence order.
///
/// Closing a polygon whose shared vertices appear twice would otherwise
/// produce zero-length edges.
pub fn flatten_segments(segments: &[Vec<Point>]) -> Vec<Point> {
    dedup_points(segments.iter().flatten().copied())
}

fn dedup_points(points: impl Iterator<Item = Point>) -> Vec<Point> {
    let mut unique: Vec<Point> = Vec::new();
    for point in points {
        // NaN never compares equal, so it is never treated as a duplicate.
        if !unique.contains(&point) {
            unique.push(point);
        }
    }
    unique
}

/// Project a polygon onto the fixed 612 × 792 pt canvas.
///
/// Returns the deduplicated points scaled by [`POINTS_PER_INCH`] with the
/// first point appended to close the outline, or `None` when fewer than two
/// distinct points remain.
pub fn device_path(polygon: &Polygon) -> Option<Vec<Point>> {
    let points = polygon.deduplicated();
    if points.len() < 2 {
        return None;
    }

    let mut path: Vec<Point> = points
        .into_iter()
        .map(|p| p.scaled(POINTS_PER_INCH))
        .collect();
    path.push(path[0]);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn format_polygon_pairs_values_in_order() {
        let polygon = format_polygon(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(polygon.points(), pts(&[(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]));
    }

    #[test]
    fn format_polygon_keeps_every_pair_for_long_input() {
        let flat: Vec<f64> = (0..40).map(|v| v as f64 * 0.25).collect();
        let polygon = format_polygon(&flat);
        assert_eq!(polygon.len(), 20);
        for (i, p) in polygon.points().iter().enumerate() {
            assert_eq!(p.x, flat[2 * i]);
            assert_eq!(p.y, flat[2 * i + 1]);
        }
    }

    #[test]
    fn format_polygon_odd_or_empty_is_empty() {
        assert!(format_polygon(&[]).is_empty());
        assert!(format_polygon(&[1.0]).is_empty());
        assert!(format_polygon(&[1.0, 2.0, 3.0]).is_empty());
        assert!(format_optional_polygon(None).is_empty());
    }

    #[test]
    fn flatten_segments_drops_shared_vertices() {
        let segments = vec![
            pts(&[(0.0, 0.0), (1.0, 0.0)]),
            pts(&[(1.0, 0.0), (1.0, 1.0)]),
        ];
        assert_eq!(
            flatten_segments(&segments),
            pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])
        );
    }

    #[test]
    fn flatten_segments_keeps_first_occurrence_order() {
        let segments = vec![pts(&[(2.0, 2.0), (0.0, 0.0), (2.0, 2.0), (1.0, 1.0), (0.0, 0.0)])];
        assert_eq!(
            flatten_segments(&segments),
            pts(&[(2.0, 2.0), (0.0, 0.0), (1.0, 1.0)])
        );
    }

    #[test]
    fn device_path_scales_and_closes() {
        let polygon = format_polygon(&[1.0, 1.0, 2.0, 1.0, 2.0, 2.0, 1.0, 2.0]);
        let path = device_path(&polygon).expect("renderable");
        assert_eq!(
            path,
            pts(&[
                (72.0, 72.0),
                (144.0, 72.0),
                (144.0, 144.0),
                (72.0, 144.0),
                (72.0, 72.0)
            ])
        );
    }

    #[test]
    fn device_path_skips_degenerate() {
        assert!(device_path(&Polygon::default()).is_none());
        assert!(device_path(&format_polygon(&[1.0, 1.0])).is_none());
        // Two copies of one vertex collapse to a single point.
        assert!(device_path(&format_polygon(&[1.0, 1.0, 1.0, 1.0])).is_none());
        assert!(device_path(&format_polygon(&[1.0, 1.0, 2.0, 2.0])).is_some());
    }

    #[test]
    fn polygon_reads_every_wire_shape() {
        let canonical: Polygon = serde_json::from_str("[[1, 2], [3, 4]]").unwrap();
        let flat: Polygon = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        let nested: Polygon = serde_json::from_str("[[[1, 2]], [[3, 4]]]").unwrap();
        let null: Polygon = serde_json::from_str("null").unwrap();
        let odd: Polygon = serde_json::from_str("[1, 2, 3]").unwrap();

        assert_eq!(canonical.points(), pts(&[(1.0, 2.0), (3.0, 4.0)]));
        assert_eq!(flat, canonical);
        assert_eq!(nested, canonical);
        assert!(null.is_empty());
        assert!(odd.is_empty());
    }

    #[test]
    fn nested_segments_lose_shared_vertices_on_load() {
        let nested: Polygon =
            serde_json::from_str("[[[0, 0], [1, 0]], [[1, 0], [1, 1]], [[1, 1], [0, 0]]]").unwrap();
        let canonical: Polygon = serde_json::from_str("[[0, 0], [1, 0], [1, 0]]").unwrap();

        assert_eq!(nested.points(), pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]));
        assert_eq!(canonical.points().len(), 3, "point lists keep duplicates");
    }

    #[test]
    fn polygon_writes_point_pairs() {
        let polygon = format_polygon(&[1.5, 2.0, 3.0, 4.25]);
        let json = serde_json::to_string(&polygon).unwrap();
        assert_eq!(json, "[[1.5,2.0],[3.0,4.25]]");
    }

    #[test]
    fn canvas_is_us_letter() {
        assert_eq!(CANVAS_WIDTH_PT, 612.0);
        assert_eq!(CANVAS_HEIGHT_PT, 792.0);
    }
}
