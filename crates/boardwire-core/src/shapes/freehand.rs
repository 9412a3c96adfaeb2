//! Freehand stroke simplification and shape recognition.

use super::{Geometry, Object};
use kurbo::{Point, Rect, Vec2};

/// Fraction of the stroke's diagonal within which start and end count as touching.
const CLOSE_RATIO: f64 = 0.2;

/// Ramer-Douglas-Peucker simplification.
pub fn simplify_stroke(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    // Find point with maximum distance from line between first and last
    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;

    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(*point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        let mut left = simplify_stroke(&points[..=max_index], tolerance);
        let right = simplify_stroke(&points[max_index..], tolerance);

        // Drop the duplicate junction point
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let d = line_end - line_start;
    let len_sq = d.hypot2();
    if len_sq < f64::EPSILON {
        return (point - line_start).hypot();
    }
    // Twice the triangle area over the base length
    let area2 = (point - line_start).cross(d).abs();
    area2 / len_sq.sqrt()
}

/// A recognised replacement for a freehand stroke, in the stroke's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognized {
    /// Offset to add to the object's position.
    pub offset: Vec2,
    pub geometry: Geometry,
}

/// Try to recognise a stroke as a line, triangle, rectangle or ellipse.
///
/// Open strokes that simplify to a single segment become lines. Closed
/// strokes become a polygon (3 corners), a rectangle (4) or an ellipse (5+).
pub fn recognize_stroke(points: &[Point], tolerance: f64) -> Option<Recognized> {
    let (first, last) = (*points.first()?, *points.last()?);
    if points.len() < 2 {
        return None;
    }
    let bbox = points.iter().fold(Rect::from_points(first, first), |acc, p| acc.union_pt(*p));
    let diagonal = bbox.size().to_vec2().hypot();
    if diagonal < f64::EPSILON {
        return None;
    }

    let simplified = simplify_stroke(points, tolerance);
    let closed = (last - first).hypot() < diagonal * CLOSE_RATIO;

    if !closed {
        return (simplified.len() == 2).then(|| Recognized {
            offset: Vec2::ZERO,
            geometry: Geometry::Line { start: first, end: last },
        });
    }

    // The closing point duplicates the first corner.
    let corners = simplified.len().saturating_sub(1);
    let boxed = |geometry| Recognized {
        offset: bbox.origin().to_vec2(),
        geometry,
    };
    match corners {
        0..=2 => None,
        3 => Some(Recognized {
            offset: Vec2::ZERO,
            geometry: Geometry::Polygon { vertices: simplified[..3].to_vec() },
        }),
        4 => Some(boxed(Geometry::Rectangle { width: bbox.width(), height: bbox.height() })),
        _ => Some(boxed(Geometry::Ellipse { width: bbox.width(), height: bbox.height() })),
    }
}

impl Object {
    /// Replace a freehand stroke with a recognised shape, marking it snapped.
    ///
    /// Returns `false` (and leaves the object untouched) when the object is
    /// not a freehand stroke or the stroke is not recognisable.
    pub fn snap_freehand(&mut self, tolerance: f64) -> bool {
        let Geometry::Freehand { points } = &self.geometry else {
            return false;
        };
        let Some(recognized) = recognize_stroke(points, tolerance) else {
            return false;
        };
        self.position += recognized.offset;
        self.geometry = recognized.geometry;
        self.snapped = true;
        true
    }
}
