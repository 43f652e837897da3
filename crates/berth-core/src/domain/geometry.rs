//! Rectangle geometry primitives.
//!
//! Everything an entity knows about space is expressed through [`Rect`]:
//! its own occupied region, the regions peers report, and the bounding
//! union of a region with its substructure. Coordinates are `f64` with the
//! origin at the top-left and `top` growing downward.

use serde::{Deserialize, Serialize};

/// A point in the shared coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub left: f64,
    pub top: f64,
}

/// An axis-aligned rectangle: top-left corner plus size.
///
/// `width`/`height` are expected to be non-negative, but this type does not
/// enforce it; construction sites own that decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Returns the rightmost X coordinate.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Returns the bottommost Y coordinate.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Returns the center point.
    pub fn center(&self) -> Point {
        Point {
            left: self.left + 0.5 * self.width,
            top: self.top + 0.5 * self.height,
        }
    }

    /// The four corners, clockwise from top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point { left: self.left, top: self.top },
            Point { left: self.right(), top: self.top },
            Point { left: self.right(), top: self.bottom() },
            Point { left: self.left, top: self.bottom() },
        ]
    }

    /// Returns `true` if `point` lies within this rectangle.
    ///
    /// Edges are inclusive, so rectangles that merely touch share their
    /// boundary points. The negotiation margins (`+ 1`) account for this.
    pub fn contains(&self, point: Point) -> bool {
        point.left >= self.left
            && point.left <= self.right()
            && point.top >= self.top
            && point.top <= self.bottom()
    }

    /// Returns `true` if this rectangle intersects `other`: any corner of
    /// either rectangle lies within the other.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.corners().iter().any(|p| other.contains(*p))
            || other.corners().iter().any(|p| self.contains(*p))
    }

    /// Returns a copy translated by the given deltas.
    pub fn translate(&self, right: f64, down: f64) -> Rect {
        Rect {
            left: self.left + right,
            top: self.top + down,
            ..*self
        }
    }
}

/// Returns the smallest rectangle covering all of `rects`, or `None` when
/// the slice is empty.
pub fn bounding_box(rects: &[Rect]) -> Option<Rect> {
    let first = rects.first()?;
    let mut left = first.left;
    let mut top = first.top;
    let mut right = first.right();
    let mut bottom = first.bottom();
    for rect in &rects[1..] {
        left = left.min(rect.left);
        top = top.min(rect.top);
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
    }
    Some(Rect {
        left,
        top,
        width: right - left,
        height: bottom - top,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
