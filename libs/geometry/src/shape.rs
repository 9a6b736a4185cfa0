//! An enumeration of geometric shapes.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::Point;
use crate::polygon::Polygon;
use crate::rect::Rect;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// A primitive geometric shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A rectangle.
    Rect(Rect),
    /// A polygon.
    Polygon(Polygon),
}

impl Shape {
    /// If this shape is a rectangle, returns a reference to it.
    pub fn rect(&self) -> Option<&Rect> {
        match self {
            Self::Rect(r) => Some(r),
            _ => None,
        }
    }

    /// If this shape is a polygon, returns a reference to it.
    pub fn polygon(&self) -> Option<&Polygon> {
        match self {
            Self::Polygon(p) => Some(p),
            _ => None,
        }
    }

    /// Returns `true` if `p` lies within the shape.
    ///
    /// Points on a rectangle's boundary are inside; for polygons only
    /// interior points are.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Self::Rect(r) => r.contains_point(p),
            Self::Polygon(poly) => poly.contains(p),
        }
    }

    /// The shape's vertices, as a polygon outline.
    pub fn to_points(&self) -> Vec<Point> {
        match self {
            Self::Rect(r) => r.corners().to_vec(),
            Self::Polygon(p) => p.points().to_vec(),
        }
    }
}

impl Bbox for Shape {
    fn bbox(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => r.bbox(),
            Self::Polygon(p) => p.bbox(),
        }
    }
}

impl TranslateMut for Shape {
    fn translate_mut(&mut self, p: Point) {
        match self {
            Self::Rect(r) => r.translate_mut(p),
            Self::Polygon(poly) => poly.translate_mut(p),
        }
    }
}

impl TransformMut for Shape {
    fn transform_mut(&mut self, trans: Transformation) {
        match self {
            Self::Rect(r) => r.transform_mut(trans),
            Self::Polygon(p) => p.transform_mut(trans),
        }
    }
}

impl From<Rect> for Shape {
    fn from(value: Rect) -> Self {
        Self::Rect(value)
    }
}

impl From<Polygon> for Shape {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}
