//! Polygons.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::Point;
use crate::rect::Rect;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// A simple polygon, stored as a list of vertices.
///
/// The closing edge from the last vertex back to the first is implied.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon with the given vertices.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let triangle = Polygon::from_verts(vec![
    ///     Point::new(0, 0),
    ///     Point::new(10, 0),
    ///     Point::new(0, 10),
    /// ]);
    /// assert_eq!(triangle.points().len(), 3);
    /// ```
    pub fn from_verts(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a regular octagon with side length `side` centered at `center`.
    ///
    /// Four of the edges are axis-aligned; the octagon's width and height are
    /// both `side * (1 + sqrt(2))`.
    pub fn regular_octagon(center: Point, side: i64) -> Self {
        let radius = side as f64 / (2. * (PI / 8.).sin());
        Self::regular(center, radius, 8, 22.5)
    }

    /// Approximates a circle of `radius` around `center`.
    ///
    /// One vertex is placed every `angle_resolution_deg` degrees, starting at
    /// angle zero.
    ///
    /// # Panics
    ///
    /// Panics if `angle_resolution_deg` is not positive.
    pub fn circle(center: Point, radius: i64, angle_resolution_deg: f64) -> Self {
        assert!(
            angle_resolution_deg > 0.,
            "circle angle resolution must be positive"
        );
        let n = (360. / angle_resolution_deg) as usize;
        Self::regular(center, radius as f64, n.max(3), 0.)
    }

    fn regular(center: Point, radius: f64, n: usize, start_deg: f64) -> Self {
        let step = 360. / n as f64;
        let points = (0..n)
            .map(|i| {
                let theta = (start_deg + i as f64 * step).to_radians();
                Point::new(
                    center.x + (radius * theta.cos()).round() as i64,
                    center.y + (radius * theta.sin()).round() as i64,
                )
            })
            .collect();
        Self { points }
    }

    /// Extrudes a centre-line path of the given `width` into a polygon.
    ///
    /// Interior vertices use miter joins; the ends are cut square with no
    /// extension. Consecutive duplicate points are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let path = Polygon::from_path(&[Point::new(0, 0), Point::new(100, 0)], 20);
    /// assert_eq!(path.bbox_rect(), Rect::from_sides(0, -10, 100, 10));
    /// ```
    pub fn from_path(points: &[Point], width: i64) -> Self {
        let mut pts: Vec<Point> = Vec::with_capacity(points.len());
        for &p in points {
            if pts.last() != Some(&p) {
                pts.push(p);
            }
        }
        if pts.len() < 2 {
            return Self::default();
        }

        let hw = width as f64 / 2.;
        let normals: Vec<(f64, f64)> = pts
            .windows(2)
            .map(|w| {
                let dx = (w[1].x - w[0].x) as f64;
                let dy = (w[1].y - w[0].y) as f64;
                let len = dx.hypot(dy);
                (-dy / len, dx / len)
            })
            .collect();

        let mut left = Vec::with_capacity(pts.len());
        let mut right = Vec::with_capacity(pts.len());
        for (i, p) in pts.iter().enumerate() {
            let (nx, ny) = if i == 0 {
                let n = normals[0];
                (n.0 * hw, n.1 * hw)
            } else if i == pts.len() - 1 {
                let n = normals[i - 1];
                (n.0 * hw, n.1 * hw)
            } else {
                let (a, b) = (normals[i - 1], normals[i]);
                let (mx, my) = (a.0 + b.0, a.1 + b.1);
                let mlen = mx.hypot(my);
                if mlen < 1e-12 {
                    // Path doubles back on itself.
                    (a.0 * hw, a.1 * hw)
                } else {
                    let (ux, uy) = (mx / mlen, my / mlen);
                    let scale = hw / (ux * a.0 + uy * a.1);
                    (ux * scale, uy * scale)
                }
            };
            left.push(Point::new(
                p.x + nx.round() as i64,
                p.y + ny.round() as i64,
            ));
            right.push(Point::new(
                p.x - nx.round() as i64,
                p.y - ny.round() as i64,
            ));
        }
        right.reverse();
        left.extend(right);
        Self { points: left }
    }

    /// The vertices of the polygon.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the polygon, returning its vertices.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Returns the bottom y-coordinate of the polygon.
    ///
    /// # Panics
    ///
    /// Panics if the polygon has no vertices.
    pub fn bot(&self) -> i64 {
        self.bbox_rect().bot()
    }

    /// Returns the top y-coordinate of the polygon.
    pub fn top(&self) -> i64 {
        self.bbox_rect().top()
    }

    /// Returns the left x-coordinate of the polygon.
    pub fn left(&self) -> i64 {
        self.bbox_rect().left()
    }

    /// Returns the right x-coordinate of the polygon.
    pub fn right(&self) -> i64 {
        self.bbox_rect().right()
    }

    /// Twice the signed area of the polygon (positive if counterclockwise).
    pub fn signed_area_x2(&self) -> i64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum()
    }

    /// Returns `true` if `p` lies strictly inside the polygon (even-odd rule).
    pub fn contains(&self, p: Point) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.y > p.y) != (b.y > p.y) {
                // x-coordinate of the edge at height p.y, compared without division.
                let lhs = (p.x - a.x) as i128 * (b.y - a.y) as i128;
                let rhs = (b.x - a.x) as i128 * (p.y - a.y) as i128;
                if (b.y > a.y && lhs < rhs) || (b.y < a.y && lhs > rhs) {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

impl Bbox for Polygon {
    fn bbox(&self) -> Option<Rect> {
        let first = *self.points.first()?;
        let (mut l, mut b, mut r, mut t) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            l = l.min(p.x);
            b = b.min(p.y);
            r = r.max(p.x);
            t = t.max(p.y);
        }
        Some(Rect::from_sides(l, b, r, t))
    }
}

impl From<Rect> for Polygon {
    fn from(value: Rect) -> Self {
        Self::from_verts(value.corners().to_vec())
    }
}

impl TranslateMut for Polygon {
    fn translate_mut(&mut self, p: Point) {
        self.points.translate_mut(p);
    }
}

impl TransformMut for Polygon {
    fn transform_mut(&mut self, trans: Transformation) {
        self.points.transform_mut(trans);
    }
}
