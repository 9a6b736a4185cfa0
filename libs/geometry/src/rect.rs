//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::Point;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    /// The lower-left corner.
    p0: Point,
    /// The upper-right corner.
    p1: Point,
}

impl Rect {
    /// Creates a new rectangle from any two opposite corner points.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::new(Point::new(30, 20), Point::new(15, 40));
    /// assert_eq!(rect, Rect::from_sides(15, 20, 30, 40));
    /// ```
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from all 4 sides (left, bottom, right, top).
    ///
    /// # Panics
    ///
    /// This method panics if `left > right` or if `bot > top`.
    #[inline]
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        assert!(
            left <= right,
            "Rect::from_sides requires that left ({left}) <= right ({right})"
        );
        assert!(
            bot <= top,
            "Rect::from_sides requires that bot ({bot}) <= top ({top})"
        );
        Self {
            p0: Point::new(left, bot),
            p1: Point::new(right, top),
        }
    }

    /// Creates a rectangle from all 4 sides, returning `None` if the rectangle would be empty.
    #[inline]
    pub fn from_sides_option(left: i64, bot: i64, right: i64, top: i64) -> Option<Self> {
        if left > right || bot > top {
            None
        } else {
            Some(Self::from_sides(left, bot, right, top))
        }
    }

    /// Creates a `w` by `h` rectangle centered on `center`.
    ///
    /// Odd dimensions cannot be centered exactly; the extra unit goes to the
    /// upper/right side.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_center_dims(Point::zero(), 100, 51);
    /// assert_eq!(rect, Rect::from_sides(-50, -25, 50, 26));
    /// ```
    pub fn from_center_dims(center: Point, w: i64, h: i64) -> Self {
        let left = center.x - w.div_euclid(2);
        let bot = center.y - h.div_euclid(2);
        Self::from_sides(left, bot, left + w, bot + h)
    }

    /// Returns the bottom y-coordinate of the rectangle.
    #[inline]
    pub const fn bot(&self) -> i64 {
        self.p0.y
    }

    /// Returns the top y-coordinate of the rectangle.
    #[inline]
    pub const fn top(&self) -> i64 {
        self.p1.y
    }

    /// Returns the left x-coordinate of the rectangle.
    #[inline]
    pub const fn left(&self) -> i64 {
        self.p0.x
    }

    /// Returns the right x-coordinate of the rectangle.
    #[inline]
    pub const fn right(&self) -> i64 {
        self.p1.x
    }

    /// Returns the lower-left corner.
    #[inline]
    pub const fn lower_left(&self) -> Point {
        self.p0
    }

    /// Returns the upper-right corner.
    #[inline]
    pub const fn upper_right(&self) -> Point {
        self.p1
    }

    /// Returns the horizontal width of the rectangle.
    #[inline]
    pub const fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// Returns the vertical height of the rectangle.
    #[inline]
    pub const fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// Returns the area of the rectangle.
    #[inline]
    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Returns the center point of the rectangle, rounded down.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_sides(0, 0, 55, 45);
    /// assert_eq!(rect.center(), Point::new(27, 22));
    /// ```
    pub const fn center(&self) -> Point {
        Point::new(
            (self.p0.x + self.p1.x).div_euclid(2),
            (self.p0.y + self.p1.y).div_euclid(2),
        )
    }

    /// Expands the rectangle by `amount` on all sides.
    ///
    /// Negative amounts shrink the rectangle.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_sides(0, 0, 100, 200);
    /// assert_eq!(rect.expand_all(20), Rect::from_sides(-20, -20, 120, 220));
    /// ```
    pub fn expand_all(&self, amount: i64) -> Self {
        Self::from_sides(
            self.p0.x - amount,
            self.p0.y - amount,
            self.p1.x + amount,
            self.p1.y + amount,
        )
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: Rect) -> Self {
        Self {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }

    /// Returns the overlap of `self` and `other`, or `None` if they do not touch.
    pub fn intersection(&self, other: Rect) -> Option<Self> {
        Self::from_sides_option(
            self.p0.x.max(other.p0.x),
            self.p0.y.max(other.p0.y),
            self.p1.x.min(other.p1.x),
            self.p1.y.min(other.p1.y),
        )
    }

    /// Returns `true` if `p` lies inside or on the boundary of the rectangle.
    pub fn contains_point(&self, p: Point) -> bool {
        self.p0.x <= p.x && p.x <= self.p1.x && self.p0.y <= p.y && p.y <= self.p1.y
    }

    /// Returns `true` if `other` lies entirely within `self`.
    pub fn contains_rect(&self, other: Rect) -> bool {
        self.contains_point(other.p0) && self.contains_point(other.p1)
    }

    /// The four corners in counterclockwise order, starting at the lower left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.p0,
            Point::new(self.p1.x, self.p0.y),
            self.p1,
            Point::new(self.p0.x, self.p1.y),
        ]
    }
}

impl Bbox for Rect {
    fn bbox(&self) -> Option<Rect> {
        Some(*self)
    }
}

impl TranslateMut for Rect {
    fn translate_mut(&mut self, p: Point) {
        self.p0.translate_mut(p);
        self.p1.translate_mut(p);
    }
}

impl TransformMut for Rect {
    fn transform_mut(&mut self, trans: Transformation) {
        *self = Rect::new(trans.apply_point(self.p0), trans.apply_point(self.p1));
    }
}
