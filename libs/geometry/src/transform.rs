//! Manhattan transformations and the traits for applying them.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// A Manhattan rotation: 0, 90, 180, or 270 degrees counterclockwise.
#[derive(
    Debug, Clone, Copy, Default, Hash, Eq, Ord, PartialOrd, PartialEq, Serialize, Deserialize,
)]
pub enum Rotation {
    /// 0 degrees; no rotation.
    #[default]
    R0,
    /// 90 degrees counterclockwise.
    R90,
    /// 180 degrees counterclockwise.
    R180,
    /// 270 degrees counterclockwise.
    R270,
}

impl Rotation {
    /// The angle of this rotation, in degrees.
    pub fn degrees(&self) -> f64 {
        match self {
            Rotation::R0 => 0.,
            Rotation::R90 => 90.,
            Rotation::R180 => 180.,
            Rotation::R270 => 270.,
        }
    }

    fn matrix(&self) -> [[i64; 2]; 2] {
        match self {
            Rotation::R0 => [[1, 0], [0, 1]],
            Rotation::R90 => [[0, -1], [1, 0]],
            Rotation::R180 => [[-1, 0], [0, -1]],
            Rotation::R270 => [[0, 1], [-1, 0]],
        }
    }
}

/// Indicates that an angle was not a valid Manhattan angle.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("angle {0} is not a multiple of 90 degrees")]
pub struct NonManhattanAngleError(pub f64);

impl TryFrom<f64> for Rotation {
    type Error = NonManhattanAngleError;

    /// Converts an angle in degrees to a [`Rotation`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Rotation::try_from(-90.), Ok(Rotation::R270));
    /// assert!(Rotation::try_from(45.).is_err());
    /// ```
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let wrapped = crate::wrap_angle(value);
        if (wrapped - wrapped.round()).abs() > 1e-9 {
            return Err(NonManhattanAngleError(value));
        }
        match wrapped.round() as i64 {
            0 | 360 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            _ => Err(NonManhattanAngleError(value)),
        }
    }
}

/// A translation, rotation, and/or reflection of geometry.
///
/// A point `p` maps to `mat * p + b`. Reflection (about the x-axis) is applied
/// before rotation, matching GDSII `STRANS` semantics.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    mat: [[i64; 2]; 2],
    b: Point,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

fn matmul(a: &[[i64; 2]; 2], b: &[[i64; 2]; 2]) -> [[i64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

fn matvec(a: &[[i64; 2]; 2], p: Point) -> Point {
    Point::new(a[0][0] * p.x + a[0][1] * p.y, a[1][0] * p.x + a[1][1] * p.y)
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object unmodified.
    pub const fn identity() -> Self {
        Self {
            mat: [[1, 0], [0, 1]],
            b: Point::zero(),
        }
    }

    /// Returns a translation by `(x,y)`.
    pub const fn translate(x: i64, y: i64) -> Self {
        Self {
            mat: [[1, 0], [0, 1]],
            b: Point::new(x, y),
        }
    }

    /// Returns a counterclockwise rotation about the origin.
    pub fn rotate(angle: Rotation) -> Self {
        Self {
            mat: angle.matrix(),
            b: Point::zero(),
        }
    }

    /// Returns a reflection about the x-axis.
    pub const fn reflect_vert() -> Self {
        Self {
            mat: [[1, 0], [0, -1]],
            b: Point::zero(),
        }
    }

    /// Creates a transformation that reflects (if requested), rotates, then translates.
    pub fn from_opts(offset: Point, reflect_vert: bool, angle: Rotation) -> Self {
        let mut mat = angle.matrix();
        if reflect_vert {
            mat[0][1] = -mat[0][1];
            mat[1][1] = -mat[1][1];
        }
        Self { mat, b: offset }
    }

    /// Creates the cascade of `parent` and `child`.
    ///
    /// The result first applies `child`, then `parent`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let t = Transformation::cascade(
    ///     Transformation::translate(1, 1),
    ///     Transformation::reflect_vert(),
    /// );
    /// assert_eq!(Point::new(1, 1).transform(t), Point::new(2, 0));
    /// ```
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        Self {
            mat: matmul(&parent.mat, &child.mat),
            b: matvec(&parent.mat, child.b) + parent.b,
        }
    }

    /// The translation applied by this transformation.
    pub fn offset_point(&self) -> Point {
        self.b
    }

    /// Whether this transformation reflects geometry about the x-axis.
    pub fn reflects_vert(&self) -> bool {
        self.mat[0][0] * self.mat[1][1] - self.mat[0][1] * self.mat[1][0] < 0
    }

    /// The rotation applied after any reflection.
    pub fn rotation(&self) -> Rotation {
        match (self.mat[0][0], self.mat[1][0]) {
            (1, 0) => Rotation::R0,
            (0, 1) => Rotation::R90,
            (-1, 0) => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// Applies this transformation to a single point.
    pub fn apply_point(&self, p: Point) -> Point {
        matvec(&self.mat, p) + self.b
    }
}

/// A trait for specifying how an object is changed by a [`Transformation`].
pub trait TransformMut {
    /// Applies the transformation `trans` in place.
    fn transform_mut(&mut self, trans: Transformation);
}

impl<T: TransformMut> TransformMut for Vec<T> {
    fn transform_mut(&mut self, trans: Transformation) {
        for item in self.iter_mut() {
            item.transform_mut(trans);
        }
    }
}

/// Owned counterpart of [`TransformMut`].
pub trait Transform: TransformMut + Sized {
    /// Returns a copy of `self` transformed by `trans`.
    #[inline]
    fn transform(mut self, trans: Transformation) -> Self {
        self.transform_mut(trans);
        self
    }
}

impl<T: TransformMut + Sized> Transform for T {}

/// A trait for specifying how a shape is translated by a [`Point`].
pub trait TranslateMut {
    /// Translates the shape by [`Point`] in place.
    fn translate_mut(&mut self, p: Point);
}

impl<T: TranslateMut> TranslateMut for Vec<T> {
    fn translate_mut(&mut self, p: Point) {
        for item in self.iter_mut() {
            item.translate_mut(p);
        }
    }
}

/// Owned counterpart of [`TranslateMut`].
pub trait Translate: TranslateMut + Sized {
    /// Returns a copy of `self` translated by `p`.
    #[inline]
    fn translate(mut self, p: Point) -> Self {
        self.translate_mut(p);
        self
    }
}

impl<T: TranslateMut + Sized> Translate for T {}
