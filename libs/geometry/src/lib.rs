//! 2-D geometric primitives for integrated circuit layout.
//!
//! All coordinates are integers in layout database units (DBU).
//!
//! # Examples
//!
//! Create a [rectangle](crate::rect::Rect):
//!
//! ```
//! # use geometry::prelude::*;
//! let rect = Rect::from_sides(10, 20, 30, 40);
//! assert_eq!(rect.width(), 20);
//! ```
#![warn(missing_docs)]

pub mod bbox;
pub mod point;
pub mod polygon;
pub mod prelude;
pub mod rect;
pub mod shape;
pub mod snap;
pub mod transform;

#[cfg(test)]
mod tests;

/// Wraps the given angle to the interval `[0, 360)` degrees.
///
/// # Examples
///
/// ```
/// use geometry::wrap_angle;
///
/// assert_eq!(wrap_angle(-90.), 270.);
/// assert_eq!(wrap_angle(450.), 90.);
/// ```
pub fn wrap_angle(angle: f64) -> f64 {
    ((angle % 360.) + 360.) % 360.
}
