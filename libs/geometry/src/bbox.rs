//! Axis-aligned rectangular bounding boxes.

use crate::rect::Rect;

/// A geometric shape that has a bounding box.
pub trait Bbox {
    /// Computes the axis-aligned rectangular bounding box.
    ///
    /// If empty, this method should return `None`.
    fn bbox(&self) -> Option<Rect>;

    /// Computes the bounding box, panicking if the object is empty.
    ///
    /// # Panics
    ///
    /// Panics if [`Bbox::bbox`] returns `None`.
    fn bbox_rect(&self) -> Rect {
        self.bbox().expect("expected bounding box to be non-empty")
    }
}

impl<T: Bbox> Bbox for &T {
    fn bbox(&self) -> Option<Rect> {
        T::bbox(*self)
    }
}

impl<T: Bbox> Bbox for [T] {
    fn bbox(&self) -> Option<Rect> {
        self.iter().fold(None, |acc, item| {
            match (acc, item.bbox()) {
                (Some(a), Some(b)) => Some(a.union(b)),
                (a, b) => a.or(b),
            }
        })
    }
}

impl<T: Bbox> Bbox for Vec<T> {
    fn bbox(&self) -> Option<Rect> {
        self.as_slice().bbox()
    }
}

impl<T: Bbox> Bbox for Option<T> {
    fn bbox(&self) -> Option<Rect> {
        self.as_ref().and_then(|x| x.bbox())
    }
}
