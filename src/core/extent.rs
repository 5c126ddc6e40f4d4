//! Inclusive index-space boxes.
//!
//! An [`Extent`] is the unit every other part of the crate talks about: the
//! region a caller asks to be processed, the piece one worker owns, and the
//! bounds a [`Volume`](crate::core::volume::Volume) was allocated for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of axes in an extent.
pub const AXES: usize = 3;

/// An inclusive, axis-aligned box in a 3-dimensional index space.
///
/// Stored as `[min0, max0, min1, max1, min2, max2]`. Axis 0 varies fastest
/// in memory, axis 2 slowest. Any axis with `min > max` makes the whole
/// extent empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent(pub [i32; 6]);

impl Extent {
    /// The canonical empty extent `(0, -1, 0, -1, 0, -1)`.
    pub const EMPTY: Extent = Extent([0, -1, 0, -1, 0, -1]);

    /// Create an extent from its six bounds.
    pub const fn new(bounds: [i32; 6]) -> Self {
        Self(bounds)
    }

    /// Create a single-slice 2D extent (`axis 2 = [0, 0]`).
    pub const fn plane(min0: i32, max0: i32, min1: i32, max1: i32) -> Self {
        Self([min0, max0, min1, max1, 0, 0])
    }

    /// Create an extent covering `dims` cells starting at the origin.
    pub fn from_dimensions(dims: [usize; AXES]) -> Self {
        let max = |d: usize| d as i32 - 1;
        Self([0, max(dims[0]), 0, max(dims[1]), 0, max(dims[2])])
    }

    /// The raw bounds.
    pub fn bounds(&self) -> [i32; 6] {
        self.0
    }

    /// `(min, max)` of one axis.
    pub fn axis(&self, axis: usize) -> (i32, i32) {
        (self.0[axis * 2], self.0[axis * 2 + 1])
    }

    /// Return a copy with one axis replaced.
    pub fn with_axis(mut self, axis: usize, min: i32, max: i32) -> Self {
        self.0[axis * 2] = min;
        self.0[axis * 2 + 1] = max;
        self
    }

    /// Whether any axis is inverted (`max < min`).
    pub fn is_empty(&self) -> bool {
        (0..AXES).any(|axis| {
            let (min, max) = self.axis(axis);
            max < min
        })
    }

    /// Number of indices along one axis (0 when inverted).
    pub fn len(&self, axis: usize) -> usize {
        let (min, max) = self.axis(axis);
        if max < min {
            0
        } else {
            (max as i64 - min as i64 + 1) as usize
        }
    }

    /// Cell counts along every axis.
    pub fn dimensions(&self) -> [usize; AXES] {
        [self.len(0), self.len(1), self.len(2)]
    }

    /// Total number of cells (0 for an empty extent).
    pub fn cell_count(&self) -> usize {
        self.dimensions().iter().product()
    }

    /// Whether the index lies inside this extent.
    pub fn contains(&self, index: [i32; AXES]) -> bool {
        (0..AXES).all(|axis| {
            let (min, max) = self.axis(axis);
            index[axis] >= min && index[axis] <= max
        })
    }

    /// Whether `other` lies entirely inside this extent.
    ///
    /// An empty `other` is contained in everything.
    pub fn contains_extent(&self, other: &Extent) -> bool {
        if other.is_empty() {
            return true;
        }
        (0..AXES).all(|axis| {
            let (min, max) = self.axis(axis);
            let (omin, omax) = other.axis(axis);
            omin >= min && omax <= max
        })
    }

    /// Overlapping region of two extents, `None` when they are disjoint.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let mut out = [0; 6];
        for axis in 0..AXES {
            let (a0, a1) = self.axis(axis);
            let (b0, b1) = other.axis(axis);
            out[axis * 2] = a0.max(b0);
            out[axis * 2 + 1] = a1.min(b1);
        }
        let out = Extent(out);
        (!out.is_empty()).then_some(out)
    }

    /// Whether the two extents share at least one cell.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.intersection(other).is_some()
    }

    /// Smallest extent containing both. Empty inputs are ignored.
    pub fn bounding_union(&self, other: &Extent) -> Extent {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut out = [0; 6];
        for axis in 0..AXES {
            let (a0, a1) = self.axis(axis);
            let (b0, b1) = other.axis(axis);
            out[axis * 2] = a0.min(b0);
            out[axis * 2 + 1] = a1.max(b1);
        }
        Extent(out)
    }

    /// Iterate over every index in x-fastest order.
    pub fn indices(&self) -> impl Iterator<Item = [i32; AXES]> + '_ {
        let [x0, x1, y0, y1, z0, z1] = self.0;
        (z0..=z1).flat_map(move |z| (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| [x, y, z])))
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<[i32; 6]> for Extent {
    fn from(bounds: [i32; 6]) -> Self {
        Self(bounds)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "({}, {}, {}, {}, {}, {})", a, b, c, d, e, g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_extent() {
        assert!(Extent::EMPTY.is_empty());
        assert_eq!(Extent::EMPTY.cell_count(), 0);
        assert!(Extent::new([0, 3, 5, 4, 0, 0]).is_empty());
        assert!(!Extent::plane(0, 0, 0, 0).is_empty());
    }

    #[test]
    fn test_dimensions() {
        let extent = Extent::new([-2, 2, 0, 9, 3, 3]);
        assert_eq!(extent.dimensions(), [5, 10, 1]);
        assert_eq!(extent.cell_count(), 50);
        assert_eq!(Extent::from_dimensions([4, 3, 2]), Extent::new([0, 3, 0, 2, 0, 1]));
    }

    #[test]
    fn test_intersection_and_union() {
        let a = Extent::new([0, 9, 0, 9, 0, 0]);
        let b = Extent::new([5, 14, 8, 20, 0, 0]);
        assert_eq!(a.intersection(&b), Some(Extent::new([5, 9, 8, 9, 0, 0])));
        assert_eq!(a.bounding_union(&b), Extent::new([0, 14, 0, 20, 0, 0]));

        let c = Extent::new([10, 12, 0, 9, 0, 0]);
        assert!(!a.intersects(&c));
        assert_eq!(a.bounding_union(&Extent::EMPTY), a);
    }

    #[test]
    fn test_contains() {
        let a = Extent::new([0, 9, 0, 9, 0, 2]);
        assert!(a.contains([9, 0, 2]));
        assert!(!a.contains([10, 0, 0]));
        assert!(a.contains_extent(&Extent::new([1, 2, 3, 4, 0, 0])));
        assert!(!a.contains_extent(&Extent::new([1, 2, 3, 4, 0, 3])));
        assert!(a.contains_extent(&Extent::EMPTY));
    }

    #[test]
    fn test_indices_order() {
        let ext = Extent::new([0, 1, 0, 1, 0, 0]);
        let all: Vec<_> = ext.indices().collect();
        assert_eq!(all, vec![[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0]]);
        assert_eq!(Extent::EMPTY.indices().count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Extent::new([0, 99, 0, 49, 0, 0]).to_string(), "(0, 99, 0, 49, 0, 0)");
    }
}
