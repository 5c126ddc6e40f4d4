//! Extent-indexed buffers.
//!
//! A [`Volume`] is the caller-owned storage the dispatch machinery reads
//! from and writes into. It is laid out x-fastest: the cell at index
//! `[x, y, z]` lives at `(z - z0) * ny * nx + (y - y0) * nx + (x - x0)`.
//!
//! Workers never receive `&mut Volume`. Outputs are shared as a
//! [`SharedVolume`] and each piece writes through a [`RegionWriter`] that
//! refuses any index outside the piece's region. Because the dispatchers
//! only hand out pairwise disjoint regions, no two threads ever touch the
//! same cell.

use crate::core::error::{DispatchError, OperationError, OperationResult};
use crate::core::extent::{Extent, AXES};
use std::marker::PhantomData;

/// A dense buffer covering one extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    extent: Extent,
    data: Vec<T>,
}

impl<T: Clone> Volume<T> {
    /// Allocate a volume covering `extent`, every cell set to `fill`.
    pub fn new(extent: Extent, fill: T) -> Self {
        Self {
            extent,
            data: vec![fill; extent.cell_count()],
        }
    }
}

impl<T> Volume<T> {
    /// Wrap existing data. The length must match the extent's cell count.
    pub fn from_vec(extent: Extent, data: Vec<T>) -> Result<Self, DispatchError> {
        if data.len() != extent.cell_count() {
            return Err(DispatchError::invalid(
                "volume",
                format!(
                    "extent {} holds {} cells but {} values were supplied",
                    extent,
                    extent.cell_count(),
                    data.len()
                ),
            ));
        }
        Ok(Self { extent, data })
    }

    /// Build a volume by evaluating `f` at every index.
    pub fn from_fn(extent: Extent, f: impl FnMut([i32; AXES]) -> T) -> Self {
        let data = extent.indices().map(f).collect();
        Self { extent, data }
    }

    /// The extent this volume was allocated for.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Flat offset of an index, `None` when outside the volume.
    pub fn offset(&self, index: [i32; AXES]) -> Option<usize> {
        offset_in(&self.extent, index)
    }

    /// Read one cell.
    pub fn get(&self, index: [i32; AXES]) -> Option<&T> {
        self.offset(index).map(|i| &self.data[i])
    }

    /// Write one cell. Returns `false` when the index is outside the volume.
    pub fn set(&mut self, index: [i32; AXES], value: T) -> bool {
        match self.offset(index) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// One z-slice as a contiguous row-major slice.
    pub fn slice(&self, z: i32) -> Option<&[T]> {
        let (z0, z1) = self.extent.axis(2);
        if z < z0 || z > z1 {
            return None;
        }
        let plane = self.extent.len(0) * self.extent.len(1);
        let start = (z - z0) as usize * plane;
        Some(&self.data[start..start + plane])
    }

    /// All cells in x-fastest order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the volume and return its cells.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

fn offset_in(extent: &Extent, index: [i32; AXES]) -> Option<usize> {
    if !extent.contains(index) {
        return None;
    }
    let [nx, ny, _] = extent.dimensions();
    let (x0, _) = extent.axis(0);
    let (y0, _) = extent.axis(1);
    let (z0, _) = extent.axis(2);
    let x = (index[0] - x0) as usize;
    let y = (index[1] - y0) as usize;
    let z = (index[2] - z0) as usize;
    Some((z * ny + y) * nx + x)
}

/// An output volume shared between the workers of one dispatch.
///
/// Holds the exclusive borrow of the caller's volume for the duration of
/// the call; cells are only reachable through [`RegionWriter`]s.
pub struct SharedVolume<'a, T> {
    ptr: *mut T,
    len: usize,
    extent: Extent,
    _borrow: PhantomData<&'a mut [T]>,
}

// SAFETY: the pointer comes from an exclusive borrow that outlives 'a, and
// every write goes through a RegionWriter whose region is disjoint from all
// other live writers. Moving T between threads requires T: Send.
unsafe impl<T: Send> Send for SharedVolume<'_, T> {}
unsafe impl<T: Send> Sync for SharedVolume<'_, T> {}

impl<'a, T> SharedVolume<'a, T> {
    pub(crate) fn new(volume: &'a mut Volume<T>) -> Self {
        Self {
            ptr: volume.data.as_mut_ptr(),
            len: volume.data.len(),
            extent: volume.extent,
            _borrow: PhantomData,
        }
    }

    /// The extent of the underlying volume.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// A writer restricted to `region`.
    ///
    /// Crate-private: the caller must guarantee no other live writer's
    /// region intersects `region`.
    pub(crate) fn region_writer(&self, region: Extent) -> RegionWriter<'_, T> {
        RegionWriter {
            volume: self,
            region,
        }
    }
}

/// Write access to one piece's region of an output volume.
pub struct RegionWriter<'v, T> {
    volume: &'v SharedVolume<'v, T>,
    region: Extent,
}

impl<T> RegionWriter<'_, T> {
    /// The region this writer may touch.
    pub fn region(&self) -> Extent {
        self.region
    }

    fn checked_offset(&self, index: [i32; AXES]) -> OperationResult<usize> {
        if !self.region.contains(index) {
            return Err(OperationError::OutOfRegion {
                index,
                region: self.region,
            });
        }
        let offset = offset_in(&self.volume.extent, index).ok_or(OperationError::OutOfRegion {
            index,
            region: self.volume.extent,
        })?;
        debug_assert!(offset < self.volume.len);
        Ok(offset)
    }

    /// Write one cell of the region.
    pub fn set(&mut self, index: [i32; AXES], value: T) -> OperationResult<()> {
        let offset = self.checked_offset(index)?;
        // SAFETY: offset is in bounds and inside this writer's region, which
        // no other writer overlaps.
        unsafe { *self.volume.ptr.add(offset) = value };
        Ok(())
    }

    /// Evaluate `f` at every index of the region and store the result.
    pub fn fill_with(&mut self, mut f: impl FnMut([i32; AXES]) -> T) -> OperationResult<()> {
        let region = self.region;
        for index in region.indices() {
            self.set(index, f(index))?;
        }
        Ok(())
    }
}

impl<T: Copy> RegionWriter<'_, T> {
    /// Read back a cell of the region.
    pub fn get(&self, index: [i32; AXES]) -> OperationResult<T> {
        let offset = self.checked_offset(index)?;
        // SAFETY: see `set`; reads stay inside the exclusive region.
        Ok(unsafe { *self.volume.ptr.add(offset) })
    }
}
