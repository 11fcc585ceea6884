//! Padded dense arrays
//!
//! A thin wrapper around `ndarray` arrays. Storage is allocated at a memory shape,
//! and a logical shape that is no larger on any axis selects the cells operations
//! read and write. The cells between the two are padding: they are owned by the
//! caller, expected to be zero, and never read by the engine.

use crate::error::{MaskingError, Result};
use ndarray::{
    Array, ArrayView, ArrayView1, ArrayViewMut, ArrayViewMut1, Axis, Dimension, IntoDimension,
    Ix2, Ix3, NdIndex, Slice,
};

/// `f32` array with a logical and a memory shape
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedArray<D: Dimension> {
    storage: Array<f32, D>,
    shape: D,
}

/// (samples, channels) array
pub type Array2 = PaddedArray<Ix2>;

/// (samples, masked channels, masker channels) array
pub type Array3 = PaddedArray<Ix3>;

impl<D: Dimension> PaddedArray<D> {
    /// Create a zero-filled array without padding
    pub fn zeros<Sh: IntoDimension<Dim = D>>(shape: Sh) -> Self {
        let shape = shape.into_dimension();
        Self {
            storage: Array::zeros(shape.clone()),
            shape,
        }
    }

    /// Create a zero-filled array whose memory is padded to `memory_shape`
    ///
    /// # Errors
    /// Returns `InvalidShape` if any memory axis is smaller than the logical axis.
    pub fn with_padding<Sh: IntoDimension<Dim = D>>(shape: Sh, memory_shape: Sh) -> Result<Self> {
        let shape = shape.into_dimension();
        let memory_shape = memory_shape.into_dimension();
        if let Some(axis) = (0..shape.ndim()).find(|&axis| memory_shape[axis] < shape[axis]) {
            return Err(MaskingError::invalid_shape(format!(
                "memory shape {:?} is smaller than logical shape {:?} on axis {}",
                memory_shape.slice(),
                shape.slice(),
                axis
            )));
        }
        Ok(Self {
            storage: Array::zeros(memory_shape),
            shape,
        })
    }

    /// Wrap an existing unpadded row-major buffer
    ///
    /// # Errors
    /// Returns `InvalidShape` if `data.len()` does not match the shape.
    pub fn from_vec<Sh: IntoDimension<Dim = D>>(shape: Sh, data: Vec<f32>) -> Result<Self> {
        let shape = shape.into_dimension();
        let len = data.len();
        let storage = Array::from_shape_vec(shape.clone(), data).map_err(|err| {
            MaskingError::invalid_shape(format!(
                "shape {:?} cannot hold {} values: {}",
                shape.slice(),
                len,
                err
            ))
        })?;
        Ok(Self { storage, shape })
    }

    /// Number of logical cells
    pub fn len(&self) -> usize {
        self.shape.size()
    }

    /// Whether the logical shape holds no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backing array, padding included
    pub fn storage(&self) -> &Array<f32, D> {
        &self.storage
    }

    /// Mutable view of the backing array, padding included
    pub fn storage_mut(&mut self) -> ArrayViewMut<'_, f32, D> {
        self.storage.view_mut()
    }

    /// Logical cells
    pub fn view(&self) -> ArrayView<'_, f32, D> {
        let mut view = self.storage.view();
        for axis in 0..self.shape.ndim() {
            view.slice_axis_inplace(Axis(axis), Slice::from(..self.shape[axis]));
        }
        view
    }

    /// Mutable logical cells
    pub fn view_mut(&mut self) -> ArrayViewMut<'_, f32, D> {
        let mut view = self.storage.view_mut();
        for axis in 0..self.shape.ndim() {
            view.slice_axis_inplace(Axis(axis), Slice::from(..self.shape[axis]));
        }
        view
    }

    /// Value of a logical cell, `None` when out of range
    pub fn get<I: NdIndex<D>>(&self, index: I) -> Option<f32> {
        self.view().get(index).copied()
    }

    /// Mutable reference to a logical cell, `None` when out of range
    pub fn get_mut<Sh: IntoDimension<Dim = D>>(&mut self, index: Sh) -> Option<&mut f32> {
        let index = index.into_dimension();
        if self.contains(&index) {
            self.storage.get_mut(index)
        } else {
            None
        }
    }

    /// Set every logical cell to `value`, leaving padding untouched
    pub fn fill(&mut self, value: f32) {
        self.view_mut().fill(value);
    }

    /// Whether every padding cell is zero
    pub fn padding_is_zero(&self) -> bool {
        self.storage.indexed_iter().all(|(index, &value)| {
            value == 0.0 || self.contains(&index.into_dimension())
        })
    }

    /// Whether `self` and `other` are backed by the same allocation
    pub fn shares_storage<E: Dimension>(&self, other: &PaddedArray<E>) -> bool {
        !self.storage.is_empty()
            && !other.storage.is_empty()
            && std::ptr::eq(self.storage.as_ptr(), other.storage.as_ptr())
    }

    /// Verify that two arrays have identical logical shapes
    pub(crate) fn ensure_same_shape(&self, other: &Self, what: &str) -> Result<()> {
        if self.shape == other.shape {
            Ok(())
        } else {
            Err(MaskingError::invalid_shape(format!(
                "{}: shape {:?} does not match {:?}",
                what,
                other.shape.slice(),
                self.shape.slice()
            )))
        }
    }

    fn contains(&self, index: &D) -> bool {
        index
            .slice()
            .iter()
            .zip(self.shape.slice())
            .all(|(position, bound)| position < bound)
    }
}

impl PaddedArray<Ix2> {
    /// Build an unpadded array from equal-length rows
    ///
    /// # Errors
    /// Returns `InvalidShape` if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().position(|row| row.len() != columns) {
            return Err(MaskingError::invalid_shape(format!(
                "row {} has {} columns, expected {}",
                row,
                rows[row].len(),
                columns
            )));
        }
        Self::from_vec([rows.len(), columns], rows.concat())
    }

    /// Logical shape
    pub fn shape(&self) -> [usize; 2] {
        [self.shape[0], self.shape[1]]
    }

    /// Allocated shape, including padding
    pub fn memory_shape(&self) -> [usize; 2] {
        let (rows, columns) = self.storage.dim();
        [rows, columns]
    }

    /// Number of rows (samples)
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns (channels)
    pub fn columns(&self) -> usize {
        self.shape[1]
    }

    /// Logical cells of row `row`
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    pub fn row(&self, row: usize) -> ArrayView1<'_, f32> {
        self.view().index_axis_move(Axis(0), row)
    }

    /// Mutable logical cells of row `row`
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    pub fn row_mut(&mut self, row: usize) -> ArrayViewMut1<'_, f32> {
        self.view_mut().index_axis_move(Axis(0), row)
    }
}

impl PaddedArray<Ix3> {
    /// Logical shape
    pub fn shape(&self) -> [usize; 3] {
        [self.shape[0], self.shape[1], self.shape[2]]
    }

    /// Allocated shape, including padding
    pub fn memory_shape(&self) -> [usize; 3] {
        let (outer, middle, inner) = self.storage.dim();
        [outer, middle, inner]
    }

    /// Logical cells along the last axis at `[outer, middle, ..]`
    ///
    /// # Panics
    /// Panics if either index is out of range.
    pub fn lane(&self, outer: usize, middle: usize) -> ArrayView1<'_, f32> {
        self.view()
            .index_axis_move(Axis(0), outer)
            .index_axis_move(Axis(0), middle)
    }

    /// Mutable logical cells along the last axis at `[outer, middle, ..]`
    ///
    /// # Panics
    /// Panics if either index is out of range.
    pub fn lane_mut(&mut self, outer: usize, middle: usize) -> ArrayViewMut1<'_, f32> {
        self.view_mut()
            .index_axis_move(Axis(0), outer)
            .index_axis_move(Axis(0), middle)
    }
}
