// src/utils/arrays.rs

//! A row-major two dimensional array.
//!
//! Picture components, transform subbands and padded wavelet buffers are all
//! stored in an [`Array2D`]. Values are indexed as `(y, x)` to match the
//! `a[y][x]` convention of the pseudocode.

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Array2D<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone> Array2D<T> {
    /// Creates a `width` x `height` array filled with `fill`.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Array2D {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    /// Builds an array from equal-length rows. Returns `None` when the rows
    /// are ragged.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        Some(Array2D {
            width,
            height,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// A copy of column `x`.
    pub fn column(&self, x: usize) -> Vec<T> {
        (0..self.height).map(|y| self[(y, x)].clone()).collect()
    }

    pub fn set_column(&mut self, x: usize, values: &[T]) {
        for (y, v) in values.iter().enumerate().take(self.height) {
            self[(y, x)] = v.clone();
        }
    }

    /// The `width` x `height` region whose top-left corner is `(top, left)`.
    pub fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in top..top + height {
            data.extend_from_slice(&self.row(y)[left..left + width]);
        }
        Array2D {
            width,
            height,
            data,
        }
    }
}

impl<T> Array2D<T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        // chunks(0) panics, so an empty array yields no rows
        self.data.chunks(self.width.max(1)).take(self.height)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.data.iter_mut()
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Array2D<U> {
        Array2D {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T> Index<(usize, usize)> for Array2D<T> {
    type Output = T;

    fn index(&self, (y, x): (usize, usize)) -> &T {
        &self.data[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Array2D<T> {
    fn index_mut(&mut self, (y, x): (usize, usize)) -> &mut T {
        &mut self.data[y * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_is_row_major() {
        let mut a = Array2D::new(3, 2, 0i32);
        a[(1, 2)] = 7;
        assert_eq!(a.row(1), &[0, 0, 7]);
        assert_eq!(a.column(2), vec![0, 7]);
        assert_eq!(a.rows().count(), 2);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(Array2D::from_rows(vec![vec![1, 2], vec![3]]).is_none());
        let a = Array2D::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(a.width(), 2);
        assert_eq!(a[(1, 0)], 3);
    }

    #[test]
    fn test_crop_and_columns() {
        let mut a = Array2D::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]).unwrap();
        assert_eq!(
            a.crop(1, 1, 2, 2),
            Array2D::from_rows(vec![vec![5, 6], vec![8, 9]]).unwrap()
        );
        a.set_column(0, &[0, 0, 0]);
        assert_eq!(a.column(0), vec![0, 0, 0]);
        assert_eq!(a.map(|v| v * 2)[(2, 2)], 18);
    }

    #[test]
    fn test_empty() {
        let a: Array2D<u8> = Array2D::new(0, 0, 0);
        assert!(a.is_empty());
        assert_eq!(a.rows().count(), 0);
    }
}
