//! Compressed sparse row matrix for event × location fields.
//!
//! Only stored entries are ever visited, so a zero cell stays unstored through
//! every transform. Entries that become zero are dropped by
//! [`CsrMatrix::eliminate_zeros`].
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurgeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Row `r` owns `indices[indptr[r]..indptr[r + 1]]`. Length `n_rows + 1`.
    pub indptr: Vec<usize>,
    /// Column of each stored entry, ascending within a row.
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

/// One row's stored entries with writable values.
pub struct RowMut<'a> {
    pub row: usize,
    pub cols: &'a [usize],
    pub values: &'a mut [f64],
}

impl CsrMatrix {
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from `(row, col, value)` triplets. Duplicates are summed and
    /// explicit zeros are not stored.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        let mut sorted: Vec<(usize, usize, f64)> = Vec::with_capacity(triplets.len());
        for &(r, c, v) in triplets {
            if r >= n_rows {
                return Err(SurgeError::ShapeMismatch { what: "triplet row", expected: n_rows, actual: r });
            }
            if c >= n_cols {
                return Err(SurgeError::ShapeMismatch { what: "triplet column", expected: n_cols, actual: c });
            }
            sorted.push((r, c, v));
        }
        sorted.sort_by_key(|&(r, c, _)| (r, c));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices = Vec::with_capacity(sorted.len());
        let mut data: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in sorted {
            if last == Some((r, c)) {
                if let Some(d) = data.last_mut() {
                    *d += v;
                }
                continue;
            }
            indptr[r + 1] += 1;
            indices.push(c);
            data.push(v);
            last = Some((r, c));
        }
        for r in 0..n_rows {
            indptr[r + 1] += indptr[r];
        }
        let mut m = Self { n_rows, n_cols, indptr, indices, data };
        m.eliminate_zeros();
        Ok(m)
    }

    /// Build from a dense row-major slice.
    pub fn from_dense(n_rows: usize, n_cols: usize, dense: &[f64]) -> Result<Self> {
        if dense.len() != n_rows * n_cols {
            return Err(SurgeError::ShapeMismatch {
                what: "dense matrix",
                expected: n_rows * n_cols,
                actual: dense.len(),
            });
        }
        let triplets: Vec<(usize, usize, f64)> = dense
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, &v)| (i / n_cols, i % n_cols, v))
            .collect();
        Self::from_triplets(n_rows, n_cols, &triplets)
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Fraction of cells holding a stored entry.
    pub fn density(&self) -> f64 {
        let cells = self.n_rows * self.n_cols;
        if cells == 0 {
            0.0
        } else {
            self.nnz() as f64 / cells as f64
        }
    }

    /// Value at (row, col), zero when unstored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (cols, values) = self.row(row);
        match cols.binary_search(&col) {
            Ok(k) => values[k],
            Err(_) => 0.0,
        }
    }

    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let span = self.indptr[row]..self.indptr[row + 1];
        (&self.indices[span.clone()], &self.data[span])
    }

    /// Split the storage into one writable view per row.
    pub fn rows_mut(&mut self) -> Vec<RowMut<'_>> {
        let mut out = Vec::with_capacity(self.n_rows);
        let mut cols: &[usize] = &self.indices;
        let mut values: &mut [f64] = &mut self.data;
        for row in 0..self.n_rows {
            let len = self.indptr[row + 1] - self.indptr[row];
            let (c_head, c_tail) = cols.split_at(len);
            let (v_head, v_tail) = std::mem::take(&mut values).split_at_mut(len);
            out.push(RowMut { row, cols: c_head, values: v_head });
            cols = c_tail;
            values = v_tail;
        }
        out
    }

    /// Apply `f(row, col, value)` to every stored entry.
    pub fn map_stored<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize, f64) -> f64,
    {
        for row in 0..self.n_rows {
            for k in self.indptr[row]..self.indptr[row + 1] {
                self.data[k] = f(row, self.indices[k], self.data[k]);
            }
        }
    }

    /// Same sparsity pattern, every stored value replaced by `value`.
    pub fn with_pattern_value(&self, value: f64) -> Self {
        Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            data: vec![value; self.data.len()],
        }
    }

    pub fn same_pattern(&self, other: &CsrMatrix) -> bool {
        self.n_rows == other.n_rows
            && self.n_cols == other.n_cols
            && self.indptr == other.indptr
            && self.indices == other.indices
    }

    /// Transposed copy; stored entries map one-to-one.
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.n_cols + 1];
        for &c in &self.indices {
            counts[c + 1] += 1;
        }
        for c in 0..self.n_cols {
            counts[c + 1] += counts[c];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0usize; self.nnz()];
        let mut data = vec![0f64; self.nnz()];
        for row in 0..self.n_rows {
            for k in self.indptr[row]..self.indptr[row + 1] {
                let c = self.indices[k];
                let dst = next[c];
                indices[dst] = row;
                data[dst] = self.data[k];
                next[c] += 1;
            }
        }
        Self { n_rows: self.n_cols, n_cols: self.n_rows, indptr, indices, data }
    }

    /// Drop stored entries equal to zero.
    pub fn eliminate_zeros(&mut self) {
        let keep: Vec<bool> = self.data.iter().map(|&v| v != 0.0).collect();
        self.retain_where(&keep);
    }

    /// Keep entry `k` only where `keep[k]`. `keep` has one flag per stored
    /// entry; used to prune a companion matrix sharing this pattern.
    pub fn retain_where(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.nnz());
        let mut write = 0usize;
        let mut new_indptr = vec![0usize; self.n_rows + 1];
        for row in 0..self.n_rows {
            for k in self.indptr[row]..self.indptr[row + 1] {
                if keep[k] {
                    self.indices[write] = self.indices[k];
                    self.data[write] = self.data[k];
                    write += 1;
                }
            }
            new_indptr[row + 1] = write;
        }
        self.indices.truncate(write);
        self.data.truncate(write);
        self.indptr = new_indptr;
    }

    /// Structural checks used when a matrix arrives from storage.
    pub fn validate(&self) -> Result<()> {
        if self.indptr.len() != self.n_rows + 1 {
            return Err(SurgeError::ShapeMismatch {
                what: "indptr",
                expected: self.n_rows + 1,
                actual: self.indptr.len(),
            });
        }
        if self.indices.len() != self.data.len() || self.indptr[self.n_rows] != self.data.len() {
            return Err(SurgeError::ShapeMismatch {
                what: "stored entries",
                expected: self.indptr[self.n_rows],
                actual: self.data.len(),
            });
        }
        if self.indptr[0] != 0 {
            return Err(SurgeError::MalformedMatrix("indptr must start at 0"));
        }
        if self.indptr.windows(2).any(|w| w[1] < w[0]) {
            return Err(SurgeError::MalformedMatrix("indptr must be non-decreasing"));
        }
        if let Some(&bad) = self.indices.iter().find(|&&c| c >= self.n_cols) {
            return Err(SurgeError::ShapeMismatch { what: "column index", expected: self.n_cols, actual: bad });
        }
        for row in 0..self.n_rows {
            let (cols, _) = self.row(row);
            if cols.windows(2).any(|w| w[1] <= w[0]) {
                return Err(SurgeError::MalformedMatrix("column indices must strictly increase within a row"));
            }
        }
        Ok(())
    }
}
