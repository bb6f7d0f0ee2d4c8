use crate::engine::core::vector::{SelectionVector, Vector};
use crate::engine::errors::VectorError;
use crate::engine::types::{LogicalType, ScalarValue};

/// A batch of rows in column-major form.
///
/// Columns are addressed by position and share one capacity. The optional
/// selection maps logical rows onto physical slots; `None` is the identity.
#[derive(Debug, Clone)]
pub struct DataChunk {
    columns: Vec<Vector>,
    cardinality: usize,
    capacity: usize,
    selection: Option<SelectionVector>,
}

impl DataChunk {
    pub fn new(types: &[LogicalType], capacity: usize) -> Self {
        Self {
            columns: types
                .iter()
                .map(|t| Vector::new(t.clone(), capacity))
                .collect(),
            cardinality: 0,
            capacity,
            selection: None,
        }
    }

    pub fn from_vectors(columns: Vec<Vector>, cardinality: usize) -> Result<Self, VectorError> {
        let capacity = columns.iter().map(Vector::capacity).min().unwrap_or(cardinality);
        if cardinality > capacity {
            return Err(VectorError::CapacityExceeded { capacity });
        }
        Ok(Self {
            columns,
            cardinality,
            capacity,
            selection: None,
        })
    }

    pub fn from_rows(types: &[LogicalType], rows: &[Vec<ScalarValue>]) -> Result<Self, VectorError> {
        let mut chunk = DataChunk::new(types, rows.len());
        for row in rows {
            chunk.append_row(row)?;
        }
        Ok(chunk)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> &Vector {
        &self.columns[idx]
    }

    pub fn column_mut(&mut self, idx: usize) -> &mut Vector {
        &mut self.columns[idx]
    }

    pub fn columns(&self) -> &[Vector] {
        &self.columns
    }

    pub fn types(&self) -> Vec<LogicalType> {
        self.columns.iter().map(|c| c.logical_type().clone()).collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of logical rows, i.e. rows reachable through the selection.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Sets the logical row count without reallocating. Any selection is
    /// dropped: the first `n` physical slots become the live rows.
    pub fn set_cardinality(&mut self, n: usize) -> Result<(), VectorError> {
        if n > self.capacity {
            return Err(VectorError::CapacityExceeded { capacity: self.capacity });
        }
        self.cardinality = n;
        self.selection = None;
        Ok(())
    }

    pub fn selection(&self) -> Option<&SelectionVector> {
        self.selection.as_ref()
    }

    /// Physical slot of logical row `i`.
    #[inline]
    pub fn row_index(&self, i: usize) -> usize {
        match &self.selection {
            Some(sel) => sel.get_index(i),
            None => i,
        }
    }

    /// Filters the chunk in place: `sel` indexes the current logical rows.
    /// Column data is never moved.
    pub fn slice(&mut self, sel: &SelectionVector) -> Result<(), VectorError> {
        sel.verify(self.cardinality)?;
        let composed = match &self.selection {
            Some(current) => current.slice(sel),
            None => sel.clone(),
        };
        self.cardinality = composed.len();
        self.selection = Some(composed);
        Ok(())
    }

    pub fn get_value(&self, col: usize, row: usize) -> ScalarValue {
        self.columns[col].get_value(self.row_index(row))
    }

    pub fn row(&self, row: usize) -> Vec<ScalarValue> {
        let idx = self.row_index(row);
        self.columns.iter().map(|c| c.get_value(idx)).collect()
    }

    pub fn rows(&self) -> Vec<Vec<ScalarValue>> {
        (0..self.cardinality).map(|r| self.row(r)).collect()
    }

    /// Appends one row after the last physical slot. A sliced chunk is
    /// flattened first so the new row lands behind the selected ones.
    pub fn append_row(&mut self, row: &[ScalarValue]) -> Result<(), VectorError> {
        if row.len() != self.columns.len() {
            return Err(VectorError::ColumnCount {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        if self.selection.is_some() {
            *self = self.flatten()?;
        }
        if self.cardinality >= self.capacity {
            let grown = (self.capacity * 2).max(1);
            for column in &mut self.columns {
                column.resize(grown);
            }
            self.capacity = grown;
        }
        let slot = self.cardinality;
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.set_value(slot, value)?;
        }
        self.cardinality += 1;
        Ok(())
    }

    /// Copies the selected rows into a fresh chunk with an identity layout.
    pub fn flatten(&self) -> Result<DataChunk, VectorError> {
        let capacity = self.capacity.max(self.cardinality);
        let mut out = DataChunk::new(&self.types(), capacity);
        for (dst, src) in out.columns.iter_mut().zip(&self.columns) {
            for i in 0..self.cardinality {
                dst.copy_slot(i, src, self.row_index(i))?;
            }
        }
        out.cardinality = self.cardinality;
        Ok(out)
    }

    /// Keeps only the given columns, in the given order.
    pub fn project(&self, column_ids: &[usize]) -> DataChunk {
        DataChunk {
            columns: column_ids.iter().map(|&c| self.columns[c].clone()).collect(),
            cardinality: self.cardinality,
            capacity: self.capacity,
            selection: self.selection.clone(),
        }
    }

    pub fn reset(&mut self) {
        for column in &mut self.columns {
            column.reset();
        }
        self.cardinality = 0;
        self.selection = None;
    }
}
