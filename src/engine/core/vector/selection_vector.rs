use crate::engine::errors::VectorError;

/// Indirection array of row indices into the vectors of a chunk.
///
/// Operators filter by rewriting the selection instead of moving column data.
/// The length of the selection is the number of live rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionVector {
    indices: Vec<usize>,
}

impl SelectionVector {
    pub fn identity(count: usize) -> Self {
        Self {
            indices: (0..count).collect(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
        }
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// O(1). `i` must be below `len()`.
    #[inline]
    pub fn get_index(&self, i: usize) -> usize {
        self.indices[i]
    }

    #[inline]
    pub fn set_index(&mut self, i: usize, row: usize) {
        self.indices[i] = row;
    }

    #[inline]
    pub fn push(&mut self, row: usize) {
        self.indices.push(row);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn truncate(&mut self, count: usize) {
        self.indices.truncate(count);
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn is_identity(&self) -> bool {
        self.indices.iter().enumerate().all(|(i, &row)| i == row)
    }

    /// Composes `self` over `inner`: position `i` of the result addresses
    /// `self[inner[i]]`.
    pub fn slice(&self, inner: &SelectionVector) -> SelectionVector {
        SelectionVector {
            indices: inner.iter().map(|i| self.indices[i]).collect(),
        }
    }

    pub fn verify(&self, capacity: usize) -> Result<(), VectorError> {
        match self.indices.iter().find(|&&row| row >= capacity) {
            Some(&index) => Err(VectorError::IndexOutOfBounds { index, capacity }),
            None => Ok(()),
        }
    }
}

impl FromIterator<usize> for SelectionVector {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}
