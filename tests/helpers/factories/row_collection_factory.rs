use std::sync::Arc;

use crate::engine::core::row::{RowCollection, RowLayout};
use crate::engine::types::{LogicalType, ScalarValue};

pub struct RowCollectionFactory {
    types: Vec<LogicalType>,
    rows: Vec<Vec<ScalarValue>>,
}

impl RowCollectionFactory {
    pub fn new() -> Self {
        Self {
            types: vec![LogicalType::Integer],
            rows: Vec::new(),
        }
    }

    pub fn with_types(mut self, types: Vec<LogicalType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_row(mut self, row: Vec<ScalarValue>) -> Self {
        self.rows.push(row);
        self
    }

    /// One row per value, for single-column layouts.
    pub fn with_values(mut self, values: Vec<ScalarValue>) -> Self {
        self.rows.extend(values.into_iter().map(|v| vec![v]));
        self
    }

    pub fn create(self) -> RowCollection {
        let layout = Arc::new(RowLayout::new(self.types).expect("layout types must be supported"));
        let mut rows = RowCollection::new(layout);
        for row in &self.rows {
            rows.append_row(row).expect("row must match the layout");
        }
        rows
    }
}
