use crate::engine::core::vector::DataChunk;
use crate::engine::types::{LogicalType, ScalarValue};

/// Deterministic value of type `ty` for row `i`.
pub fn value_for(ty: &LogicalType, i: usize) -> ScalarValue {
    match ty {
        LogicalType::Boolean => ScalarValue::Boolean(i % 2 == 0),
        LogicalType::TinyInt => ScalarValue::TinyInt((i % 100) as i8),
        LogicalType::SmallInt => ScalarValue::SmallInt((i % 30_000) as i16),
        LogicalType::Integer => ScalarValue::Integer(i as i32),
        LogicalType::BigInt => ScalarValue::BigInt(i as i64),
        LogicalType::UBigInt => ScalarValue::UBigInt(i as u64),
        LogicalType::Real => ScalarValue::Real(i as f32 * 0.5),
        LogicalType::Double => ScalarValue::Double(i as f64 * 0.5),
        LogicalType::Varchar => ScalarValue::Varchar(format!("v{}", i)),
        LogicalType::List(_) => ScalarValue::Null,
    }
}

/// Builds data chunks for tests. Defaults to `(INTEGER, VARCHAR)` and no
/// rows; the first `with_column` call replaces the defaults.
pub struct ChunkFactory {
    types: Vec<LogicalType>,
    custom_types: bool,
    rows: Vec<Vec<ScalarValue>>,
}

impl ChunkFactory {
    pub fn new() -> Self {
        Self {
            types: vec![LogicalType::Integer, LogicalType::Varchar],
            custom_types: false,
            rows: Vec::new(),
        }
    }

    pub fn with_types(mut self, types: Vec<LogicalType>) -> Self {
        self.types = types;
        self.custom_types = true;
        self
    }

    pub fn with_column(mut self, ty: LogicalType) -> Self {
        if !self.custom_types {
            self.types.clear();
            self.custom_types = true;
        }
        self.types.push(ty);
        self
    }

    pub fn with_row(mut self, row: Vec<ScalarValue>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Vec<ScalarValue>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Appends rows `from..from + count` filled through `value_for`.
    pub fn with_sequential(mut self, from: usize, count: usize) -> Self {
        for i in from..from + count {
            let row = self.types.iter().map(|t| value_for(t, i)).collect();
            self.rows.push(row);
        }
        self
    }

    pub fn types(&self) -> &[LogicalType] {
        &self.types
    }

    pub fn create(self) -> DataChunk {
        DataChunk::from_rows(&self.types, &self.rows).expect("rows must match the chunk types")
    }
}
