use std::ops::Range;
use std::sync::Arc;

use crate::engine::core::row::RowLayout;
use crate::engine::core::vector::{DataChunk, NativeType, Vector};
use crate::engine::errors::{MatchError, VectorError};
use crate::engine::types::{PhysicalType, ScalarValue};

/// Integer address of a packed row: its index in the arena.
pub type RowPointer = usize;

/// Arena of packed rows sharing one layout.
///
/// Row `p` occupies `rows[p * width..(p + 1) * width]`. Strings live in a
/// separate heap and are referenced by `(offset: u32, len: u32)`.
#[derive(Debug, Clone)]
pub struct RowCollection {
    layout: Arc<RowLayout>,
    rows: Vec<u8>,
    heap: Vec<u8>,
    count: usize,
}

impl RowCollection {
    pub fn new(layout: Arc<RowLayout>) -> Self {
        Self {
            layout,
            rows: Vec::new(),
            heap: Vec::new(),
            count: 0,
        }
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn heap_size(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn row(&self, ptr: RowPointer) -> &[u8] {
        let width = self.layout.row_width();
        &self.rows[ptr * width..(ptr + 1) * width]
    }

    #[inline]
    pub fn is_valid(&self, ptr: RowPointer, col: usize) -> bool {
        let (byte, bit) = RowLayout::validity_position(col);
        self.row(ptr)[byte] & bit != 0
    }

    #[inline]
    pub fn load<T: NativeType>(&self, ptr: RowPointer, col: usize) -> T {
        T::read_le(&self.row(ptr)[self.layout.offset(col)..])
    }

    #[inline]
    pub fn load_bytes(&self, ptr: RowPointer, col: usize) -> &[u8] {
        let at = self.layout.offset(col);
        let row = self.row(ptr);
        let offset = read_u32(&row[at..]) as usize;
        let len = read_u32(&row[at + 4..]) as usize;
        &self.heap[offset..offset + len]
    }

    pub fn get_value(&self, ptr: RowPointer, col: usize) -> ScalarValue {
        if !self.is_valid(ptr, col) {
            return ScalarValue::Null;
        }
        match self.layout.physical_type(col) {
            PhysicalType::Bool => ScalarValue::Boolean(self.load::<bool>(ptr, col)),
            PhysicalType::I8 => ScalarValue::TinyInt(self.load::<i8>(ptr, col)),
            PhysicalType::I16 => ScalarValue::SmallInt(self.load::<i16>(ptr, col)),
            PhysicalType::I32 => ScalarValue::Integer(self.load::<i32>(ptr, col)),
            PhysicalType::I64 => ScalarValue::BigInt(self.load::<i64>(ptr, col)),
            PhysicalType::U64 => ScalarValue::UBigInt(self.load::<u64>(ptr, col)),
            PhysicalType::F32 => ScalarValue::Real(self.load::<f32>(ptr, col)),
            PhysicalType::F64 => ScalarValue::Double(self.load::<f64>(ptr, col)),
            PhysicalType::VarBytes => {
                ScalarValue::Varchar(String::from_utf8_lossy(self.load_bytes(ptr, col)).into_owned())
            }
            PhysicalType::List => ScalarValue::Null,
        }
    }

    pub fn append_row(&mut self, values: &[ScalarValue]) -> Result<RowPointer, MatchError> {
        if values.len() != self.layout.column_count() {
            return Err(VectorError::ColumnCount {
                expected: self.layout.column_count(),
                actual: values.len(),
            }
            .into());
        }
        let heap_len = self.heap.len();
        let ptr = self.allocate(1);
        for (col, value) in values.iter().enumerate() {
            if value.is_null() {
                continue;
            }
            if !value.fits(&self.layout.types()[col]) {
                self.truncate(ptr, heap_len);
                return Err(VectorError::TypeMismatch {
                    expected: self.layout.types()[col].clone(),
                    found: value.to_string(),
                }
                .into());
            }
            if let Err(e) = self.store_value(ptr, col, value) {
                self.truncate(ptr, heap_len);
                return Err(e);
            }
        }
        Ok(ptr)
    }

    /// Scatters the selected rows of `chunk` into new packed rows.
    pub fn append_chunk(&mut self, chunk: &DataChunk) -> Result<Range<RowPointer>, MatchError> {
        let layout = Arc::clone(&self.layout);
        if chunk.column_count() < layout.column_count() {
            return Err(VectorError::ColumnCount {
                expected: layout.column_count(),
                actual: chunk.column_count(),
            }
            .into());
        }
        for (col, ty) in layout.types().iter().enumerate() {
            if chunk.column(col).logical_type() != ty {
                return Err(VectorError::TypeMismatch {
                    expected: ty.clone(),
                    found: chunk.column(col).logical_type().to_string(),
                }
                .into());
            }
        }

        let count = chunk.cardinality();
        let heap_len = self.heap.len();
        let start = self.allocate(count);
        for col in 0..layout.column_count() {
            let vector = chunk.column(col);
            match layout.physical_type(col) {
                PhysicalType::Bool => self.scatter_fixed::<bool>(vector, chunk, start, col),
                PhysicalType::I8 => self.scatter_fixed::<i8>(vector, chunk, start, col),
                PhysicalType::I16 => self.scatter_fixed::<i16>(vector, chunk, start, col),
                PhysicalType::I32 => self.scatter_fixed::<i32>(vector, chunk, start, col),
                PhysicalType::I64 => self.scatter_fixed::<i64>(vector, chunk, start, col),
                PhysicalType::U64 => self.scatter_fixed::<u64>(vector, chunk, start, col),
                PhysicalType::F32 => self.scatter_fixed::<f32>(vector, chunk, start, col),
                PhysicalType::F64 => self.scatter_fixed::<f64>(vector, chunk, start, col),
                PhysicalType::VarBytes => {
                    if let Err(e) = self.scatter_strings(vector, chunk, start, col) {
                        self.truncate(start, heap_len);
                        return Err(e);
                    }
                }
                PhysicalType::List => {
                    self.truncate(start, heap_len);
                    return Err(MatchError::UnsupportedType(layout.types()[col].clone()));
                }
            }
        }
        Ok(start..start + count)
    }

    /// Reads one column of the given rows back into a vector.
    pub fn gather(&self, col: usize, ptrs: &[RowPointer]) -> Result<Vector, VectorError> {
        let ty = self.layout.types()[col].clone();
        let mut out = Vector::new(ty, ptrs.len());
        for (i, &ptr) in ptrs.iter().enumerate() {
            out.set_value(i, &self.get_value(ptr, col))?;
        }
        Ok(out)
    }

    fn allocate(&mut self, count: usize) -> RowPointer {
        let start = self.count;
        let width = self.layout.row_width();
        // All validity bits start cleared; stores set them.
        self.rows.resize((start + count) * width, 0);
        self.count += count;
        start
    }

    fn truncate(&mut self, count: usize, heap_len: usize) {
        self.rows.truncate(count * self.layout.row_width());
        self.heap.truncate(heap_len);
        self.count = count;
    }

    fn set_valid(&mut self, ptr: RowPointer, col: usize) {
        let (byte, bit) = RowLayout::validity_position(col);
        let width = self.layout.row_width();
        self.rows[ptr * width + byte] |= bit;
    }

    fn slot_mut(&mut self, ptr: RowPointer, col: usize) -> &mut [u8] {
        let width = self.layout.row_width();
        let at = ptr * width + self.layout.offset(col);
        &mut self.rows[at..(ptr + 1) * width]
    }

    fn store_value(&mut self, ptr: RowPointer, col: usize, value: &ScalarValue) -> Result<(), MatchError> {
        match value {
            ScalarValue::Boolean(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::TinyInt(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::SmallInt(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::Integer(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::BigInt(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::UBigInt(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::Real(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::Double(v) => v.write_le(self.slot_mut(ptr, col)),
            ScalarValue::Varchar(s) => self.store_bytes(ptr, col, s.as_bytes())?,
            ScalarValue::Null | ScalarValue::List(_) => return Ok(()),
        }
        self.set_valid(ptr, col);
        Ok(())
    }

    fn store_bytes(&mut self, ptr: RowPointer, col: usize, bytes: &[u8]) -> Result<(), MatchError> {
        let (offset, len) = heap_slot(self.heap.len(), bytes.len())?;
        self.heap.extend_from_slice(bytes);
        let slot = self.slot_mut(ptr, col);
        slot[..4].copy_from_slice(&offset.to_le_bytes());
        slot[4..8].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn scatter_fixed<T: NativeType>(&mut self, vector: &Vector, chunk: &DataChunk, start: RowPointer, col: usize) {
        let Some(values) = vector.values::<T>() else {
            return;
        };
        for i in 0..chunk.cardinality() {
            let idx = chunk.row_index(i);
            if vector.is_valid(idx) {
                values[idx].write_le(self.slot_mut(start + i, col));
                self.set_valid(start + i, col);
            }
        }
    }

    fn scatter_strings(
        &mut self,
        vector: &Vector,
        chunk: &DataChunk,
        start: RowPointer,
        col: usize,
    ) -> Result<(), MatchError> {
        let Some(values) = vector.strings() else {
            return Ok(());
        };
        for i in 0..chunk.cardinality() {
            let idx = chunk.row_index(i);
            if vector.is_valid(idx) {
                self.store_bytes(start + i, col, values[idx].as_bytes())?;
                self.set_valid(start + i, col);
            }
        }
        Ok(())
    }
}

/// Offset and length of `add` bytes appended to a heap of `heap_len`
/// bytes. The heap end must stay addressable by a `u32` offset.
pub(crate) fn heap_slot(heap_len: usize, add: usize) -> Result<(u32, u32), MatchError> {
    let end = heap_len.saturating_add(add);
    if u32::try_from(end).is_err() {
        return Err(MatchError::HeapOverflow { len: end });
    }
    Ok((heap_len as u32, add as u32))
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}
