use crate::engine::core::vector::{NativeType, SelectionVector, ValidityMask};
use crate::engine::errors::VectorError;
use crate::engine::types::{LogicalType, PhysicalType, ScalarValue};

/// Slot of a list vector: a window into the child vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListEntry {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone)]
pub struct ListData {
    pub entries: Vec<ListEntry>,
    pub child: Box<Vector>,
    pub child_len: usize,
}

/// Typed buffer behind a vector. One variant per physical type.
#[derive(Debug, Clone)]
pub enum VectorData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    VarBytes(Vec<String>),
    List(ListData),
}

impl VectorData {
    fn allocate(logical_type: &LogicalType, capacity: usize) -> Self {
        match logical_type {
            LogicalType::Boolean => VectorData::Bool(vec![false; capacity]),
            LogicalType::TinyInt => VectorData::I8(vec![0; capacity]),
            LogicalType::SmallInt => VectorData::I16(vec![0; capacity]),
            LogicalType::Integer => VectorData::I32(vec![0; capacity]),
            LogicalType::BigInt => VectorData::I64(vec![0; capacity]),
            LogicalType::UBigInt => VectorData::U64(vec![0; capacity]),
            LogicalType::Real => VectorData::F32(vec![0.0; capacity]),
            LogicalType::Double => VectorData::F64(vec![0.0; capacity]),
            LogicalType::Varchar => VectorData::VarBytes(vec![String::new(); capacity]),
            LogicalType::List(child) => VectorData::List(ListData {
                entries: vec![ListEntry::default(); capacity],
                child: Box::new(Vector::new((**child).clone(), capacity)),
                child_len: 0,
            }),
        }
    }

    fn resize(&mut self, capacity: usize) {
        match self {
            VectorData::Bool(v) => v.resize(capacity, false),
            VectorData::I8(v) => v.resize(capacity, 0),
            VectorData::I16(v) => v.resize(capacity, 0),
            VectorData::I32(v) => v.resize(capacity, 0),
            VectorData::I64(v) => v.resize(capacity, 0),
            VectorData::U64(v) => v.resize(capacity, 0),
            VectorData::F32(v) => v.resize(capacity, 0.0),
            VectorData::F64(v) => v.resize(capacity, 0.0),
            VectorData::VarBytes(v) => v.resize(capacity, String::new()),
            VectorData::List(list) => list.entries.resize(capacity, ListEntry::default()),
        }
    }
}

/// Fixed-capacity columnar buffer of one logical type plus its validity.
#[derive(Debug, Clone)]
pub struct Vector {
    logical_type: LogicalType,
    data: VectorData,
    validity: ValidityMask,
    capacity: usize,
}

impl Vector {
    /// Allocates a typed buffer of `capacity` slots, all valid.
    pub fn new(logical_type: LogicalType, capacity: usize) -> Self {
        let data = VectorData::allocate(&logical_type, capacity);
        Self {
            logical_type,
            data,
            validity: ValidityMask::new(capacity),
            capacity,
        }
    }

    pub fn from_values(logical_type: LogicalType, values: &[ScalarValue]) -> Result<Self, VectorError> {
        let mut vector = Vector::new(logical_type, values.len());
        for (i, value) in values.iter().enumerate() {
            vector.set_value(i, value)?;
        }
        Ok(vector)
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.logical_type.physical_type()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data(&self) -> &VectorData {
        &self.data
    }

    pub fn validity(&self) -> &ValidityMask {
        &self.validity
    }

    pub fn validity_mut(&mut self) -> &mut ValidityMask {
        &mut self.validity
    }

    #[inline]
    pub fn values<T: NativeType>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    #[inline]
    pub fn values_mut<T: NativeType>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.data).map(|v| v.as_mut_slice())
    }

    pub fn strings(&self) -> Option<&[String]> {
        match &self.data {
            VectorData::VarBytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn strings_mut(&mut self) -> Option<&mut [String]> {
        match &mut self.data {
            VectorData::VarBytes(v) => Some(v.as_mut_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.is_valid(idx)
    }

    pub fn list_entry(&self, idx: usize) -> Option<ListEntry> {
        match &self.data {
            VectorData::List(list) => Some(list.entries[idx]),
            _ => None,
        }
    }

    pub fn list_child(&self) -> Option<&Vector> {
        match &self.data {
            VectorData::List(list) => Some(&list.child),
            _ => None,
        }
    }

    pub fn get_value(&self, idx: usize) -> ScalarValue {
        if !self.validity.is_valid(idx) {
            return ScalarValue::Null;
        }
        match &self.data {
            VectorData::Bool(v) => ScalarValue::Boolean(v[idx]),
            VectorData::I8(v) => ScalarValue::TinyInt(v[idx]),
            VectorData::I16(v) => ScalarValue::SmallInt(v[idx]),
            VectorData::I32(v) => ScalarValue::Integer(v[idx]),
            VectorData::I64(v) => ScalarValue::BigInt(v[idx]),
            VectorData::U64(v) => ScalarValue::UBigInt(v[idx]),
            VectorData::F32(v) => ScalarValue::Real(v[idx]),
            VectorData::F64(v) => ScalarValue::Double(v[idx]),
            VectorData::VarBytes(v) => ScalarValue::Varchar(v[idx].clone()),
            VectorData::List(list) => {
                let entry = list.entries[idx];
                ScalarValue::List(
                    (entry.offset..entry.offset + entry.length)
                        .map(|i| list.child.get_value(i))
                        .collect(),
                )
            }
        }
    }

    pub fn set_value(&mut self, idx: usize, value: &ScalarValue) -> Result<(), VectorError> {
        if idx >= self.capacity {
            return Err(VectorError::IndexOutOfBounds {
                index: idx,
                capacity: self.capacity,
            });
        }
        if value.is_null() {
            self.validity.set_invalid(idx);
            return Ok(());
        }
        let expected = &self.logical_type;
        let mismatch = || VectorError::TypeMismatch {
            expected: expected.clone(),
            found: value.to_string(),
        };
        match (&mut self.data, value) {
            (VectorData::Bool(v), ScalarValue::Boolean(x)) => v[idx] = *x,
            (VectorData::I8(v), ScalarValue::TinyInt(x)) => v[idx] = *x,
            (VectorData::I16(v), ScalarValue::SmallInt(x)) => v[idx] = *x,
            (VectorData::I32(v), ScalarValue::Integer(x)) => v[idx] = *x,
            (VectorData::I64(v), ScalarValue::BigInt(x)) => v[idx] = *x,
            (VectorData::U64(v), ScalarValue::UBigInt(x)) => v[idx] = *x,
            (VectorData::F32(v), ScalarValue::Real(x)) => v[idx] = *x,
            (VectorData::F64(v), ScalarValue::Double(x)) => v[idx] = *x,
            (VectorData::VarBytes(v), ScalarValue::Varchar(x)) => v[idx].clone_from(x),
            (VectorData::List(list), ScalarValue::List(items)) => {
                let offset = list.child_len;
                let needed = offset + items.len();
                if needed > list.child.capacity() {
                    let grown = needed.max(list.child.capacity() * 2);
                    list.child.resize(grown);
                }
                for (i, item) in items.iter().enumerate() {
                    list.child.set_value(offset + i, item)?;
                }
                list.child_len = needed;
                list.entries[idx] = ListEntry {
                    offset,
                    length: items.len(),
                };
            }
            _ => return Err(mismatch()),
        }
        self.validity.set_valid(idx);
        Ok(())
    }

    pub fn set_null(&mut self, idx: usize) {
        self.validity.set_invalid(idx);
    }

    /// Copies slot `src_idx` of `src` into slot `dst_idx`. Both vectors must
    /// share a logical type.
    pub fn copy_slot(&mut self, dst_idx: usize, src: &Vector, src_idx: usize) -> Result<(), VectorError> {
        if dst_idx >= self.capacity {
            return Err(VectorError::IndexOutOfBounds {
                index: dst_idx,
                capacity: self.capacity,
            });
        }
        if !src.is_valid(src_idx) {
            self.validity.set_invalid(dst_idx);
            return Ok(());
        }
        let copied = match (&mut self.data, &src.data) {
            (VectorData::Bool(d), VectorData::Bool(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::I8(d), VectorData::I8(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::I16(d), VectorData::I16(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::I32(d), VectorData::I32(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::I64(d), VectorData::I64(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::U64(d), VectorData::U64(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::F32(d), VectorData::F32(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::F64(d), VectorData::F64(s)) => {
                d[dst_idx] = s[src_idx];
                true
            }
            (VectorData::VarBytes(d), VectorData::VarBytes(s)) => {
                d[dst_idx].clone_from(&s[src_idx]);
                true
            }
            _ => false,
        };
        if !copied {
            return self.set_value(dst_idx, &src.get_value(src_idx));
        }
        self.validity.set_valid(dst_idx);
        Ok(())
    }

    /// Copies the rows of `src` picked by `sel` into slots `len..`, growing
    /// the buffer when it runs out. Returns the new length.
    pub fn append_from(&mut self, len: usize, src: &Vector, sel: &SelectionVector) -> Result<usize, VectorError> {
        if src.logical_type != self.logical_type {
            return Err(VectorError::TypeMismatch {
                expected: self.logical_type.clone(),
                found: src.logical_type.to_string(),
            });
        }
        sel.verify(src.capacity)?;
        let needed = len + sel.len();
        if needed > self.capacity {
            self.resize(needed.max(self.capacity * 2));
        }
        for (i, row) in sel.iter().enumerate() {
            self.copy_slot(len + i, src, row)?;
        }
        Ok(needed)
    }

    /// Clears validity and variable-length payloads so the buffer can be
    /// reused for the next chunk.
    pub fn reset(&mut self) {
        self.validity.reset();
        match &mut self.data {
            VectorData::VarBytes(v) => v.iter_mut().for_each(String::clear),
            VectorData::List(list) => {
                list.child.reset();
                list.child_len = 0;
            }
            _ => {}
        }
    }

    pub fn resize(&mut self, capacity: usize) {
        self.data.resize(capacity);
        self.validity.resize(capacity);
        self.capacity = capacity;
    }
}
