use std::cmp::Ordering;

use crate::engine::core::vector::VectorData;
use crate::engine::types::{PhysicalType, ScalarValue, total_cmp_f32, total_cmp_f64};

/// Fixed-width primitive stored in vectors, packed rows and column blocks.
///
/// Generic code over this trait is monomorphized per physical type, so the
/// per-row work in scans and matches carries no dynamic dispatch.
pub trait NativeType: Copy + Default + PartialEq + Send + Sync + 'static {
    const PHYSICAL: PhysicalType;
    const WIDTH: usize;

    fn slice(data: &VectorData) -> Option<&[Self]>;
    fn slice_mut(data: &mut VectorData) -> Option<&mut Vec<Self>>;
    fn write_le(self, out: &mut [u8]);
    fn read_le(bytes: &[u8]) -> Self;
    fn total_cmp(&self, other: &Self) -> Ordering;
    fn into_scalar(self) -> ScalarValue;
    fn from_scalar(value: &ScalarValue) -> Option<Self>;
}

macro_rules! native_number {
    ($t:ty, $phys:ident, $variant:ident, $scalar:ident, |$a:ident, $b:ident| $cmp:expr) => {
        impl NativeType for $t {
            const PHYSICAL: PhysicalType = PhysicalType::$phys;
            const WIDTH: usize = std::mem::size_of::<$t>();

            #[inline]
            fn slice(data: &VectorData) -> Option<&[Self]> {
                match data {
                    VectorData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            #[inline]
            fn slice_mut(data: &mut VectorData) -> Option<&mut Vec<Self>> {
                match data {
                    VectorData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            #[inline]
            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(buf)
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                let ($a, $b) = (*self, *other);
                $cmp
            }

            fn into_scalar(self) -> ScalarValue {
                ScalarValue::$scalar(self)
            }

            fn from_scalar(value: &ScalarValue) -> Option<Self> {
                match value {
                    ScalarValue::$scalar(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

native_number!(i8, I8, I8, TinyInt, |a, b| a.cmp(&b));
native_number!(i16, I16, I16, SmallInt, |a, b| a.cmp(&b));
native_number!(i32, I32, I32, Integer, |a, b| a.cmp(&b));
native_number!(i64, I64, I64, BigInt, |a, b| a.cmp(&b));
native_number!(u64, U64, U64, UBigInt, |a, b| a.cmp(&b));
native_number!(f32, F32, F32, Real, |a, b| total_cmp_f32(a, b));
native_number!(f64, F64, F64, Double, |a, b| total_cmp_f64(a, b));

impl NativeType for bool {
    const PHYSICAL: PhysicalType = PhysicalType::Bool;
    const WIDTH: usize = 1;

    #[inline]
    fn slice(data: &VectorData) -> Option<&[Self]> {
        match data {
            VectorData::Bool(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    #[inline]
    fn slice_mut(data: &mut VectorData) -> Option<&mut Vec<Self>> {
        match data {
            VectorData::Bool(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn into_scalar(self) -> ScalarValue {
        ScalarValue::Boolean(self)
    }

    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}
