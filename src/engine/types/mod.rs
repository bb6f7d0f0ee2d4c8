use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};


/// SQL-level column type. Drives the physical representation of vectors,
/// packed rows and persisted segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    UBigInt,
    Real,
    Double,
    Varchar,
    List(Box<LogicalType>),
}

impl LogicalType {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            LogicalType::Boolean => PhysicalType::Bool,
            LogicalType::TinyInt => PhysicalType::I8,
            LogicalType::SmallInt => PhysicalType::I16,
            LogicalType::Integer => PhysicalType::I32,
            LogicalType::BigInt => PhysicalType::I64,
            LogicalType::UBigInt => PhysicalType::U64,
            LogicalType::Real => PhysicalType::F32,
            LogicalType::Double => PhysicalType::F64,
            LogicalType::Varchar => PhysicalType::VarBytes,
            LogicalType::List(_) => PhysicalType::List,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, LogicalType::List(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::TinyInt => "TINYINT",
            LogicalType::SmallInt => "SMALLINT",
            LogicalType::Integer => "INTEGER",
            LogicalType::BigInt => "BIGINT",
            LogicalType::UBigInt => "UBIGINT",
            LogicalType::Real => "REAL",
            LogicalType::Double => "DOUBLE",
            LogicalType::Varchar => "VARCHAR",
            LogicalType::List(_) => "LIST",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::List(child) => write!(f, "{}[]", child),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for LogicalType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(child) = s.strip_suffix("[]") {
            return LogicalType::from_str(child).map(|c| LogicalType::List(Box::new(c)));
        }
        match s.to_ascii_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => Ok(LogicalType::Boolean),
            "TINYINT" => Ok(LogicalType::TinyInt),
            "SMALLINT" => Ok(LogicalType::SmallInt),
            "INTEGER" | "INT" => Ok(LogicalType::Integer),
            "BIGINT" => Ok(LogicalType::BigInt),
            "UBIGINT" => Ok(LogicalType::UBigInt),
            "REAL" | "FLOAT" => Ok(LogicalType::Real),
            "DOUBLE" => Ok(LogicalType::Double),
            "VARCHAR" | "TEXT" | "STRING" => Ok(LogicalType::Varchar),
            _ => Err(()),
        }
    }
}

/// In-memory/on-disk representation class of a logical type.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    VarBytes = 0,
    I64 = 1,
    U64 = 2,
    F64 = 3,
    Bool = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    F32 = 8,
    List = 9,
}

impl PhysicalType {
    /// Width of a value inside a packed row. `VarBytes` is stored as a
    /// (heap offset, length) pair.
    pub fn row_width(&self) -> Option<usize> {
        match self {
            PhysicalType::Bool | PhysicalType::I8 => Some(1),
            PhysicalType::I16 => Some(2),
            PhysicalType::I32 | PhysicalType::F32 => Some(4),
            PhysicalType::I64 | PhysicalType::U64 | PhysicalType::F64 => Some(8),
            PhysicalType::VarBytes => Some(8),
            PhysicalType::List => None,
        }
    }

    pub fn is_fixed_width(&self) -> bool {
        !matches!(self, PhysicalType::VarBytes | PhysicalType::List)
    }
}

impl TryFrom<u8> for PhysicalType {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(PhysicalType::VarBytes),
            1 => Ok(PhysicalType::I64),
            2 => Ok(PhysicalType::U64),
            3 => Ok(PhysicalType::F64),
            4 => Ok(PhysicalType::Bool),
            5 => Ok(PhysicalType::I8),
            6 => Ok(PhysicalType::I16),
            7 => Ok(PhysicalType::I32),
            8 => Ok(PhysicalType::F32),
            9 => Ok(PhysicalType::List),
            other => Err(other),
        }
    }
}

impl From<PhysicalType> for u8 {
    fn from(p: PhysicalType) -> u8 {
        p as u8
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    UBigInt(u64),
    Real(f32),
    Double(f64),
    Varchar(String),
    List(Vec<ScalarValue>),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Whether this value can be stored in a column of `ty` without casting.
    pub fn fits(&self, ty: &LogicalType) -> bool {
        match (self, ty) {
            (ScalarValue::Null, _) => true,
            (ScalarValue::Boolean(_), LogicalType::Boolean)
            | (ScalarValue::TinyInt(_), LogicalType::TinyInt)
            | (ScalarValue::SmallInt(_), LogicalType::SmallInt)
            | (ScalarValue::Integer(_), LogicalType::Integer)
            | (ScalarValue::BigInt(_), LogicalType::BigInt)
            | (ScalarValue::UBigInt(_), LogicalType::UBigInt)
            | (ScalarValue::Real(_), LogicalType::Real)
            | (ScalarValue::Double(_), LogicalType::Double)
            | (ScalarValue::Varchar(_), LogicalType::Varchar) => true,
            (ScalarValue::List(items), LogicalType::List(child)) => {
                items.iter().all(|v| v.fits(child))
            }
            _ => false,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            ScalarValue::TinyInt(v) => Some(*v as i128),
            ScalarValue::SmallInt(v) => Some(*v as i128),
            ScalarValue::Integer(v) => Some(*v as i128),
            ScalarValue::BigInt(v) => Some(*v as i128),
            ScalarValue::UBigInt(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Real(v) => Some(*v as f64),
            ScalarValue::Double(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Varchar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Lossless conversion into `ty`. Integers are range checked; integer to
    /// float conversion is allowed, float to integer is not.
    pub fn try_cast(&self, ty: &LogicalType) -> Option<ScalarValue> {
        if self.fits(ty) {
            return Some(self.clone());
        }
        if let Some(v) = self.as_i128() {
            return match ty {
                LogicalType::TinyInt => i8::try_from(v).ok().map(ScalarValue::TinyInt),
                LogicalType::SmallInt => i16::try_from(v).ok().map(ScalarValue::SmallInt),
                LogicalType::Integer => i32::try_from(v).ok().map(ScalarValue::Integer),
                LogicalType::BigInt => i64::try_from(v).ok().map(ScalarValue::BigInt),
                LogicalType::UBigInt => u64::try_from(v).ok().map(ScalarValue::UBigInt),
                LogicalType::Real => Some(ScalarValue::Real(v as f32)),
                LogicalType::Double => Some(ScalarValue::Double(v as f64)),
                _ => None,
            };
        }
        match (self, ty) {
            (ScalarValue::Real(v), LogicalType::Double) => Some(ScalarValue::Double(*v as f64)),
            _ => None,
        }
    }

    /// Ordering between two non-null values of the same variant. Floats use
    /// IEEE total order with `-0.0 == 0.0`.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
            (ScalarValue::TinyInt(a), ScalarValue::TinyInt(b)) => Some(a.cmp(b)),
            (ScalarValue::SmallInt(a), ScalarValue::SmallInt(b)) => Some(a.cmp(b)),
            (ScalarValue::Integer(a), ScalarValue::Integer(b)) => Some(a.cmp(b)),
            (ScalarValue::BigInt(a), ScalarValue::BigInt(b)) => Some(a.cmp(b)),
            (ScalarValue::UBigInt(a), ScalarValue::UBigInt(b)) => Some(a.cmp(b)),
            (ScalarValue::Real(a), ScalarValue::Real(b)) => Some(total_cmp_f32(*a, *b)),
            (ScalarValue::Double(a), ScalarValue::Double(b)) => Some(total_cmp_f64(*a, *b)),
            (ScalarValue::Varchar(a), ScalarValue::Varchar(b)) => Some(a.cmp(b)),
            (ScalarValue::List(a), ScalarValue::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match (x.is_null(), y.is_null()) {
                        (true, true) => continue,
                        (true, false) => return Some(Ordering::Greater),
                        (false, true) => return Some(Ordering::Less),
                        _ => match x.compare(y)? {
                            Ordering::Equal => continue,
                            ord => return Some(ord),
                        },
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Structural equality where NULL equals NULL and NaN equals NaN.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => true,
            (ScalarValue::Null, _) | (_, ScalarValue::Null) => false,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Boolean(v) => write!(f, "{}", v),
            ScalarValue::TinyInt(v) => write!(f, "{}", v),
            ScalarValue::SmallInt(v) => write!(f, "{}", v),
            ScalarValue::Integer(v) => write!(f, "{}", v),
            ScalarValue::BigInt(v) => write!(f, "{}", v),
            ScalarValue::UBigInt(v) => write!(f, "{}", v),
            ScalarValue::Real(v) => write!(f, "{}", v),
            ScalarValue::Double(v) => write!(f, "{}", v),
            ScalarValue::Varchar(v) => write!(f, "'{}'", v),
            ScalarValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Integer(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::BigInt(v)
    }
}

impl From<u64> for ScalarValue {
    fn from(v: u64) -> Self {
        ScalarValue::UBigInt(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Double(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Varchar(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Varchar(v)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ScalarValue::Null)
    }
}

#[inline]
pub fn total_cmp_f64(a: f64, b: f64) -> Ordering {
    if a == b { Ordering::Equal } else { a.total_cmp(&b) }
}

#[inline]
pub fn total_cmp_f32(a: f32, b: f32) -> Ordering {
    if a == b { Ordering::Equal } else { a.total_cmp(&b) }
}
