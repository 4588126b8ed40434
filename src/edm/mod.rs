//! Primitive EDM type descriptors and the values they validate into.
//!
//! Every descriptor is a plain `Copy` value, so the whole parsing pipeline
//! shares them freely: an `Edm.Int32` constant and an `Edm.Int32` function
//! parameter refer to the same descriptor.

mod literal;
mod render;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents the primitive types of the entity data model, plus the two
/// pseudo-types the expression parser needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum EdmType {
    Binary = 1,
    Boolean = 2,
    Byte = 3,
    DateTime = 4,
    Decimal = 5,
    Double = 6,
    Guid = 7,
    Int16 = 8,
    Int32 = 9,
    Int64 = 10,
    SByte = 11,
    Single = 12,
    String = 13,

    /// Result type of a property access yielding a complex or entity value.
    Navigation = 14,

    /// Type of the `null` literal before it meets a typed operand.
    Null = 15,
}

impl EdmType {
    /// Stable numeric identity of the descriptor.
    pub fn type_code(self) -> u8 {
        self as u8
    }

    /// Fully qualified name, e.g. `Edm.Int32`.
    pub fn name(self) -> &'static str {
        match self {
            EdmType::Binary => "Edm.Binary",
            EdmType::Boolean => "Edm.Boolean",
            EdmType::Byte => "Edm.Byte",
            EdmType::DateTime => "Edm.DateTime",
            EdmType::Decimal => "Edm.Decimal",
            EdmType::Double => "Edm.Double",
            EdmType::Guid => "Edm.Guid",
            EdmType::Int16 => "Edm.Int16",
            EdmType::Int32 => "Edm.Int32",
            EdmType::Int64 => "Edm.Int64",
            EdmType::SByte => "Edm.SByte",
            EdmType::Single => "Edm.Single",
            EdmType::String => "Edm.String",
            EdmType::Navigation => "Navigation",
            EdmType::Null => "null",
        }
    }

    /// Looks a primitive type up by its fully qualified name.
    pub fn from_name(name: &str) -> Option<EdmType> {
        Some(match name {
            "Edm.Binary" => EdmType::Binary,
            "Edm.Boolean" => EdmType::Boolean,
            "Edm.Byte" => EdmType::Byte,
            "Edm.DateTime" => EdmType::DateTime,
            "Edm.Decimal" => EdmType::Decimal,
            "Edm.Double" => EdmType::Double,
            "Edm.Guid" => EdmType::Guid,
            "Edm.Int16" => EdmType::Int16,
            "Edm.Int32" => EdmType::Int32,
            "Edm.Int64" => EdmType::Int64,
            "Edm.SByte" => EdmType::SByte,
            "Edm.Single" => EdmType::Single,
            "Edm.String" => EdmType::String,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_fractional()
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            EdmType::Byte | EdmType::SByte | EdmType::Int16 | EdmType::Int32 | EdmType::Int64
        )
    }

    pub fn is_fractional(self) -> bool {
        matches!(self, EdmType::Single | EdmType::Double | EdmType::Decimal)
    }

    /// Whether a value of this type can be used where `other` is expected.
    ///
    /// The relation is directional: narrower numeric types are compatible
    /// with wider ones, never the reverse. `null` is compatible with every
    /// type.
    ///
    /// ```
    /// use odata_query::edm::EdmType;
    ///
    /// assert!(EdmType::Int16.is_compatible_with(EdmType::Int32));
    /// assert!(!EdmType::Int32.is_compatible_with(EdmType::Int16));
    /// assert!(!EdmType::String.is_compatible_with(EdmType::Int32));
    /// ```
    pub fn is_compatible_with(self, other: EdmType) -> bool {
        use EdmType::*;

        if self == other || self == Null {
            return true;
        }

        match self {
            Byte | SByte => matches!(other, Int16 | Int32 | Int64 | Single | Double | Decimal),
            Int16 => matches!(other, Int32 | Int64 | Single | Double | Decimal),
            Int32 => matches!(other, Int64 | Single | Double | Decimal),
            Int64 => matches!(other, Single | Double | Decimal),
            Single => matches!(other, Double | Decimal),
            Double => matches!(other, Decimal),
            _ => false,
        }
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents a validated primitive value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    Guid(Uuid),
    Binary(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Descriptor of the value's own representation.
    pub fn edm_type(&self) -> EdmType {
        match self {
            Value::Null => EdmType::Null,
            Value::Boolean(_) => EdmType::Boolean,
            Value::Byte(_) => EdmType::Byte,
            Value::SByte(_) => EdmType::SByte,
            Value::Int16(_) => EdmType::Int16,
            Value::Int32(_) => EdmType::Int32,
            Value::Int64(_) => EdmType::Int64,
            Value::Single(_) => EdmType::Single,
            Value::Double(_) => EdmType::Double,
            Value::Decimal(_) => EdmType::Decimal,
            Value::String(_) => EdmType::String,
            Value::Guid(_) => EdmType::Guid,
            Value::Binary(_) => EdmType::Binary,
            Value::DateTime(_) => EdmType::DateTime,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integral values widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::SByte(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric value as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        use bigdecimal::ToPrimitive;

        match self {
            Value::Single(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Numeric values as a `BigDecimal`.
    ///
    /// Floating values widen from their shortest round-trip text, so `0.1d`
    /// becomes `0.1` rather than its binary expansion. Non-finite values
    /// have no decimal form.
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Decimal(v) => Some(v.clone()),
            Value::Single(v) if v.is_finite() => BigDecimal::from_str(&v.to_string()).ok(),
            Value::Double(v) if v.is_finite() => BigDecimal::from_str(&v.to_string()).ok(),
            Value::Single(_) | Value::Double(_) => None,
            other => other.as_i64().map(BigDecimal::from),
        }
    }

    /// Orders two non-null values of comparable types.
    ///
    /// Numerics compare by value across representations, which is what
    /// type promotion in the parser relies on. Strings compare by code
    /// point, byte for byte. Returns `None` for nulls and for values that
    /// have no common ordering.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (a, b) if a.edm_type().is_numeric() && b.edm_type().is_numeric() => {
                let floating = matches!(a, Value::Single(_) | Value::Double(_))
                    || matches!(b, Value::Single(_) | Value::Double(_));

                if floating {
                    a.as_f64()?.partial_cmp(&b.as_f64()?)
                } else {
                    Some(a.as_decimal()?.cmp(&b.as_decimal()?))
                }
            }
            _ => None,
        }
    }
}

/// Compares two GUID texts ignoring dashes, braces, parentheses and case.
///
/// ```
/// use odata_query::edm::guid_equal;
///
/// assert!(guid_equal(
///     "{AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA}",
///     "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa",
/// ));
/// ```
pub fn guid_equal(lhs: &str, rhs: &str) -> bool {
    let digits = |text: &str| {
        text.chars()
            .filter(|c| !matches!(c, '-' | '{' | '}' | '(' | ')'))
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };

    digits(lhs) == digits(rhs)
}
