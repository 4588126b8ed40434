use super::{EdmType, Value};
use chrono::Timelike;
use std::fmt::{self, Write};

impl Value {
    /// Renders the value in the literal form its type descriptor validates.
    ///
    /// ```
    /// use odata_query::edm::Value;
    ///
    /// assert_eq!(Value::Int64(7).to_odata_literal(), "7L");
    /// assert_eq!(Value::String("O'Neil".to_owned()).to_odata_literal(), "'O''Neil'");
    /// ```
    pub fn to_odata_literal(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_odata_literal(&mut output);
        output
    }

    /// Writes the value to a writer in its literal form.
    pub fn write_odata_literal<W: Write>(&self, writer: &mut W) -> fmt::Result {
        match self {
            Value::Null => write!(writer, "null"),

            Value::Boolean(b) => write!(writer, "{b}"),

            Value::Byte(n) => write!(writer, "{n}"),
            Value::SByte(n) => write!(writer, "{n}"),
            Value::Int16(n) => write!(writer, "{n}"),
            Value::Int32(n) => write!(writer, "{n}"),
            Value::Int64(n) => write!(writer, "{n}L"),

            Value::Single(n) => write!(writer, "{n}f"),
            Value::Double(n) => write!(writer, "{n}d"),
            Value::Decimal(n) => write!(writer, "{n}M"),

            Value::Guid(id) => write!(writer, "guid'{id}'"),

            Value::Binary(bytes) => write!(writer, "binary'{}'", hex::encode_upper(bytes)),

            Value::DateTime(dt) => {
                write!(writer, "datetime'{}", dt.format("%Y-%m-%dT%H:%M:%S"))?;

                let nanos = dt.nanosecond();
                if nanos > 0 {
                    let fraction = format!("{nanos:09}");
                    write!(writer, ".{}", fraction.trim_end_matches('0'))?;
                }

                write!(writer, "'")
            }

            // Single quotes are escaped by doubling them.
            Value::String(s) => write!(writer, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_odata_literal(f)
    }
}

impl EdmType {
    /// Renders `value` as a literal of this type.
    ///
    /// Numeric values are widened to the descriptor first, so a promoted
    /// `Edm.Int32` constant renders with the suffix of its promoted type.
    pub fn render(self, value: &Value) -> String {
        let widened = match (self, value) {
            (_, Value::Null) => None,
            (EdmType::Int64, v) if v.edm_type().is_integral() => v.as_i64().map(Value::Int64),
            (EdmType::Double, v) if v.edm_type().is_numeric() => v.as_f64().map(Value::Double),
            (EdmType::Decimal, v) if v.edm_type().is_numeric() => {
                v.as_decimal().map(Value::Decimal)
            }
            _ => None,
        };

        widened.as_ref().unwrap_or(value).to_odata_literal()
    }
}
