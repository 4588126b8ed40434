use super::{EdmType, Value};
use crate::error::LiteralError;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;
use uuid::Uuid;

impl EdmType {
    /// Validates literal text in its query-option form and converts it
    /// into the value it denotes.
    ///
    /// ```
    /// use odata_query::edm::{EdmType, Value};
    ///
    /// assert_eq!(EdmType::Int64.validate("42L"), Ok(Value::Int64(42)));
    /// assert_eq!(EdmType::Binary.validate("x'ab'"), Ok(Value::Binary(vec![0xab])));
    /// assert!(EdmType::Binary.validate("x'abc'").is_err());
    /// ```
    pub fn validate(self, text: &str) -> Result<Value, LiteralError> {
        let malformed = || LiteralError::Malformed {
            ty: self,
            text: text.to_owned(),
        };
        let out_of_range = || LiteralError::OutOfRange {
            ty: self,
            text: text.to_owned(),
        };

        match self {
            EdmType::Null => edm_literal::null(text).map(|()| Value::Null).map_err(|_| malformed()),

            EdmType::Boolean => edm_literal::boolean(text)
                .map(Value::Boolean)
                .map_err(|_| malformed()),

            EdmType::Byte => {
                let digits = edm_literal::integer(text).map_err(|_| malformed())?;
                digits.parse().map(Value::Byte).map_err(|_| out_of_range())
            }

            EdmType::SByte => {
                let digits = edm_literal::integer(text).map_err(|_| malformed())?;
                digits.parse().map(Value::SByte).map_err(|_| out_of_range())
            }

            EdmType::Int16 => {
                let digits = edm_literal::integer(text).map_err(|_| malformed())?;
                digits.parse().map(Value::Int16).map_err(|_| out_of_range())
            }

            EdmType::Int32 => {
                let digits = edm_literal::integer(text).map_err(|_| malformed())?;
                digits.parse().map(Value::Int32).map_err(|_| out_of_range())
            }

            EdmType::Int64 => {
                let digits = edm_literal::int64(text).map_err(|_| malformed())?;
                digits.parse().map(Value::Int64).map_err(|_| out_of_range())
            }

            EdmType::Single => {
                let number = edm_literal::single(text).map_err(|_| malformed())?;
                match number.parse::<f32>() {
                    Ok(v) if v.is_finite() => Ok(Value::Single(v)),
                    _ => Err(out_of_range()),
                }
            }

            EdmType::Double => {
                let number = edm_literal::double(text).map_err(|_| malformed())?;
                match number.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(Value::Double(v)),
                    _ => Err(out_of_range()),
                }
            }

            EdmType::Decimal => {
                let number = edm_literal::decimal(text).map_err(|_| malformed())?;
                BigDecimal::from_str(number)
                    .map(Value::Decimal)
                    .map_err(|_| out_of_range())
            }

            EdmType::String => edm_literal::string(text)
                .map(Value::String)
                .map_err(|_| malformed()),

            EdmType::Guid => {
                let digits = edm_literal::guid(text).map_err(|_| malformed())?;
                Uuid::parse_str(&digits)
                    .map(Value::Guid)
                    .map_err(|_| malformed())
            }

            EdmType::Binary => {
                let digits = edm_literal::binary(text).map_err(|_| malformed())?;
                hex::decode(digits).map(Value::Binary).map_err(|_| malformed())
            }

            EdmType::DateTime => edm_literal::datetime(text)
                .map_err(|_| malformed())?
                .map(Value::DateTime)
                .ok_or_else(out_of_range),

            EdmType::Navigation => Err(malformed()),
        }
    }
}

fn date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn time(hour: &str, minute: &str, second: Option<(&str, Option<&str>)>) -> Option<NaiveTime> {
    let (second, nanos) = match second {
        Some((second, Some(fraction))) => {
            // Right-pad to nine digits so "5" reads as 500ms.
            let nanos = format!("{fraction:0<9}").parse().ok()?;
            (second.parse().ok()?, nanos)
        }
        Some((second, None)) => (second.parse().ok()?, 0),
        None => (0, 0),
    };

    NaiveTime::from_hms_nano_opt(hour.parse().ok()?, minute.parse().ok()?, second, nanos)
}

peg::parser! {
    /// Literal forms of the primitive types as they appear in query options.
    grammar edm_literal() for str {
        use super::{date, time};
        use chrono::NaiveDateTime;

        pub(super) rule null()
            = "null"

        pub(super) rule boolean() -> bool
            = "true" { true }
            / "false" { false }

        /// Signed integer digits without suffix.
        pub(super) rule integer() -> &'input str
            = $(['+'|'-']? ['0'..='9']+)

        /// Signed integer digits with an optional `L` suffix.
        pub(super) rule int64() -> &'input str
            = n:integer() ['L'|'l']? { n }

        rule exponent()
            = ['e'|'E'] ['+'|'-']? ['0'..='9']+

        rule real() -> &'input str
            = $(['+'|'-']? ['0'..='9']+ ("." ['0'..='9']+)? exponent()?)

        pub(super) rule single() -> &'input str
            = n:real() ['f'|'F']? { n }

        pub(super) rule double() -> &'input str
            = n:real() ['d'|'D']? { n }

        pub(super) rule decimal() -> &'input str
            = n:real() ['m'|'M']? { n }

        /// Single quoted string, a doubled quote escapes a quote.
        pub(super) rule string() -> String
            = "'" s:string_char()* "'" { s.into_iter().collect() }

        rule string_char() -> char
            = "''" { '\'' }
            / c:[^'\''] { c }

        rule hex() -> char
            = ['0'..='9'|'a'..='f'|'A'..='F']

        /// Either the dashed 8-4-4-4-12 form or 32 bare hex digits, returned without dashes.
        rule guid_digits() -> String
            = a:$(hex()*<8>) "-" b:$(hex()*<4>) "-" c:$(hex()*<4>) "-" d:$(hex()*<4>) "-" e:$(hex()*<12>) {
                [a, b, c, d, e].concat()
            }
            / g:$(hex()*<32>) { g.to_owned() }

        rule guid_body() -> String
            = "{" g:guid_digits() "}" { g }
            / "(" g:guid_digits() ")" { g }
            / guid_digits()

        pub(super) rule guid() -> String
            = "guid'" g:guid_body() "'" { g }

        pub(super) rule binary() -> &'input str
            = ("binary" / "X" / "x") "'" h:$(hex()*) "'" { h }

        rule two_digits() -> &'input str
            = $(['0'..='9']*<2>)

        rule fraction() -> &'input str
            = "." f:$(['0'..='9']*<1,9>) { f }

        rule seconds() -> (&'input str, Option<&'input str>)
            = ":" s:two_digits() f:fraction()? { (s, f) }

        /// `datetime'yyyy-mm-ddThh:mm[:ss[.fffffff]]'`, `None` when the fields are out of range.
        pub(super) rule datetime() -> Option<NaiveDateTime>
            = "datetime'" y:$(['0'..='9']*<4>) "-" mo:two_digits() "-" d:two_digits()
              "T" h:two_digits() ":" mi:two_digits() s:seconds()? "Z"? "'" {
                Some(NaiveDateTime::new(date(y, mo, d)?, time(h, mi, s)?))
            }
    }
}
