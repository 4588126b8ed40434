use odata_query::bigdecimal::BigDecimal;
use odata_query::chrono::NaiveDate;
use odata_query::edm::{guid_equal, EdmType, Value};
use odata_query::error::LiteralError;
use odata_query::uuid::Uuid;
use pretty_assertions::assert_eq;
use std::cmp::Ordering;
use std::str::FromStr;

const NUMERIC: [EdmType; 8] = [
    EdmType::Byte,
    EdmType::SByte,
    EdmType::Int16,
    EdmType::Int32,
    EdmType::Int64,
    EdmType::Single,
    EdmType::Double,
    EdmType::Decimal,
];

#[test]
fn binary_needs_an_even_number_of_digits() {
    assert_eq!(EdmType::Binary.validate("x'ab'"), Ok(Value::Binary(vec![0xab])));
    assert_eq!(
        EdmType::Binary.validate("binary'00FF'"),
        Ok(Value::Binary(vec![0x00, 0xff]))
    );
    assert_eq!(
        EdmType::Binary.validate("x'abc'"),
        Err(LiteralError::Malformed {
            ty: EdmType::Binary,
            text: "x'abc'".to_owned(),
        })
    );
}

#[test]
fn guid_forms() {
    let expected = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").expect("valid uuid");

    for text in [
        "guid'0f8fad5b-d9cb-469f-a165-70867728950e'",
        "guid'0F8FAD5BD9CB469FA16570867728950E'",
        "guid'{0f8fad5b-d9cb-469f-a165-70867728950e}'",
        "guid'(0f8fad5b-d9cb-469f-a165-70867728950e)'",
    ] {
        assert_eq!(EdmType::Guid.validate(text), Ok(Value::Guid(expected)), "{text}");
    }

    assert!(EdmType::Guid.validate("guid'0f8fad5b'").is_err());
}

#[test]
fn guid_equal_ignores_formatting() {
    assert!(guid_equal(
        "0F8FAD5B-D9CB-469F-A165-70867728950E",
        "{0f8fad5bd9cb469fa16570867728950e}"
    ));
    assert!(guid_equal(
        "(0f8fad5b-d9cb-469f-a165-70867728950e)",
        "0f8fad5b-d9cb-469f-a165-70867728950e"
    ));
    assert!(!guid_equal(
        "0f8fad5b-d9cb-469f-a165-70867728950e",
        "0f8fad5b-d9cb-469f-a165-70867728950f"
    ));
}

#[test]
fn integers_out_of_range() {
    assert_eq!(
        EdmType::Int32.validate("2147483648"),
        Err(LiteralError::OutOfRange {
            ty: EdmType::Int32,
            text: "2147483648".to_owned(),
        })
    );
    assert_eq!(EdmType::Int32.validate("-2147483648"), Ok(Value::Int32(i32::MIN)));
    assert!(matches!(
        EdmType::Byte.validate("256"),
        Err(LiteralError::OutOfRange { .. })
    ));
    assert!(matches!(
        EdmType::SByte.validate("-129"),
        Err(LiteralError::OutOfRange { .. })
    ));
    assert!(matches!(
        EdmType::Int16.validate("12x"),
        Err(LiteralError::Malformed { .. })
    ));
}

#[test]
fn datetime_literals() {
    let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
        .and_then(|d| d.and_hms_milli_opt(10, 20, 30, 500))
        .expect("valid datetime");

    assert_eq!(
        EdmType::DateTime.validate("datetime'2024-02-29T10:20:30.5'"),
        Ok(Value::DateTime(expected))
    );

    let minutes_only = NaiveDate::from_ymd_opt(1996, 7, 4)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid datetime");
    assert_eq!(
        EdmType::DateTime.validate("datetime'1996-07-04T00:00'"),
        Ok(Value::DateTime(minutes_only))
    );

    assert!(matches!(
        EdmType::DateTime.validate("datetime'2023-02-29T10:20'"),
        Err(LiteralError::OutOfRange { .. })
    ));
    assert!(matches!(
        EdmType::DateTime.validate("datetime'2023-02-28'"),
        Err(LiteralError::Malformed { .. })
    ));
}

#[test]
fn strings_unescape_doubled_quotes() {
    assert_eq!(
        EdmType::String.validate("'O''Neil'"),
        Ok(Value::String("O'Neil".to_owned()))
    );
    assert_eq!(EdmType::String.validate("''"), Ok(Value::String(String::new())));
    assert!(EdmType::String.validate("'a'b'").is_err());
}

#[test]
fn rendered_literals_validate_to_the_same_value() {
    let cases = [
        (EdmType::Boolean, "true"),
        (EdmType::Byte, "255"),
        (EdmType::SByte, "-5"),
        (EdmType::Int16, "5"),
        (EdmType::Int32, "-42"),
        (EdmType::Int64, "42L"),
        (EdmType::Single, "1.5f"),
        (EdmType::Double, "1e3"),
        (EdmType::Decimal, "10.50M"),
        (EdmType::String, "'it''s'"),
        (EdmType::Guid, "guid'0f8fad5b-d9cb-469f-a165-70867728950e'"),
        (EdmType::Binary, "x'0aff'"),
        (EdmType::DateTime, "datetime'2024-02-29T10:20:30.125'"),
        (EdmType::Null, "null"),
    ];

    for (ty, text) in cases {
        let value = ty.validate(text).expect("valid literal");
        let rendered = value.to_odata_literal();

        assert_eq!(ty.validate(&rendered), Ok(value), "{text} rendered as {rendered}");
    }
}

#[test]
fn render_widens_to_the_descriptor() {
    assert_eq!(EdmType::Int64.render(&Value::Int32(3)), "3L");
    assert_eq!(EdmType::Decimal.render(&Value::Int32(3)), "3M");
    assert_eq!(EdmType::Double.render(&Value::Int16(2)), "2d");
    assert_eq!(EdmType::Int32.render(&Value::Null), "null");
}

#[test]
fn compatibility_widens_only() {
    let rank = |ty: EdmType| match ty {
        EdmType::Byte | EdmType::SByte => 0,
        EdmType::Int16 => 1,
        EdmType::Int32 => 2,
        EdmType::Int64 => 3,
        EdmType::Single => 4,
        EdmType::Double => 5,
        _ => 6,
    };

    for from in NUMERIC {
        for to in NUMERIC {
            let expected = from == to || rank(from) < rank(to);
            assert_eq!(from.is_compatible_with(to), expected, "{from} -> {to}");
        }
    }

    assert!(!EdmType::Byte.is_compatible_with(EdmType::SByte));
    assert!(!EdmType::SByte.is_compatible_with(EdmType::Byte));
}

#[test]
fn non_numeric_types_are_only_compatible_with_themselves() {
    let others = [
        EdmType::String,
        EdmType::Boolean,
        EdmType::DateTime,
        EdmType::Guid,
        EdmType::Binary,
    ];

    for from in others {
        for to in others.iter().chain(NUMERIC.iter()) {
            assert_eq!(from.is_compatible_with(*to), from == *to, "{from} -> {to}");
        }
        assert!(EdmType::Null.is_compatible_with(from));
    }
}

#[test]
fn numeric_values_compare_across_types() {
    let decimal = Value::Decimal(BigDecimal::from_str("5.0").expect("valid decimal"));

    assert_eq!(Value::Int32(5).compare(&decimal), Some(Ordering::Equal));
    assert_eq!(Value::Int16(4).compare(&Value::Int64(5)), Some(Ordering::Less));
    assert_eq!(Value::Double(5.5).compare(&Value::Int32(5)), Some(Ordering::Greater));
    assert_eq!(
        Value::String("Z".to_owned()).compare(&Value::String("a".to_owned())),
        Some(Ordering::Less)
    );
    assert_eq!(Value::Null.compare(&Value::Int32(1)), None);
    assert_eq!(Value::String("1".to_owned()).compare(&Value::Int32(1)), None);
}

#[test]
fn type_names_round_trip() {
    for ty in NUMERIC {
        assert_eq!(EdmType::from_name(ty.name()), Some(ty));
    }
    assert_eq!(EdmType::from_name("Edm.Time"), None);
}
