use super::{BinaryOperator, ExpressionProvider, FunctionDescription, PropertyAccess, UnaryOperator};
use crate::edm::{guid_equal, EdmType, Value};
use crate::error::{Error, Result};
use crate::instance::Instance;
use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, Timelike};
use std::cmp::Ordering;

/// Evaluates an expression tree against one entity.
///
/// Nulls propagate through arithmetic and function calls. `and`/`or`
/// follow three-valued logic. Ordering comparisons involving null are
/// false; `eq` holds between two nulls.
#[derive(Copy, Clone, Debug)]
pub struct EvaluationProvider<'i> {
    instance: &'i Instance,
}

impl<'i> EvaluationProvider<'i> {
    pub fn new(instance: &'i Instance) -> Self {
        Self { instance }
    }
}

fn evaluation_error(message: impl Into<String>) -> Error {
    Error::Evaluation(message.into())
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Guid(a), Value::Guid(b)) => guid_equal(&a.to_string(), &b.to_string()),
        (a, b) => a.compare(b) == Some(Ordering::Equal),
    }
}

fn integral(value: i64, ty: EdmType) -> Result<Value> {
    let overflow = || evaluation_error(format!("{value} overflows {ty}"));

    Ok(match ty {
        EdmType::Byte => Value::Byte(u8::try_from(value).map_err(|_| overflow())?),
        EdmType::SByte => Value::SByte(i8::try_from(value).map_err(|_| overflow())?),
        EdmType::Int16 => Value::Int16(i16::try_from(value).map_err(|_| overflow())?),
        EdmType::Int32 => Value::Int32(i32::try_from(value).map_err(|_| overflow())?),
        _ => Value::Int64(value),
    })
}

fn arithmetic(operator: BinaryOperator, left: &Value, right: &Value, ty: EdmType) -> Result<Value> {
    let operands = || evaluation_error(format!("cannot apply '{operator}' to {left:?} and {right:?}"));

    match ty {
        ty if ty.is_integral() => {
            let (a, b) = (left.as_i64().ok_or_else(operands)?, right.as_i64().ok_or_else(operands)?);

            if matches!(operator, BinaryOperator::Div | BinaryOperator::Mod) && b == 0 {
                return Err(evaluation_error("division by zero"));
            }

            let result = match operator {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Sub => a.checked_sub(b),
                BinaryOperator::Mul => a.checked_mul(b),
                BinaryOperator::Div => a.checked_div(b),
                BinaryOperator::Mod => a.checked_rem(b),
                _ => return Err(operands()),
            }
            .ok_or_else(|| evaluation_error(format!("'{operator}' overflows {ty}")))?;

            integral(result, ty)
        }

        EdmType::Single | EdmType::Double => {
            let (a, b) = (left.as_f64().ok_or_else(operands)?, right.as_f64().ok_or_else(operands)?);

            let result = match operator {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div => a / b,
                BinaryOperator::Mod => a % b,
                _ => return Err(operands()),
            };

            Ok(if ty == EdmType::Single {
                Value::Single(result as f32)
            } else {
                Value::Double(result)
            })
        }

        EdmType::Decimal => {
            let a = left.as_decimal().ok_or_else(operands)?;
            let b = right.as_decimal().ok_or_else(operands)?;

            if matches!(operator, BinaryOperator::Div | BinaryOperator::Mod) && b.is_zero() {
                return Err(evaluation_error("division by zero"));
            }

            Ok(Value::Decimal(match operator {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div => a / b,
                BinaryOperator::Mod => a % b,
                _ => return Err(operands()),
            }))
        }

        _ => Err(operands()),
    }
}

fn floor_decimal(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(0);
    if &truncated > value {
        truncated - BigDecimal::from(1)
    } else {
        truncated
    }
}

fn ceiling_decimal(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(0);
    if &truncated < value {
        truncated + BigDecimal::from(1)
    } else {
        truncated
    }
}

/// Rounds half away from zero.
fn round_decimal(value: &BigDecimal) -> BigDecimal {
    let half = BigDecimal::new(5.into(), 1);

    if value < &BigDecimal::zero() {
        (value.clone() - half).with_scale(0)
    } else {
        (value.clone() + half).with_scale(0)
    }
}

fn string_arg(arguments: &[Value], index: usize) -> Result<&str> {
    match arguments.get(index) {
        Some(Value::String(s)) => Ok(s),
        other => Err(evaluation_error(format!("expected a string argument, got {other:?}"))),
    }
}

fn int_arg(arguments: &[Value], index: usize) -> Result<i64> {
    arguments
        .get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| evaluation_error(format!("expected an integer argument at {index}")))
}

fn length_of(len: usize) -> Result<Value> {
    i32::try_from(len)
        .map(Value::Int32)
        .map_err(|_| evaluation_error("string too long"))
}

/// Character index of `needle` in `haystack`, -1 when absent.
fn index_of(haystack: &str, needle: &str) -> Result<Value> {
    match haystack.find(needle) {
        Some(byte) => length_of(haystack[..byte].chars().count()),
        None => Ok(Value::Int32(-1)),
    }
}

fn substring(text: &str, start: i64, length: Option<i64>) -> String {
    let start = usize::try_from(start).unwrap_or(0);
    let chars = text.chars().skip(start);

    match length {
        Some(length) => chars.take(usize::try_from(length).unwrap_or(0)).collect(),
        None => chars.collect(),
    }
}

fn call(function: &FunctionDescription, arguments: &[Value]) -> Result<Value> {
    if arguments.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }

    let datetime = || match arguments.first() {
        Some(Value::DateTime(dt)) => Ok(*dt),
        other => Err(evaluation_error(format!("expected a DateTime argument, got {other:?}"))),
    };

    let fractional = |f: fn(f64) -> f64, d: fn(&BigDecimal) -> BigDecimal| -> Result<Value> {
        let argument = arguments
            .first()
            .ok_or_else(|| evaluation_error("missing argument"))?;

        if function.return_type == EdmType::Decimal {
            argument
                .as_decimal()
                .map(|v| Value::Decimal(d(&v)))
                .ok_or_else(|| evaluation_error(format!("expected a numeric argument, got {argument:?}")))
        } else {
            argument
                .as_f64()
                .map(|v| Value::Double(f(v)))
                .ok_or_else(|| evaluation_error(format!("expected a numeric argument, got {argument:?}")))
        }
    };

    Ok(match function.name {
        "endswith" => Value::Boolean(string_arg(arguments, 0)?.ends_with(string_arg(arguments, 1)?)),
        "startswith" => {
            Value::Boolean(string_arg(arguments, 0)?.starts_with(string_arg(arguments, 1)?))
        }
        "substringof" => {
            Value::Boolean(string_arg(arguments, 1)?.contains(string_arg(arguments, 0)?))
        }
        "indexof" => index_of(string_arg(arguments, 0)?, string_arg(arguments, 1)?)?,
        "replace" => Value::String(
            string_arg(arguments, 0)?.replace(string_arg(arguments, 1)?, string_arg(arguments, 2)?),
        ),
        "tolower" => Value::String(string_arg(arguments, 0)?.to_lowercase()),
        "toupper" => Value::String(string_arg(arguments, 0)?.to_uppercase()),
        "trim" => Value::String(string_arg(arguments, 0)?.trim().to_owned()),
        "substring" => {
            let length = match arguments.len() {
                3 => Some(int_arg(arguments, 2)?),
                _ => None,
            };
            Value::String(substring(string_arg(arguments, 0)?, int_arg(arguments, 1)?, length))
        }
        "concat" => Value::String(
            [string_arg(arguments, 0)?, string_arg(arguments, 1)?].concat(),
        ),
        "length" => length_of(string_arg(arguments, 0)?.chars().count())?,
        "year" => Value::Int32(datetime()?.year()),
        "month" => Value::Int32(datetime()?.month() as i32),
        "day" => Value::Int32(datetime()?.day() as i32),
        "hour" => Value::Int32(datetime()?.hour() as i32),
        "minute" => Value::Int32(datetime()?.minute() as i32),
        "second" => Value::Int32(datetime()?.second() as i32),
        "round" => fractional(f64::round, round_decimal)?,
        "ceiling" => fractional(f64::ceil, ceiling_decimal)?,
        "floor" => fractional(f64::floor, floor_decimal)?,
        name => return Err(evaluation_error(format!("function '{name}' cannot be evaluated"))),
    })
}

impl ExpressionProvider for EvaluationProvider<'_> {
    type Output = Value;

    fn on_logical_expression(
        &mut self,
        operator: BinaryOperator,
        left: Value,
        right: Value,
    ) -> Result<Value> {
        let as_bool = |value: &Value| match value {
            Value::Boolean(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            other => Err(evaluation_error(format!("'{operator}' expects booleans, got {other:?}"))),
        };

        let (a, b) = (as_bool(&left)?, as_bool(&right)?);

        Ok(match (operator, a, b) {
            (BinaryOperator::And, Some(false), _) | (BinaryOperator::And, _, Some(false)) => {
                Value::Boolean(false)
            }
            (BinaryOperator::Or, Some(true), _) | (BinaryOperator::Or, _, Some(true)) => {
                Value::Boolean(true)
            }
            (_, None, _) | (_, _, None) => Value::Null,
            (BinaryOperator::And, Some(a), Some(b)) => Value::Boolean(a && b),
            (_, Some(a), Some(b)) => Value::Boolean(a || b),
        })
    }

    fn on_arithmetic_expression(
        &mut self,
        operator: BinaryOperator,
        left: Value,
        right: Value,
        ty: EdmType,
    ) -> Result<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        arithmetic(operator, &left, &right, ty)
    }

    fn on_relational_expression(
        &mut self,
        operator: BinaryOperator,
        left: Value,
        right: Value,
    ) -> Result<Value> {
        let ordering = || {
            left.compare(&right).ok_or_else(|| {
                evaluation_error(format!("cannot compare {left:?} with {right:?}"))
            })
        };

        let result = match operator {
            BinaryOperator::Equal => equal(&left, &right),
            BinaryOperator::NotEqual => !equal(&left, &right),
            _ if left.is_null() || right.is_null() => false,
            BinaryOperator::GreaterThan => ordering()?.is_gt(),
            BinaryOperator::GreaterOrEqual => ordering()?.is_ge(),
            BinaryOperator::LessThan => ordering()?.is_lt(),
            BinaryOperator::LessOrEqual => ordering()?.is_le(),
            _ => return Err(evaluation_error(format!("'{operator}' is not relational"))),
        };

        Ok(Value::Boolean(result))
    }

    fn on_unary_expression(
        &mut self,
        operator: UnaryOperator,
        operand: Value,
        ty: EdmType,
    ) -> Result<Value> {
        match (operator, operand) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (UnaryOperator::Negate, Value::Decimal(d)) => Ok(Value::Decimal(-d)),
            (UnaryOperator::Negate, operand) if ty.is_integral() => {
                let value = operand
                    .as_i64()
                    .and_then(i64::checked_neg)
                    .ok_or_else(|| evaluation_error(format!("cannot negate {operand:?}")))?;
                integral(value, ty)
            }
            (UnaryOperator::Negate, operand) if ty == EdmType::Decimal => operand
                .as_decimal()
                .map(|d| Value::Decimal(-d))
                .ok_or_else(|| evaluation_error(format!("cannot negate {operand:?}"))),
            (UnaryOperator::Negate, operand) => {
                let value = operand
                    .as_f64()
                    .ok_or_else(|| evaluation_error(format!("cannot negate {operand:?}")))?;

                Ok(match ty {
                    EdmType::Single => Value::Single(-value as f32),
                    _ => Value::Double(-value),
                })
            }
            (operator, operand) => Err(evaluation_error(format!(
                "cannot apply '{operator}' to {operand:?}"
            ))),
        }
    }

    fn on_constant_expression(&mut self, _ty: EdmType, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }

    fn on_property_access_expression(&mut self, access: &PropertyAccess<'_>) -> Result<Value> {
        Ok(self
            .instance
            .resolve(access.path())
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn on_function_call_expression(
        &mut self,
        function: &FunctionDescription,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        call(function, &arguments)
    }
}
