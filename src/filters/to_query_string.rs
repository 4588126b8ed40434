use super::{
    BinaryOperator, Expression, ExpressionProvider, FunctionDescription, PropertyAccess,
    UnaryOperator,
};
use crate::edm::{EdmType, Value};
use crate::error::Result;

/// Renders an expression tree back to `$filter` text.
///
/// Every binary node is wrapped in parentheses, so the output is
/// unambiguous whatever the precedence of the source text was. Constants
/// render in the literal form of their (possibly promoted) type.
#[derive(Copy, Clone, Debug, Default)]
pub struct QueryStringProvider;

impl QueryStringProvider {
    fn binary(operator: BinaryOperator, left: String, right: String) -> String {
        format!("({left} {operator} {right})")
    }
}

impl ExpressionProvider for QueryStringProvider {
    type Output = String;

    fn on_logical_expression(
        &mut self,
        operator: BinaryOperator,
        left: String,
        right: String,
    ) -> Result<String> {
        Ok(Self::binary(operator, left, right))
    }

    fn on_arithmetic_expression(
        &mut self,
        operator: BinaryOperator,
        left: String,
        right: String,
        _ty: EdmType,
    ) -> Result<String> {
        Ok(Self::binary(operator, left, right))
    }

    fn on_relational_expression(
        &mut self,
        operator: BinaryOperator,
        left: String,
        right: String,
    ) -> Result<String> {
        Ok(Self::binary(operator, left, right))
    }

    fn on_unary_expression(
        &mut self,
        operator: UnaryOperator,
        operand: String,
        _ty: EdmType,
    ) -> Result<String> {
        Ok(match operator {
            UnaryOperator::Not => format!("not {operand}"),
            UnaryOperator::Negate => format!("-{operand}"),
        })
    }

    fn on_constant_expression(&mut self, ty: EdmType, value: &Value) -> Result<String> {
        Ok(ty.render(value))
    }

    fn on_property_access_expression(&mut self, access: &PropertyAccess<'_>) -> Result<String> {
        Ok(access.path().join("/"))
    }

    fn on_function_call_expression(
        &mut self,
        function: &FunctionDescription,
        arguments: Vec<String>,
    ) -> Result<String> {
        Ok(format!("{}({})", function.name, arguments.join(", ")))
    }
}

/// Converts an expression tree to its `$filter` string representation.
///
/// The outermost parentheses of a binary root are left out.
///
/// ```
/// use odata_query::edm::Value;
/// use odata_query::filters::{to_query_string, BinaryOperator, Expression};
/// use odata_query::edm::EdmType;
///
/// let expression = Expression::Binary {
///     operator: BinaryOperator::Add,
///     left: Box::new(Expression::constant(Value::Int32(1))),
///     right: Box::new(Expression::constant(Value::Int64(2))),
///     ty: EdmType::Int64,
/// };
///
/// assert_eq!(to_query_string(&expression).unwrap(), "1 add 2L");
/// ```
pub fn to_query_string(expression: &Expression<'_>) -> Result<String> {
    let output = expression.accept(&mut QueryStringProvider)?;

    if let Expression::Binary { .. } = expression {
        if let Some(inner) = output.strip_prefix('(').and_then(|o| o.strip_suffix(')')) {
            return Ok(inner.to_owned());
        }
    }

    Ok(output)
}
