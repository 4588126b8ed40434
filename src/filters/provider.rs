use super::{BinaryOperator, FunctionDescription, PropertyAccess, UnaryOperator};
use crate::edm::{EdmType, Value};
use crate::error::Result;

/// Turns an expression tree into something a backend can use, one node
/// at a time.
///
/// [`Expression::accept`](super::Expression::accept) calls back children
/// first, so every callback receives the already converted operands.
pub trait ExpressionProvider {
    type Output;

    /// `and` / `or`.
    fn on_logical_expression(
        &mut self,
        operator: BinaryOperator,
        left: Self::Output,
        right: Self::Output,
    ) -> Result<Self::Output>;

    /// `add`, `sub`, `mul`, `div`, `mod`; `ty` is the resolved result type.
    fn on_arithmetic_expression(
        &mut self,
        operator: BinaryOperator,
        left: Self::Output,
        right: Self::Output,
        ty: EdmType,
    ) -> Result<Self::Output>;

    /// `eq`, `ne`, `gt`, `ge`, `lt`, `le`.
    fn on_relational_expression(
        &mut self,
        operator: BinaryOperator,
        left: Self::Output,
        right: Self::Output,
    ) -> Result<Self::Output>;

    fn on_unary_expression(
        &mut self,
        operator: UnaryOperator,
        operand: Self::Output,
        ty: EdmType,
    ) -> Result<Self::Output>;

    fn on_constant_expression(&mut self, ty: EdmType, value: &Value) -> Result<Self::Output>;

    fn on_property_access_expression(&mut self, access: &PropertyAccess<'_>)
        -> Result<Self::Output>;

    fn on_function_call_expression(
        &mut self,
        function: &FunctionDescription,
        arguments: Vec<Self::Output>,
    ) -> Result<Self::Output>;
}
