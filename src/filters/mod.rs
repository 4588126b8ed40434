//! `$filter` support: tokenizer, function catalog, expression parser and
//! the typed expression tree it produces.

mod evaluate;
mod functions;
mod lexer;
mod parse;
mod provider;
mod to_query_string;

use crate::edm::{EdmType, Value};
use crate::error::Result;
use crate::instance::Instance;
use crate::metadata::ResourceProperty;
use std::fmt;

pub use evaluate::EvaluationProvider;
pub use functions::{
    arithmetic_operation_functions, filter_function, find_function_with_promotion,
    logical_operation_functions, negate_operation_functions, not_operation_functions,
    relational_operation_functions, FunctionDescription,
};
pub use lexer::{Lexer, Token, TokenKind};
pub use parse::{parse_filter, ExpressionParser, MAX_NESTING};
pub use provider::ExpressionProvider;
pub use to_query_string::{to_query_string, QueryStringProvider};

/// Group an operator belongs to; decides which provider callback sees it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorCategory {
    Logical,
    Relational,
    Arithmetic,
}

/// Represents the binary operators of `$filter`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    pub fn keyword(self) -> &'static str {
        match self {
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Equal => "eq",
            BinaryOperator::NotEqual => "ne",
            BinaryOperator::GreaterThan => "gt",
            BinaryOperator::GreaterOrEqual => "ge",
            BinaryOperator::LessThan => "lt",
            BinaryOperator::LessOrEqual => "le",
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
            BinaryOperator::Mod => "mod",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "and" => BinaryOperator::And,
            "or" => BinaryOperator::Or,
            "eq" => BinaryOperator::Equal,
            "ne" => BinaryOperator::NotEqual,
            "gt" => BinaryOperator::GreaterThan,
            "ge" => BinaryOperator::GreaterOrEqual,
            "lt" => BinaryOperator::LessThan,
            "le" => BinaryOperator::LessOrEqual,
            "add" => BinaryOperator::Add,
            "sub" => BinaryOperator::Sub,
            "mul" => BinaryOperator::Mul,
            "div" => BinaryOperator::Div,
            "mod" => BinaryOperator::Mod,
            _ => return None,
        })
    }

    pub fn category(self) -> OperatorCategory {
        match self {
            BinaryOperator::And | BinaryOperator::Or => OperatorCategory::Logical,
            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod => OperatorCategory::Arithmetic,
            _ => OperatorCategory::Relational,
        }
    }

    /// `eq` and `ne`, the only relational operators defined for null,
    /// Guid and Binary operands.
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Equal | BinaryOperator::NotEqual)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Logical `not`.
    Not,

    /// Arithmetic `-`.
    Negate,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "not"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

/// A chain of property accesses, innermost parent first.
///
/// `Address/City` is an access of `City` whose parent is an access of
/// `Address` on the filtered resource.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyAccess<'a> {
    parent: Option<Box<PropertyAccess<'a>>>,
    property: &'a ResourceProperty,
    ty: EdmType,
}

impl<'a> PropertyAccess<'a> {
    pub(crate) fn new(
        parent: Option<PropertyAccess<'a>>,
        property: &'a ResourceProperty,
        ty: EdmType,
    ) -> Self {
        Self {
            parent: parent.map(Box::new),
            property,
            ty,
        }
    }

    pub fn parent(&self) -> Option<&PropertyAccess<'a>> {
        self.parent.as_deref()
    }

    pub fn property(&self) -> &'a ResourceProperty {
        self.property
    }

    pub fn result_type(&self) -> EdmType {
        self.ty
    }

    /// Property names from the resource down to this access.
    pub fn path(&self) -> Vec<&'a str> {
        let mut path: Vec<_> = self.accesses().map(|a| a.property.name()).collect();
        path.reverse();
        path
    }

    /// Navigation properties crossed by the chain, outermost first.
    pub fn navigation_properties(&self) -> Vec<&'a ResourceProperty> {
        let mut properties: Vec<_> = self
            .accesses()
            .map(|a| a.property)
            .filter(|p| p.kind().is_navigation())
            .collect();
        properties.reverse();
        properties
    }

    fn accesses(&self) -> impl Iterator<Item = &PropertyAccess<'a>> {
        std::iter::successors(Some(self), |a| a.parent.as_deref())
    }
}

/// Represents a typed `$filter` expression tree.
///
/// Every node carries its result type. Operands of an operator may have
/// had their type widened by promotion, so a node's type can differ from
/// the type of the value it holds.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression<'a> {
    /// A literal value.
    Constant { value: Value, ty: EdmType },

    /// A property of the filtered resource, possibly through complex and
    /// navigation properties.
    PropertyAccess(PropertyAccess<'a>),

    Unary {
        operator: UnaryOperator,
        operand: Box<Expression<'a>>,
        ty: EdmType,
    },

    Binary {
        operator: BinaryOperator,
        left: Box<Expression<'a>>,
        right: Box<Expression<'a>>,
        ty: EdmType,
    },

    /// A call to one overload of a catalog function.
    FunctionCall {
        function: &'static FunctionDescription,
        arguments: Vec<Expression<'a>>,
        ty: EdmType,
    },
}

impl<'a> Expression<'a> {
    /// A constant typed by its own value.
    pub fn constant(value: Value) -> Self {
        let ty = value.edm_type();
        Expression::Constant { value, ty }
    }

    pub fn result_type(&self) -> EdmType {
        match self {
            Expression::Constant { ty, .. }
            | Expression::Unary { ty, .. }
            | Expression::Binary { ty, .. }
            | Expression::FunctionCall { ty, .. } => *ty,
            Expression::PropertyAccess(access) => access.ty,
        }
    }

    pub(crate) fn set_result_type(&mut self, new_type: EdmType) {
        match self {
            Expression::Constant { ty, .. }
            | Expression::Unary { ty, .. }
            | Expression::Binary { ty, .. }
            | Expression::FunctionCall { ty, .. } => *ty = new_type,
            Expression::PropertyAccess(access) => access.ty = new_type,
        }
    }

    /// Walks the tree bottom-up, handing every node and the results of its
    /// children to `provider`.
    pub fn accept<P>(&self, provider: &mut P) -> Result<P::Output>
    where
        P: ExpressionProvider + ?Sized,
    {
        match self {
            Expression::Constant { value, ty } => provider.on_constant_expression(*ty, value),

            Expression::PropertyAccess(access) => provider.on_property_access_expression(access),

            Expression::Unary {
                operator,
                operand,
                ty,
            } => {
                let operand = operand.accept(provider)?;
                provider.on_unary_expression(*operator, operand, *ty)
            }

            Expression::Binary {
                operator,
                left,
                right,
                ty,
            } => {
                let left = left.accept(provider)?;
                let right = right.accept(provider)?;

                match operator.category() {
                    OperatorCategory::Logical => {
                        provider.on_logical_expression(*operator, left, right)
                    }
                    OperatorCategory::Relational => {
                        provider.on_relational_expression(*operator, left, right)
                    }
                    OperatorCategory::Arithmetic => {
                        provider.on_arithmetic_expression(*operator, left, right, *ty)
                    }
                }
            }

            Expression::FunctionCall {
                function,
                arguments,
                ..
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| argument.accept(provider))
                    .collect::<Result<Vec<_>>>()?;
                provider.on_function_call_expression(function, arguments)
            }
        }
    }
}

/// A parsed `$filter` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterInfo<'a> {
    expression: Expression<'a>,
    navigation_properties: Vec<Vec<&'a ResourceProperty>>,
}

impl<'a> FilterInfo<'a> {
    pub(crate) fn new(
        expression: Expression<'a>,
        navigation_properties: Vec<Vec<&'a ResourceProperty>>,
    ) -> Self {
        Self {
            expression,
            navigation_properties,
        }
    }

    pub fn expression(&self) -> &Expression<'a> {
        &self.expression
    }

    /// Navigation properties crossed by each distinct property path of the
    /// filter, for eager loading.
    pub fn navigation_properties(&self) -> &[Vec<&'a ResourceProperty>] {
        &self.navigation_properties
    }

    /// Evaluates the filter against one entity; a null result does not match.
    pub fn matches(&self, instance: &Instance) -> Result<bool> {
        let mut provider = EvaluationProvider::new(instance);
        let value = self.expression.accept(&mut provider)?;
        Ok(value == Value::Boolean(true))
    }
}
