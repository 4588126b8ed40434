use super::functions::{
    arithmetic_operation_functions, filter_function, find_function_with_promotion, join_types,
    logical_operation_functions, negate_operation_functions, not_operation_functions,
    relational_operation_functions, FunctionDescription,
};
use super::{
    BinaryOperator, Expression, FilterInfo, Lexer, OperatorCategory, PropertyAccess, Token,
    TokenKind, UnaryOperator,
};
use crate::edm::EdmType;
use crate::error::{Error, LiteralError, Result};
use crate::metadata::{
    Providers, ResourceProperty, ResourcePropertyKind, ResourceSetWrapper, ResourceType,
};
use std::collections::HashMap;

const CLAUSE: &str = "$filter";

/// Deepest nesting of parentheses, unary operators and function arguments.
pub const MAX_NESTING: usize = 100;

/// Recursive-descent parser for `$filter` expressions.
///
/// Precedence from loosest to tightest: `or`, `and`, `not`, relational
/// operators, `add`/`sub`, `mul`/`div`/`mod`, unary `-`, primary.
pub struct ExpressionParser<'a, 't> {
    lexer: Lexer<'t>,
    providers: Providers<'a>,
    resource_set: ResourceSetWrapper<'a>,
    aliases: Option<&'t HashMap<String, String>>,
    navigation_properties: Vec<Vec<&'a ResourceProperty>>,
    depth: usize,
}

impl<'a, 't> ExpressionParser<'a, 't> {
    /// Parser for `text` with property paths resolved against the type of
    /// `resource_set`.
    pub fn new(
        text: &'t str,
        providers: Providers<'a>,
        resource_set: ResourceSetWrapper<'a>,
    ) -> Result<Self> {
        Ok(Self {
            lexer: Lexer::new(text)?,
            providers,
            resource_set,
            aliases: None,
            navigation_properties: Vec::new(),
            depth: 0,
        })
    }

    /// Values for `@name` parameter aliases, keyed without the `@`.
    pub fn with_aliases(mut self, aliases: &'t HashMap<String, String>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    /// Parses the whole text as one expression.
    pub fn parse(&mut self) -> Result<Expression<'a>> {
        let expression = self.parse_logical_or()?;

        let token = self.lexer.current_token();
        if token.kind != TokenKind::End {
            return Err(Error::TrailingInput {
                found: token.text.to_owned(),
                position: token.position,
            });
        }

        Ok(expression)
    }

    /// Navigation properties crossed by each property path parsed so far.
    pub fn navigation_properties(&self) -> &[Vec<&'a ResourceProperty>] {
        &self.navigation_properties
    }

    fn current(&self) -> Token<'t> {
        *self.lexer.current_token()
    }

    /// Binary operator keyword at the current token, when it belongs to
    /// one of `operators`.
    fn operator_in(&self, operators: &[BinaryOperator]) -> Option<BinaryOperator> {
        let token = self.current();
        if token.kind != TokenKind::Identifier {
            return None;
        }

        BinaryOperator::from_keyword(token.text).filter(|op| operators.contains(op))
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        position: usize,
        parse: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(Error::NestingTooDeep {
                max: MAX_NESTING,
                position,
            });
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_logical_or(&mut self) -> Result<Expression<'a>> {
        let mut left = self.parse_logical_and()?;

        while let Some(operator) = self.operator_in(&[BinaryOperator::Or]) {
            let position = self.current().position;
            self.lexer.next_token()?;
            let right = self.parse_logical_and()?;
            left = self.binary(operator, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression<'a>> {
        let mut left = self.parse_logical_not()?;

        while let Some(operator) = self.operator_in(&[BinaryOperator::And]) {
            let position = self.current().position;
            self.lexer.next_token()?;
            let right = self.parse_logical_not()?;
            left = self.binary(operator, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_logical_not(&mut self) -> Result<Expression<'a>> {
        let token = self.current();
        if !token.identifier_is("not") {
            return self.parse_comparison();
        }

        self.lexer.next_token()?;
        let operand = self.nested(token.position, Self::parse_logical_not)?;
        self.unary(UnaryOperator::Not, operand, token)
    }

    fn parse_comparison(&mut self) -> Result<Expression<'a>> {
        const RELATIONAL: [BinaryOperator; 6] = [
            BinaryOperator::Equal,
            BinaryOperator::NotEqual,
            BinaryOperator::GreaterThan,
            BinaryOperator::GreaterOrEqual,
            BinaryOperator::LessThan,
            BinaryOperator::LessOrEqual,
        ];

        let mut left = self.parse_additive()?;

        while let Some(operator) = self.operator_in(&RELATIONAL) {
            let position = self.current().position;
            self.lexer.next_token()?;
            let right = self.parse_additive()?;
            left = self.binary(operator, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression<'a>> {
        let mut left = self.parse_multiplicative()?;

        while let Some(operator) = self.operator_in(&[BinaryOperator::Add, BinaryOperator::Sub]) {
            let position = self.current().position;
            self.lexer.next_token()?;
            let right = self.parse_multiplicative()?;
            left = self.binary(operator, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression<'a>> {
        const MULTIPLICATIVE: [BinaryOperator; 3] =
            [BinaryOperator::Mul, BinaryOperator::Div, BinaryOperator::Mod];

        let mut left = self.parse_negate()?;

        while let Some(operator) = self.operator_in(&MULTIPLICATIVE) {
            let position = self.current().position;
            self.lexer.next_token()?;
            let right = self.parse_negate()?;
            left = self.binary(operator, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_negate(&mut self) -> Result<Expression<'a>> {
        let token = self.current();
        if token.kind != TokenKind::Minus {
            return self.parse_primary();
        }

        self.lexer.next_token()?;
        let operand = self.nested(token.position, Self::parse_negate)?;
        self.unary(UnaryOperator::Negate, operand, token)
    }

    fn parse_primary(&mut self) -> Result<Expression<'a>> {
        let token = self.current();

        let expression = match token.kind {
            TokenKind::OpenParen => {
                self.lexer.next_token()?;
                let inner = self.nested(token.position, Self::parse_logical_or)?;
                self.lexer.validate_token(TokenKind::CloseParen)?;
                self.lexer.next_token()?;
                inner
            }

            TokenKind::Identifier => {
                let next = self.lexer.peek_next_token()?;
                if matches!(next.kind, TokenKind::OpenParen | TokenKind::Dot) {
                    self.parse_function_call()?
                } else {
                    return self.parse_property_access();
                }
            }

            TokenKind::ParameterAlias => {
                let expression = self.parse_alias(token)?;
                self.lexer.next_token()?;
                expression
            }

            kind => match kind.literal_type() {
                Some(ty) => {
                    let expression = literal(ty, token)?;
                    self.lexer.next_token()?;
                    expression
                }
                None => {
                    return Err(Error::ExpressionExpected {
                        position: token.position,
                    })
                }
            },
        };

        let next = self.current();
        if next.kind == TokenKind::Slash {
            let property = self.lexer.peek_next_token()?;
            return Err(Error::MemberAccessOnNonProperty {
                property: property.text.to_owned(),
                position: next.position,
            });
        }

        Ok(expression)
    }

    /// Replaces `@name` with the literal the request supplies for it.
    fn parse_alias(&self, token: Token<'t>) -> Result<Expression<'a>> {
        let name = &token.text[1..];
        let value = self
            .aliases
            .and_then(|aliases| aliases.get(name))
            .ok_or_else(|| Error::UndefinedParameterAlias {
                name: token.text.to_owned(),
                position: token.position,
            })?;

        let mut lexer = Lexer::new(value)?;
        let value_token = *lexer.current_token();
        let ty = value_token.kind.literal_type().ok_or(Error::ExpressionExpected {
            position: token.position,
        })?;
        let expression = literal(ty, value_token)?;

        lexer.next_token()?;
        let rest = lexer.current_token();
        if rest.kind != TokenKind::End {
            return Err(Error::TrailingInput {
                found: rest.text.to_owned(),
                position: token.position,
            });
        }

        Ok(expression)
    }

    fn parse_function_call(&mut self) -> Result<Expression<'a>> {
        let position = self.current().position;
        let name = self.lexer.read_dotted_identifier()?;

        self.lexer.validate_token(TokenKind::OpenParen)?;
        self.lexer.next_token()?;

        let mut arguments = Vec::new();
        if self.current().kind != TokenKind::CloseParen {
            loop {
                arguments.push(self.nested(position, Self::parse_logical_or)?);

                if self.current().kind != TokenKind::Comma {
                    break;
                }
                self.lexer.next_token()?;
            }
        }

        self.lexer.validate_token(TokenKind::CloseParen)?;
        self.lexer.next_token()?;

        let candidates = filter_function(&name).ok_or_else(|| Error::UnknownFunction {
            name: name.clone(),
            position,
        })?;

        let function = find_function_with_promotion(candidates, &mut arguments, false)
            .ok_or_else(|| Error::NoApplicableFunction {
                name: name.clone(),
                argument_types: argument_types(&arguments),
                position,
            })?;

        Ok(Expression::FunctionCall {
            function,
            arguments,
            ty: function.return_type,
        })
    }

    /// Parses `property(/property)*` from the filtered resource.
    fn parse_property_access(&mut self) -> Result<Expression<'a>> {
        let mut resource_set = self.resource_set;
        let mut resource_type: &'a ResourceType = resource_set.resource_type();
        let mut parent: Option<PropertyAccess<'a>> = None;
        let mut navigations = Vec::new();

        loop {
            let token = self.current();
            self.lexer.validate_token(TokenKind::Identifier)?;

            let property = resource_type.resolve_property(token.text).ok_or_else(|| {
                Error::PropertyNotFound {
                    type_name: resource_type.name().to_owned(),
                    property: token.text.to_owned(),
                }
            })?;

            self.lexer.next_token()?;
            let has_next = self.current().kind == TokenKind::Slash;

            match property.kind() {
                ResourcePropertyKind::Bag => {
                    return Err(Error::BagPropertyNotAllowed {
                        property: property.name().to_owned(),
                        type_name: resource_type.name().to_owned(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::ResourceSetReference => {
                    return Err(Error::CollectionNavigationNotAllowed {
                        property: property.name().to_owned(),
                        type_name: resource_type.name().to_owned(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::Primitive if has_next => {
                    return Err(Error::PrimitivePropertyAsIntermediate {
                        property: property.name().to_owned(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::Primitive => {}

                ResourcePropertyKind::Complex => {
                    resource_type = self.providers.target_type(property)?;
                }

                ResourcePropertyKind::ResourceReference => {
                    resource_set = self
                        .providers
                        .resource_set_wrapper_for_navigation_property(
                            &resource_set,
                            resource_type,
                            property,
                        )?
                        .ok_or_else(|| Error::InvisibleNavigationTarget {
                            type_name: resource_type.name().to_owned(),
                            property: property.name().to_owned(),
                        })?;
                    resource_type = self.providers.target_type(property)?;
                    navigations.push(property);
                }
            }

            let ty = property.instance_type().unwrap_or(EdmType::Navigation);
            let access = PropertyAccess::new(parent.take(), property, ty);

            if !has_next {
                if !navigations.is_empty() && !self.navigation_properties.contains(&navigations) {
                    self.navigation_properties.push(navigations);
                }
                return Ok(Expression::PropertyAccess(access));
            }

            parent = Some(access);
            self.lexer.next_token()?;
        }
    }

    fn unary(
        &self,
        operator: UnaryOperator,
        operand: Expression<'a>,
        token: Token<'t>,
    ) -> Result<Expression<'a>> {
        let candidates = match operator {
            UnaryOperator::Not => not_operation_functions(),
            UnaryOperator::Negate => negate_operation_functions(),
        };

        let mut operands = [operand];
        let function = resolve_operator(candidates, &mut operands, token.text, token.position)?;
        let [operand] = operands;

        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
            ty: function.return_type,
        })
    }

    fn binary(
        &self,
        operator: BinaryOperator,
        left: Expression<'a>,
        right: Expression<'a>,
        position: usize,
    ) -> Result<Expression<'a>> {
        let keyword = operator.keyword();
        let mut operands = [left, right];

        let ty = match operator.category() {
            OperatorCategory::Logical => {
                resolve_operator(logical_operation_functions(), &mut operands, keyword, position)?
                    .return_type
            }

            OperatorCategory::Arithmetic => {
                resolve_operator(arithmetic_operation_functions(), &mut operands, keyword, position)?
                    .return_type
            }

            OperatorCategory::Relational => {
                let types = [operands[0].result_type(), operands[1].result_type()];

                if types.contains(&EdmType::Null) {
                    if !operator.is_equality() {
                        return Err(Error::EqualityOnlyOperator {
                            operator: keyword.to_owned(),
                            operand: "null".to_owned(),
                            position,
                        });
                    }
                } else {
                    let equality_only = types
                        .into_iter()
                        .find(|ty| matches!(ty, EdmType::Guid | EdmType::Binary));

                    if let (Some(ty), false) = (equality_only, operator.is_equality()) {
                        return Err(Error::EqualityOnlyOperator {
                            operator: keyword.to_owned(),
                            operand: ty.name().to_owned(),
                            position,
                        });
                    }

                    resolve_operator(
                        relational_operation_functions(),
                        &mut operands,
                        keyword,
                        position,
                    )?;
                }

                EdmType::Boolean
            }
        };

        let [left, right] = operands;
        Ok(Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }
}

fn resolve_operator(
    candidates: &'static [FunctionDescription],
    operands: &mut [Expression<'_>],
    operator: &str,
    position: usize,
) -> Result<&'static FunctionDescription> {
    find_function_with_promotion(candidates, operands, true).ok_or_else(|| {
        Error::IncompatibleOperands {
            operator: operator.to_owned(),
            operand_types: argument_types(operands),
            position,
        }
    })
}

fn argument_types(arguments: &[Expression<'_>]) -> String {
    let types: Vec<_> = arguments.iter().map(Expression::result_type).collect();
    join_types(&types)
}

/// Validates a literal token into a constant.
///
/// An unsuffixed integer too large for `Edm.Int32` is read as `Edm.Int64`.
fn literal<'a>(ty: EdmType, token: Token<'_>) -> Result<Expression<'a>> {
    let invalid = |ty: EdmType| Error::InvalidLiteral {
        ty,
        text: token.text.to_owned(),
        position: token.position,
    };

    let value = match ty.validate(token.text) {
        Ok(value) => value,
        Err(LiteralError::OutOfRange { .. }) if ty == EdmType::Int32 => EdmType::Int64
            .validate(token.text)
            .map_err(|_| invalid(EdmType::Int64))?,
        Err(_) => return Err(invalid(ty)),
    };

    Ok(Expression::constant(value))
}

/// Parses a `$filter` clause against `resource_set`.
///
/// The clause must be a boolean expression.
///
/// ```
/// # use odata_query::config::ServiceConfig;
/// # use odata_query::edm::EdmType;
/// # use odata_query::metadata::{Metadata, Providers, ResourceType};
/// use odata_query::filters::{parse_filter, to_query_string};
/// use std::collections::HashMap;
///
/// let mut metadata = Metadata::default();
/// metadata.add_resource_type(
///     ResourceType::entity("Product")
///         .key("ProductID", EdmType::Int32)
///         .primitive("UnitPrice", EdmType::Decimal),
/// )?;
/// metadata.add_resource_set("Products", "Product")?;
/// let config = ServiceConfig::default();
/// let providers = Providers::new(&metadata, &config);
/// let products = providers.resource_set_wrapper("Products")?.unwrap();
///
/// let filter = parse_filter("UnitPrice gt 10 and ProductID ne 3", providers, products, &HashMap::new())?;
///
/// assert_eq!(
///     to_query_string(filter.expression())?,
///     "(UnitPrice gt 10M) and (ProductID ne 3)"
/// );
/// # Ok::<(), odata_query::Error>(())
/// ```
pub fn parse_filter<'a>(
    text: &str,
    providers: Providers<'a>,
    resource_set: ResourceSetWrapper<'a>,
    aliases: &HashMap<String, String>,
) -> Result<FilterInfo<'a>> {
    let mut parser = ExpressionParser::new(text, providers, resource_set)?.with_aliases(aliases);
    let expression = parser.parse()?;

    let ty = expression.result_type();
    if ty != EdmType::Boolean {
        return Err(Error::FilterNotBoolean { found: ty });
    }

    Ok(FilterInfo::new(expression, parser.navigation_properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::Value;

    #[test]
    fn literal_widens_large_integers() {
        let token = Token {
            kind: TokenKind::IntegerLiteral,
            text: "3000000000",
            position: 0,
        };

        assert_eq!(
            literal(EdmType::Int32, token),
            Ok(Expression::constant(Value::Int64(3_000_000_000)))
        );
    }

    #[test]
    fn argument_types_are_joined() {
        let arguments = [
            Expression::constant(Value::Int16(1)),
            Expression::constant(Value::String("a".to_owned())),
            Expression::constant(Value::Boolean(true)),
        ];

        assert_eq!(
            argument_types(&arguments),
            "Edm.Int16, Edm.String and Edm.Boolean"
        );
    }
}
