//! `$skiptoken` support for server-driven paging.
//!
//! A skip token holds one literal per clause of the ordering in effect,
//! taken from the last entity of the previous page. The next page starts
//! at the first entity ordered after those values.

use crate::edm::{EdmType, Value};
use crate::error::{Error, Result};
use crate::filters::{Lexer, Token, TokenKind};
use crate::instance::Instance;
use crate::orderby::InternalOrderByInfo;
use std::cmp::Ordering;

/// A parsed `$skiptoken`.
#[derive(Clone, Debug, PartialEq)]
pub struct InternalSkipTokenInfo {
    values: Vec<Value>,
    key: Instance,
}

impl InternalSkipTokenInfo {
    /// Token values in clause order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The token values placed at their sort paths, as an entity the
    /// ordering can compare against.
    pub fn key_object(&self) -> &Instance {
        &self.key
    }

    /// Index of the first entry of `entries` ordered strictly after the
    /// token; `entries` must be sorted by `order_by`.
    pub fn index_of_first_entry_to_return(
        &self,
        order_by: &InternalOrderByInfo<'_>,
        entries: &[Instance],
    ) -> usize {
        entries.partition_point(|entry| order_by.compare(entry, &self.key) != Ordering::Greater)
    }
}

/// Parses `text` as a skip token for `order_by`.
///
/// Each value must be a literal of, or compatible with, the type its sort
/// path ends on. `null` matches any type.
pub fn parse_skip_token(text: &str, order_by: &InternalOrderByInfo<'_>) -> Result<InternalSkipTokenInfo> {
    let malformed = || Error::MalformedSkipToken {
        token: text.to_owned(),
    };

    let tokens = literal_tokens(text).map_err(|_| malformed())?;
    let segments = order_by.order_by_path_segments();

    if tokens.len() != segments.len() {
        return Err(Error::SkipTokenValueCountMismatch {
            token: text.to_owned(),
            count: tokens.len(),
            expected: segments.len(),
        });
    }

    let mut values = Vec::with_capacity(tokens.len());
    let mut key = Instance::new();

    for (position, (token, segment)) in tokens.iter().zip(segments).enumerate() {
        let expected = segment.leaf_type().ok_or_else(malformed)?;
        let value = token_value(token, expected).map_err(|found| Error::SkipTokenTypeMismatch {
            token: text.to_owned(),
            position,
            expected,
            found,
        })?;

        key.set_path(&segment.path(), value.clone());
        values.push(value);
    }

    Ok(InternalSkipTokenInfo { values, key })
}

/// Splits a skip token into its literal tokens.
fn literal_tokens(text: &str) -> Result<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(text)?;
    let mut tokens = Vec::new();

    loop {
        let token = *lexer.current_token();
        if token.kind.literal_type().is_none() {
            return Err(Error::ExpressionExpected {
                position: token.position,
            });
        }
        tokens.push(token);

        lexer.next_token()?;
        match lexer.current_token().kind {
            TokenKind::End => return Ok(tokens),
            TokenKind::Comma => lexer.next_token()?,
            _ => lexer.validate_token(TokenKind::Comma)?,
        }
    }
}

/// Validates a token as a value of `expected`, or returns the type the
/// token denotes on its own.
fn token_value(token: &Token<'_>, expected: EdmType) -> std::result::Result<Value, EdmType> {
    if token.kind == TokenKind::NullLiteral {
        return Ok(Value::Null);
    }

    if let Ok(value) = expected.validate(token.text) {
        return Ok(value);
    }

    let found = token.kind.literal_type().unwrap_or(EdmType::Null);
    match found.validate(token.text) {
        Ok(value) if found.is_compatible_with(expected) => Ok(value),
        _ => Err(found),
    }
}

impl InternalOrderByInfo<'_> {
    /// Skip token that continues after `last`, the final entity of a page.
    ///
    /// ```
    /// # use odata_query::config::ServiceConfig;
    /// # use odata_query::edm::{EdmType, Value};
    /// # use odata_query::instance::Instance;
    /// # use odata_query::metadata::{Metadata, Providers, ResourceType};
    /// use odata_query::orderby::parse_order_by;
    ///
    /// let mut metadata = Metadata::default();
    /// metadata.add_resource_type(
    ///     ResourceType::entity("Order")
    ///         .key("OrderID", EdmType::Int32)
    ///         .primitive("Freight", EdmType::Decimal),
    /// )?;
    /// metadata.add_resource_set("Orders", "Order")?;
    /// let config = ServiceConfig::default();
    /// let providers = Providers::new(&metadata, &config);
    /// let orders = providers.resource_set_wrapper("Orders")?.unwrap();
    ///
    /// let order_by = parse_order_by("Freight", providers, orders, true)?;
    /// let last = Instance::new()
    ///     .with("OrderID", Value::Int32(10248))
    ///     .with("Freight", Value::Null);
    ///
    /// assert_eq!(order_by.build_skip_token(&last), "null,10248");
    /// # Ok::<(), odata_query::Error>(())
    /// ```
    pub fn build_skip_token(&self, last: &Instance) -> String {
        self.order_by_path_segments()
            .iter()
            .map(|segment| match (last.resolve(segment.path()), segment.leaf_type()) {
                (Some(value), Some(ty)) => ty.render(value),
                (Some(value), None) => value.to_odata_literal(),
                (None, _) => Value::Null.to_odata_literal(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
