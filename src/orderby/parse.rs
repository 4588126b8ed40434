use super::{InternalOrderByInfo, OrderByPathSegment, OrderBySubPathSegment};
use crate::edm::EdmType;
use crate::error::{Error, Result};
use crate::filters::{Lexer, TokenKind};
use crate::metadata::{Providers, ResourcePropertyKind, ResourceSetWrapper, ResourceType};

const CLAUSE: &str = "$orderby";

/// Parser for `$orderby` clauses against one resource set.
#[derive(Copy, Clone)]
pub struct OrderByParser<'a> {
    providers: Providers<'a>,
    resource_set: ResourceSetWrapper<'a>,
}

impl<'a> OrderByParser<'a> {
    pub fn new(providers: Providers<'a>, resource_set: ResourceSetWrapper<'a>) -> Self {
        Self {
            providers,
            resource_set,
        }
    }

    /// Parses `path [asc|desc] (, path [asc|desc])*`.
    ///
    /// A clause whose path repeats an earlier one is dropped, keeping the
    /// earlier direction.
    pub fn parse(&self, text: &str) -> Result<Vec<OrderByPathSegment<'a>>> {
        let mut lexer = Lexer::new(text)?;
        let mut segments: Vec<OrderByPathSegment<'a>> = Vec::new();

        loop {
            let sub_path_segments = self.parse_path(&mut lexer)?;

            let token = *lexer.current_token();
            let is_ascending = if token.identifier_is("asc") {
                lexer.next_token()?;
                true
            } else if token.identifier_is("desc") {
                lexer.next_token()?;
                false
            } else {
                true
            };

            if let Some(segment) = OrderByPathSegment::new(sub_path_segments, is_ascending) {
                if segments.iter().any(|s| s.path() == segment.path()) {
                    log::trace!("dropping repeated $orderby path {}", segment.path().join("/"));
                } else {
                    segments.push(segment);
                }
            }

            let token = *lexer.current_token();
            match token.kind {
                TokenKind::End => break,
                TokenKind::Comma => lexer.next_token()?,
                _ => {
                    return Err(Error::TrailingInput {
                        found: token.text.to_owned(),
                        position: token.position,
                    })
                }
            }
        }

        Ok(segments)
    }

    fn parse_path(&self, lexer: &mut Lexer<'_>) -> Result<Vec<OrderBySubPathSegment<'a>>> {
        let mut resource_set = self.resource_set;
        let mut resource_type: &'a ResourceType = resource_set.resource_type();
        let mut sub_path_segments = Vec::new();

        loop {
            let name = lexer.read_dotted_identifier()?;
            let property = resource_type.resolve_property(&name).ok_or_else(|| {
                Error::PropertyNotFound {
                    type_name: resource_type.name().to_owned(),
                    property: name.clone(),
                }
            })?;

            let has_next = lexer.current_token().kind == TokenKind::Slash;
            let property_name = || property.name().to_owned();

            match property.kind() {
                ResourcePropertyKind::ResourceSetReference => {
                    return Err(Error::CollectionNavigationNotAllowed {
                        property: property_name(),
                        type_name: resource_type.name().to_owned(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::Bag => {
                    return Err(Error::BagPropertyNotAllowed {
                        property: property_name(),
                        type_name: resource_type.name().to_owned(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::Primitive if has_next => {
                    return Err(Error::PrimitivePropertyAsIntermediate {
                        property: property_name(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::Primitive => {
                    if property.instance_type() == Some(EdmType::Binary) {
                        return Err(Error::BinaryPropertyNotSortable {
                            property: property_name(),
                        });
                    }
                }

                ResourcePropertyKind::Complex if !has_next => {
                    return Err(Error::ComplexPropertyAsLeaf {
                        property: property_name(),
                        clause: CLAUSE,
                    })
                }

                ResourcePropertyKind::Complex => {
                    resource_type = self.providers.target_type(property)?;
                }

                ResourcePropertyKind::ResourceReference if !has_next => {
                    return Err(Error::NavigationPropertyAsLeaf {
                        property: property_name(),
                    })
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
                            property: property_name(),
                        })?;
                    resource_type = self.providers.target_type(property)?;
                }
            }

            sub_path_segments.push(OrderBySubPathSegment::new(property));

            if !has_next {
                return Ok(sub_path_segments);
            }
            lexer.next_token()?;
        }
    }
}

/// Ascending clauses on the key properties of `resource_type`.
pub fn key_order_by(resource_type: &ResourceType) -> Vec<OrderByPathSegment<'_>> {
    resource_type
        .key_properties()
        .filter_map(|key| OrderByPathSegment::new(vec![OrderBySubPathSegment::new(key)], true))
        .collect()
}

/// Parses a `$orderby` clause into an ordering for `resource_set`.
///
/// With `append_keys`, key clauses not already present are appended so
/// that the ordering is total, as paging and `$top`/`$skip` require.
pub fn parse_order_by<'a>(
    text: &str,
    providers: Providers<'a>,
    resource_set: ResourceSetWrapper<'a>,
    append_keys: bool,
) -> Result<InternalOrderByInfo<'a>> {
    let mut segments = OrderByParser::new(providers, resource_set).parse(text)?;

    if append_keys {
        for key in key_order_by(resource_set.resource_type()) {
            if segments.iter().all(|s| s.path() != key.path()) {
                log::trace!(
                    "appending key {} to the ordering of {}",
                    key.path().join("/"),
                    resource_set.name()
                );
                segments.push(key);
            }
        }
    }

    Ok(InternalOrderByInfo::new(segments))
}
