use super::{ExpandedProjectionNode, ProjectionNode, RootProjectionNode, MAX_DEPTH};
use crate::error::{Error, Result};
use crate::filters::{Lexer, TokenKind};
use crate::metadata::{Providers, ResourcePropertyKind, ResourceSetWrapper};
use crate::orderby::{key_order_by, InternalOrderByInfo};

/// One segment of an `$expand` or `$select` path.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PathSegment {
    Property(String),
    /// `*`, only valid last in a `$select` path.
    Star,
}

/// Reads `segment(/segment)* (, segment(/segment)*)*`.
fn read_paths(text: &str, allow_star: bool) -> Result<Vec<Vec<PathSegment>>> {
    let mut lexer = Lexer::new(text)?;
    let mut paths = Vec::new();

    loop {
        let mut path = Vec::new();

        loop {
            if allow_star && lexer.current_token().kind == TokenKind::Star {
                lexer.next_token()?;
                path.push(PathSegment::Star);
                break;
            }

            path.push(PathSegment::Property(lexer.read_dotted_identifier()?));

            if lexer.current_token().kind != TokenKind::Slash {
                break;
            }
            lexer.next_token()?;
        }

        paths.push(path);

        let token = *lexer.current_token();
        match token.kind {
            TokenKind::End => return Ok(paths),
            TokenKind::Comma => lexer.next_token()?,
            _ => {
                return Err(Error::TrailingInput {
                    found: token.text.to_owned(),
                    position: token.position,
                })
            }
        }
    }
}

/// Builds a projection tree from `$expand` and then applies `$select` to it.
pub struct ExpandProjectionParser<'a> {
    providers: Providers<'a>,
    root: RootProjectionNode<'a>,
}

impl<'a> ExpandProjectionParser<'a> {
    /// Parser whose root stands for `resource_set` with the ordering and
    /// paging of the request itself.
    pub fn new(
        providers: Providers<'a>,
        resource_set: ResourceSetWrapper<'a>,
        internal_order_by_info: Option<InternalOrderByInfo<'a>>,
        skip_count: Option<usize>,
        take_count: Option<usize>,
    ) -> Self {
        let mut root = RootProjectionNode::new(resource_set, resource_set.resource_type());
        root.set_ordering(
            internal_order_by_info,
            skip_count,
            take_count,
            resource_set.max_results_per_collection(),
        );

        Self { providers, root }
    }

    /// Adds a node for every navigation property named by the `$expand`
    /// paths, sharing nodes between paths with a common prefix.
    pub fn parse_expand(&mut self, text: &str) -> Result<()> {
        let paths = read_paths(text, false)?;
        let config = self.providers.config();

        if let Some(max) = config.max_expand_count {
            if paths.len() > max {
                return Err(Error::TooManyExpandPaths {
                    count: paths.len(),
                    max,
                });
            }
        }

        // The configured depth never lifts the tree bound.
        let max_depth = config
            .max_expand_depth
            .map_or(MAX_DEPTH, |max| max.min(MAX_DEPTH));
        if paths.iter().any(|path| path.len() > max_depth) {
            return Err(Error::ExpandTooDeep { max: max_depth });
        }

        self.root.set_expansion_specified();
        for path in &paths {
            self.apply_expand_path(path)?;
        }

        Ok(())
    }

    fn apply_expand_path(&mut self, path: &[PathSegment]) -> Result<()> {
        let providers = self.providers;
        let mut paged = false;
        let mut node: &mut ExpandedProjectionNode<'a> = &mut self.root;

        for segment in path {
            let PathSegment::Property(name) = segment else {
                continue;
            };

            let resource_type = node.resource_type();
            let property = resource_type.resolve_property(name).ok_or_else(|| {
                Error::PropertyNotFound {
                    type_name: resource_type.name().to_owned(),
                    property: name.clone(),
                }
            })?;

            if !property.kind().is_navigation() {
                return Err(Error::ExpandRequiresNavigation {
                    type_name: resource_type.name().to_owned(),
                    property: property.name().to_owned(),
                });
            }

            if node.find_node(property.name()).is_none() {
                let target = providers
                    .resource_set_wrapper_for_navigation_property(
                        &node.resource_set(),
                        resource_type,
                        property,
                    )?
                    .ok_or_else(|| Error::InvisibleNavigationTarget {
                        type_name: resource_type.name().to_owned(),
                        property: property.name().to_owned(),
                    })?;

                let single = property.kind() == ResourcePropertyKind::ResourceReference;
                target.check_rights_for_read(single)?;

                let target_type = providers.target_type(property)?;
                let mut child = ExpandedProjectionNode::new(Some(property), target, target_type);

                if !single {
                    let page_size = target.page_size();
                    if page_size > 0 {
                        paged = true;
                        log::trace!("ordering paged expansion {} by key", property.name());
                        child.set_ordering(
                            Some(InternalOrderByInfo::new(key_order_by(target_type))),
                            None,
                            Some(page_size),
                            None,
                        );
                    } else {
                        child.set_ordering(None, None, None, target.max_results_per_collection());
                    }
                }

                node.add_node(ProjectionNode::Expanded(child));
            }

            node = match node.find_node_mut(property.name()) {
                Some(ProjectionNode::Expanded(child)) => child,
                _ => {
                    return Err(Error::UnexpectedPropertyType {
                        property: property.name().to_owned(),
                        kind: property.kind().to_string(),
                    })
                }
            };
        }

        if paged {
            self.root.set_paged_expanded_result();
        }

        Ok(())
    }

    /// Marks what the `$select` paths select and prunes the rest.
    pub fn parse_select(&mut self, text: &str) -> Result<()> {
        let paths = read_paths(text, true)?;

        self.root.set_selection_specified();
        for path in &paths {
            self.apply_select_path(path)?;
        }

        Ok(())
    }

    fn apply_select_path(&mut self, path: &[PathSegment]) -> Result<()> {
        let providers = self.providers;
        let mut node: &mut ExpandedProjectionNode<'a> = &mut self.root;
        let last = path.len().saturating_sub(1);

        for (index, segment) in path.iter().enumerate() {
            node.set_selection_found();
            let is_last = index == last;

            let name = match segment {
                PathSegment::Star => {
                    node.set_select_all_immediate_properties();
                    break;
                }
                PathSegment::Property(name) => name,
            };

            let resource_type = node.resource_type();
            let property = resource_type.resolve_property(name).ok_or_else(|| {
                Error::PropertyNotFound {
                    type_name: resource_type.name().to_owned(),
                    property: name.clone(),
                }
            })?;

            if !is_last {
                let property_name = property.name().to_owned();
                match property.kind() {
                    ResourcePropertyKind::Bag => {
                        return Err(Error::BagAsInnerSelectSegment {
                            property: property_name,
                        })
                    }
                    ResourcePropertyKind::Primitive => {
                        return Err(Error::PrimitiveAsInnerSelectSegment {
                            property: property_name,
                        })
                    }
                    ResourcePropertyKind::Complex => {
                        return Err(Error::ComplexAsInnerSelectSegment {
                            property: property_name,
                        })
                    }
                    ResourcePropertyKind::ResourceReference
                    | ResourcePropertyKind::ResourceSetReference => {}
                }
            }

            if node.find_node(property.name()).is_none() {
                if !is_last {
                    return Err(Error::SelectWithoutMatchingExpand {
                        property: property.name().to_owned(),
                    });
                }

                if property.kind().is_navigation() {
                    providers
                        .resource_set_wrapper_for_navigation_property(
                            &node.resource_set(),
                            resource_type,
                            property,
                        )?
                        .ok_or_else(|| Error::InvisibleNavigationTarget {
                            type_name: resource_type.name().to_owned(),
                            property: property.name().to_owned(),
                        })?;
                }

                node.add_node(ProjectionNode::Property(property));
                break;
            }

            node = match node.find_node_mut(property.name()) {
                Some(ProjectionNode::Expanded(child)) => child,
                _ if is_last => break,
                _ => {
                    return Err(Error::SelectWithoutMatchingExpand {
                        property: property.name().to_owned(),
                    })
                }
            };

            if is_last {
                node.set_selection_found();
                node.mark_subtree_as_selected();
            }
        }

        Ok(())
    }

    /// Finishes the tree: without `$select` everything expanded is
    /// selected, otherwise unselected branches and redundant leaves are
    /// removed. Children end up in property declaration order.
    pub fn finish(mut self) -> RootProjectionNode<'a> {
        if self.root.is_selection_specified() {
            self.root.remove_non_selected_nodes();
            self.root.remove_nodes_already_included_implicitly();
        } else {
            self.root.mark_subtree_as_selected();
        }

        self.root.sort_nodes();
        self.root
    }
}

/// Builds the projection tree for a request's `$expand` and `$select`.
///
/// ```
/// # use odata_query::config::ServiceConfig;
/// # use odata_query::edm::EdmType;
/// # use odata_query::metadata::{Metadata, Providers, ResourceType};
/// use odata_query::projection::parse_expand_and_select;
///
/// let mut metadata = Metadata::default();
/// metadata.add_resource_type(
///     ResourceType::entity("Customer")
///         .key("CustomerID", EdmType::String)
///         .set_reference("Orders", "Order"),
/// )?;
/// metadata.add_resource_type(
///     ResourceType::entity("Order")
///         .key("OrderID", EdmType::Int32)
///         .reference("Customer", "Customer"),
/// )?;
/// metadata.add_resource_set("Customers", "Customer")?;
/// metadata.add_resource_set("Orders", "Order")?;
/// let config = ServiceConfig::default();
/// let providers = Providers::new(&metadata, &config);
/// let customers = providers.resource_set_wrapper("Customers")?.unwrap();
///
/// let root = parse_expand_and_select(
///     providers,
///     customers,
///     None,
///     None,
///     None,
///     Some("Orders/Customer"),
///     None,
/// )?;
///
/// assert_eq!(root.eager_load_list()?, vec!["Orders/Customer".to_owned()]);
/// # Ok::<(), odata_query::Error>(())
/// ```
pub fn parse_expand_and_select<'a>(
    providers: Providers<'a>,
    resource_set: ResourceSetWrapper<'a>,
    internal_order_by_info: Option<InternalOrderByInfo<'a>>,
    skip_count: Option<usize>,
    take_count: Option<usize>,
    expand: Option<&str>,
    select: Option<&str>,
) -> Result<RootProjectionNode<'a>> {
    let mut parser = ExpandProjectionParser::new(
        providers,
        resource_set,
        internal_order_by_info,
        skip_count,
        take_count,
    );

    if let Some(expand) = expand {
        parser.parse_expand(expand)?;
    }

    if let Some(select) = select {
        if !providers.config().accept_projection_requests {
            return Err(Error::ProjectionDisabled);
        }
        parser.parse_select(select)?;
    }

    Ok(parser.finish())
}
