//! `$expand` and `$select` support: the projection tree describing which
//! related entities a response includes and which properties it returns.

mod parse;

use crate::error::{Error, Result};
use crate::metadata::{ResourceProperty, ResourceSetWrapper, ResourceType};
use crate::orderby::InternalOrderByInfo;
use indexmap::{IndexMap, IndexSet};
use std::ops::{Deref, DerefMut};

pub use parse::{parse_expand_and_select, ExpandProjectionParser};

/// Bound on projection tree depth; deeper trees indicate cyclic metadata.
pub const MAX_DEPTH: usize = 20;

/// A child of an expanded node.
#[derive(Clone, Debug)]
pub enum ProjectionNode<'a> {
    /// A selected property that is not expanded: a primitive, complex or
    /// bag property, or a navigation property returned as a link.
    Property(&'a ResourceProperty),

    /// An expanded navigation property.
    Expanded(ExpandedProjectionNode<'a>),
}

impl<'a> ProjectionNode<'a> {
    pub fn name(&self) -> &str {
        match self {
            ProjectionNode::Property(property) => property.name(),
            ProjectionNode::Expanded(node) => node.name(),
        }
    }

    pub fn as_expanded(&self) -> Option<&ExpandedProjectionNode<'a>> {
        match self {
            ProjectionNode::Expanded(node) => Some(node),
            ProjectionNode::Property(_) => None,
        }
    }
}

/// A node for the root resource or an expanded navigation property.
#[derive(Clone, Debug)]
pub struct ExpandedProjectionNode<'a> {
    property: Option<&'a ResourceProperty>,
    resource_set: ResourceSetWrapper<'a>,
    resource_type: &'a ResourceType,
    internal_order_by_info: Option<InternalOrderByInfo<'a>>,
    skip_count: Option<usize>,
    take_count: Option<usize>,
    max_result_count: Option<usize>,
    children: IndexMap<String, ProjectionNode<'a>>,
    selection_found: bool,
    select_all_immediate_properties: bool,
    select_subtree: bool,
}

impl<'a> ExpandedProjectionNode<'a> {
    pub(crate) fn new(
        property: Option<&'a ResourceProperty>,
        resource_set: ResourceSetWrapper<'a>,
        resource_type: &'a ResourceType,
    ) -> Self {
        Self {
            property,
            resource_set,
            resource_type,
            internal_order_by_info: None,
            skip_count: None,
            take_count: None,
            max_result_count: None,
            children: IndexMap::new(),
            selection_found: false,
            select_all_immediate_properties: false,
            select_subtree: false,
        }
    }

    /// Name of the expanded property, empty for the root.
    pub fn name(&self) -> &str {
        self.property.map_or("", |p| p.name())
    }

    /// The expanded navigation property, `None` for the root.
    pub fn property(&self) -> Option<&'a ResourceProperty> {
        self.property
    }

    pub fn resource_set(&self) -> ResourceSetWrapper<'a> {
        self.resource_set
    }

    pub fn resource_type(&self) -> &'a ResourceType {
        self.resource_type
    }

    /// Ordering to apply to the entities of this node.
    pub fn internal_order_by_info(&self) -> Option<&InternalOrderByInfo<'a>> {
        self.internal_order_by_info.as_ref()
    }

    pub fn skip_count(&self) -> Option<usize> {
        self.skip_count
    }

    pub fn take_count(&self) -> Option<usize> {
        self.take_count
    }

    pub fn max_result_count(&self) -> Option<usize> {
        self.max_result_count
    }

    /// Children in property declaration order once the tree is built.
    pub fn children(&self) -> impl Iterator<Item = &ProjectionNode<'a>> {
        self.children.values()
    }

    pub fn find_node(&self, name: &str) -> Option<&ProjectionNode<'a>> {
        self.children.get(name)
    }

    pub fn selection_found(&self) -> bool {
        self.selection_found
    }

    pub fn select_all_immediate_properties(&self) -> bool {
        self.select_all_immediate_properties
    }

    pub fn select_subtree(&self) -> bool {
        self.select_subtree
    }

    /// Whether every property of this node's resource is returned.
    pub fn can_select_all_properties(&self) -> bool {
        self.select_subtree || self.select_all_immediate_properties
    }

    pub(crate) fn set_ordering(
        &mut self,
        internal_order_by_info: Option<InternalOrderByInfo<'a>>,
        skip_count: Option<usize>,
        take_count: Option<usize>,
        max_result_count: Option<usize>,
    ) {
        self.internal_order_by_info = internal_order_by_info;
        self.skip_count = skip_count;
        self.take_count = take_count;
        self.max_result_count = max_result_count;
    }

    pub(crate) fn find_node_mut(&mut self, name: &str) -> Option<&mut ProjectionNode<'a>> {
        self.children.get_mut(name)
    }

    pub(crate) fn add_node(&mut self, node: ProjectionNode<'a>) {
        self.children.insert(node.name().to_owned(), node);
    }

    pub(crate) fn set_selection_found(&mut self) {
        self.selection_found = true;
    }

    pub(crate) fn set_select_all_immediate_properties(&mut self) {
        self.select_all_immediate_properties = true;
    }

    /// Selects this node and everything below it.
    pub(crate) fn mark_subtree_as_selected(&mut self) {
        self.select_subtree = true;
        self.select_all_immediate_properties = false;

        for child in self.children.values_mut() {
            if let ProjectionNode::Expanded(node) = child {
                node.mark_subtree_as_selected();
            }
        }
    }

    /// Drops expanded children that no select path reaches.
    pub(crate) fn remove_non_selected_nodes(&mut self) {
        self.children.retain(|name, child| match child {
            ProjectionNode::Property(_) => true,
            ProjectionNode::Expanded(node) => {
                let keep = node.selection_found || node.select_subtree;
                if !keep {
                    log::trace!("pruning unselected expansion {name}");
                }
                keep
            }
        });

        for child in self.children.values_mut() {
            if let ProjectionNode::Expanded(node) = child {
                node.remove_non_selected_nodes();
            }
        }
    }

    /// Drops property leaves of nodes that select all their properties anyway.
    pub(crate) fn remove_nodes_already_included_implicitly(&mut self) {
        if self.can_select_all_properties() {
            self.children
                .retain(|_, child| matches!(child, ProjectionNode::Expanded(_)));
        }

        for child in self.children.values_mut() {
            if let ProjectionNode::Expanded(node) = child {
                node.remove_nodes_already_included_implicitly();
            }
        }
    }

    /// Orders children by the declaration order of their properties.
    pub(crate) fn sort_nodes(&mut self) {
        for child in self.children.values_mut() {
            if let ProjectionNode::Expanded(node) = child {
                node.sort_nodes();
            }
        }

        if self.children.len() > 1 {
            let resource_type = self.resource_type;
            self.children.sort_by(|a, _, b, _| {
                resource_type
                    .property_index(a)
                    .cmp(&resource_type.property_index(b))
            });
        }
    }
}

/// The top of a projection tree, for the resource the request targets.
#[derive(Clone, Debug)]
pub struct RootProjectionNode<'a> {
    node: ExpandedProjectionNode<'a>,
    base_resource_type: &'a ResourceType,
    expansion_specified: bool,
    selection_specified: bool,
    has_paged_expanded_result: bool,
}

impl<'a> RootProjectionNode<'a> {
    pub(crate) fn new(resource_set: ResourceSetWrapper<'a>, base_resource_type: &'a ResourceType) -> Self {
        Self {
            node: ExpandedProjectionNode::new(None, resource_set, base_resource_type),
            base_resource_type,
            expansion_specified: false,
            selection_specified: false,
            has_paged_expanded_result: false,
        }
    }

    pub fn base_resource_type(&self) -> &'a ResourceType {
        self.base_resource_type
    }

    pub fn is_expansion_specified(&self) -> bool {
        self.expansion_specified
    }

    pub fn is_selection_specified(&self) -> bool {
        self.selection_specified
    }

    /// Whether some expanded collection is paged by the server.
    pub fn has_paged_expanded_result(&self) -> bool {
        self.has_paged_expanded_result
    }

    pub(crate) fn set_expansion_specified(&mut self) {
        self.expansion_specified = true;
    }

    pub(crate) fn set_selection_specified(&mut self) {
        self.selection_specified = true;
    }

    pub(crate) fn set_paged_expanded_result(&mut self) {
        self.has_paged_expanded_result = true;
    }

    /// `/`-joined paths of the navigation properties to load eagerly, one
    /// per expanded branch, in depth-first order.
    pub fn eager_load_list(&self) -> Result<Vec<String>> {
        let mut paths = IndexSet::new();
        if !self.expansion_specified {
            return Ok(Vec::new());
        }

        let mut stack: Vec<(&ExpandedProjectionNode<'a>, Vec<&str>)> = vec![(&self.node, Vec::new())];

        while let Some((node, path)) = stack.pop() {
            if path.len() > MAX_DEPTH {
                return Err(Error::ProjectionTooDeep { max: MAX_DEPTH });
            }

            let expanded: Vec<_> = node.children().filter_map(ProjectionNode::as_expanded).collect();

            if expanded.is_empty() {
                if !path.is_empty() {
                    paths.insert(path.join("/"));
                }
                continue;
            }

            for child in expanded.into_iter().rev() {
                let mut child_path = path.clone();
                child_path.push(child.name());
                stack.push((child, child_path));
            }
        }

        Ok(paths.into_iter().collect())
    }
}

impl<'a> Deref for RootProjectionNode<'a> {
    type Target = ExpandedProjectionNode<'a>;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl DerefMut for RootProjectionNode<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.node
    }
}
