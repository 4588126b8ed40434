//! Resource metadata: the entity, complex and property shapes that query
//! options are resolved against.
//!
//! The parsers only talk to metadata through [`MetadataProvider`], so a
//! service can back it with anything. [`Metadata`] is an in-memory model
//! for services that describe their types in code.

mod wrapper;

use crate::edm::EdmType;
use crate::error::{Error, Result};
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use wrapper::{Providers, ResourceSetWrapper};

/// Kind of a resource type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResourceTypeKind {
    Entity,
    Complex,
}

/// Classification of a resource property.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResourcePropertyKind {
    Primitive,
    Complex,
    /// Collection of primitive or complex values.
    Bag,
    /// Navigation to a single related entity.
    ResourceReference,
    /// Navigation to a collection of related entities.
    ResourceSetReference,
}

impl ResourcePropertyKind {
    pub fn is_navigation(self) -> bool {
        matches!(
            self,
            ResourcePropertyKind::ResourceReference | ResourcePropertyKind::ResourceSetReference
        )
    }
}

impl fmt::Display for ResourcePropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePropertyKind::Primitive => write!(f, "primitive"),
            ResourcePropertyKind::Complex => write!(f, "complex"),
            ResourcePropertyKind::Bag => write!(f, "bag"),
            ResourcePropertyKind::ResourceReference => write!(f, "resource reference"),
            ResourcePropertyKind::ResourceSetReference => write!(f, "resource set reference"),
        }
    }
}

/// Type a property holds: a primitive descriptor or the name of a complex
/// or entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyType {
    Primitive(EdmType),
    Complex(String),
    Entity(String),
}

/// A declared property of a resource type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceProperty {
    name: String,
    kind: ResourcePropertyKind,
    property_type: PropertyType,
    is_key: bool,
}

impl ResourceProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourcePropertyKind {
        self.kind
    }

    pub fn property_type(&self) -> &PropertyType {
        &self.property_type
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    /// Primitive descriptor of a primitive property.
    pub fn instance_type(&self) -> Option<EdmType> {
        match (&self.kind, &self.property_type) {
            (ResourcePropertyKind::Primitive, PropertyType::Primitive(ty)) => Some(*ty),
            _ => None,
        }
    }

    /// Name of the complex or entity type the property leads to.
    pub fn target_type_name(&self) -> Option<&str> {
        match &self.property_type {
            PropertyType::Complex(name) | PropertyType::Entity(name) => Some(name),
            PropertyType::Primitive(_) => None,
        }
    }
}

/// Shape of an entity or complex type; properties keep declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceType {
    name: String,
    kind: ResourceTypeKind,
    properties: IndexMap<String, ResourceProperty>,
    duplicates: Vec<String>,
}

impl ResourceType {
    /// Starts an entity type; add at least one key with [`ResourceType::key`].
    ///
    /// ```
    /// use odata_query::edm::EdmType;
    /// use odata_query::metadata::ResourceType;
    ///
    /// let customer = ResourceType::entity("Customer")
    ///     .key("CustomerID", EdmType::String)
    ///     .primitive("CompanyName", EdmType::String)
    ///     .complex("Address", "Address")
    ///     .set_reference("Orders", "Order");
    ///
    /// assert_eq!(customer.key_properties().count(), 1);
    /// ```
    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(name, ResourceTypeKind::Entity)
    }

    pub fn complex_type(name: impl Into<String>) -> Self {
        Self::new(name, ResourceTypeKind::Complex)
    }

    fn new(name: impl Into<String>, kind: ResourceTypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }

    fn with_property(
        mut self,
        name: impl Into<String>,
        kind: ResourcePropertyKind,
        property_type: PropertyType,
        is_key: bool,
    ) -> Self {
        let name = name.into();
        let property = ResourceProperty {
            name: name.clone(),
            kind,
            property_type,
            is_key,
        };

        if self.properties.insert(name.clone(), property).is_some() {
            self.duplicates.push(name);
        }

        self
    }

    pub fn key(self, name: impl Into<String>, ty: EdmType) -> Self {
        self.with_property(name, ResourcePropertyKind::Primitive, PropertyType::Primitive(ty), true)
    }

    pub fn primitive(self, name: impl Into<String>, ty: EdmType) -> Self {
        self.with_property(name, ResourcePropertyKind::Primitive, PropertyType::Primitive(ty), false)
    }

    pub fn complex(self, name: impl Into<String>, complex_type: impl Into<String>) -> Self {
        self.with_property(
            name,
            ResourcePropertyKind::Complex,
            PropertyType::Complex(complex_type.into()),
            false,
        )
    }

    pub fn bag(self, name: impl Into<String>, item_type: PropertyType) -> Self {
        self.with_property(name, ResourcePropertyKind::Bag, item_type, false)
    }

    pub fn reference(self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.with_property(
            name,
            ResourcePropertyKind::ResourceReference,
            PropertyType::Entity(entity_type.into()),
            false,
        )
    }

    pub fn set_reference(self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.with_property(
            name,
            ResourcePropertyKind::ResourceSetReference,
            PropertyType::Entity(entity_type.into()),
            false,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceTypeKind {
        self.kind
    }

    pub fn resolve_property(&self, name: &str) -> Option<&ResourceProperty> {
        self.properties.get(name)
    }

    /// Key properties in declaration order.
    pub fn key_properties(&self) -> impl Iterator<Item = &ResourceProperty> {
        self.properties.values().filter(|p| p.is_key)
    }

    /// All properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &ResourceProperty> {
        self.properties.values()
    }

    /// Declaration index of a property.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.get_index_of(name)
    }
}

/// A named collection of entities of one entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceSet {
    name: String,
    resource_type: String,
}

impl ResourceSet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type_name(&self) -> &str {
        &self.resource_type
    }
}

/// Typed metadata lookups the parsers depend on.
pub trait MetadataProvider {
    fn resource_type(&self, name: &str) -> Option<&ResourceType>;

    fn resource_set(&self, name: &str) -> Option<&ResourceSet>;

    /// Resource set reached by following `property` from an entity of
    /// `source_type` in `source_set`.
    fn navigation_target(
        &self,
        source_set: &ResourceSet,
        source_type: &ResourceType,
        property: &ResourceProperty,
    ) -> Option<&ResourceSet>;
}

/// In-memory metadata model.
///
/// ```
/// use odata_query::edm::EdmType;
/// use odata_query::metadata::{Metadata, MetadataProvider, ResourceType};
///
/// let mut metadata = Metadata::default();
/// metadata
///     .add_resource_type(ResourceType::entity("Order").key("OrderID", EdmType::Int32))
///     .unwrap();
/// metadata.add_resource_set("Orders", "Order").unwrap();
///
/// assert!(metadata.resource_set("Orders").is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    types: IndexMap<String, ResourceType>,
    sets: IndexMap<String, ResourceSet>,
    associations: HashMap<(String, String), String>,
}

impl Metadata {
    pub fn add_resource_type(&mut self, resource_type: ResourceType) -> Result<()> {
        if let Some(duplicate) = resource_type.duplicates.first() {
            return Err(Error::InvalidMetadata(format!(
                "property '{duplicate}' is declared more than once on type '{}'",
                resource_type.name
            )));
        }

        if resource_type.kind == ResourceTypeKind::Entity
            && resource_type.key_properties().next().is_none()
        {
            return Err(Error::InvalidMetadata(format!(
                "entity type '{}' has no key property",
                resource_type.name
            )));
        }

        if self.types.contains_key(&resource_type.name) {
            return Err(Error::InvalidMetadata(format!(
                "type '{}' is declared more than once",
                resource_type.name
            )));
        }

        self.types.insert(resource_type.name.clone(), resource_type);
        Ok(())
    }

    pub fn add_resource_set(&mut self, name: impl Into<String>, entity_type: &str) -> Result<()> {
        let name = name.into();

        match self.types.get(entity_type) {
            Some(ty) if ty.kind == ResourceTypeKind::Entity => {}
            _ => {
                return Err(Error::InvalidMetadata(format!(
                    "resource set '{name}' refers to unknown entity type '{entity_type}'"
                )))
            }
        }

        if self.sets.contains_key(&name) {
            return Err(Error::InvalidMetadata(format!(
                "resource set '{name}' is declared more than once"
            )));
        }

        self.sets.insert(
            name.clone(),
            ResourceSet {
                name,
                resource_type: entity_type.to_owned(),
            },
        );
        Ok(())
    }

    /// Binds a navigation property of `source_set` to an explicit target set.
    ///
    /// Without a binding the target is the first set of the property's
    /// entity type.
    pub fn add_association(
        &mut self,
        source_set: &str,
        property: &str,
        target_set: &str,
    ) -> Result<()> {
        let source = self.sets.get(source_set).ok_or_else(|| {
            Error::InvalidMetadata(format!("unknown resource set '{source_set}'"))
        })?;
        let target = self.sets.get(target_set).ok_or_else(|| {
            Error::InvalidMetadata(format!("unknown resource set '{target_set}'"))
        })?;

        let navigation = self
            .types
            .get(&source.resource_type)
            .and_then(|ty| ty.resolve_property(property))
            .filter(|p| p.kind.is_navigation())
            .ok_or_else(|| {
                Error::InvalidMetadata(format!(
                    "'{property}' is not a navigation property of '{}'",
                    source.resource_type
                ))
            })?;

        if navigation.target_type_name() != Some(target.resource_type.as_str()) {
            return Err(Error::InvalidMetadata(format!(
                "resource set '{target_set}' does not hold entities of the type '{property}' leads to"
            )));
        }

        self.associations.insert(
            (source_set.to_owned(), property.to_owned()),
            target_set.to_owned(),
        );
        Ok(())
    }
}

impl MetadataProvider for Metadata {
    fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.types.get(name)
    }

    fn resource_set(&self, name: &str) -> Option<&ResourceSet> {
        self.sets.get(name)
    }

    fn navigation_target(
        &self,
        source_set: &ResourceSet,
        _source_type: &ResourceType,
        property: &ResourceProperty,
    ) -> Option<&ResourceSet> {
        if let Some(target) = self
            .associations
            .get(&(source_set.name.clone(), property.name.clone()))
        {
            return self.sets.get(target);
        }

        let target_type = property.target_type_name()?;
        self.sets
            .values()
            .find(|set| set.resource_type == target_type)
    }
}
