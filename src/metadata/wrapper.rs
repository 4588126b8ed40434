use super::{MetadataProvider, ResourceProperty, ResourceSet, ResourceType};
use crate::config::{EntitySetRights, ServiceConfig};
use crate::error::{Error, Result};

/// A resource set together with the settings the service applies to it.
#[derive(Copy, Clone, Debug)]
pub struct ResourceSetWrapper<'a> {
    resource_set: &'a ResourceSet,
    resource_type: &'a ResourceType,
    rights: EntitySetRights,
    page_size: usize,
    max_results_per_collection: Option<usize>,
}

impl<'a> ResourceSetWrapper<'a> {
    pub fn name(&self) -> &'a str {
        self.resource_set.name()
    }

    pub fn resource_set(&self) -> &'a ResourceSet {
        self.resource_set
    }

    pub fn resource_type(&self) -> &'a ResourceType {
        self.resource_type
    }

    pub fn rights(&self) -> EntitySetRights {
        self.rights
    }

    /// Server page size, 0 when the set is not paged.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_results_per_collection(&self) -> Option<usize> {
        self.max_results_per_collection
    }

    pub fn is_visible(&self) -> bool {
        self.rights != EntitySetRights::None
    }

    /// Fails unless the set may be read as a single entity or as a collection.
    pub fn check_rights_for_read(&self, single_result: bool) -> Result<()> {
        let allowed = if single_result {
            self.rights.can_read_single()
        } else {
            self.rights.can_read_multiple()
        };

        if allowed {
            Ok(())
        } else {
            Err(Error::Forbidden {
                resource_set: self.name().to_owned(),
            })
        }
    }
}

/// Metadata provider and service configuration as one lookup surface.
#[derive(Copy, Clone)]
pub struct Providers<'a> {
    metadata: &'a dyn MetadataProvider,
    config: &'a ServiceConfig,
}

impl<'a> Providers<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider, config: &'a ServiceConfig) -> Self {
        Self { metadata, config }
    }

    pub fn config(&self) -> &'a ServiceConfig {
        self.config
    }

    pub fn resource_type(&self, name: &str) -> Result<&'a ResourceType> {
        let metadata = self.metadata;

        metadata
            .resource_type(name)
            .ok_or_else(|| Error::InvalidMetadata(format!("unknown resource type '{name}'")))
    }

    /// Complex or entity type a property leads to.
    pub fn target_type(&self, property: &ResourceProperty) -> Result<&'a ResourceType> {
        let name = property.target_type_name().ok_or_else(|| Error::UnexpectedPropertyType {
            property: property.name().to_owned(),
            kind: property.kind().to_string(),
        })?;

        self.resource_type(name)
    }

    /// Visible resource set by name.
    pub fn resource_set_wrapper(&self, name: &str) -> Result<Option<ResourceSetWrapper<'a>>> {
        let metadata = self.metadata;

        match metadata.resource_set(name) {
            Some(set) => self.wrap(set),
            None => Ok(None),
        }
    }

    /// Visible resource set reached through a navigation property, `None`
    /// when the target is hidden.
    pub fn resource_set_wrapper_for_navigation_property(
        &self,
        source: &ResourceSetWrapper<'a>,
        source_type: &ResourceType,
        property: &ResourceProperty,
    ) -> Result<Option<ResourceSetWrapper<'a>>> {
        let metadata = self.metadata;

        match metadata.navigation_target(source.resource_set, source_type, property) {
            Some(set) => self.wrap(set),
            None => Ok(None),
        }
    }

    fn wrap(&self, set: &'a ResourceSet) -> Result<Option<ResourceSetWrapper<'a>>> {
        let wrapper = ResourceSetWrapper {
            resource_set: set,
            resource_type: self.resource_type(set.resource_type_name())?,
            rights: self.config.rights(set.name()),
            page_size: self.config.page_size(set.name()),
            max_results_per_collection: self.config.max_results_per_collection,
        };

        Ok(wrapper.is_visible().then_some(wrapper))
    }
}
