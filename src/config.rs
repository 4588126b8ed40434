//! Service-wide settings that shape query processing.

use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wildcard key applying to every resource set without its own entry.
pub const ALL_RESOURCE_SETS: &str = "*";

/// Read rights on a resource set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntitySetRights {
    /// The set is invisible.
    None,
    ReadSingle,
    ReadMultiple,
    #[default]
    ReadAll,
}

impl EntitySetRights {
    pub fn can_read_single(self) -> bool {
        matches!(self, EntitySetRights::ReadSingle | EntitySetRights::ReadAll)
    }

    pub fn can_read_multiple(self) -> bool {
        matches!(self, EntitySetRights::ReadMultiple | EntitySetRights::ReadAll)
    }
}

/// Configuration of a data service.
///
/// ```
/// use odata_query::config::{EntitySetRights, ServiceConfig};
///
/// let config = ServiceConfig::default()
///     .with_page_size("Customers", 20)
///     .with_access_rule("Employees", EntitySetRights::None)
///     .with_max_expand_depth(3);
///
/// assert_eq!(config.page_size("Customers"), 20);
/// assert_eq!(config.page_size("Orders"), 0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ServiceConfig {
    /// Server page size per resource set, 0 disables paging.
    pub entity_set_page_size: HashMap<String, usize>,

    /// Read rights per resource set.
    pub entity_set_access_rule: HashMap<String, EntitySetRights>,

    /// Upper bound on entities returned for any collection; excludes paging.
    pub max_results_per_collection: Option<usize>,

    /// Upper bound on the number of `$expand` paths.
    pub max_expand_count: Option<usize>,

    /// Upper bound on the number of segments in an `$expand` path.
    pub max_expand_depth: Option<usize>,

    /// Whether `$inlinecount` and `$count` are served.
    pub accept_count_requests: bool,

    /// Whether `$select` is served.
    pub accept_projection_requests: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            entity_set_page_size: HashMap::new(),
            entity_set_access_rule: HashMap::new(),
            max_results_per_collection: None,
            max_expand_count: None,
            max_expand_depth: None,
            accept_count_requests: true,
            accept_projection_requests: true,
        }
    }
}

impl ServiceConfig {
    /// Page size of a resource set, falling back to the wildcard entry.
    pub fn page_size(&self, resource_set: &str) -> usize {
        self.entity_set_page_size
            .get(resource_set)
            .or_else(|| self.entity_set_page_size.get(ALL_RESOURCE_SETS))
            .copied()
            .unwrap_or(0)
    }

    /// Rights on a resource set, falling back to the wildcard entry.
    pub fn rights(&self, resource_set: &str) -> EntitySetRights {
        self.entity_set_access_rule
            .get(resource_set)
            .or_else(|| self.entity_set_access_rule.get(ALL_RESOURCE_SETS))
            .copied()
            .unwrap_or_default()
    }

    pub fn with_page_size(mut self, resource_set: impl Into<String>, page_size: usize) -> Self {
        self.entity_set_page_size.insert(resource_set.into(), page_size);
        self
    }

    pub fn with_access_rule(
        mut self,
        resource_set: impl Into<String>,
        rights: EntitySetRights,
    ) -> Self {
        self.entity_set_access_rule.insert(resource_set.into(), rights);
        self
    }

    pub fn with_max_results_per_collection(mut self, max: usize) -> Self {
        self.max_results_per_collection = Some(max);
        self
    }

    pub fn with_max_expand_count(mut self, max: usize) -> Self {
        self.max_expand_count = Some(max);
        self
    }

    pub fn with_max_expand_depth(mut self, max: usize) -> Self {
        self.max_expand_depth = Some(max);
        self
    }

    pub fn with_count_requests(mut self, accept: bool) -> Self {
        self.accept_count_requests = accept;
        self
    }

    pub fn with_projection_requests(mut self, accept: bool) -> Self {
        self.accept_projection_requests = accept;
        self
    }

    /// Rejects paging combined with a per-collection result limit.
    pub fn validate(&self) -> Result<()> {
        let paged = self.entity_set_page_size.values().any(|size| *size > 0);

        if paged && self.max_results_per_collection.is_some() {
            return Err(Error::InvalidConfiguration(
                "server paging and max_results_per_collection cannot be combined".to_owned(),
            ));
        }

        Ok(())
    }
}
