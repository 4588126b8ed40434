//! `$orderby` support: parsed sort paths and the comparator chain built
//! from them.

mod parse;

use crate::edm::EdmType;
use crate::instance::Instance;
use crate::metadata::ResourceProperty;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub use parse::{key_order_by, parse_order_by, OrderByParser};

/// One property in a sort path.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrderBySubPathSegment<'a> {
    property: &'a ResourceProperty,
}

impl<'a> OrderBySubPathSegment<'a> {
    pub fn new(property: &'a ResourceProperty) -> Self {
        Self { property }
    }

    pub fn name(&self) -> &'a str {
        self.property.name()
    }

    pub fn property(&self) -> &'a ResourceProperty {
        self.property
    }
}

/// One `path [asc|desc]` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderByPathSegment<'a> {
    sub_path_segments: Vec<OrderBySubPathSegment<'a>>,
    is_ascending: bool,
}

impl<'a> OrderByPathSegment<'a> {
    /// `None` for an empty path.
    pub fn new(sub_path_segments: Vec<OrderBySubPathSegment<'a>>, is_ascending: bool) -> Option<Self> {
        if sub_path_segments.is_empty() {
            return None;
        }

        Some(Self {
            sub_path_segments,
            is_ascending,
        })
    }

    pub fn sub_path_segments(&self) -> &[OrderBySubPathSegment<'a>] {
        &self.sub_path_segments
    }

    pub fn is_ascending(&self) -> bool {
        self.is_ascending
    }

    pub fn path(&self) -> Vec<&'a str> {
        self.sub_path_segments.iter().map(|s| s.name()).collect()
    }

    /// Primitive type of the property the path ends on.
    pub fn leaf_type(&self) -> Option<EdmType> {
        self.sub_path_segments
            .last()
            .and_then(|s| s.property.instance_type())
    }

    pub fn navigation_properties(&self) -> Vec<&'a ResourceProperty> {
        self.sub_path_segments
            .iter()
            .map(|s| s.property)
            .filter(|p| p.kind().is_navigation())
            .collect()
    }
}

/// Comparison of two entities on one sort clause.
pub type Comparator = Arc<dyn Fn(&Instance, &Instance) -> Ordering + Send + Sync>;

/// Builds the comparator of one clause.
///
/// Null sorts before any value ascending and after it descending. Two
/// nulls, or two values without a common ordering, are equal.
fn path_comparator(path: Vec<String>, is_ascending: bool) -> Comparator {
    Arc::new(move |a: &Instance, b: &Instance| {
        let ordering = match (a.resolve(&path), b.resolve(&path)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
        };

        if is_ascending {
            ordering
        } else {
            ordering.reverse()
        }
    })
}

/// Parsed ordering of a request or an expanded collection.
///
/// ```
/// # use odata_query::config::ServiceConfig;
/// # use odata_query::edm::{EdmType, Value};
/// # use odata_query::instance::Instance;
/// # use odata_query::metadata::{Metadata, Providers, ResourceType};
/// use odata_query::orderby::parse_order_by;
/// use std::cmp::Ordering;
///
/// let mut metadata = Metadata::default();
/// metadata.add_resource_type(
///     ResourceType::entity("Product")
///         .key("ProductID", EdmType::Int32)
///         .primitive("ProductName", EdmType::String),
/// )?;
/// metadata.add_resource_set("Products", "Product")?;
/// let config = ServiceConfig::default();
/// let providers = Providers::new(&metadata, &config);
/// let products = providers.resource_set_wrapper("Products")?.unwrap();
///
/// let order_by = parse_order_by("ProductName desc", providers, products, false)?;
///
/// let chai = Instance::new().with("ProductName", Value::String("Chai".to_owned()));
/// let chang = Instance::new().with("ProductName", Value::String("Chang".to_owned()));
/// assert_eq!(order_by.compare(&chai, &chang), Ordering::Greater);
/// # Ok::<(), odata_query::Error>(())
/// ```
#[derive(Clone)]
pub struct InternalOrderByInfo<'a> {
    order_by_path_segments: Vec<OrderByPathSegment<'a>>,
    navigation_properties: Vec<Vec<&'a ResourceProperty>>,
    comparators: Vec<Comparator>,
}

impl<'a> InternalOrderByInfo<'a> {
    pub fn new(order_by_path_segments: Vec<OrderByPathSegment<'a>>) -> Self {
        let mut navigation_properties: Vec<Vec<&'a ResourceProperty>> = Vec::new();
        for segment in &order_by_path_segments {
            let navigations = segment.navigation_properties();
            if !navigations.is_empty() && !navigation_properties.contains(&navigations) {
                navigation_properties.push(navigations);
            }
        }

        let comparators = order_by_path_segments
            .iter()
            .map(|segment| {
                let path = segment.path().into_iter().map(str::to_owned).collect();
                path_comparator(path, segment.is_ascending)
            })
            .collect();

        Self {
            order_by_path_segments,
            navigation_properties,
            comparators,
        }
    }

    pub fn order_by_path_segments(&self) -> &[OrderByPathSegment<'a>] {
        &self.order_by_path_segments
    }

    /// Navigation properties crossed by each clause that crosses any.
    pub fn navigation_properties(&self) -> &[Vec<&'a ResourceProperty>] {
        &self.navigation_properties
    }

    /// One comparator per clause, in clause order.
    pub fn sub_comparators(&self) -> &[Comparator] {
        &self.comparators
    }

    /// Compares clause by clause; the first non-equal result wins.
    pub fn compare(&self, a: &Instance, b: &Instance) -> Ordering {
        self.comparators
            .iter()
            .map(|comparator| comparator(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Stable sort of `entries` by this ordering.
    pub fn sort(&self, entries: &mut [Instance]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Debug for InternalOrderByInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalOrderByInfo")
            .field("order_by_path_segments", &self.order_by_path_segments)
            .field("navigation_properties", &self.navigation_properties)
            .finish_non_exhaustive()
    }
}
