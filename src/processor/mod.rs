//! Reads the system query options of a request, checks that they apply
//! to the targeted resource and parses each into the request description.

use crate::error::{Error, Result};
use crate::filters::{parse_filter, FilterInfo};
use crate::metadata::{Providers, ResourceSetWrapper};
use crate::orderby::{key_order_by, parse_order_by, InternalOrderByInfo};
use crate::projection::{parse_expand_and_select, RootProjectionNode};
use crate::skiptoken::{parse_skip_token, InternalSkipTokenInfo};
use indexmap::IndexMap;
use std::collections::HashMap;

pub const FILTER: &str = "$filter";
pub const ORDER_BY: &str = "$orderby";
pub const EXPAND: &str = "$expand";
pub const SELECT: &str = "$select";
pub const TOP: &str = "$top";
pub const SKIP: &str = "$skip";
pub const SKIP_TOKEN: &str = "$skiptoken";
pub const INLINE_COUNT: &str = "$inlinecount";
pub const FORMAT: &str = "$format";

const SYSTEM_OPTIONS: [&str; 9] = [
    FILTER,
    ORDER_BY,
    EXPAND,
    SELECT,
    TOP,
    SKIP,
    SKIP_TOKEN,
    INLINE_COUNT,
    FORMAT,
];

/// Options that shape the query result; `$format` is left to the response
/// writer.
const QUERY_OPTIONS: [&str; 8] = [
    FILTER,
    ORDER_BY,
    EXPAND,
    SELECT,
    TOP,
    SKIP,
    SKIP_TOKEN,
    INLINE_COUNT,
];

/// The query string of a request, split into system options and
/// parameter aliases. Other custom options are ignored.
///
/// ```
/// use odata_query::processor::QueryOptions;
///
/// let options = QueryOptions::from_pairs([
///     ("$filter", "Price gt @p"),
///     ("@p", "10"),
///     ("tracking", "on"),
/// ])
/// .unwrap();
///
/// assert_eq!(options.get("$filter"), Some("Price gt @p"));
/// assert_eq!(options.aliases().get("p").map(String::as_str), Some("10"));
/// assert!(QueryOptions::from_pairs([("$top", "1"), ("$top", "2")]).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    system: IndexMap<String, String>,
    aliases: HashMap<String, String>,
}

impl QueryOptions {
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut options = Self::default();

        for (name, value) in pairs {
            let name = name.into();
            let value = value.into();

            if let Some(alias) = name.strip_prefix('@') {
                if options.aliases.insert(alias.to_owned(), value).is_some() {
                    return Err(Error::DuplicateOption { name });
                }
            } else if name.starts_with('$') {
                if !SYSTEM_OPTIONS.contains(&name.as_str()) {
                    return Err(Error::UnknownSystemOption { name });
                }
                if options.system.contains_key(&name) {
                    return Err(Error::DuplicateOption { name });
                }
                options.system.insert(name, value);
            }
        }

        Ok(options)
    }

    /// Value of a system option.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.system.get(name).map(String::as_str)
    }

    /// Parameter alias values keyed by name without the `@`.
    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }
}

/// What the resource path of a request addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// Entities of a resource set.
    Resource,
    /// `$links` to related entities.
    Link,
    ComplexObject,
    Primitive,
    /// `$value` of a primitive property.
    PrimitiveValue,
    Bag,
    MediaResource,
    Metadata,
    ServiceDirectory,
    Batch,
}

/// The resource a request addresses, as resolved from its path.
#[derive(Copy, Clone, Debug)]
pub struct RequestTarget<'a> {
    kind: TargetKind,
    resource_set: Option<ResourceSetWrapper<'a>>,
    is_single_result: bool,
    is_count_request: bool,
}

impl<'a> RequestTarget<'a> {
    /// All entities of a resource set, e.g. `/Customers`.
    pub fn collection(resource_set: ResourceSetWrapper<'a>) -> Self {
        Self {
            kind: TargetKind::Resource,
            resource_set: Some(resource_set),
            is_single_result: false,
            is_count_request: false,
        }
    }

    /// One entity, e.g. `/Customers('ALFKI')`.
    pub fn single(resource_set: ResourceSetWrapper<'a>) -> Self {
        Self {
            is_single_result: true,
            ..Self::collection(resource_set)
        }
    }

    /// Links to entities of `resource_set`.
    pub fn links(resource_set: ResourceSetWrapper<'a>, is_single_result: bool) -> Self {
        Self {
            kind: TargetKind::Link,
            is_single_result,
            ..Self::collection(resource_set)
        }
    }

    /// A target that is not a resource set, e.g. `$metadata`.
    pub fn other(kind: TargetKind) -> Self {
        Self {
            kind,
            resource_set: None,
            is_single_result: true,
            is_count_request: false,
        }
    }

    /// Marks the request as `$count`.
    pub fn counted(mut self) -> Self {
        self.is_count_request = true;
        self
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn resource_set(&self) -> Option<ResourceSetWrapper<'a>> {
        self.resource_set
    }

    pub fn is_single_result(&self) -> bool {
        self.is_single_result
    }

    pub fn is_count_request(&self) -> bool {
        self.is_count_request
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InlineCount {
    #[default]
    None,
    AllPages,
}

/// Everything the data layer needs to execute a query.
#[derive(Clone, Debug, Default)]
pub struct RequestDescription<'a> {
    pub filter: Option<FilterInfo<'a>>,
    pub internal_order_by_info: Option<InternalOrderByInfo<'a>>,
    /// Entities to return: `$top`, clamped to the page size when paged.
    pub top_count: Option<usize>,
    /// `$top` as the request gave it.
    pub top_option_count: Option<usize>,
    pub skip_count: Option<usize>,
    pub skip_token: Option<InternalSkipTokenInfo>,
    pub inline_count: InlineCount,
    pub root_projection_node: Option<RootProjectionNode<'a>>,
}

/// Processes the query options of requests against one service.
#[derive(Copy, Clone)]
pub struct QueryProcessor<'a> {
    providers: Providers<'a>,
}

impl<'a> QueryProcessor<'a> {
    pub fn new(providers: Providers<'a>) -> Self {
        Self { providers }
    }

    /// Validates `options` against `target` and parses them.
    pub fn process(
        &self,
        target: &RequestTarget<'a>,
        options: &QueryOptions,
    ) -> Result<RequestDescription<'a>> {
        let resource_set = match (target.kind, target.resource_set) {
            (TargetKind::Resource | TargetKind::Link, Some(set)) => set,
            _ => {
                if let Some(option) = QUERY_OPTIONS.into_iter().find(|o| options.get(o).is_some()) {
                    return Err(Error::OptionNotApplicable { option });
                }
                return Ok(RequestDescription::default());
            }
        };

        resource_set.check_rights_for_read(target.is_single_result)?;

        if target.is_single_result {
            for option in [ORDER_BY, TOP, SKIP, SKIP_TOKEN, INLINE_COUNT] {
                if options.get(option).is_some() {
                    return Err(Error::OptionNotApplicable { option });
                }
            }
        }

        if target.is_count_request && !self.providers.config().accept_count_requests {
            return Err(Error::CountRequestsDisabled);
        }

        let mut description = RequestDescription::default();

        if let Some(filter) = options.get(FILTER) {
            log::debug!("processing {FILTER} on {}", resource_set.name());
            description.filter = Some(parse_filter(
                filter,
                self.providers,
                resource_set,
                options.aliases(),
            )?);
        }

        let top = count_option(options, TOP)?;
        let skip = count_option(options, SKIP)?;
        let page_size = resource_set.page_size();
        let is_paged = !target.is_single_result && !target.is_count_request && page_size > 0;

        description.top_option_count = top;
        description.skip_count = skip;
        description.top_count = match (top, is_paged) {
            (Some(top), true) => Some(top.min(page_size)),
            (None, true) => Some(page_size),
            (top, false) => top,
        };

        let order_by = options.get(ORDER_BY);
        let needs_total_order = top.is_some() || skip.is_some() || is_paged;

        if order_by.is_some() || needs_total_order {
            log::debug!("processing {ORDER_BY} on {}", resource_set.name());
            description.internal_order_by_info = Some(match order_by {
                Some(text) => {
                    parse_order_by(text, self.providers, resource_set, needs_total_order)?
                }
                None => InternalOrderByInfo::new(key_order_by(resource_set.resource_type())),
            });
        }

        if let Some(skip_token) = options.get(SKIP_TOKEN) {
            let order_by = match (&description.internal_order_by_info, is_paged) {
                (Some(order_by), true) => order_by,
                _ => {
                    return Err(Error::SkipTokenWithoutPaging {
                        resource_set: resource_set.name().to_owned(),
                    })
                }
            };

            log::debug!("processing {SKIP_TOKEN} on {}", resource_set.name());
            description.skip_token = Some(parse_skip_token(skip_token, order_by)?);
        }

        if let Some(inline_count) = options.get(INLINE_COUNT) {
            description.inline_count = match inline_count {
                "none" => InlineCount::None,
                "allpages" if target.is_count_request => {
                    return Err(Error::OptionNotApplicable {
                        option: INLINE_COUNT,
                    })
                }
                "allpages" if !self.providers.config().accept_count_requests => {
                    return Err(Error::CountRequestsDisabled)
                }
                "allpages" => InlineCount::AllPages,
                other => {
                    return Err(Error::InvalidInlineCount {
                        value: other.to_owned(),
                    })
                }
            };
        }

        let expand = options.get(EXPAND);
        let select = options.get(SELECT);

        if expand.is_some() || select.is_some() {
            let option = if expand.is_some() { EXPAND } else { SELECT };
            if target.kind != TargetKind::Resource || target.is_count_request {
                return Err(Error::OptionNotApplicable { option });
            }

            log::debug!("processing {EXPAND}/{SELECT} on {}", resource_set.name());
            description.root_projection_node = Some(parse_expand_and_select(
                self.providers,
                resource_set,
                description.internal_order_by_info.clone(),
                description.skip_count,
                description.top_count,
                expand,
                select,
            )?);
        }

        Ok(description)
    }
}

/// Parses `$top` or `$skip` as a non-negative integer.
fn count_option(options: &QueryOptions, option: &'static str) -> Result<Option<usize>> {
    options
        .get(option)
        .map(|value| {
            // Digits only: `str::parse` would also take a leading '+'.
            let digits = !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());

            digits
                .then(|| value.parse::<usize>().ok())
                .flatten()
                .ok_or_else(|| Error::InvalidArgumentFormat {
                    option,
                    value: value.to_owned(),
                })
        })
        .transpose()
}
