mod common;

use odata_query::config::{EntitySetRights, ServiceConfig};
use odata_query::metadata::Providers;
use odata_query::projection::{
    parse_expand_and_select, ExpandedProjectionNode, ProjectionNode, RootProjectionNode, MAX_DEPTH,
};
use odata_query::{Error, Result};
use pretty_assertions::assert_eq;

fn with_projection<T>(
    config: &ServiceConfig,
    expand: Option<&str>,
    select: Option<&str>,
    f: impl FnOnce(&RootProjectionNode<'_>) -> T,
) -> Result<T> {
    let metadata = common::northwind();
    let providers = Providers::new(&metadata, config);
    let customers = common::set(providers, "Customers");

    let root = parse_expand_and_select(providers, customers, None, None, None, expand, select)?;
    Ok(f(&root))
}

fn projection_error(config: &ServiceConfig, expand: Option<&str>, select: Option<&str>) -> Error {
    with_projection(config, expand, select, |_| ()).expect_err("invalid projection")
}

fn child<'n, 'a>(node: &'n ExpandedProjectionNode<'a>, name: &str) -> &'n ExpandedProjectionNode<'a> {
    node.find_node(name)
        .and_then(ProjectionNode::as_expanded)
        .unwrap_or_else(|| panic!("{name} is expanded"))
}

fn child_names(node: &ExpandedProjectionNode<'_>) -> Vec<String> {
    node.children().map(|c| c.name().to_owned()).collect()
}

#[test]
fn select_keeps_everything_below_a_selected_expansion() {
    let config = ServiceConfig::default();

    with_projection(
        &config,
        Some("Orders/Order_Details,Orders/Order_Details/Product,Orders/Order_Details/Order"),
        Some("Orders/Order_Details"),
        |root| {
            let orders = child(root, "Orders");
            let details = child(orders, "Order_Details");
            let product = child(details, "Product");
            let order = child(details, "Order");

            assert!(!root.can_select_all_properties());
            assert!(!orders.can_select_all_properties());
            assert!(details.can_select_all_properties());
            assert!(product.can_select_all_properties());
            assert!(order.can_select_all_properties());

            assert_eq!(child_names(details), vec!["Product".to_owned(), "Order".to_owned()]);
        },
    )
    .expect("valid projection");
}

#[test]
fn unselected_expansions_are_pruned() {
    let config = ServiceConfig::default();

    with_projection(
        &config,
        Some("Orders/Order_Details,BestFriend/Orders"),
        Some("Orders/Order_Details"),
        |root| {
            assert!(root.find_node("BestFriend").is_none());
            assert_eq!(child_names(root), vec!["Orders".to_owned()]);
            assert!(root.is_selection_specified());
            assert!(root.is_expansion_specified());
        },
    )
    .expect("valid projection");
}

#[test]
fn without_select_everything_is_selected() {
    let config = ServiceConfig::default();

    with_projection(&config, Some("BestFriend,Orders/Customer"), None, |root| {
        assert!(root.can_select_all_properties());
        assert!(child(child(root, "Orders"), "Customer").can_select_all_properties());
        assert!(!root.is_selection_specified());
        assert_eq!(child_names(root), vec!["Orders".to_owned(), "BestFriend".to_owned()]);
    })
    .expect("valid projection");
}

#[test]
fn children_follow_declaration_order() {
    let config = ServiceConfig::default();

    with_projection(
        &config,
        Some("Orders"),
        Some("Orders,CompanyName,CustomerID"),
        |root| {
            assert_eq!(
                child_names(root),
                vec![
                    "CustomerID".to_owned(),
                    "CompanyName".to_owned(),
                    "Orders".to_owned(),
                ]
            );
            assert!(!root.can_select_all_properties());
            assert!(child(root, "Orders").can_select_all_properties());
        },
    )
    .expect("valid projection");
}

#[test]
fn star_selects_immediate_properties() {
    let config = ServiceConfig::default();

    with_projection(&config, None, Some("*,CompanyName"), |root| {
        assert!(root.select_all_immediate_properties());
        assert!(root.can_select_all_properties());
        assert_eq!(child_names(root), Vec::<String>::new());
    })
    .expect("valid projection");

    with_projection(&config, Some("Orders"), Some("Orders/*"), |root| {
        let orders = child(root, "Orders");
        assert!(orders.select_all_immediate_properties());
        assert!(!orders.select_subtree());
    })
    .expect("valid projection");
}

#[test]
fn navigation_links_can_be_selected() {
    let config = ServiceConfig::default();

    with_projection(&config, None, Some("BestFriend"), |root| {
        match root.find_node("BestFriend") {
            Some(ProjectionNode::Property(property)) => assert_eq!(property.name(), "BestFriend"),
            other => panic!("expected a property leaf, got {other:?}"),
        }
    })
    .expect("valid projection");
}

#[test]
fn expansion_reuses_shared_prefixes() {
    let config = ServiceConfig::default();

    with_projection(&config, Some("Orders/Customer,Orders/Order_Details,Orders"), None, |root| {
        assert_eq!(child_names(root), vec!["Orders".to_owned()]);
        assert_eq!(
            child_names(child(root, "Orders")),
            vec!["Customer".to_owned(), "Order_Details".to_owned()]
        );
    })
    .expect("valid projection");
}

#[test]
fn eager_load_list_has_one_path_per_branch() {
    let config = ServiceConfig::default();

    let paths = with_projection(
        &config,
        Some("BestFriend,Orders/Order_Details/Product,Orders/Customer"),
        None,
        |root| root.eager_load_list(),
    )
    .expect("valid projection")
    .expect("bounded tree");

    assert_eq!(
        paths,
        vec![
            "Orders/Customer".to_owned(),
            "Orders/Order_Details/Product".to_owned(),
            "BestFriend".to_owned(),
        ]
    );

    let empty = with_projection(&config, None, Some("CompanyName"), |root| root.eager_load_list())
        .expect("valid projection")
        .expect("bounded tree");
    assert_eq!(empty, Vec::<String>::new());
}

#[test]
fn paged_expansions_are_ordered_by_key() {
    let config = ServiceConfig::default().with_page_size("Orders", 2);

    with_projection(&config, Some("Orders,BestFriend"), None, |root| {
        assert!(root.has_paged_expanded_result());

        let orders = child(root, "Orders");
        assert_eq!(orders.take_count(), Some(2));
        let keys: Vec<_> = orders
            .internal_order_by_info()
            .expect("key ordering")
            .order_by_path_segments()
            .iter()
            .map(|s| s.path().join("/"))
            .collect();
        assert_eq!(keys, vec!["OrderID".to_owned()]);

        let friend = child(root, "BestFriend");
        assert!(friend.internal_order_by_info().is_none());
        assert_eq!(friend.take_count(), None);
    })
    .expect("valid projection");
}

#[test]
fn collection_limit_applies_to_unpaged_expansions() {
    let config = ServiceConfig::default().with_max_results_per_collection(50);

    with_projection(&config, Some("Orders"), None, |root| {
        assert!(!root.has_paged_expanded_result());
        assert_eq!(child(root, "Orders").max_result_count(), Some(50));
    })
    .expect("valid projection");
}

#[test]
fn expand_errors() {
    let config = ServiceConfig::default();

    assert_eq!(
        projection_error(&config, Some("CompanyName"), None),
        Error::ExpandRequiresNavigation {
            type_name: "Customer".to_owned(),
            property: "CompanyName".to_owned(),
        }
    );
    assert_eq!(
        projection_error(&config, Some("Nope"), None),
        Error::PropertyNotFound {
            type_name: "Customer".to_owned(),
            property: "Nope".to_owned(),
        }
    );
    assert!(matches!(
        projection_error(&config, Some("*"), None),
        Error::ExpectedToken { .. }
    ));
}

#[test]
fn expand_limits() {
    let count = ServiceConfig::default().with_max_expand_count(1);
    assert_eq!(
        projection_error(&count, Some("Orders,BestFriend"), None),
        Error::TooManyExpandPaths { count: 2, max: 1 }
    );

    let depth = ServiceConfig::default().with_max_expand_depth(2);
    assert_eq!(
        projection_error(&depth, Some("Orders/Order_Details/Product"), None),
        Error::ExpandTooDeep { max: 2 }
    );
    assert!(with_projection(&depth, Some("Orders/Order_Details"), None, |_| ()).is_ok());
}

#[test]
fn expand_checks_target_rights() {
    let hidden = ServiceConfig::default().with_access_rule("Employees", EntitySetRights::None);
    assert_eq!(
        projection_error(&hidden, Some("Orders/Employee"), None),
        Error::InvisibleNavigationTarget {
            type_name: "Order".to_owned(),
            property: "Employee".to_owned(),
        }
    );

    let single_only = ServiceConfig::default().with_access_rule("Orders", EntitySetRights::ReadSingle);
    assert_eq!(
        projection_error(&single_only, Some("Orders"), None),
        Error::Forbidden {
            resource_set: "Orders".to_owned(),
        }
    );
}

#[test]
fn select_errors() {
    let config = ServiceConfig::default();

    assert_eq!(
        projection_error(&config, None, Some("Orders/OrderID")),
        Error::SelectWithoutMatchingExpand {
            property: "Orders".to_owned(),
        }
    );
    assert_eq!(
        projection_error(&config, None, Some("Address/City")),
        Error::ComplexAsInnerSelectSegment {
            property: "Address".to_owned(),
        }
    );
    assert_eq!(
        projection_error(&config, None, Some("CompanyName/Length")),
        Error::PrimitiveAsInnerSelectSegment {
            property: "CompanyName".to_owned(),
        }
    );
    assert_eq!(
        projection_error(&config, None, Some("Phones/Number")),
        Error::BagAsInnerSelectSegment {
            property: "Phones".to_owned(),
        }
    );
}

#[test]
fn projections_can_be_disabled() {
    let config = ServiceConfig::default().with_projection_requests(false);

    assert_eq!(
        projection_error(&config, Some("Orders"), Some("CompanyName")),
        Error::ProjectionDisabled
    );
    assert!(with_projection(&config, Some("Orders"), None, |_| ()).is_ok());
}

#[test]
fn expand_depth_is_bounded_while_building() {
    let config = ServiceConfig::default();
    let path = |depth: usize| vec!["BestFriend"; depth].join("/");

    let deepest = path(MAX_DEPTH);
    let paths = with_projection(&config, Some(deepest.as_str()), None, |root| root.eager_load_list())
        .expect("valid projection")
        .expect("bounded tree");
    assert_eq!(paths, vec![deepest.clone()]);

    let too_deep = path(MAX_DEPTH + 5);
    assert_eq!(
        projection_error(&config, Some(too_deep.as_str()), None),
        Error::ExpandTooDeep { max: MAX_DEPTH }
    );

    let lenient = ServiceConfig::default().with_max_expand_depth(100);
    assert_eq!(
        projection_error(&lenient, Some(too_deep.as_str()), None),
        Error::ExpandTooDeep { max: MAX_DEPTH }
    );
}
