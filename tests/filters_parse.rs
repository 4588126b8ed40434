mod common;

use odata_query::config::{EntitySetRights, ServiceConfig};
use odata_query::edm::{EdmType, Value};
use odata_query::filters::{
    parse_filter, to_query_string, BinaryOperator, Expression, ExpressionParser, UnaryOperator,
};
use odata_query::metadata::Providers;
use odata_query::{Error, ErrorKind, Result};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn render_with(config: &ServiceConfig, set: &str, text: &str, aliases: &HashMap<String, String>) -> Result<String> {
    let metadata = common::northwind();
    let providers = Providers::new(&metadata, config);
    let filter = parse_filter(text, providers, common::set(providers, set), aliases)?;
    to_query_string(filter.expression())
}

fn render(set: &str, text: &str) -> Result<String> {
    render_with(&ServiceConfig::default(), set, text, &HashMap::new())
}

fn parse_error(set: &str, text: &str) -> Error {
    render(set, text).expect_err("invalid filter")
}

#[test]
fn and_binds_tighter_than_or() {
    let filter = "OrderID gt 5 or OrderID lt 2 and Freight eq 1";

    assert_eq!(
        render("Orders", filter).expect("valid filter"),
        "(OrderID gt 5) or ((OrderID lt 2) and (Freight eq 1M))"
    );
}

#[test]
fn multiplicative_binds_tighter_than_additive() {
    let filter = "Freight add 2 mul 3 gt 10";

    assert_eq!(
        render("Orders", filter).expect("valid filter"),
        "(Freight add (2 mul 3)) gt 10M"
    );
}

#[test]
fn parentheses_override_precedence() {
    let filter = "(OrderID gt 5 or OrderID lt 2) and Freight eq 1";

    assert_eq!(
        render("Orders", filter).expect("valid filter"),
        "((OrderID gt 5) or (OrderID lt 2)) and (Freight eq 1M)"
    );
}

#[test]
fn not_grouping() {
    assert_eq!(
        render("Orders", "not (ShipVia eq 1)").expect("valid filter"),
        "not (ShipVia eq 1)"
    );
    assert_eq!(
        render("Orders", "not not (ShipVia eq 1)").expect("valid filter"),
        "not not (ShipVia eq 1)"
    );
}

#[test]
fn negation() {
    assert_eq!(
        render("Orders", "-Freight lt -5").expect("valid filter"),
        "-Freight lt -5M"
    );
}

#[test]
fn operands_widen_to_the_common_type() {
    assert_eq!(
        render("Orders", "ShipVia add 1L eq 3").expect("valid filter"),
        "(ShipVia add 1L) eq 3L"
    );
}

#[test]
fn expression_tree_carries_promoted_types() {
    let metadata = common::northwind();
    let config = ServiceConfig::default();
    let providers = Providers::new(&metadata, &config);
    let orders = common::set(providers, "Orders");

    let filter =
        parse_filter("ShipVia add 1 gt 2", providers, orders, &HashMap::new()).expect("valid filter");

    let Expression::Binary {
        operator: BinaryOperator::GreaterThan,
        left,
        right,
        ty: EdmType::Boolean,
    } = filter.expression()
    else {
        panic!("expected a comparison, got {:?}", filter.expression());
    };

    let Expression::Binary {
        operator: BinaryOperator::Add,
        left: ship_via,
        right: one,
        ty: EdmType::Int32,
    } = left.as_ref()
    else {
        panic!("expected an addition, got {left:?}");
    };

    match ship_via.as_ref() {
        Expression::PropertyAccess(access) => {
            assert_eq!(access.path(), vec!["ShipVia"]);
            assert_eq!(access.property().instance_type(), Some(EdmType::Int16));
            assert_eq!(access.result_type(), EdmType::Int32);
        }
        other => panic!("expected a property access, got {other:?}"),
    }

    assert_eq!(
        one.as_ref(),
        &Expression::Constant {
            value: Value::Int32(1),
            ty: EdmType::Int32,
        }
    );
    assert_eq!(right.result_type(), EdmType::Int32);
}

#[test]
fn function_arguments_are_not_promoted() {
    let metadata = common::northwind();
    let config = ServiceConfig::default();
    let providers = Providers::new(&metadata, &config);
    let orders = common::set(providers, "Orders");

    let filter =
        parse_filter("round(ShipVia) gt 5", providers, orders, &HashMap::new()).expect("valid filter");

    let Expression::Binary { left, .. } = filter.expression() else {
        panic!("expected a comparison, got {:?}", filter.expression());
    };

    match left.as_ref() {
        Expression::FunctionCall {
            function,
            arguments,
            ty,
        } => {
            assert_eq!(function.name, "round");
            assert_eq!(*ty, EdmType::Decimal);
            assert_eq!(arguments[0].result_type(), EdmType::Int16);
        }
        other => panic!("expected a function call, got {other:?}"),
    }
}

#[test]
fn function_calls() {
    assert_eq!(
        render(
            "Customers",
            "substringof('Alf', CompanyName) and length(CompanyName) ge 5"
        )
        .expect("valid filter"),
        "substringof('Alf', CompanyName) and (length(CompanyName) ge 5)"
    );
    assert_eq!(
        render("Orders", "year(OrderDate) eq 1996 and round(Freight) gt 30")
            .expect("valid filter"),
        "(year(OrderDate) eq 1996) and (round(Freight) gt 30M)"
    );
    assert_eq!(
        render("Customers", "substring(CompanyName, 1, 2) eq 'lf'").expect("valid filter"),
        "substring(CompanyName, 1, 2) eq 'lf'"
    );
}

#[test]
fn paths_through_complex_and_navigation_properties() {
    assert_eq!(
        render("Customers", "Address/City eq 'Berlin'").expect("valid filter"),
        "Address/City eq 'Berlin'"
    );
    assert_eq!(
        render("Orders", "Customer/Address/City ne null").expect("valid filter"),
        "Customer/Address/City ne null"
    );
}

#[test]
fn navigation_properties_are_collected_once() {
    let metadata = common::northwind();
    let config = ServiceConfig::default();
    let providers = Providers::new(&metadata, &config);
    let orders = common::set(providers, "Orders");

    let filter = parse_filter(
        "Customer/CompanyName eq 'a' or Customer/CustomerID eq 'b' or OrderID eq 1",
        providers,
        orders,
        &HashMap::new(),
    )
    .expect("valid filter");

    let navigations: Vec<Vec<&str>> = filter
        .navigation_properties()
        .iter()
        .map(|path| path.iter().map(|p| p.name()).collect())
        .collect();
    assert_eq!(navigations, vec![vec!["Customer"]]);

    let mut parser = ExpressionParser::new("BestFriend/BestFriend/CompanyName eq 'x'", providers, common::set(providers, "Customers"))
        .expect("valid first token");
    parser.parse().expect("valid filter");

    let navigations: Vec<Vec<&str>> = parser
        .navigation_properties()
        .iter()
        .map(|path| path.iter().map(|p| p.name()).collect())
        .collect();
    assert_eq!(navigations, vec![vec!["BestFriend", "BestFriend"]]);
}

#[test]
fn null_and_guid_equality() {
    assert_eq!(
        render("Orders", "Freight eq null").expect("valid filter"),
        "Freight eq null"
    );
    assert_eq!(
        render("Orders", "null ne Freight").expect("valid filter"),
        "null ne Freight"
    );
    assert_eq!(
        render("Orders", "Tag eq guid'0f8fad5b-d9cb-469f-a165-70867728950e'").expect("valid filter"),
        "Tag eq guid'0f8fad5b-d9cb-469f-a165-70867728950e'"
    );
    assert_eq!(
        render("Customers", "Photo ne X'00FF'").expect("valid filter"),
        "Photo ne binary'00FF'"
    );
}

#[test]
fn ordering_against_null_is_rejected() {
    assert_eq!(
        parse_error("Orders", "OrderID gt null"),
        Error::EqualityOnlyOperator {
            operator: "gt".to_owned(),
            operand: "null".to_owned(),
            position: 8,
        }
    );
}

#[test]
fn ordering_guids_and_binaries_is_rejected() {
    assert_eq!(
        parse_error("Orders", "Tag lt guid'0f8fad5b-d9cb-469f-a165-70867728950e'"),
        Error::EqualityOnlyOperator {
            operator: "lt".to_owned(),
            operand: "Edm.Guid".to_owned(),
            position: 4,
        }
    );
    assert_eq!(
        parse_error("Customers", "Photo ge x'00'"),
        Error::EqualityOnlyOperator {
            operator: "ge".to_owned(),
            operand: "Edm.Binary".to_owned(),
            position: 6,
        }
    );
}

#[test]
fn incompatible_operands() {
    let error = parse_error("Customers", "CompanyName eq 1");

    assert_eq!(
        error,
        Error::IncompatibleOperands {
            operator: "eq".to_owned(),
            operand_types: "Edm.String and Edm.Int32".to_owned(),
            position: 12,
        }
    );
    assert_eq!(error.kind(), ErrorKind::Syntax);
    assert_eq!(error.position(), Some(12));

    assert_eq!(
        parse_error("Orders", "Freight add 'a' gt 1"),
        Error::IncompatibleOperands {
            operator: "add".to_owned(),
            operand_types: "Edm.Decimal and Edm.String".to_owned(),
            position: 8,
        }
    );
    assert_eq!(
        parse_error("Orders", "not OrderID"),
        Error::IncompatibleOperands {
            operator: "not".to_owned(),
            operand_types: "Edm.Int32".to_owned(),
            position: 0,
        }
    );
}

#[test]
fn collections_and_bags_are_rejected() {
    let error = parse_error("Customers", "Orders/OrderID eq 1");
    assert_eq!(
        error,
        Error::CollectionNavigationNotAllowed {
            property: "Orders".to_owned(),
            type_name: "Customer".to_owned(),
            clause: "$filter",
        }
    );
    assert_eq!(error.kind(), ErrorKind::BadRequest);

    assert_eq!(
        parse_error("Customers", "Phones eq 'x'"),
        Error::BagPropertyNotAllowed {
            property: "Phones".to_owned(),
            type_name: "Customer".to_owned(),
            clause: "$filter",
        }
    );
}

#[test]
fn invalid_property_paths() {
    assert_eq!(
        parse_error("Customers", "CompanyName/Length eq 1"),
        Error::PrimitivePropertyAsIntermediate {
            property: "CompanyName".to_owned(),
            clause: "$filter",
        }
    );
    assert_eq!(
        parse_error("Orders", "Nope eq 1"),
        Error::PropertyNotFound {
            type_name: "Order".to_owned(),
            property: "Nope".to_owned(),
        }
    );
    assert_eq!(
        parse_error("Customers", "Address/Zip eq 1"),
        Error::PropertyNotFound {
            type_name: "Address".to_owned(),
            property: "Zip".to_owned(),
        }
    );
    assert_eq!(
        parse_error("Customers", "'abc'/x eq 1"),
        Error::MemberAccessOnNonProperty {
            property: "x".to_owned(),
            position: 5,
        }
    );
}

#[test]
fn hidden_navigation_targets_are_not_properties() {
    let config = ServiceConfig::default().with_access_rule("Employees", EntitySetRights::None);

    assert_eq!(
        render_with(&config, "Orders", "Employee/Name eq 'x'", &HashMap::new()),
        Err(Error::InvisibleNavigationTarget {
            type_name: "Order".to_owned(),
            property: "Employee".to_owned(),
        })
    );
}

#[test]
fn unknown_and_inapplicable_functions() {
    assert_eq!(
        parse_error("Customers", "frob(CompanyName)"),
        Error::UnknownFunction {
            name: "frob".to_owned(),
            position: 0,
        }
    );
    assert_eq!(
        parse_error("Orders", "length(OrderID) eq 1"),
        Error::NoApplicableFunction {
            name: "length".to_owned(),
            argument_types: "Edm.Int32".to_owned(),
            position: 0,
        }
    );
}

#[test]
fn filter_must_be_boolean() {
    assert_eq!(
        parse_error("Orders", "OrderID add 1"),
        Error::FilterNotBoolean {
            found: EdmType::Int32,
        }
    );
}

#[test]
fn syntax_errors() {
    assert_eq!(
        parse_error("Orders", "OrderID eq 1 )"),
        Error::TrailingInput {
            found: ")".to_owned(),
            position: 13,
        }
    );
    assert_eq!(
        parse_error("Orders", "OrderID eq"),
        Error::ExpressionExpected { position: 10 }
    );
    assert_eq!(
        parse_error("Orders", "(OrderID eq 1"),
        Error::ExpectedToken {
            expected: odata_query::filters::TokenKind::CloseParen,
            found: "end of input".to_owned(),
            position: 13,
        }
    );
}

#[test]
fn large_integers_read_as_int64() {
    assert_eq!(
        render("Orders", "OrderID eq 2147483648").expect("valid filter"),
        "OrderID eq 2147483648L"
    );
    assert_eq!(
        parse_error("Orders", "OrderID eq 99999999999999999999"),
        Error::InvalidLiteral {
            ty: EdmType::Int64,
            text: "99999999999999999999".to_owned(),
            position: 11,
        }
    );
}

#[test]
fn parameter_aliases() {
    let aliases = HashMap::from([
        ("id".to_owned(), "10248".to_owned()),
        ("city".to_owned(), "'Reims'".to_owned()),
        ("bad".to_owned(), "1 add 2".to_owned()),
    ]);
    let config = ServiceConfig::default();

    assert_eq!(
        render_with(&config, "Orders", "OrderID eq @id", &aliases).expect("valid filter"),
        "OrderID eq 10248"
    );
    assert_eq!(
        render_with(&config, "Orders", "Customer/Address/City eq @city", &aliases)
            .expect("valid filter"),
        "Customer/Address/City eq 'Reims'"
    );
    assert_eq!(
        render_with(&config, "Orders", "OrderID eq @missing", &aliases),
        Err(Error::UndefinedParameterAlias {
            name: "@missing".to_owned(),
            position: 11,
        })
    );
    assert!(matches!(
        render_with(&config, "Orders", "OrderID eq @bad", &aliases),
        Err(Error::TrailingInput { .. })
    ));
}

#[test]
fn query_string_parses_back_to_itself() {
    for filter in [
        "OrderID gt 5 or OrderID lt 2 and Freight eq 1",
        "not (ShipVia eq 1) and -Freight lt -5",
        "year(OrderDate) eq 1996 and Customer/Address/City eq 'O''Hare'",
    ] {
        let rendered = render("Orders", filter).expect("valid filter");
        let reparsed = render("Orders", &rendered).expect("rendered filter parses");

        assert_eq!(reparsed, rendered, "{filter}");
    }
}

#[test]
fn unary_operator_display() {
    assert_eq!(UnaryOperator::Not.to_string(), "not");
    assert_eq!(BinaryOperator::from_keyword("le"), Some(BinaryOperator::LessOrEqual));
    assert_eq!(BinaryOperator::from_keyword("lte"), None);
}

#[test]
fn promoted_doubles_keep_their_value() {
    assert_eq!(render("Orders", "Freight eq 0.1").expect("valid filter"), "Freight eq 0.1M");
    assert_eq!(
        render("Orders", "Freight add 0.1 gt 2.5").expect("valid filter"),
        "(Freight add 0.1M) gt 2.5M"
    );
}

#[test]
fn nesting_is_bounded() {
    let nested = |depth: usize| format!("{}OrderID eq 1{}", "(".repeat(depth), ")".repeat(depth));

    assert!(render("Orders", &nested(50)).is_ok());
    assert_eq!(
        parse_error("Orders", &nested(150)),
        Error::NestingTooDeep {
            max: odata_query::filters::MAX_NESTING,
            position: 100,
        }
    );

    let error = parse_error("Orders", &format!("{}OrderID eq 1", "not ".repeat(150)));
    assert!(matches!(error, Error::NestingTooDeep { position: 400, .. }), "{error:?}");
    assert_eq!(error.kind(), ErrorKind::Syntax);
}
