#![allow(dead_code)]

use odata_query::edm::{EdmType, Value};
use odata_query::instance::{Instance, PropertyValue};
use odata_query::metadata::{Metadata, PropertyType, Providers, ResourceSetWrapper, ResourceType};

/// A small Northwind model.
///
/// Customer: CustomerID, CompanyName, Address (complex), Photo (binary),
/// Phones (bag), Orders (collection), BestFriend (reference).
/// Order: OrderID, OrderDate, Freight, ShipVia, Tag, Customer, Employee,
/// Order_Details. OrderDetail: OrderID, ProductID, Quantity, UnitPrice,
/// Product, Order. Product and Employee are flat.
pub fn northwind() -> Metadata {
    let mut metadata = Metadata::default();

    let types = [
        ResourceType::complex_type("Address")
            .primitive("StreetName", EdmType::String)
            .primitive("HouseNumber", EdmType::String)
            .primitive("City", EdmType::String),
        ResourceType::entity("Customer")
            .key("CustomerID", EdmType::String)
            .primitive("CompanyName", EdmType::String)
            .complex("Address", "Address")
            .primitive("Photo", EdmType::Binary)
            .bag("Phones", PropertyType::Primitive(EdmType::String))
            .set_reference("Orders", "Order")
            .reference("BestFriend", "Customer"),
        ResourceType::entity("Order")
            .key("OrderID", EdmType::Int32)
            .primitive("OrderDate", EdmType::DateTime)
            .primitive("Freight", EdmType::Decimal)
            .primitive("ShipVia", EdmType::Int16)
            .primitive("Tag", EdmType::Guid)
            .reference("Customer", "Customer")
            .reference("Employee", "Employee")
            .set_reference("Order_Details", "OrderDetail"),
        ResourceType::entity("OrderDetail")
            .key("OrderID", EdmType::Int32)
            .key("ProductID", EdmType::Int32)
            .primitive("Quantity", EdmType::Int16)
            .primitive("UnitPrice", EdmType::Decimal)
            .reference("Product", "Product")
            .reference("Order", "Order"),
        ResourceType::entity("Product")
            .key("ProductID", EdmType::Int32)
            .primitive("ProductName", EdmType::String)
            .primitive("Weight", EdmType::Double)
            .primitive("Stock", EdmType::Int64)
            .primitive("Discontinued", EdmType::Boolean),
        ResourceType::entity("Employee")
            .key("EmployeeID", EdmType::Int32)
            .primitive("Name", EdmType::String),
    ];

    for resource_type in types {
        metadata
            .add_resource_type(resource_type)
            .expect("valid resource type");
    }

    for (set, entity_type) in [
        ("Customers", "Customer"),
        ("Orders", "Order"),
        ("Order_Details", "OrderDetail"),
        ("Products", "Product"),
        ("Employees", "Employee"),
    ] {
        metadata
            .add_resource_set(set, entity_type)
            .expect("valid resource set");
    }

    metadata
}

pub fn set<'a>(providers: Providers<'a>, name: &str) -> ResourceSetWrapper<'a> {
    providers
        .resource_set_wrapper(name)
        .expect("known resource set")
        .expect("visible resource set")
}

pub fn string(text: &str) -> Value {
    Value::String(text.to_owned())
}

pub fn customer(id: &str, company: &str, city: Option<&str>) -> Instance {
    let address: PropertyValue = match city {
        Some(city) => Instance::new()
            .with("City", string(city))
            .with("HouseNumber", string("12"))
            .into(),
        None => Value::Null.into(),
    };

    Instance::new()
        .with("CustomerID", string(id))
        .with("CompanyName", string(company))
        .with("Address", address)
}
