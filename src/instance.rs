//! Runtime entity values.
//!
//! Comparators, the in-memory evaluator and skip tokens read property
//! values out of an [`Instance`] by following property-name paths.

use crate::edm::Value;
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value held by one property of an instance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyValue {
    /// A primitive value, `Value::Null` for an absent complex or entity value too.
    Primitive(Value),

    /// A complex value or a single related entity.
    Nested(Instance),

    /// A bag or a collection of related entities.
    Collection(Vec<PropertyValue>),
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Primitive(value)
    }
}

impl From<Instance> for PropertyValue {
    fn from(instance: Instance) -> Self {
        PropertyValue::Nested(instance)
    }
}

/// An entity or complex value: property names mapped to values in
/// insertion order. Missing properties read as null.
///
/// ```
/// use odata_query::edm::Value;
/// use odata_query::instance::Instance;
///
/// let customer = Instance::new()
///     .with("CustomerID", Value::String("ALFKI".to_owned()))
///     .with("Address", Instance::new().with("City", Value::String("Berlin".to_owned())));
///
/// assert_eq!(
///     customer.resolve(["Address", "City"]),
///     Some(&Value::String("Berlin".to_owned()))
/// );
/// assert_eq!(customer.resolve(["Address", "Street"]), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instance(IndexMap<String, PropertyValue>);

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    /// Follows a path of property names to a primitive value.
    ///
    /// `None` means the value is null: a missing property, a null
    /// primitive, a null complex or entity value on the way, or a path
    /// that ends on something other than a primitive.
    pub fn resolve<I, S>(&self, path: I) -> Option<&Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self;
        let mut path = path.into_iter().peekable();

        while let Some(name) = path.next() {
            let value = current.0.get(name.as_ref())?;
            let is_last = path.peek().is_none();

            match value {
                PropertyValue::Primitive(Value::Null) => return None,
                PropertyValue::Primitive(v) if is_last => return Some(v),
                PropertyValue::Nested(nested) if !is_last => current = nested,
                _ => return None,
            }
        }

        None
    }

    /// Writes a primitive value at the end of a path, creating nested
    /// instances on the way.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut current = self;
        for name in parents {
            let slot = current
                .0
                .entry(name.as_ref().to_owned())
                .or_insert_with(|| PropertyValue::Nested(Instance::new()));

            if !matches!(slot, PropertyValue::Nested(_)) {
                *slot = PropertyValue::Nested(Instance::new());
            }

            current = match slot {
                PropertyValue::Nested(nested) => nested,
                _ => return,
            };
        }

        current.set(last.as_ref(), value);
    }
}
