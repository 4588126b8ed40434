//! Static signature tables for `$filter` functions and operators, and the
//! overload resolution that picks one signature for a set of operands.

use super::Expression;
use crate::edm::EdmType;
use crate::edm::EdmType::*;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::fmt;

/// One signature of a function or operator.
#[derive(Debug, PartialEq, Eq)]
pub struct FunctionDescription {
    pub name: &'static str,
    pub return_type: EdmType,
    pub parameter_types: &'static [EdmType],
}

impl FunctionDescription {
    const fn new(
        name: &'static str,
        return_type: EdmType,
        parameter_types: &'static [EdmType],
    ) -> Self {
        Self {
            name,
            return_type,
            parameter_types,
        }
    }
}

impl fmt::Display for FunctionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;

        for (i, ty) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }

        write!(f, ") -> {}", self.return_type)
    }
}

static FILTER_FUNCTIONS: Lazy<IndexMap<&'static str, Vec<FunctionDescription>>> = Lazy::new(|| {
    let signatures = [
        FunctionDescription::new("endswith", Boolean, &[String, String]),
        FunctionDescription::new("indexof", Int32, &[String, String]),
        FunctionDescription::new("replace", String, &[String, String, String]),
        FunctionDescription::new("startswith", Boolean, &[String, String]),
        FunctionDescription::new("tolower", String, &[String]),
        FunctionDescription::new("toupper", String, &[String]),
        FunctionDescription::new("trim", String, &[String]),
        FunctionDescription::new("substring", String, &[String, Int32]),
        FunctionDescription::new("substring", String, &[String, Int32, Int32]),
        FunctionDescription::new("substringof", Boolean, &[String, String]),
        FunctionDescription::new("concat", String, &[String, String]),
        FunctionDescription::new("length", Int32, &[String]),
        FunctionDescription::new("year", Int32, &[DateTime]),
        FunctionDescription::new("month", Int32, &[DateTime]),
        FunctionDescription::new("day", Int32, &[DateTime]),
        FunctionDescription::new("hour", Int32, &[DateTime]),
        FunctionDescription::new("minute", Int32, &[DateTime]),
        FunctionDescription::new("second", Int32, &[DateTime]),
        FunctionDescription::new("round", Decimal, &[Decimal]),
        FunctionDescription::new("round", Double, &[Double]),
        FunctionDescription::new("ceiling", Decimal, &[Decimal]),
        FunctionDescription::new("ceiling", Double, &[Double]),
        FunctionDescription::new("floor", Decimal, &[Decimal]),
        FunctionDescription::new("floor", Double, &[Double]),
    ];

    let mut functions: IndexMap<&'static str, Vec<FunctionDescription>> = IndexMap::new();
    for signature in signatures {
        functions.entry(signature.name).or_default().push(signature);
    }
    functions
});

const fn arithmetic_signatures(name: &'static str) -> [FunctionDescription; 5] {
    [
        FunctionDescription::new(name, Int32, &[Int32, Int32]),
        FunctionDescription::new(name, Int64, &[Int64, Int64]),
        FunctionDescription::new(name, Single, &[Single, Single]),
        FunctionDescription::new(name, Double, &[Double, Double]),
        FunctionDescription::new(name, Decimal, &[Decimal, Decimal]),
    ]
}

static ARITHMETIC_FUNCTIONS: Lazy<Vec<FunctionDescription>> =
    Lazy::new(|| arithmetic_signatures("arithmetic").into());

static RELATIONAL_FUNCTIONS: Lazy<Vec<FunctionDescription>> = Lazy::new(|| {
    let mut functions: Vec<_> = arithmetic_signatures("relational")
        .into_iter()
        .map(|f| FunctionDescription::new(f.name, Boolean, f.parameter_types))
        .collect();

    functions.extend([
        FunctionDescription::new("relational", Boolean, &[String, String]),
        FunctionDescription::new("relational", Boolean, &[Boolean, Boolean]),
        FunctionDescription::new("relational", Boolean, &[DateTime, DateTime]),
        FunctionDescription::new("relational", Boolean, &[Guid, Guid]),
        FunctionDescription::new("relational", Boolean, &[Binary, Binary]),
    ]);
    functions
});

static LOGICAL_FUNCTIONS: Lazy<Vec<FunctionDescription>> =
    Lazy::new(|| vec![FunctionDescription::new("logical", Boolean, &[Boolean, Boolean])]);

static NOT_FUNCTIONS: Lazy<Vec<FunctionDescription>> =
    Lazy::new(|| vec![FunctionDescription::new("not", Boolean, &[Boolean])]);

static NEGATE_FUNCTIONS: Lazy<Vec<FunctionDescription>> = Lazy::new(|| {
    vec![
        FunctionDescription::new("negate", Int32, &[Int32]),
        FunctionDescription::new("negate", Int64, &[Int64]),
        FunctionDescription::new("negate", Single, &[Single]),
        FunctionDescription::new("negate", Double, &[Double]),
        FunctionDescription::new("negate", Decimal, &[Decimal]),
    ]
});

/// Overloads of a `$filter` function, `None` for unknown names.
pub fn filter_function(name: &str) -> Option<&'static [FunctionDescription]> {
    let functions: &'static IndexMap<_, _> = &FILTER_FUNCTIONS;
    functions.get(name).map(Vec::as_slice)
}

/// Signatures shared by `add`, `sub`, `mul`, `div` and `mod`.
pub fn arithmetic_operation_functions() -> &'static [FunctionDescription] {
    &ARITHMETIC_FUNCTIONS
}

/// Signatures shared by `eq`, `ne`, `gt`, `ge`, `lt` and `le`.
pub fn relational_operation_functions() -> &'static [FunctionDescription] {
    &RELATIONAL_FUNCTIONS
}

/// Signatures shared by `and` and `or`.
pub fn logical_operation_functions() -> &'static [FunctionDescription] {
    &LOGICAL_FUNCTIONS
}

pub fn not_operation_functions() -> &'static [FunctionDescription] {
    &NOT_FUNCTIONS
}

pub fn negate_operation_functions() -> &'static [FunctionDescription] {
    &NEGATE_FUNCTIONS
}

/// Picks the signature from `candidates` that accepts `arguments`.
///
/// Candidates with the right arity are tried in order, first for an exact
/// match of every argument type, then for a match where every argument is
/// compatible with its parameter. With `promote`, the arguments of a
/// compatible match are retyped to the parameter types.
///
/// ```
/// use odata_query::edm::{EdmType, Value};
/// use odata_query::filters::{arithmetic_operation_functions, find_function_with_promotion, Expression};
///
/// let mut operands = [
///     Expression::constant(Value::Int16(2)),
///     Expression::constant(Value::Int32(3)),
/// ];
/// let add = find_function_with_promotion(arithmetic_operation_functions(), &mut operands, true).unwrap();
///
/// assert_eq!(add.return_type, EdmType::Int32);
/// assert_eq!(operands[0].result_type(), EdmType::Int32);
/// ```
pub fn find_function_with_promotion<'f>(
    candidates: &'f [FunctionDescription],
    arguments: &mut [Expression<'_>],
    promote: bool,
) -> Option<&'f FunctionDescription> {
    let types: Vec<EdmType> = arguments.iter().map(Expression::result_type).collect();
    let applicable = candidates
        .iter()
        .filter(|f| f.parameter_types.len() == types.len());

    if let Some(exact) = applicable
        .clone()
        .find(|f| f.parameter_types == types.as_slice())
    {
        return Some(exact);
    }

    let compatible = applicable.into_iter().find(|f| {
        types
            .iter()
            .zip(f.parameter_types)
            .all(|(arg, param)| arg.is_compatible_with(*param))
    })?;

    if promote {
        for (argument, param) in arguments.iter_mut().zip(compatible.parameter_types) {
            argument.set_result_type(*param);
        }
    }

    Some(compatible)
}

/// Joins type names with ", " and a final " and ".
pub(crate) fn join_types(types: &[EdmType]) -> std::string::String {
    let names: Vec<_> = types.iter().map(|ty| ty.name()).collect();

    match names.split_last() {
        None => std::string::String::new(),
        Some((last, [])) => (*last).to_owned(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}
