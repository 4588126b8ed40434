use crate::edm::EdmType;
use crate::filters::TokenKind;
use thiserror::Error;

/// Result alias used by every parsing entry point in the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], used by the request layer to
/// pick a response status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed query text: bad literal, unknown token or name, no matching overload.
    Syntax,

    /// Well formed but semantically illegal for the targeted resource.
    BadRequest,

    /// The request reaches a resource set the service does not expose for reading.
    Forbidden,

    /// Inconsistent metadata or a broken internal invariant; not caused by user input.
    Internal,
}

/// Failure to validate a literal against a primitive type descriptor.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LiteralError {
    /// Text does not follow the literal grammar of the type.
    #[error("'{text}' is not a valid {ty} literal.")]
    Malformed { ty: EdmType, text: String },

    /// Text follows the grammar but the value does not fit the type.
    #[error("'{text}' is out of range for {ty}.")]
    OutOfRange { ty: EdmType, text: String },
}

/// Every failure raised while turning query options into a request description.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A character that cannot start any token.
    #[error("Syntax error: invalid character '{character}' at position {position}.")]
    InvalidCharacter { character: char, position: usize },

    /// A quoted literal without its closing quote.
    #[error("Syntax error: unterminated literal '{text}' at position {position}.")]
    UnterminatedLiteral { text: String, position: usize },

    /// A literal token whose text its type descriptor rejects.
    #[error("Syntax error: unrecognized {ty} literal '{text}' at position {position}.")]
    InvalidLiteral {
        ty: EdmType,
        text: String,
        position: usize,
    },

    /// A numeric literal missing the digits after its '.' or exponent marker.
    #[error("Syntax error: digit expected at position {position}.")]
    DigitExpected { position: usize },

    /// The parser needed a specific token.
    #[error("Syntax error at position {position}: expected {expected} but found '{found}'.")]
    ExpectedToken {
        expected: TokenKind,
        found: String,
        position: usize,
    },

    /// The parser needed the start of an expression.
    #[error("Syntax error at position {position}: expression expected.")]
    ExpressionExpected { position: usize },

    /// Input left over after a complete clause.
    #[error("Syntax error at position {position}: unexpected '{found}' after the end of the clause.")]
    TrailingInput { found: String, position: usize },

    /// Parentheses, unary operators or function calls nested past the parser's limit.
    #[error("Syntax error: expression nested deeper than {max} levels at position {position}.")]
    NestingTooDeep { max: usize, position: usize },

    /// A property name that the current resource type does not declare.
    #[error("Syntax error: type '{type_name}' does not have a property named '{property}'.")]
    PropertyNotFound { type_name: String, property: String },

    /// A function call whose name is not in the catalog.
    #[error("Syntax error: unknown function '{name}' at position {position}.")]
    UnknownFunction { name: String, position: usize },

    /// A function call none of whose overloads accepts the arguments.
    #[error("No applicable function found for '{name}' at position {position} with argument types {argument_types}.")]
    NoApplicableFunction {
        name: String,
        argument_types: String,
        position: usize,
    },

    /// An operator none of whose signatures accepts the operands.
    #[error("Operator '{operator}' incompatible with operand types {operand_types} at position {position}.")]
    IncompatibleOperands {
        operator: String,
        operand_types: String,
        position: usize,
    },

    /// An ordering operator applied to null, Guid or Binary operands.
    #[error("The operator '{operator}' at position {position} is not supported for {operand}; only equality checks are supported.")]
    EqualityOnlyOperator {
        operator: String,
        operand: String,
        position: usize,
    },

    /// A property access that is not preceded by a navigable property.
    #[error("Syntax error at position {position}: '{property}' must follow a complex or navigation property.")]
    MemberAccessOnNonProperty { property: String, position: usize },

    /// A `@name` alias with no value supplied in the request.
    #[error("Syntax error: parameter alias '{name}' at position {position} has no value.")]
    UndefinedParameterAlias { name: String, position: usize },

    /// A `$filter` clause that does not evaluate to a boolean.
    #[error("Expression of type {found} cannot be used as $filter, a boolean expression is required.")]
    FilterNotBoolean { found: EdmType },

    /// A bag property used inside a clause that cannot process collections.
    #[error("Bag property '{property}' defined on type '{type_name}' cannot be used in the {clause} clause.")]
    BagPropertyNotAllowed {
        property: String,
        type_name: String,
        clause: &'static str,
    },

    /// A navigation property to a collection used inside a clause that cannot process collections.
    #[error("Navigation property '{property}' defined on type '{type_name}' points to a collection and cannot be used in the {clause} clause.")]
    CollectionNavigationNotAllowed {
        property: String,
        type_name: String,
        clause: &'static str,
    },

    /// A primitive property followed by further path segments.
    #[error("Primitive property '{property}' cannot be used as an intermediate segment in the {clause} clause, it must be the last segment.")]
    PrimitivePropertyAsIntermediate {
        property: String,
        clause: &'static str,
    },

    /// A complex property as the last segment of a path that needs a primitive value.
    #[error("Complex property '{property}' cannot be used as the last segment in the {clause} clause.")]
    ComplexPropertyAsLeaf {
        property: String,
        clause: &'static str,
    },

    /// A navigation property as the last segment of an `$orderby` path.
    #[error("Navigation property '{property}' cannot be used as the last segment in the $orderby clause.")]
    NavigationPropertyAsLeaf { property: String },

    /// A binary property in `$orderby`.
    #[error("Binary property '{property}' is not allowed in the $orderby clause, no ordering is defined for it.")]
    BinaryPropertyNotSortable { property: String },

    /// A navigation property whose target resource set is not visible.
    #[error("Property '{property}' on type '{type_name}' is not a valid property.")]
    InvisibleNavigationTarget { type_name: String, property: String },

    /// An `$expand` segment that is not a navigation property.
    #[error("Property '{property}' on type '{type_name}' is not a navigation property, only navigation properties can be expanded.")]
    ExpandRequiresNavigation { type_name: String, property: String },

    /// A `$select` path that descends into a navigation property that was not expanded.
    #[error("Only navigation properties that are also expanded can be selected through, '{property}' is not expanded.")]
    SelectWithoutMatchingExpand { property: String },

    /// A `$select` path descending through a bag property.
    #[error("Bag property '{property}' cannot be used as an intermediate segment in the $select clause.")]
    BagAsInnerSelectSegment { property: String },

    /// A `$select` path descending through a primitive property.
    #[error("Primitive property '{property}' cannot be used as an intermediate segment in the $select clause.")]
    PrimitiveAsInnerSelectSegment { property: String },

    /// A `$select` path descending through a complex property.
    #[error("Complex property '{property}' cannot be used as an intermediate segment in the $select clause.")]
    ComplexAsInnerSelectSegment { property: String },

    /// More `$expand` paths than the service allows.
    #[error("The request includes {count} $expand paths, the maximum allowed is {max}.")]
    TooManyExpandPaths { count: usize, max: usize },

    /// An `$expand` path deeper than the service allows.
    #[error("The request includes a $expand path which is too deep, the maximum depth allowed is {max}.")]
    ExpandTooDeep { max: usize },

    /// `$select` while projections are disabled.
    #[error("The $select query option is not supported by this service.")]
    ProjectionDisabled,

    /// A skip token that is not a comma separated list of literals.
    #[error("Syntax error in the $skiptoken '{token}'.")]
    MalformedSkipToken { token: String },

    /// A skip token whose value count differs from the ordering.
    #[error("The $skiptoken '{token}' has {count} values but the ordering has {expected} keys.")]
    SkipTokenValueCountMismatch {
        token: String,
        count: usize,
        expected: usize,
    },

    /// A skip token value whose type does not match its ordering key.
    #[error("The value at position {position} in the $skiptoken '{token}' is of type {found}, {expected} expected.")]
    SkipTokenTypeMismatch {
        token: String,
        position: usize,
        expected: EdmType,
        found: EdmType,
    },

    /// A `$`-prefixed query option that is not a known system option.
    #[error("The query parameter '{name}' begins with a system-reserved '$' character but is not recognized.")]
    UnknownSystemOption { name: String },

    /// A system query option given twice.
    #[error("Query option '{name}' is specified more than once.")]
    DuplicateOption { name: String },

    /// A `$top`/`$skip` value that is not a non-negative integer.
    #[error("Incorrect format for the {option} argument '{value}'.")]
    InvalidArgumentFormat { option: &'static str, value: String },

    /// A system query option that the requested resource does not support.
    #[error("Query option {option} cannot be applied to the requested resource.")]
    OptionNotApplicable { option: &'static str },

    /// An `$inlinecount` value other than `allpages` or `none`.
    #[error("Unknown $inlinecount option '{value}', only 'allpages' and 'none' are supported.")]
    InvalidInlineCount { value: String },

    /// `$inlinecount` or `$count` while count requests are disabled.
    #[error("Count requests are not supported by this service.")]
    CountRequestsDisabled,

    /// `$skiptoken` on a resource set without server paging.
    #[error("$skiptoken cannot be applied to the resource set '{resource_set}', it is not paged.")]
    SkipTokenWithoutPaging { resource_set: String },

    /// Reading from a resource set without the matching right.
    #[error("Access to resource set '{resource_set}' is forbidden.")]
    Forbidden { resource_set: String },

    /// A property kind the current code path has no rule for.
    #[error("Internal error: unexpected kind {kind} for property '{property}'.")]
    UnexpectedPropertyType { property: String, kind: String },

    /// A projection tree deeper than the traversal bound.
    #[error("Internal error: projection tree exceeds the maximum depth of {max}.")]
    ProjectionTooDeep { max: usize },

    /// Metadata that refers to unknown or duplicated types, sets or properties.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Service configuration with contradictory settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A failure raised while an expression provider walks the tree.
    #[error("Expression evaluation failed: {0}")]
    Evaluation(String),
}

impl Error {
    /// Classifies the error for the request layer.
    pub fn kind(&self) -> ErrorKind {
        use Error::*;

        match self {
            InvalidCharacter { .. }
            | UnterminatedLiteral { .. }
            | InvalidLiteral { .. }
            | DigitExpected { .. }
            | ExpectedToken { .. }
            | ExpressionExpected { .. }
            | TrailingInput { .. }
            | NestingTooDeep { .. }
            | PropertyNotFound { .. }
            | UnknownFunction { .. }
            | NoApplicableFunction { .. }
            | IncompatibleOperands { .. }
            | MemberAccessOnNonProperty { .. }
            | UndefinedParameterAlias { .. }
            | FilterNotBoolean { .. }
            | MalformedSkipToken { .. }
            | SkipTokenTypeMismatch { .. }
            | UnknownSystemOption { .. }
            | DuplicateOption { .. }
            | InvalidArgumentFormat { .. }
            | InvalidInlineCount { .. } => ErrorKind::Syntax,

            EqualityOnlyOperator { .. }
            | BagPropertyNotAllowed { .. }
            | CollectionNavigationNotAllowed { .. }
            | PrimitivePropertyAsIntermediate { .. }
            | ComplexPropertyAsLeaf { .. }
            | NavigationPropertyAsLeaf { .. }
            | BinaryPropertyNotSortable { .. }
            | InvisibleNavigationTarget { .. }
            | ExpandRequiresNavigation { .. }
            | SelectWithoutMatchingExpand { .. }
            | BagAsInnerSelectSegment { .. }
            | PrimitiveAsInnerSelectSegment { .. }
            | ComplexAsInnerSelectSegment { .. }
            | TooManyExpandPaths { .. }
            | ExpandTooDeep { .. }
            | ProjectionDisabled
            | SkipTokenValueCountMismatch { .. }
            | OptionNotApplicable { .. }
            | CountRequestsDisabled
            | SkipTokenWithoutPaging { .. }
            | Evaluation(_) => ErrorKind::BadRequest,

            Forbidden { .. } => ErrorKind::Forbidden,

            UnexpectedPropertyType { .. }
            | ProjectionTooDeep { .. }
            | InvalidMetadata(_)
            | InvalidConfiguration(_) => ErrorKind::Internal,
        }
    }

    /// Offset in the clause text where the error was detected, when known.
    pub fn position(&self) -> Option<usize> {
        use Error::*;

        match self {
            InvalidCharacter { position, .. }
            | UnterminatedLiteral { position, .. }
            | InvalidLiteral { position, .. }
            | DigitExpected { position }
            | ExpectedToken { position, .. }
            | ExpressionExpected { position }
            | TrailingInput { position, .. }
            | NestingTooDeep { position, .. }
            | UnknownFunction { position, .. }
            | NoApplicableFunction { position, .. }
            | IncompatibleOperands { position, .. }
            | EqualityOnlyOperator { position, .. }
            | MemberAccessOnNonProperty { position, .. }
            | UndefinedParameterAlias { position, .. } => Some(*position),
            _ => None,
        }
    }
}
