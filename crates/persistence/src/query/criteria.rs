//! Criteria tree nodes.

use std::fmt;

use serde_json::Value;

use super::geometry::Geometry;

/// Boolean operator joining the entries of a [`CriteriaList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BoolOperator {
    /// All entries must match.
    #[default]
    And,
    /// At least one entry must match.
    Or,
}

impl BoolOperator {
    /// Returns the filter key for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        }
    }
}

impl fmt::Display for BoolOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered list of criteria joined by one operator.
///
/// A list nested inside another list acts as a boolean container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaList {
    operator: BoolOperator,
    items: Vec<Criteria>,
}

impl CriteriaList {
    /// Creates an empty `and` list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with the given operator.
    pub fn with_operator(operator: BoolOperator) -> Self {
        Self {
            operator,
            items: Vec::new(),
        }
    }

    /// Appends a criteria, builder style.
    pub fn with(mut self, criteria: impl Into<Criteria>) -> Self {
        self.items.push(criteria.into());
        self
    }

    /// Appends a criteria.
    pub fn push(&mut self, criteria: impl Into<Criteria>) {
        self.items.push(criteria.into());
    }

    /// Operator joining the entries.
    pub fn operator(&self) -> BoolOperator {
        self.operator
    }

    /// Entries in insertion order.
    pub fn items(&self) -> &[Criteria] {
        &self.items
    }

    /// First entry, if any.
    pub fn first(&self) -> Option<&Criteria> {
        self.items.first()
    }

    /// True when the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of direct entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl FromIterator<Criteria> for CriteriaList {
    fn from_iter<I: IntoIterator<Item = Criteria>>(iter: I) -> Self {
        Self {
            operator: BoolOperator::And,
            items: iter.into_iter().collect(),
        }
    }
}

/// One node of the criteria tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Compares one attribute.
    Attribute(AttributeCriteria),
    /// Bounds one attribute.
    Range(RangeCriteria),
    /// Tests a geo attribute.
    Spatial(SpatialCriteria),
    /// Full-text search.
    Search(SearchCriteria),
    /// Native filter fragment.
    Custom(CustomCriteria),
    /// Nested list.
    Container(CriteriaList),
}

impl Criteria {
    /// Name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Criteria::Attribute(_) => "attribute",
            Criteria::Range(_) => "range",
            Criteria::Spatial(_) => "spatial",
            Criteria::Search(_) => "search",
            Criteria::Custom(_) => "custom",
            Criteria::Container(_) => "container",
        }
    }
}

impl From<AttributeCriteria> for Criteria {
    fn from(criteria: AttributeCriteria) -> Self {
        Criteria::Attribute(criteria)
    }
}

impl From<RangeCriteria> for Criteria {
    fn from(criteria: RangeCriteria) -> Self {
        Criteria::Range(criteria)
    }
}

impl From<SpatialCriteria> for Criteria {
    fn from(criteria: SpatialCriteria) -> Self {
        Criteria::Spatial(criteria)
    }
}

impl From<SearchCriteria> for Criteria {
    fn from(criteria: SearchCriteria) -> Self {
        Criteria::Search(criteria)
    }
}

impl From<CustomCriteria> for Criteria {
    fn from(criteria: CustomCriteria) -> Self {
        Criteria::Custom(criteria)
    }
}

impl From<CriteriaList> for Criteria {
    fn from(list: CriteriaList) -> Self {
        Criteria::Container(list)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// Equal to a scalar, or any of a list.
    Equals,
    /// Member of a list or inside a geometry.
    In,
    /// Strictly greater.
    GreaterThan,
    /// Greater or equal.
    GreaterThanOrEquals,
    /// Strictly less.
    LessThan,
    /// Less or equal.
    LessThanOrEquals,
}

impl ComparisonOperator {
    /// Returns the short comparator name, which is also the range key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "eq",
            ComparisonOperator::In => "in",
            ComparisonOperator::GreaterThan => "gt",
            ComparisonOperator::GreaterThanOrEquals => "gte",
            ComparisonOperator::LessThan => "lt",
            ComparisonOperator::LessThanOrEquals => "lte",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The right hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparand {
    /// A single value.
    Scalar(Value),
    /// A list of values.
    List(Vec<Value>),
    /// A shape for spatial criteria.
    Geometry(Geometry),
}

/// An operator applied to a comparand, optionally negated.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    operator: ComparisonOperator,
    comparand: Comparand,
    inverted: bool,
}

impl Comparison {
    /// Creates a comparison that is not inverted.
    pub fn new(operator: ComparisonOperator, comparand: Comparand) -> Self {
        Self {
            operator,
            comparand,
            inverted: false,
        }
    }

    /// Equality against a scalar, or membership when given a JSON array.
    pub fn equals(value: impl Into<Value>) -> Self {
        let comparand = match value.into() {
            Value::Array(values) => Comparand::List(values),
            value => Comparand::Scalar(value),
        };
        Self::new(ComparisonOperator::Equals, comparand)
    }

    /// Membership in a list of values.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            ComparisonOperator::In,
            Comparand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Containment in a geometry.
    pub fn within(geometry: impl Into<Geometry>) -> Self {
        Self::new(ComparisonOperator::In, Comparand::Geometry(geometry.into()))
    }

    /// Strictly greater than `value`.
    pub fn gt(value: impl Into<Value>) -> Self {
        Self::new(ComparisonOperator::GreaterThan, Comparand::Scalar(value.into()))
    }

    /// Greater than or equal to `value`.
    pub fn gte(value: impl Into<Value>) -> Self {
        Self::new(
            ComparisonOperator::GreaterThanOrEquals,
            Comparand::Scalar(value.into()),
        )
    }

    /// Strictly less than `value`.
    pub fn lt(value: impl Into<Value>) -> Self {
        Self::new(ComparisonOperator::LessThan, Comparand::Scalar(value.into()))
    }

    /// Less than or equal to `value`.
    pub fn lte(value: impl Into<Value>) -> Self {
        Self::new(
            ComparisonOperator::LessThanOrEquals,
            Comparand::Scalar(value.into()),
        )
    }

    /// Returns the negated comparison.
    pub fn inverted(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }

    /// The operator.
    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    /// The right hand side.
    pub fn comparand(&self) -> &Comparand {
        &self.comparand
    }

    /// Whether the comparison is negated.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

/// Compares one attribute against a value or list of values.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCriteria {
    attribute_path: String,
    comparison: Comparison,
}

impl AttributeCriteria {
    /// Compares `attribute_path` using `comparison`.
    pub fn new(attribute_path: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            attribute_path: attribute_path.into(),
            comparison,
        }
    }

    /// Dotted path of the attribute.
    pub fn attribute_path(&self) -> &str {
        &self.attribute_path
    }

    /// The comparison applied.
    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }
}

/// Bounds one attribute with a set of range comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCriteria {
    attribute_path: String,
    items: Vec<Comparison>,
}

impl RangeCriteria {
    /// Creates a range without bounds.
    pub fn new(attribute_path: impl Into<String>) -> Self {
        Self {
            attribute_path: attribute_path.into(),
            items: Vec::new(),
        }
    }

    /// Adds a bound, builder style.
    pub fn with(mut self, comparison: Comparison) -> Self {
        self.items.push(comparison);
        self
    }

    /// Dotted path of the attribute.
    pub fn attribute_path(&self) -> &str {
        &self.attribute_path
    }

    /// Bounds in insertion order.
    pub fn items(&self) -> &[Comparison] {
        &self.items
    }
}

/// Tests a geo attribute against a geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialCriteria {
    attribute_path: String,
    comparison: Comparison,
}

impl SpatialCriteria {
    /// Tests `attribute_path` using `comparison`.
    pub fn new(attribute_path: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            attribute_path: attribute_path.into(),
            comparison,
        }
    }

    /// Dotted path of the geo attribute.
    pub fn attribute_path(&self) -> &str {
        &self.attribute_path
    }

    /// The comparison applied, usually [`Comparison::within`].
    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }
}

/// A full-text phrase, optionally scoped to one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    phrase: String,
    attribute_path: String,
}

impl SearchCriteria {
    /// Searches the catch-all field.
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            attribute_path: String::new(),
        }
    }

    /// Searches a single attribute.
    pub fn on(attribute_path: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            attribute_path: attribute_path.into(),
        }
    }

    /// The search phrase.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Attribute searched, empty for the catch-all field.
    pub fn attribute_path(&self) -> &str {
        &self.attribute_path
    }
}

/// A pre-built native filter fragment passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomCriteria {
    query_part: Value,
}

impl CustomCriteria {
    /// Wraps a native filter fragment.
    pub fn new(query_part: Value) -> Self {
        Self { query_part }
    }

    /// The native fragment.
    pub fn query_part(&self) -> &Value {
        &self.query_part
    }
}
