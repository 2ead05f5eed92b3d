//! Storage-agnostic query model.
//!
//! A [`Query`] is one of three variants: a criteria query built from a tree
//! of [`Criteria`], a stored query naming a template registered on the
//! engine, or a custom query carrying a pre-built native query. The
//! translators in [`crate::translation`] turn each variant into a request.

mod criteria;
mod geometry;

use serde_json::{Map, Value};

pub use criteria::{
    AttributeCriteria, BoolOperator, Comparand, Comparison, ComparisonOperator, Criteria,
    CriteriaList, CustomCriteria, RangeCriteria, SearchCriteria, SpatialCriteria,
};
pub use geometry::{Annulus, BoundingBox, Circle, Geometry, Point, Polygon};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Returns the engine's sort order keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Sorts results by one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriteria {
    attribute_path: String,
    direction: SortDirection,
}

impl SortCriteria {
    /// Sorts by `attribute_path` in `direction`.
    pub fn new(attribute_path: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            attribute_path: attribute_path.into(),
            direction,
        }
    }

    /// Ascending sort.
    pub fn asc(attribute_path: impl Into<String>) -> Self {
        Self::new(attribute_path, SortDirection::Ascending)
    }

    /// Descending sort.
    pub fn desc(attribute_path: impl Into<String>) -> Self {
        Self::new(attribute_path, SortDirection::Descending)
    }

    /// Dotted path of the attribute.
    pub fn attribute_path(&self) -> &str {
        &self.attribute_path
    }

    /// Sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// Filters, full-text search criteria, sorting and pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaQuery {
    search_criteria: CriteriaList,
    filter_criteria: CriteriaList,
    sort_criteria: Vec<SortCriteria>,
    offset: u64,
    limit: u64,
}

impl CriteriaQuery {
    /// Creates a query for one page without criteria.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }

    /// Adds a full-text search criteria.
    pub fn with_search(mut self, criteria: impl Into<Criteria>) -> Self {
        self.search_criteria.push(criteria);
        self
    }

    /// Adds a filter criteria to the top-level filter list.
    pub fn with_filter(mut self, criteria: impl Into<Criteria>) -> Self {
        self.filter_criteria.push(criteria);
        self
    }

    /// Replaces the top-level filter list.
    pub fn with_filters(mut self, filters: CriteriaList) -> Self {
        self.filter_criteria = filters;
        self
    }

    /// Appends a sort, applied after the earlier ones.
    pub fn with_sort(mut self, sort: SortCriteria) -> Self {
        self.sort_criteria.push(sort);
        self
    }

    /// Full-text search criteria.
    pub fn search_criteria(&self) -> &CriteriaList {
        &self.search_criteria
    }

    /// Top-level filter list.
    pub fn filter_criteria(&self) -> &CriteriaList {
        &self.filter_criteria
    }

    /// Sorts in priority order.
    pub fn sort_criteria(&self) -> &[SortCriteria] {
        &self.sort_criteria
    }

    /// Index of the first result.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of results.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A named template stored on the engine, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredQuery {
    name: String,
    parameters: Map<String, Value>,
    offset: u64,
    limit: u64,
}

impl StoredQuery {
    /// References the template `name`.
    pub fn new(name: impl Into<String>, offset: u64, limit: u64) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
            offset,
            limit,
        }
    }

    /// Sets a template parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template parameters.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Index of the first result.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of results.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A pre-built native query.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomQuery {
    query: Value,
    offset: u64,
    limit: u64,
}

impl CustomQuery {
    /// Wraps a native query body.
    pub fn new(query: Value, offset: u64, limit: u64) -> Self {
        Self {
            query,
            offset,
            limit,
        }
    }

    /// The native query body.
    pub fn query(&self) -> &Value {
        &self.query
    }

    /// Index of the first result.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of results.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Any query understood by the translators.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A criteria query.
    Criteria(CriteriaQuery),
    /// A stored template query.
    Stored(StoredQuery),
    /// A native query.
    Custom(CustomQuery),
}

impl Query {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Criteria(_) => "criteria",
            Query::Stored(_) => "stored",
            Query::Custom(_) => "custom",
        }
    }

    /// Index of the first result.
    pub fn offset(&self) -> u64 {
        match self {
            Query::Criteria(q) => q.offset(),
            Query::Stored(q) => q.offset(),
            Query::Custom(q) => q.offset(),
        }
    }

    /// Maximum number of results.
    pub fn limit(&self) -> u64 {
        match self {
            Query::Criteria(q) => q.limit(),
            Query::Stored(q) => q.limit(),
            Query::Custom(q) => q.limit(),
        }
    }
}

impl From<CriteriaQuery> for Query {
    fn from(query: CriteriaQuery) -> Self {
        Query::Criteria(query)
    }
}

impl From<StoredQuery> for Query {
    fn from(query: StoredQuery) -> Self {
        Query::Stored(query)
    }
}

impl From<CustomQuery> for Query {
    fn from(query: CustomQuery) -> Self {
        Query::Custom(query)
    }
}
