//! Query descriptor types produced by the path parser.

/// One element of a store path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Plain mapping key: `.config`
    Key(String),
    /// Key/value predicate selecting the first matching element of a
    /// sequence: `.[id:2]`
    Predicate { key: String, value: String },
}

impl PathStep {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    pub fn predicate(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Predicate {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the plain key, if this step is one.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Predicate { .. } => None,
        }
    }
}

/// Parsed descriptor of one path segment.
///
/// Describes a single store lookup: which store, which path inside it,
/// which fields to keep or drop, and under which name the result is
/// wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Alias the result is wrapped under when no `prop_name` applies.
    pub name: Option<String>,
    /// Target store identifier. Resolved externally by the caller.
    pub store: String,
    /// Trailing plain key of `store_path`, used as an implicit name.
    pub prop_name: Option<String>,
    /// Path to walk inside the store snapshot. Never null.
    pub store_path: Vec<PathStep>,
    /// Inclusion filter: `:just(a, b)`
    pub just: Option<Vec<String>>,
    /// Exclusion filter: `:not(a, status:archived)`
    pub not: Option<Vec<String>>,
}

impl Query {
    /// Descriptor selecting the whole snapshot of `store`.
    pub fn store_root(store: impl Into<String>) -> Self {
        Self {
            name: None,
            store: store.into(),
            prop_name: None,
            store_path: Vec::new(),
            just: None,
            not: None,
        }
    }
}

/// Result of parsing a whole expression.
///
/// A lone segment yields `Single`; `|`-joined segments yield `Union`
/// in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    Single(Query),
    Union(Vec<Query>),
}

impl ParsedPath {
    /// All descriptors in source order.
    pub fn queries(&self) -> &[Query] {
        match self {
            Self::Single(query) => std::slice::from_ref(query),
            Self::Union(queries) => queries,
        }
    }

    pub fn into_queries(self) -> Vec<Query> {
        match self {
            Self::Single(query) => vec![query],
            Self::Union(queries) => queries,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }
}
