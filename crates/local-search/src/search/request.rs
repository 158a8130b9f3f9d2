use std::fmt;

pub const DEFAULT_START: usize = 0;
pub const DEFAULT_ROWS: usize = 1000;

/// The collection a search runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Node,
    Role,
    /// A named bag of free-form items.
    Bag(String),
}

impl Collection {
    /// `node` and `role` name the fixed collections; any other name is a bag.
    pub fn parse(name: &str) -> Self {
        match name {
            "node" => Self::Node,
            "role" => Self::Role,
            bag => Self::Bag(bag.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Node => "node",
            Self::Role => "role",
            Self::Bag(bag) => bag.as_str(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Collection {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

/// One search call: collection, optional query text, and the result window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    collection: Collection,
    query: Option<String>,
    sort: Option<String>,
    start: usize,
    rows: usize,
}

impl SearchRequest {
    pub fn new(collection: impl Into<Collection>) -> Self {
        Self {
            collection: collection.into(),
            query: None,
            sort: None,
            start: DEFAULT_START,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sorting is never performed; a request carrying a sort is rejected.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn sort_order(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn window_start(&self) -> usize {
        self.start
    }

    pub fn window_rows(&self) -> usize {
        self.rows
    }
}
