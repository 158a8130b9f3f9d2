//! Query expression types and AST nodes.

use std::fmt;

use super::wildcard::GlobPattern;

/// A parsed query expression (AST node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpression {
    /// `*:*` or an empty query.
    MatchAll,
    Term(QueryTerm),
    Not(Box<QueryExpression>),
    And(Vec<QueryExpression>),
    Or(Vec<QueryExpression>),
}

/// A single `field:value` constraint (leaf node in the AST).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub field: QueryField,
    pub value: QueryValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryField {
    /// `*` or no field at all: the value may sit under any path.
    Any,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Case-sensitive whole-value equality (plain words and quoted phrases).
    Exact(String),
    /// Unquoted value containing `*` or `?`.
    Pattern(GlobPattern),
    /// A lone `*`: the field has at least one value.
    Present,
    Range(StringRange),
}

/// Lexicographic range over string values (`[a TO b]`, `{a TO b}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRange {
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

impl StringRange {
    pub fn contains(&self, candidate: &str) -> bool {
        let above = match self.lower.as_deref() {
            None => true,
            Some(lower) if self.lower_inclusive => candidate >= lower,
            Some(lower) => candidate > lower,
        };
        let below = match self.upper.as_deref() {
            None => true,
            Some(upper) if self.upper_inclusive => candidate <= upper,
            Some(upper) => candidate < upper,
        };
        above && below
    }
}

impl QueryTerm {
    pub fn new(field: QueryField, value: QueryValue) -> Self {
        Self { field, value }
    }
}

impl QueryExpression {
    /// `field:value` with an exact value.
    pub fn field_equals(field: &str, value: &str) -> Self {
        Self::Term(QueryTerm::new(
            QueryField::Named(field.to_string()),
            QueryValue::Exact(value.to_string()),
        ))
    }

    /// `field:*`.
    pub fn field_present(field: &str) -> Self {
        Self::Term(QueryTerm::new(
            QueryField::Named(field.to_string()),
            QueryValue::Present,
        ))
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::MatchAll)
    }
}

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAll => write!(f, "*:*"),
            Self::Term(term) => write!(f, "{term}"),
            Self::Not(inner) => write!(f, "NOT {inner}"),
            Self::And(parts) => write_joined(f, parts, " AND "),
            Self::Or(parts) => write_joined(f, parts, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[QueryExpression], joiner: &str) -> fmt::Result {
    write!(f, "(")?;
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            write!(f, "{joiner}")?;
        }
        write!(f, "{part}")?;
    }
    write!(f, ")")
}

impl fmt::Display for QueryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            QueryField::Any => write!(f, "*:")?,
            QueryField::Named(name) => write!(f, "{name}:")?,
        }
        match &self.value {
            QueryValue::Exact(value) => write!(f, "{value:?}"),
            QueryValue::Pattern(pattern) => write!(f, "{pattern}"),
            QueryValue::Present => write!(f, "*"),
            QueryValue::Range(range) => write!(f, "{range}"),
        }
    }
}

impl fmt::Display for StringRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lower_inclusive { '[' } else { '{' };
        let close = if self.upper_inclusive { ']' } else { '}' };
        write!(
            f,
            "{open}{} TO {}{close}",
            self.lower.as_deref().unwrap_or("*"),
            self.upper.as_deref().unwrap_or("*")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_range_includes_bounds() {
        let range = StringRange {
            lower: Some("b".to_string()),
            upper: Some("d".to_string()),
            lower_inclusive: true,
            upper_inclusive: true,
        };
        assert!(range.contains("b"));
        assert!(range.contains("c"));
        assert!(range.contains("d"));
        assert!(!range.contains("e"));
    }

    #[test]
    fn exclusive_range_excludes_bounds() {
        let range = StringRange {
            lower: Some("b".to_string()),
            upper: Some("d".to_string()),
            lower_inclusive: false,
            upper_inclusive: false,
        };
        assert!(!range.contains("b"));
        assert!(range.contains("c"));
        assert!(!range.contains("d"));
    }

    #[test]
    fn open_range_bounds() {
        let range = StringRange {
            lower: None,
            upper: Some("m".to_string()),
            lower_inclusive: true,
            upper_inclusive: false,
        };
        assert!(range.contains(""));
        assert!(range.contains("apple"));
        assert!(!range.contains("zebra"));
    }

    #[test]
    fn display_round_trips_shape() {
        let expr = QueryExpression::And(vec![
            QueryExpression::field_equals("role", "web"),
            QueryExpression::field_equals("environment", "staging").negate(),
        ]);
        assert_eq!(
            expr.to_string(),
            "(role:\"web\" AND NOT environment:\"staging\")"
        );
    }
}
