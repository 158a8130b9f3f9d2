//! Evaluates query expressions against flattened records.

use serde_json::Value;

use crate::error::Result;
use crate::flatten::{flatten, FlatView};

use super::expression::{QueryExpression, QueryField, QueryTerm, QueryValue};
use super::optimizer::optimize_expression;
use super::parser::QueryParser;

/// A compiled query, ready to test records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatcher {
    expression: QueryExpression,
}

impl QueryMatcher {
    /// Compiles query text; `None` and blank text match everything.
    ///
    /// The compilation pipeline:
    /// 1. Parse the raw query string into an AST
    /// 2. Normalize the expression (flatten nested AND/OR, reorder by cost)
    pub fn compile(raw_query: Option<&str>) -> Result<Self> {
        let parsed = match raw_query {
            Some(text) => QueryParser::parse(text)?,
            None => QueryExpression::MatchAll,
        };
        Ok(Self::from_expression(parsed))
    }

    pub fn from_expression(expression: QueryExpression) -> Self {
        Self {
            expression: optimize_expression(expression),
        }
    }

    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }

    pub fn matches(&self, view: &FlatView) -> bool {
        matches(&self.expression, view)
    }

    /// Flattens `record` and tests it.
    pub fn matches_record(&self, record: &Value) -> bool {
        self.matches(&flatten(record))
    }
}

/// Tests one expression against one view. Unknown fields never match.
pub fn matches(expression: &QueryExpression, view: &FlatView) -> bool {
    match expression {
        QueryExpression::MatchAll => true,
        QueryExpression::Term(term) => term_matches(term, view),
        QueryExpression::Not(inner) => !matches(inner, view),
        QueryExpression::And(parts) => parts.iter().all(|part| matches(part, view)),
        QueryExpression::Or(parts) => parts.iter().any(|part| matches(part, view)),
    }
}

fn term_matches(term: &QueryTerm, view: &FlatView) -> bool {
    match (&term.field, &term.value) {
        (QueryField::Named(field), QueryValue::Exact(value)) => view.contains(field, value),
        (QueryField::Named(field), value) => view
            .values(field)
            .any(|candidate| value_matches(value, candidate)),
        (QueryField::Any, value) => view
            .all_values()
            .any(|candidate| value_matches(value, candidate)),
    }
}

fn value_matches(value: &QueryValue, candidate: &str) -> bool {
    match value {
        QueryValue::Exact(expected) => candidate == expected,
        QueryValue::Pattern(pattern) => pattern.matches(candidate),
        QueryValue::Present => true,
        QueryValue::Range(range) => range.contains(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn compile(query: &str) -> QueryMatcher {
        QueryMatcher::compile(Some(query)).expect("query compiles")
    }

    fn web_prod() -> FlatView {
        flatten(&json!({
            "name": "web01",
            "role": ["web", "base"],
            "environment": "prod",
            "automatic": { "hostname": "web01.example.com", "cpu": { "total": 8 } },
            "enabled": true
        }))
    }

    #[test]
    fn none_matches_everything() {
        let matcher = QueryMatcher::compile(None).unwrap();
        assert!(matcher.matches(&FlatView::default()));
        assert!(matcher.matches(&web_prod()));
    }

    #[test]
    fn exact_term_on_scalar_and_sequence() {
        assert!(compile("environment:prod").matches(&web_prod()));
        assert!(compile("role:base").matches(&web_prod()));
        assert!(!compile("role:db").matches(&web_prod()));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!compile("environment:Prod").matches(&web_prod()));
    }

    #[test]
    fn nested_paths_and_canonical_scalars() {
        assert!(compile("automatic.hostname:web01.example.com").matches(&web_prod()));
        assert!(compile("automatic.cpu.total:8").matches(&web_prod()));
        assert!(compile("enabled:true").matches(&web_prod()));
    }

    #[test]
    fn unknown_field_never_matches() {
        assert!(!compile("missing:value").matches(&web_prod()));
        assert!(!compile("missing:*").matches(&web_prod()));
        assert!(compile("NOT missing:value").matches(&web_prod()));
    }

    #[test]
    fn presence_requires_a_value() {
        assert!(compile("automatic.hostname:*").matches(&web_prod()));
        assert!(!compile("description:*").matches(&flatten(&json!({ "description": null }))));
    }

    #[test]
    fn any_field_term() {
        assert!(compile("*:prod").matches(&web_prod()));
        assert!(compile("web01").matches(&web_prod()));
        assert!(!compile("staging").matches(&web_prod()));
    }

    #[test]
    fn glob_and_range_values() {
        assert!(compile("name:web*").matches(&web_prod()));
        assert!(compile("name:web0?").matches(&web_prod()));
        assert!(!compile("name:db*").matches(&web_prod()));
        assert!(compile("name:[w TO x]").matches(&web_prod()));
        assert!(!compile("name:{web01 TO *]").matches(&web_prod()));
    }

    #[test]
    fn boolean_composition() {
        let view = web_prod();
        assert!(compile("role:web AND NOT environment:staging").matches(&view));
        assert!(compile("role:db OR environment:prod").matches(&view));
        assert!(!compile("role:db OR environment:staging").matches(&view));
        assert!(compile("(role:db OR role:web) -environment:staging").matches(&view));
    }

    #[test]
    fn phrase_round_trip() {
        let view = flatten(&json!({ "description": "front end web tier" }));
        assert!(compile("description:\"front end web tier\"").matches(&view));
        assert!(!compile("description:\"front end\"").matches(&view));
    }

    #[test]
    fn matches_record_flattens_first() {
        let matcher = compile("run_list:recipe\\[nginx\\]");
        assert!(matcher.matches_record(&json!({ "run_list": ["recipe[nginx]"] })));
        assert!(!matcher.matches_record(&json!({ "run_list": [] })));
    }

    #[test]
    fn repeated_evaluation_is_stable() {
        let matcher = compile("role:web AND name:web*");
        let view = web_prod();
        let first = matcher.matches(&view);
        for _ in 0..10 {
            assert_eq!(matcher.matches(&view), first);
        }
    }

    const FIELDS: [&str; 3] = ["a", "b", "c"];
    const VALUES: [&str; 3] = ["1", "2", "3"];

    fn arb_term() -> impl Strategy<Value = QueryExpression> {
        (
            prop::sample::select(FIELDS.to_vec()),
            prop::sample::select(VALUES.to_vec()),
        )
            .prop_map(|(field, value)| QueryExpression::field_equals(field, value))
    }

    fn arb_expression() -> impl Strategy<Value = QueryExpression> {
        arb_term().prop_recursive(4, 32, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone())
                    .prop_map(|(left, right)| QueryExpression::And(vec![left, right])),
                (inner.clone(), inner.clone())
                    .prop_map(|(left, right)| QueryExpression::Or(vec![left, right])),
                inner.prop_map(QueryExpression::negate),
            ]
        })
    }

    fn arb_view() -> impl Strategy<Value = FlatView> {
        prop::collection::btree_map(
            prop::sample::select(FIELDS.to_vec()),
            prop::collection::vec(prop::sample::select(VALUES.to_vec()), 0..3),
            0..4,
        )
        .prop_map(|fields| flatten(&serde_json::to_value(fields).expect("serializable")))
    }

    proptest! {
        #[test]
        fn match_all_accepts_every_view(view in arb_view()) {
            prop_assert!(matches(&QueryExpression::MatchAll, &view));
        }

        #[test]
        fn de_morgan_over_and(a in arb_expression(), b in arb_expression(), view in arb_view()) {
            let lhs = QueryExpression::And(vec![a.clone(), b.clone()]).negate();
            let rhs = QueryExpression::Or(vec![a.negate(), b.negate()]);
            prop_assert_eq!(matches(&lhs, &view), matches(&rhs, &view));
        }

        #[test]
        fn de_morgan_over_or(a in arb_expression(), b in arb_expression(), view in arb_view()) {
            let lhs = QueryExpression::Or(vec![a.clone(), b.clone()]).negate();
            let rhs = QueryExpression::And(vec![a.negate(), b.negate()]);
            prop_assert_eq!(matches(&lhs, &view), matches(&rhs, &view));
        }

        #[test]
        fn normalization_preserves_results(expr in arb_expression(), view in arb_view()) {
            let normalized = QueryMatcher::from_expression(expr.clone());
            prop_assert_eq!(normalized.matches(&view), matches(&expr, &view));
        }
    }
}
