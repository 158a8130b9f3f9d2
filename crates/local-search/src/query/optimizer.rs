//! Query normalization before evaluation.
//!
//! Applies deterministic rewrites that keep results identical while making the
//! tree smaller and cheaper to evaluate:
//! - Flattens nested AND/OR expressions
//! - Folds `*:*` out of conjunctions and collapses disjunctions containing it
//! - Removes double negation
//! - Reorders conjunction operands so cheap lookups run first

use super::expression::{QueryExpression, QueryField, QueryTerm, QueryValue};

/// Normalizes a parsed expression. A new tree is returned.
pub fn optimize_expression(expr: QueryExpression) -> QueryExpression {
    match expr {
        QueryExpression::And(parts) => optimize_and(parts),
        QueryExpression::Or(parts) => optimize_or(parts),
        QueryExpression::Not(inner) => match optimize_expression(*inner) {
            QueryExpression::Not(double) => *double,
            other => QueryExpression::Not(Box::new(other)),
        },
        QueryExpression::Term(_) | QueryExpression::MatchAll => expr,
    }
}

fn optimize_and(parts: Vec<QueryExpression>) -> QueryExpression {
    let mut flattened = Vec::new();

    for expr in parts.into_iter().map(optimize_expression) {
        match expr {
            QueryExpression::And(nested) => flattened.extend(nested),
            QueryExpression::MatchAll => {}
            other => flattened.push(other),
        }
    }

    match flattened.len() {
        0 => QueryExpression::MatchAll,
        1 => flattened.remove(0),
        _ => {
            reorder_by_cost(&mut flattened);
            QueryExpression::And(flattened)
        }
    }
}

fn optimize_or(parts: Vec<QueryExpression>) -> QueryExpression {
    let mut flattened = Vec::new();

    for expr in parts.into_iter().map(optimize_expression) {
        match expr {
            QueryExpression::Or(nested) => flattened.extend(nested),
            QueryExpression::MatchAll => return QueryExpression::MatchAll,
            other => flattened.push(other),
        }
    }

    match flattened.len() {
        0 => QueryExpression::MatchAll,
        1 => flattened.remove(0),
        _ => QueryExpression::Or(flattened),
    }
}

/// Cost classes (lower runs first):
/// - 0: exact value on a named field, a single set lookup
/// - 1: other named-field terms, a scan over one field's values
/// - 2: any-field terms, a scan over every value of the record
/// - 3: compound expressions and negations
///
/// The sort is stable, so operands of equal cost keep their written order.
fn reorder_by_cost(parts: &mut [QueryExpression]) {
    let cost = |expr: &QueryExpression| -> u8 {
        match expr {
            QueryExpression::Term(QueryTerm {
                field: QueryField::Named(_),
                value: QueryValue::Exact(_),
            }) => 0,
            QueryExpression::Term(QueryTerm {
                field: QueryField::Named(_),
                ..
            }) => 1,
            QueryExpression::Term(_) => 2,
            _ => 3,
        }
    };
    parts.sort_by_key(cost);
}
