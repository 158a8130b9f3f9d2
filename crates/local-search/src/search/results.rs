use std::iter::FusedIterator;

use crate::document::Document;
use crate::query::QueryMatcher;

/// Matches of one search call, produced lazily in listing order.
///
/// Candidates are flattened and tested only as the iterator is advanced, and
/// iteration stops as soon as the window is filled.
pub struct SearchResults {
    candidates: std::vec::IntoIter<Document>,
    matcher: QueryMatcher,
    skip: usize,
    remaining: usize,
}

impl SearchResults {
    pub(crate) fn new(
        candidates: Vec<Document>,
        matcher: QueryMatcher,
        start: usize,
        rows: usize,
    ) -> Self {
        Self {
            candidates: candidates.into_iter(),
            matcher,
            skip: start,
            remaining: rows,
        }
    }

    /// Documents the window can still yield at most.
    pub fn remaining_rows(&self) -> usize {
        self.remaining
    }
}

impl Iterator for SearchResults {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        while self.remaining > 0 {
            let document = self.candidates.next()?;
            if !self.matcher.matches(&document.flat_view()) {
                continue;
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            self.remaining -= 1;
            return Some(document);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining.min(self.candidates.len())))
    }
}

impl FusedIterator for SearchResults {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BagItem;
    use serde_json::{json, Value};

    fn items(count: usize) -> Vec<Document> {
        (0..count)
            .map(|n| {
                let Value::Object(raw) = json!({ "id": n.to_string(), "even": n % 2 == 0 }) else {
                    unreachable!()
                };
                Document::BagItem(BagItem {
                    bag: "numbers".to_string(),
                    id: n.to_string(),
                    raw,
                })
            })
            .collect()
    }

    fn ids(results: SearchResults) -> Vec<String> {
        results.map(|document| document.id().to_string()).collect()
    }

    #[test]
    fn skips_only_matches() {
        let matcher = QueryMatcher::compile(Some("even:true")).unwrap();
        let results = SearchResults::new(items(10), matcher, 1, 2);
        assert_eq!(ids(results), vec!["2", "4"]);
    }

    #[test]
    fn zero_rows_yields_nothing() {
        let matcher = QueryMatcher::compile(None).unwrap();
        let mut results = SearchResults::new(items(3), matcher, 0, 0);
        assert_eq!(results.size_hint(), (0, Some(0)));
        assert!(results.next().is_none());
    }

    #[test]
    fn stops_when_window_is_filled() {
        let matcher = QueryMatcher::compile(None).unwrap();
        let mut results = SearchResults::new(items(5), matcher, 0, 2);
        assert!(results.next().is_some());
        assert!(results.next().is_some());
        assert_eq!(results.remaining_rows(), 0);
        assert!(results.next().is_none());
        // Unvisited candidates are left untouched.
        assert_eq!(results.candidates.len(), 3);
    }

    #[test]
    fn start_beyond_matches_is_empty() {
        let matcher = QueryMatcher::compile(Some("*:*")).unwrap();
        let results = SearchResults::new(items(3), matcher, 3, 10);
        assert!(ids(results).is_empty());
    }
}
