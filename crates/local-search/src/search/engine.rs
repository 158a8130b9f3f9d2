//! Search orchestration over a document source.

use crate::document::Document;
use crate::error::{Result, SearchError};
use crate::provider::{BagProvider, CollectionProvider, NodeProvider, RoleProvider};
use crate::query::QueryMatcher;
use crate::source::SharedSource;

use super::request::{Collection, SearchRequest};
use super::results::SearchResults;

/// Runs searches against one document source.
///
/// Every call lists and scans the whole collection again; nothing is cached
/// between calls.
#[derive(Clone)]
pub struct Searcher {
    source: SharedSource,
}

impl Searcher {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    fn provider_for(&self, collection: &Collection) -> Box<dyn CollectionProvider> {
        match collection {
            Collection::Node => Box::new(NodeProvider::new(self.source.clone())),
            Collection::Role => Box::new(RoleProvider::new(self.source.clone())),
            Collection::Bag(bag) => Box::new(BagProvider::new(self.source.clone(), bag.clone())),
        }
    }

    /// Validates the request, lists candidates, and returns the window of
    /// matches as a lazy iterator.
    ///
    /// Fails before any record is read when the request carries a sort or the
    /// query text is outside the supported grammar.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        if let Some(sort) = request.sort_order() {
            return Err(SearchError::UnsupportedOption(format!(
                "sorting search results is not supported (sort: {sort})"
            )));
        }
        let matcher = QueryMatcher::compile(request.query_text())?;

        let collection = request.collection();
        let candidates = self.provider_for(collection).list_candidates()?;
        log::debug!(
            "search {} query={} candidates={} start={} rows={}",
            collection,
            matcher.expression(),
            candidates.len(),
            request.window_start(),
            request.window_rows()
        );

        Ok(SearchResults::new(
            candidates,
            matcher,
            request.window_start(),
            request.window_rows(),
        ))
    }

    /// Returns the window of matches as a vector.
    pub fn search_collect(&self, request: &SearchRequest) -> Result<Vec<Document>> {
        Ok(self.search(request)?.collect())
    }

    /// Hands each match in the window to `deliver`, in order, before
    /// returning. Returns the number of documents delivered.
    pub fn search_each<F>(&self, request: &SearchRequest, mut deliver: F) -> Result<usize>
    where
        F: FnMut(Document),
    {
        let mut delivered = 0;
        for document in self.search(request)? {
            deliver(document);
            delivered += 1;
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, RecordFormat, StoredRecord};
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn searcher(source: MemorySource) -> Searcher {
        Searcher::new(Arc::new(source))
    }

    fn ids(documents: &[Document]) -> Vec<&str> {
        documents.iter().map(Document::id).collect()
    }

    fn three_nodes() -> MemorySource {
        MemorySource::new()
            .with_node("a", &json!({ "name": "a", "automatic": { "hostname": "a.local" } }))
            .with_node("b", &json!({ "name": "b", "hostname": "b.local" }))
            .with_node("c", &json!({ "hostname": "c.local", "chef_environment": "prod" }))
    }

    #[test]
    fn role_query_with_negation() {
        let source = MemorySource::new()
            .with_role("web-staging", &json!({ "role": "web", "environment": "staging" }))
            .with_role("web-prod", &json!({ "role": "web", "environment": "prod" }))
            .with_role("db", &json!({ "role": "db" }));
        let request = SearchRequest::new(Collection::Role)
            .query("role:web AND NOT environment:staging")
            .start(0)
            .rows(10);

        let found = searcher(source).search_collect(&request).expect("search");
        assert_eq!(ids(&found), vec!["web-prod"]);
    }

    #[test]
    fn match_all_window_past_first_page() {
        let request = SearchRequest::new(Collection::Node)
            .query("*:*")
            .start(2)
            .rows(2);
        let found = searcher(three_nodes()).search_collect(&request).expect("search");
        assert_eq!(ids(&found), vec!["c.local"]);
    }

    #[test]
    fn sort_is_always_rejected() {
        let request = SearchRequest::new(Collection::Node)
            .query("hostname:*")
            .sort("name");
        let err = searcher(three_nodes()).search(&request).err().expect("rejected");
        assert!(matches!(err, SearchError::UnsupportedOption(_)));
    }

    #[test]
    fn sort_is_rejected_before_reading_records() {
        // Neither the bad query nor the missing bag is reached.
        let request = SearchRequest::new("missing").query("a:b~2").sort("id");
        let err = searcher(MemorySource::new()).search(&request).err().expect("rejected");
        assert!(matches!(err, SearchError::UnsupportedOption(_)));
    }

    #[test]
    fn unsupported_query_is_rejected_before_listing() {
        let mut source = MemorySource::new();
        source.push_node(StoredRecord::new("bad", RecordFormat::Json, "{"));
        let request = SearchRequest::new(Collection::Node).query("name:web^2");
        let err = searcher(source).search(&request).err().expect("rejected");
        assert!(matches!(err, SearchError::UnsupportedQuery(_)));
    }

    #[test]
    fn hostname_queries_see_relocated_hostnames() {
        let searcher = searcher(three_nodes());
        let request = SearchRequest::new(Collection::Node).query("hostname:*");
        let found = searcher.search_collect(&request).expect("search");
        assert_eq!(ids(&found), vec!["a", "b", "c.local"]);

        let request = SearchRequest::new(Collection::Node).query("automatic.hostname:b.local");
        let found = searcher.search_collect(&request).expect("search");
        assert_eq!(ids(&found), vec!["b"]);
    }

    #[test]
    fn absent_and_blank_queries_match_everything() {
        let searcher = searcher(three_nodes());
        for request in [
            SearchRequest::new(Collection::Node),
            SearchRequest::new(Collection::Node).query(""),
            SearchRequest::new(Collection::Node).query("   "),
        ] {
            assert_eq!(searcher.search_collect(&request).expect("search").len(), 3);
        }
    }

    #[test]
    fn bag_search_and_missing_bag() {
        let source = MemorySource::new()
            .with_bag_item("users", "alice", &json!({ "id": "alice", "groups": ["admin", "dev"] }))
            .with_bag_item("users", "bob", &json!({ "id": "bob", "groups": ["dev"] }));
        let searcher = searcher(source);

        let request = SearchRequest::new("users").query("groups:admin");
        let found = searcher.search_collect(&request).expect("search");
        assert_eq!(ids(&found), vec!["alice"]);

        let request = SearchRequest::new("groups");
        let err = searcher.search(&request).err().expect("missing bag");
        assert!(matches!(err, SearchError::BagNotFound(name) if name == "groups"));
    }

    #[test]
    fn node_search_through_role_expansion() {
        let source = MemorySource::new()
            .with_role("web", &json!({ "name": "web", "run_list": ["recipe[nginx]"] }))
            .with_node("web01", &json!({ "name": "web01", "run_list": ["role[web]"] }))
            .with_node("db01", &json!({ "name": "db01", "run_list": ["recipe[postgres]"] }));
        let searcher = searcher(source);

        let found = searcher
            .search_collect(&SearchRequest::new(Collection::Node).query("recipes:nginx"))
            .expect("search");
        assert_eq!(ids(&found), vec!["web01"]);

        let found = searcher
            .search_collect(&SearchRequest::new(Collection::Node).query("role:web OR recipe:postgres"))
            .expect("search");
        assert_eq!(ids(&found), vec!["web01", "db01"]);
    }

    #[test]
    fn malformed_node_aborts_search() {
        let mut source = three_nodes();
        source.push_node(StoredRecord::new("broken", RecordFormat::Json, "[1, 2"));
        let request = SearchRequest::new(Collection::Node);
        let err = searcher(source).search(&request).err().expect("aborted");
        assert!(matches!(err, SearchError::MalformedRecord { id, .. } if id == "broken"));
    }

    #[test]
    fn searches_a_directory_tree() {
        use crate::config::SourceConfig;
        use crate::source::DirectorySource;

        let dir = tempfile::tempdir().expect("tempdir");
        let config = SourceConfig::rooted_at(dir.path());
        let write = |path: std::path::PathBuf, contents: &str| {
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(path, contents).expect("write");
        };
        write(
            config.node_path().join("web01.json"),
            r#"{"hostname":"web01","run_list":["role[web]"],"normal":{"tier":"front"}}"#,
        );
        write(
            config.node_path().join("db01.json"),
            r#"{"name":"db01","run_list":["recipe[postgres]"]}"#,
        );
        write(
            config.role_path.join("web.rb"),
            "name \"web\"\nrun_list \"recipe[nginx]\"\ndefault_attributes \"nginx\" => { \"port\" => 80 }\n",
        );
        write(
            config.data_bag_path.join("users").join("alice.json"),
            r#"{"id":"alice","shell":"/bin/zsh"}"#,
        );

        let searcher = Searcher::new(Arc::new(DirectorySource::new(config)));

        let found = searcher
            .search_collect(&SearchRequest::new(Collection::Node).query("nginx.port:80"))
            .expect("node search");
        assert_eq!(ids(&found), vec!["web01"]);

        let found = searcher
            .search_collect(&SearchRequest::new(Collection::Node).query("name:*01"))
            .expect("node search");
        assert_eq!(ids(&found), vec!["db01", "web01"]);

        let found = searcher
            .search_collect(&SearchRequest::new(Collection::Role).query("run_list:recipe\\[nginx\\]"))
            .expect("role search");
        assert_eq!(ids(&found), vec!["web"]);

        let found = searcher
            .search_collect(&SearchRequest::new("users").query("shell:\"/bin/zsh\""))
            .expect("bag search");
        assert_eq!(ids(&found), vec!["alice"]);
    }

    #[test]
    fn search_each_delivers_in_order() {
        let mut delivered = Vec::new();
        let count = searcher(three_nodes())
            .search_each(&SearchRequest::new(Collection::Node).start(1), |document| {
                delivered.push(document.id().to_string())
            })
            .expect("search");
        assert_eq!(count, 2);
        assert_eq!(delivered, vec!["b", "c.local"]);
    }

    fn numbered_bag(count: usize) -> MemorySource {
        (0..count).fold(MemorySource::new().with_bag("numbers"), |source, n| {
            source.with_bag_item(
                "numbers",
                &format!("{n:03}"),
                &json!({ "id": format!("{n:03}"), "even": n % 2 == 0 }),
            )
        })
    }

    proptest! {
        #[test]
        fn window_is_a_slice_of_the_match_list(
            count in 0usize..24,
            start in 0usize..30,
            rows in 0usize..30,
        ) {
            let searcher = searcher(numbered_bag(count));
            let all = searcher
                .search_collect(&SearchRequest::new("numbers").query("even:true"))
                .unwrap();
            let window = searcher
                .search_collect(
                    &SearchRequest::new("numbers")
                        .query("even:true")
                        .start(start)
                        .rows(rows),
                )
                .unwrap();

            let end = start.saturating_add(rows).min(all.len());
            let expected = if start >= all.len() { &all[..0] } else { &all[start..end] };
            prop_assert_eq!(window.as_slice(), expected);
        }

        #[test]
        fn delivery_matches_returned_window(
            count in 0usize..16,
            start in 0usize..20,
            rows in 0usize..20,
        ) {
            let searcher = searcher(numbered_bag(count));
            let request = SearchRequest::new("numbers").start(start).rows(rows);

            let returned = searcher.search_collect(&request).unwrap();
            let mut delivered = Vec::new();
            let delivered_count = searcher
                .search_each(&request, |document| delivered.push(document))
                .unwrap();

            prop_assert_eq!(delivered_count, returned.len());
            prop_assert_eq!(delivered, returned);
        }

        #[test]
        fn sort_fails_for_any_window(start in 0usize..50, rows in 0usize..50, sort in "[a-z]{1,8}") {
            let request = SearchRequest::new(Collection::Node)
                .start(start)
                .rows(rows)
                .sort(sort);
            let rejected = matches!(
                searcher(MemorySource::new()).search(&request),
                Err(SearchError::UnsupportedOption(_))
            );
            prop_assert!(rejected);
        }
    }
}
