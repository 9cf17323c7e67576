//! Search result types.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

/// A single normalized search result.
///
/// `query` is the original (pre-prefix) query the result belongs to. It is
/// not serialized: in JSON output the query is the key that groups results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(skip)]
    query: String,
    title: String,
    url: String,
    snippet: String,
    domain: String,
}

impl SearchResult {
    /// Creates a new search result, deriving `domain` from the URL host.
    pub fn new(
        query: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let domain = domain_of(&url);
        Self {
            query: query.into(),
            title: title.into(),
            url,
            snippet: snippet.into(),
            domain,
        }
    }

    /// Returns the original query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the result title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the result URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the result snippet.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    /// Returns the host of `url`, or an empty string if it has none.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns a copy attributed to another query.
    ///
    /// Used when results come from the cache or a JSON file, where the
    /// grouping key is the source of truth.
    pub fn for_query(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..self.clone()
        }
    }
}

/// Extracts the lowercased host of a URL.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

/// Ordered mapping from original query to its results.
///
/// Insertion order is query file order; the first insertion of a query
/// wins, so repeated query lines collapse into one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: IndexMap<String, Vec<SearchResult>>,
}

impl ResultSet {
    /// Creates an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the results for a query. Returns `false` if the query was
    /// already present, in which case nothing changes.
    pub fn insert(&mut self, query: impl Into<String>, results: Vec<SearchResult>) -> bool {
        let query = query.into();
        if self.entries.contains_key(&query) {
            return false;
        }
        self.entries.insert(query, results);
        true
    }

    /// Returns whether the query has an entry.
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    /// Returns the results for a query.
    pub fn get(&self, query: &str) -> Option<&[SearchResult]> {
        self.entries.get(query).map(Vec::as_slice)
    }

    /// Returns the number of queries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no query has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the queries in insertion order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over `(query, results)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SearchResult])> {
        self.entries.iter().map(|(q, r)| (q.as_str(), r.as_slice()))
    }

    /// Returns the total number of results across all queries.
    pub fn total_results(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResultSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = IndexMap::<String, Vec<SearchResult>>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(query, results)| {
                let results = results.iter().map(|r| r.for_query(query.as_str())).collect();
                (query, results)
            })
            .collect();
        Ok(Self { entries })
    }
}
