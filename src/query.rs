//! Query file parsing and target-domain prefixing.

use std::path::Path;

use crate::error::ConfigError;

/// A query as read from the query file, paired with the text actually
/// sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    original: String,
    effective: String,
}

impl Query {
    /// Creates a query, prefixing `site:<domain>` when a target is given.
    pub fn new(original: impl Into<String>, target_domain: Option<&str>) -> Self {
        let original = original.into();
        let effective = apply_target(&original, target_domain);
        Self { original, effective }
    }

    /// The query as written in the file; used to group results.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The query sent to the backend.
    pub fn effective(&self) -> &str {
        &self.effective
    }
}

/// Prefixes `site:<domain> ` to a query when a target domain is set.
///
/// A blank target is treated as no target.
pub fn apply_target(query: &str, target_domain: Option<&str>) -> String {
    match target_domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => format!("site:{} {}", domain, query),
        None => query.to_string(),
    }
}

/// Parses newline-delimited queries.
///
/// Lines are trimmed; blank lines and `#` comments are skipped.
pub fn parse_queries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads and parses a query file.
///
/// # Errors
///
/// Returns [`ConfigError::QueryFile`] if the file cannot be read and
/// [`ConfigError::NoQueries`] if it holds no queries.
pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::QueryFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let queries = parse_queries(&content);
    if queries.is_empty() {
        return Err(ConfigError::NoQueries(path.display().to_string()));
    }
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_apply_target_prefixes_site() {
        assert_eq!(
            apply_target("password", Some("example.com")),
            "site:example.com password"
        );
    }

    #[test]
    fn test_apply_target_none_is_identity() {
        assert_eq!(apply_target("inurl:admin", None), "inurl:admin");
    }

    #[test]
    fn test_apply_target_blank_is_identity() {
        assert_eq!(apply_target("filetype:pdf", Some("  ")), "filetype:pdf");
    }

    #[test]
    fn test_query_keeps_original() {
        let query = Query::new("password", Some("example.com"));
        assert_eq!(query.original(), "password");
        assert_eq!(query.effective(), "site:example.com password");
    }

    #[test]
    fn test_parse_queries_skips_blank_and_comments() {
        let content = "# login pages\ninurl:login\n\n   \n  filetype:sql password  \n#intitle:index\n";
        assert_eq!(parse_queries(content), vec!["inurl:login", "filetype:sql password"]);
    }

    #[test]
    fn test_parse_queries_handles_crlf() {
        assert_eq!(parse_queries("a\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_load_queries_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "password").unwrap();
        writeln!(file, "admin login").unwrap();
        let queries = load_queries(file.path()).unwrap();
        assert_eq!(queries, vec!["password", "admin login"]);
    }

    #[test]
    fn test_load_queries_missing_file() {
        let err = load_queries("/definitely/not/here/dorks.txt").unwrap_err();
        assert!(matches!(err, ConfigError::QueryFile { .. }));
    }

    #[test]
    fn test_load_queries_only_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        writeln!(file).unwrap();
        let err = load_queries(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoQueries(_)));
    }
}
