//! Query building for the title index.

/// Quote a term for an FTS5 MATCH expression.
pub fn quote_fts5_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Build an FTS5 query where every term must appear as a prefix.
///
/// - "the matrix" → `"the"* "matrix"*`
/// - "spider-man" → `"spider-man"*`
pub fn build_fts5_query(search_term: &str) -> String {
    search_term
        .to_lowercase()
        .split_whitespace()
        .map(|term| format!("{}*", quote_fts5_term(term)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a LIKE pattern that matches `term` as a substring.
///
/// `%`, `_` and the escape character itself are escaped with `\`.
pub fn build_like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_multiple_terms() {
        assert_eq!(build_fts5_query("The Matrix"), "\"the\"* \"matrix\"*");
    }

    #[test]
    fn test_build_query_quotes() {
        assert_eq!(build_fts5_query("say \"hi\""), "\"say\"* \"\"\"hi\"\"\"*");
    }

    #[test]
    fn test_build_query_empty() {
        assert_eq!(build_fts5_query("   "), "");
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(build_like_pattern("100%_sure"), "%100\\%\\_sure%");
        assert_eq!(build_like_pattern(" heat "), "%heat%");
    }
}
