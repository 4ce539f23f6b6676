//! Predicates for Folio test output

use predicates::prelude::*;
use predicates::str::contains;

/// Stderr contains none of `values`
pub fn stderr_not_contains(values: &[&str]) -> impl Predicate<str> {
    let owned_values: Vec<String> = values.iter().map(|&s| s.to_string()).collect();
    predicate::function(move |s: &str| !owned_values.iter().any(|v| s.contains(v.as_str())))
}

/// Basic JSON-RPC response shape: `jsonrpc`, `id`, and `result` or `error`
///
/// ```rust
/// use folio_test_helpers::assertions::valid_jsonrpc_response;
/// use predicates::prelude::*;
///
/// let response = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
/// assert!(valid_jsonrpc_response().eval(response));
/// ```
pub fn valid_jsonrpc_response() -> impl Predicate<str> {
    contains("\"jsonrpc\"")
        .and(contains("\"id\""))
        .and(contains("\"result\"").or(contains("\"error\"")))
}

/// Output mentions a document key: 32 lowercase hex characters in a row
pub fn contains_document_key() -> impl Predicate<str> {
    predicate::function(|s: &str| {
        s.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word.len() == 32 && word.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')))
    })
}

/// Every line of `s` is a JSON value
pub fn json_lines() -> impl Predicate<str> {
    predicate::function(|s: &str| {
        s.lines()
            .filter(|l| !l.trim().is_empty())
            .all(|l| l.trim_start().starts_with('{') && l.trim_end().ends_with('}'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_not_contains() {
        assert!(stderr_not_contains(&["ERROR", "WARN"]).eval("Some output without errors"));
        assert!(!stderr_not_contains(&["ERROR"]).eval("ERROR: something went wrong"));
    }

    #[test]
    fn test_valid_jsonrpc_response() {
        assert!(valid_jsonrpc_response().eval(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#));
        assert!(valid_jsonrpc_response().eval(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600}}"#));
        assert!(!valid_jsonrpc_response().eval(r#"{"data":"test"}"#));
    }

    #[test]
    fn test_contains_document_key() {
        assert!(contains_document_key().eval("document-key: 2cf24dba5fb0a30e26e83b2ac5b9e29e for prompt"));
        assert!(!contains_document_key().eval("document-key: 2cf24dba"));
        assert!(!contains_document_key().eval("2CF24DBA5FB0A30E26E83B2AC5B9E29E"));
    }

    #[test]
    fn test_json_lines() {
        assert!(json_lines().eval("{\"a\":1}\n{\"b\":2}\n"));
        assert!(!json_lines().eval("{\"a\":1}\nlog line\n"));
    }
}
