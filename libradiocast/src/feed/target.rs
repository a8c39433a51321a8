//! Redirect-link unwrapping
//!
//! Feed links point at a redirect service that carries the real destination,
//! percent-encoded, in its `url` query parameter.

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// Query parameter holding the wrapped destination
pub const TARGET_PARAM: &str = "url";

/// Recover the destination wrapped in a redirect link
///
/// The query is the text between the first `?` and the next `?` (if any).
/// It is parsed as `application/x-www-form-urlencoded`, the first `url`
/// value is taken, and that value is percent-decoded once more to undo a
/// second level of encoding. Returns an empty string when the link has no
/// query, the parameter is absent or empty, or the decoded bytes are not
/// UTF-8.
pub fn resolve_target_url(link: &str) -> String {
    let Some((_, rest)) = link.split_once('?') else {
        return String::new();
    };
    let query = rest.split('?').next().unwrap_or_default();

    let wrapped = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| *key == TARGET_PARAM)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    if wrapped.is_empty() {
        return String::new();
    }

    match percent_decode_str(&wrapped).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!(link, error = %e, "Wrapped target is not valid UTF-8");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_percent_encoded_target() {
        assert_eq!(
            resolve_target_url("https://r.example.com/go?url=https%3A%2F%2Ftarget.example.com%2Fx"),
            "https://target.example.com/x"
        );
    }

    #[test]
    fn test_no_query_is_empty() {
        assert_eq!(resolve_target_url("https://r.example.com/go"), "");
        assert_eq!(resolve_target_url(""), "");
    }

    #[test]
    fn test_missing_or_empty_parameter_is_empty() {
        assert_eq!(resolve_target_url("https://r.example.com/go?id=7"), "");
        assert_eq!(resolve_target_url("https://r.example.com/go?url="), "");
        assert_eq!(resolve_target_url("https://r.example.com/go?"), "");
    }

    #[test]
    fn test_first_url_parameter_wins() {
        assert_eq!(
            resolve_target_url("https://r.example.com/go?a=1&url=https%3A%2F%2Fone&url=https%3A%2F%2Ftwo"),
            "https://one"
        );
    }

    #[test]
    fn test_double_encoded_target_is_fully_decoded() {
        assert_eq!(
            resolve_target_url("https://r.example.com/go?url=https%253A%252F%252Ft.example.com%252Fa%2520b"),
            "https://t.example.com/a b"
        );
    }

    #[test]
    fn test_plus_decodes_to_space() {
        assert_eq!(
            resolve_target_url("https://r.example.com/go?url=https%3A%2F%2Ft.example.com%2Fsearch%3Fq%3Da+b"),
            "https://t.example.com/search?q=a b"
        );
    }

    #[test]
    fn test_query_ends_at_second_question_mark() {
        assert_eq!(
            resolve_target_url("https://r.example.com/go?url=https%3A%2F%2Ft.example.com?url=ignored"),
            "https://t.example.com"
        );
    }

    #[test]
    fn test_invalid_utf8_is_empty() {
        assert_eq!(resolve_target_url("https://r.example.com/go?url=%25FF%25FE"), "");
    }
}
