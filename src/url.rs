//! Query-string URL construction for script sources.
//!
//! Pure functions — no DOM access, no I/O. Validation strictness is driven
//! by [`UrlPolicy`]; the default is the strictest variant (http/https only,
//! empty parameter keys rejected).

use crate::error::ValidationError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Characters that should NOT be percent-encoded in a query component
/// (matches JS `encodeURIComponent`: unreserved chars per RFC 3986
/// plus `!`, `'`, `(`, `)`, `*`). Space encodes as `%20`, never `+`.
const QUERY_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Validation strictness at the loader boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UrlPolicy {
    /// Restrict absolute base URLs to `http`/`https` (rejects e.g.
    /// `javascript:` and `file:`).
    pub enforce_http_scheme: bool,
    /// Reject parameter keys that are empty after trimming.
    pub reject_empty_keys: bool,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            enforce_http_scheme: true,
            reject_empty_keys: true,
        }
    }
}

/// Percent-encode a single query key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, QUERY_COMPONENT_SET).to_string()
}

/// Whether the address carries a URI scheme (`scheme:`), i.e. is absolute.
///
/// Protocol-relative addresses (`//cdn.example.com/x.js`) and bare paths
/// have no scheme and are passed through unparsed.
fn leading_scheme(address: &str) -> Option<&str> {
    let colon = address.find(':')?;
    let scheme = &address[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}

/// Validate a base URL against the policy.
///
/// Must be non-empty after trimming; when absolute, must parse as a URL and
/// (under the default policy) resolve to an `http`/`https` scheme.
pub fn validate_base_url(base_url: &str, policy: &UrlPolicy) -> Result<(), ValidationError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyBaseUrl);
    }

    if leading_scheme(trimmed).is_some() {
        let parsed = url::Url::parse(trimmed).map_err(|e| ValidationError::MalformedUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if policy.enforce_http_scheme && !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::DisallowedScheme {
                scheme: parsed.scheme().to_string(),
            });
        }
    }

    Ok(())
}

/// Validate a flat key/value parameter set against the policy.
pub fn validate_params(
    params: &[(String, String)],
    policy: &UrlPolicy,
) -> Result<(), ValidationError> {
    if policy.reject_empty_keys {
        for (position, (key, _)) in params.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(ValidationError::EmptyParamKey { position });
            }
        }
    }
    Ok(())
}

/// Build the fully qualified request URL from a base address and a flat
/// parameter set, preserving parameter order.
///
/// An empty parameter set returns `base_url` unchanged. Otherwise the first
/// separator is `&` when the base already contains a literal `?`, else `?`;
/// later pairs always join with `&`.
pub fn build_url(
    base_url: &str,
    params: &[(String, String)],
    policy: &UrlPolicy,
) -> Result<String, ValidationError> {
    validate_base_url(base_url, policy)?;
    validate_params(params, policy)?;

    if params.is_empty() {
        return Ok(base_url.to_string());
    }

    let mut out = String::with_capacity(base_url.len() + params.len() * 16);
    out.push_str(base_url);

    for (i, (key, value)) in params.iter().enumerate() {
        out.push(if i == 0 && !base_url.contains('?') {
            '?'
        } else {
            '&'
        });
        out.push_str(&encode_component(key));
        out.push('=');
        out.push_str(&encode_component(value));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_params_returns_base_unchanged() {
        let policy = UrlPolicy::default();
        let base = "https://cdn.example.com/widget.js";
        assert_eq!(build_url(base, &[], &policy).unwrap(), base);
    }

    #[test]
    fn test_first_separator_is_question_mark() {
        let policy = UrlPolicy::default();
        let url = build_url(
            "https://cdn.example.com/widget.js",
            &pairs(&[("v", "2"), ("lang", "en")]),
            &policy,
        )
        .unwrap();
        assert_eq!(url, "https://cdn.example.com/widget.js?v=2&lang=en");
    }

    #[test]
    fn test_existing_query_joins_with_ampersand() {
        let policy = UrlPolicy::default();
        let url = build_url(
            "https://cdn.example.com/widget.js?v=2",
            &pairs(&[("lang", "en"), ("debug", "1")]),
            &policy,
        )
        .unwrap();
        assert_eq!(url, "https://cdn.example.com/widget.js?v=2&lang=en&debug=1");
    }

    #[test]
    fn test_reserved_characters_are_percent_encoded() {
        let policy = UrlPolicy::default();
        let url = build_url(
            "https://cdn.example.com/w.js",
            &pairs(&[("a&b", "c=d"), ("q", "one two?")]),
            &policy,
        )
        .unwrap();
        assert_eq!(
            url,
            "https://cdn.example.com/w.js?a%26b=c%3Dd&q=one%20two%3F"
        );
    }

    #[test]
    fn test_space_encodes_as_percent_20_not_plus() {
        assert_eq!(encode_component("one two"), "one%20two");
    }

    #[test]
    fn test_unicode_round_trips_through_encoding() {
        let encoded = encode_component("héllo wörld");
        let decoded = percent_encoding::percent_decode_str(&encoded)
            .decode_utf8()
            .unwrap();
        assert_eq!(decoded, "héllo wörld");
    }

    #[test]
    fn test_unreserved_marks_stay_literal() {
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)j"), "a-b_c.d!e~f*g'h(i)j");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let policy = UrlPolicy::default();
        assert_eq!(
            build_url("", &[], &policy).unwrap_err(),
            ValidationError::EmptyBaseUrl
        );
        assert_eq!(
            build_url("   \t", &[], &policy).unwrap_err(),
            ValidationError::EmptyBaseUrl
        );
    }

    #[test]
    fn test_disallowed_schemes_rejected_by_default() {
        let policy = UrlPolicy::default();
        assert!(matches!(
            build_url("javascript:alert(1)", &[], &policy),
            Err(ValidationError::DisallowedScheme { scheme }) if scheme == "javascript"
        ));
        assert!(matches!(
            build_url("file:///etc/passwd", &[], &policy),
            Err(ValidationError::DisallowedScheme { scheme }) if scheme == "file"
        ));
    }

    #[test]
    fn test_scheme_check_can_be_relaxed() {
        let policy = UrlPolicy {
            enforce_http_scheme: false,
            ..UrlPolicy::default()
        };
        assert!(build_url("ftp://mirror.example.com/w.js", &[], &policy).is_ok());
    }

    #[test]
    fn test_malformed_absolute_url_rejected() {
        let policy = UrlPolicy::default();
        assert!(matches!(
            build_url("http://[not-a-host/w.js", &[], &policy),
            Err(ValidationError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_relative_and_protocol_relative_pass_through() {
        let policy = UrlPolicy::default();
        assert!(build_url("/static/widget.js", &[], &policy).is_ok());
        assert!(build_url("//cdn.example.com/widget.js", &[], &policy).is_ok());
        assert!(build_url("widget.js", &[], &policy).is_ok());
    }

    #[test]
    fn test_empty_key_rejected_by_default() {
        let policy = UrlPolicy::default();
        assert_eq!(
            build_url(
                "https://cdn.example.com/w.js",
                &pairs(&[("v", "2"), ("  ", "x")]),
                &policy,
            )
            .unwrap_err(),
            ValidationError::EmptyParamKey { position: 1 }
        );
    }

    #[test]
    fn test_empty_key_allowed_when_relaxed() {
        let policy = UrlPolicy {
            reject_empty_keys: false,
            ..UrlPolicy::default()
        };
        let url = build_url("https://cdn.example.com/w.js", &pairs(&[("", "x")]), &policy)
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/w.js?=x");
    }

    #[test]
    fn test_empty_value_is_kept() {
        let policy = UrlPolicy::default();
        let url = build_url("https://cdn.example.com/w.js", &pairs(&[("flag", "")]), &policy)
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/w.js?flag=");
    }
}
