//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Every canonical header line ends in `\n`, so the header block is followed
//! by an empty line. Both the validator and [`crate::RequestSigner`] go through
//! these functions, which keeps the two sides symmetric.

use http::{HeaderMap, Method, Uri};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::error::AuthError;

/// Characters that are percent-encoded in path segments and query components.
///
/// Everything except the unreserved set (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the canonical request for an HTTP request.
///
/// The `host` header falls back to the URI authority when the request has no
/// `Host` header.
pub fn canonical_request(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    signed_headers: &[&str],
    payload_hash: &str,
) -> Result<String, AuthError> {
    let host = uri.authority().map(http::uri::Authority::as_str);
    let canonical_headers = build_canonical_headers(headers, host, signed_headers)?;
    Ok(build_canonical_request(
        method.as_str(),
        uri.path(),
        uri.query().unwrap_or(""),
        &canonical_headers,
        signed_headers,
        payload_hash,
    ))
}

/// Assemble a canonical request from its components.
///
/// `path` and `query` are canonicalized here; `canonical_headers` must already
/// be the output of [`build_canonical_headers`].
///
/// # Examples
///
/// ```
/// use holydb_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     "host:examplebucket.s3.amazonaws.com\n",
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n\nhost:"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    canonical_headers: &str,
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(path);
    let canonical_query = build_canonical_query_string(query);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by re-encoding each path segment.
///
/// Each `/`-delimited segment is percent-decoded once to raw bytes and then
/// encoded byte by byte, so an already-encoded path is not double-encoded.
/// A malformed escape such as `%zz` is kept literally and comes out as
/// `%25zz`. An empty path becomes `/`.
///
/// # Examples
///
/// ```
/// use holydb_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/my%20file.txt"), "/my%20file.txt");
/// assert_eq!(build_canonical_uri("/my file.txt"), "/my%20file.txt");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded: Vec<u8> = percent_decode_str(segment).collect();
            percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string.
///
/// Each `&`-separated parameter is split at its first `=`, `+` is read as a
/// space, and both sides are percent-decoded to raw bytes. The pairs are
/// sorted by key and then value and re-encoded with the unreserved set, so
/// escapes that are not UTF-8 survive unchanged, as in the path.
///
/// # Examples
///
/// ```
/// use holydb_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("b=2&a=1&a=0"), "a=0&a=1&b=2");
/// assert_eq!(build_canonical_query_string("q=a+b"), "q=a%20b");
/// assert_eq!(build_canonical_query_string("k=%FF"), "k=%FF");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    let mut params: Vec<(Vec<u8>, Vec<u8>)> = query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (decode_query_component(key), decode_query_component(value))
        })
        .collect();
    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                percent_encode(k, URI_ENCODE_SET),
                percent_encode(v, URI_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical header block for the signed header names.
///
/// Names are lowercased and sorted. Each value is trimmed with internal
/// whitespace runs collapsed to one space; repeated headers are joined with
/// commas. Every line, including the last, ends in `\n`.
///
/// `host` falls back to `default_host` when the request has no `Host`
/// header. Any other missing header is an error, as is a value that is not
/// visible ASCII.
pub fn build_canonical_headers(
    headers: &HeaderMap,
    default_host: Option<&str>,
    signed_headers: &[&str],
) -> Result<String, AuthError> {
    let mut out = String::new();
    for name in sorted_lowercase(signed_headers) {
        let values = headers
            .get_all(name.as_str())
            .iter()
            .map(|value| {
                value.to_str().map(|v| collapse_whitespace(v.trim())).map_err(|_| {
                    AuthError::Malformed(format!("header {name} is not visible ASCII"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let value = if !values.is_empty() {
            values.join(",")
        } else if name == "host" {
            let host = default_host.ok_or_else(|| AuthError::MissingHeader(name.clone()))?;
            collapse_whitespace(host.trim())
        } else {
            return Err(AuthError::MissingHeader(name));
        };

        out.push_str(&name);
        out.push(':');
        out.push_str(&value);
        out.push('\n');
    }
    Ok(out)
}

/// Build the signed headers string: lowercase names, sorted, `;`-separated.
///
/// # Examples
///
/// ```
/// use holydb_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&["X-Amz-Date", "host"]),
///     "host;x-amz-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    sorted_lowercase(signed_headers).join(";")
}

fn sorted_lowercase(names: &[&str]) -> Vec<String> {
    let mut sorted: Vec<String> = names.iter().map(|name| name.to_ascii_lowercase()).collect();
    sorted.sort_unstable();
    sorted
}

/// Decode a query key or value to raw bytes, reading `+` as a space.
fn decode_query_component(component: &str) -> Vec<u8> {
    percent_decode_str(&component.replace('+', " ")).collect()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
