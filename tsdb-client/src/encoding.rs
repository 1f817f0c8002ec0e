//! Percent-encoding rules used on the wire.
//!
//! The service canonicalizes every URI, query parameter and signed header
//! with RFC 3986 rules: `A-Z a-z 0-9 - _ . ~` pass through unchanged and
//! every other byte becomes `%XX` with uppercase hex digits.

use std::borrow::Cow;

/// Encodes every byte outside the unreserved set, including `/`.
pub fn uri_encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Form-style query escaping used for presigned URLs: like [`uri_encode`]
/// but a space becomes `+`.
pub fn query_escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}
