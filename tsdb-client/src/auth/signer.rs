//! `bce-auth-v1` request signing.
//!
//! The authorization string is
//! `bce-auth-v1/{ak}/{timestamp}/{expire}/{signed-headers}/{signature}` where
//! the signature is an HMAC-SHA256 of the canonical request, keyed by an
//! HMAC-SHA256 of the auth prefix under the secret key.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ring::hmac;

use crate::auth::Credentials;
use crate::encoding::uri_encode;
use crate::error::{Result, TsdbError};
use crate::http::request::{self as header, Request};

pub const BCE_AUTH_VERSION: &str = "bce-auth-v1";

/// Signature validity used when the caller does not ask for one.
pub const DEFAULT_EXPIRE_SECONDS: u32 = 1800;

/// Headers signed by default, in addition to every `x-bce-*` header.
pub const DEFAULT_HEADERS_TO_SIGN: [&str; 4] = [
    header::HOST,
    "content-md5",
    header::CONTENT_LENGTH,
    header::CONTENT_TYPE,
];

/// Which headers are bound into the signature and for how long it is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOptions {
    pub headers_to_sign: BTreeSet<String>,
    pub expire_seconds: u32,
    /// Fixed signing time. `None` means now.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            headers_to_sign: DEFAULT_HEADERS_TO_SIGN
                .iter()
                .map(|h| h.to_string())
                .collect(),
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
            timestamp: None,
        }
    }
}

impl SignOptions {
    /// Same headers, different expiration window.
    pub fn with_expire_seconds(&self, expire_seconds: u32) -> Self {
        Self {
            expire_seconds,
            ..self.clone()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Computes the `Authorization` header for a request.
pub trait Signer: Send + Sync {
    /// Sign `request` in place by setting its `Authorization` header.
    fn sign(
        &self,
        request: &mut Request,
        credentials: &Credentials,
        options: &SignOptions,
    ) -> Result<()>;
}

/// The `bce-auth-v1` signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BceV1Signer;

impl Signer for BceV1Signer {
    fn sign(
        &self,
        request: &mut Request,
        credentials: &Credentials,
        options: &SignOptions,
    ) -> Result<()> {
        let authorization = self.authorization(request, credentials, options)?;
        request.set_header(header::AUTHORIZATION, authorization);
        Ok(())
    }
}

impl BceV1Signer {
    /// Compute the authorization string without modifying the request.
    pub fn authorization(
        &self,
        request: &Request,
        credentials: &Credentials,
        options: &SignOptions,
    ) -> Result<String> {
        if options.expire_seconds == 0 {
            return Err(TsdbError::Signing {
                message: "expiration must be a positive number of seconds".to_string(),
            });
        }

        let timestamp = options.timestamp.unwrap_or_else(Utc::now);
        let auth_prefix = format!(
            "{}/{}/{}/{}",
            BCE_AUTH_VERSION,
            credentials.access_key_id(),
            format_iso8601(&timestamp),
            options.expire_seconds
        );

        let secret = hmac::Key::new(
            hmac::HMAC_SHA256,
            credentials.secret_access_key().expose().as_bytes(),
        );
        let signing_key = hex::encode(hmac::sign(&secret, auth_prefix.as_bytes()).as_ref());

        let (canonical_request, signed_headers) =
            canonical_request(request, &options.headers_to_sign);

        let key = hmac::Key::new(hmac::HMAC_SHA256, signing_key.as_bytes());
        let signature = hex::encode(hmac::sign(&key, canonical_request.as_bytes()).as_ref());

        Ok(format!(
            "{}/{}/{}",
            auth_prefix,
            signed_headers.join(";"),
            signature
        ))
    }
}

/// `yyyy-mm-ddThh:mm:ssZ`, the format of both the auth prefix and `x-bce-date`.
pub fn format_iso8601(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `METHOD\nURI\nQUERY\nHEADERS` and the sorted names of the signed headers.
fn canonical_request(
    request: &Request,
    headers_to_sign: &BTreeSet<String>,
) -> (String, Vec<String>) {
    let (headers, signed) = canonical_headers(request, headers_to_sign);
    let canonical = format!(
        "{}\n{}\n{}\n{}",
        request.method().as_str(),
        canonical_uri(request.uri()),
        canonical_query_string(request),
        headers
    );
    (canonical, signed)
}

fn canonical_uri(uri: &str) -> &str {
    // Request URIs are stored percent-encoded already.
    if uri.is_empty() {
        "/"
    } else {
        uri
    }
}

fn canonical_query_string(request: &Request) -> String {
    let mut items: Vec<String> = request
        .params()
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case(header::AUTHORIZATION))
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect();
    items.sort();
    items.join("&")
}

fn canonical_headers(
    request: &Request,
    headers_to_sign: &BTreeSet<String>,
) -> (String, Vec<String>) {
    let mut canonical = Vec::new();
    let mut signed = Vec::new();

    for (key, value) in request.headers() {
        let key = key.trim().to_ascii_lowercase();
        if key == header::AUTHORIZATION {
            continue;
        }
        let is_bce_header = key.starts_with(header::BCE_PREFIX) && key != header::BCE_REQUEST_ID;
        if headers_to_sign.contains(&key) || is_bce_header {
            canonical.push(format!("{}:{}", uri_encode(&key), uri_encode(value.trim())));
            signed.push(key);
        }
    }

    canonical.sort();
    signed.sort();
    (canonical.join("\n"), signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::Method;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 4, 27, 8, 23, 49).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials::new(
            "aab8e1c4ac6d4a4e8d5e8f3f5d2f9c1a",
            "b9f1b8e6b1cc4e2a9b6a7e7c8d9e0f1a",
        )
        .unwrap()
    }

    fn sample_request() -> Request {
        let mut req = Request::new(Method::PUT, "/v1/test/myfolder/readme.txt");
        req.set_header("Host", "bj.bcebos.com");
        req.set_header("Content-Type", "text/plain");
        req.set_header("Content-Length", "8");
        req.set_header("x-bce-date", "2015-04-27T08:23:49Z");
        req.set_header("x-bce-request-id", "ignored-by-signer");
        req.set_param("partNumber", "9");
        req.set_param("uploadId", "a44cc9bab11cbd156984767aad637851");
        req
    }

    #[test]
    fn test_authorization_layout() {
        let options = SignOptions::default().with_timestamp(fixed_time());
        let auth = BceV1Signer
            .authorization(&sample_request(), &credentials(), &options)
            .unwrap();

        let parts: Vec<&str> = auth.split('/').collect();
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[0], "bce-auth-v1");
        assert_eq!(parts[1], "aab8e1c4ac6d4a4e8d5e8f3f5d2f9c1a");
        assert_eq!(parts[2], "2015-04-27T08:23:49Z");
        assert_eq!(parts[3], "1800");
        assert_eq!(parts[4], "content-length;content-type;host;x-bce-date");
        assert_eq!(parts[5].len(), 64);
        assert!(parts[5].chars().all(|c| c.is_ascii_hexdigit()));
    }

    fn vector_request() -> Request {
        let mut req = sample_request();
        req.set_header("Host", "bj.bcebos.com:8080");
        req.set_header("x-bce-meta-owner", " tsdb team ");
        req.set_header("User-Agent", "tsdb-client-rust/0.1.0");
        req.set_param("uploadId", "a b/c");
        req.set_param("empty", "");
        req
    }

    #[test]
    fn test_canonical_request_vector() {
        let (canonical, signed) =
            canonical_request(&vector_request(), &SignOptions::default().headers_to_sign);
        assert_eq!(
            canonical,
            "PUT\n\
             /v1/test/myfolder/readme.txt\n\
             empty=&partNumber=9&uploadId=a%20b%2Fc\n\
             content-length:8\n\
             content-type:text%2Fplain\n\
             host:bj.bcebos.com%3A8080\n\
             x-bce-date:2015-04-27T08%3A23%3A49Z\n\
             x-bce-meta-owner:tsdb%20team"
        );
        assert_eq!(
            signed,
            vec!["content-length", "content-type", "host", "x-bce-date", "x-bce-meta-owner"]
        );
    }

    #[test]
    fn test_authorization_vector() {
        let options = SignOptions::default().with_timestamp(fixed_time());
        let auth = BceV1Signer
            .authorization(&vector_request(), &credentials(), &options)
            .unwrap();
        assert_eq!(
            auth,
            "bce-auth-v1/aab8e1c4ac6d4a4e8d5e8f3f5d2f9c1a/2015-04-27T08:23:49Z/1800/\
             content-length;content-type;host;x-bce-date;x-bce-meta-owner/\
             1e584805784240f0994f6d97a93f966e0e14018b98a04611496ee9537500779a"
        );
    }

    #[test]
    fn test_authorization_vector_without_custom_headers() {
        let mut req = sample_request();
        req.set_param("uploadId", "a b/c");
        req.set_param("empty", "");
        let options = SignOptions::default().with_timestamp(fixed_time());
        let auth = BceV1Signer
            .authorization(&req, &credentials(), &options)
            .unwrap();
        assert_eq!(
            auth,
            "bce-auth-v1/aab8e1c4ac6d4a4e8d5e8f3f5d2f9c1a/2015-04-27T08:23:49Z/1800/\
             content-length;content-type;host;x-bce-date/\
             0446432ad514e331fd798e2831e431879858af8282eb1ffb758d80e549be90b7"
        );
    }

    #[test]
    fn test_signature_is_deterministic_for_fixed_time() {
        let options = SignOptions::default().with_timestamp(fixed_time());
        let a = BceV1Signer
            .authorization(&sample_request(), &credentials(), &options)
            .unwrap();
        let b = BceV1Signer
            .authorization(&sample_request(), &credentials(), &options)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_binds_params_and_expiration() {
        let options = SignOptions::default().with_timestamp(fixed_time());
        let base = BceV1Signer
            .authorization(&sample_request(), &credentials(), &options)
            .unwrap();

        let mut changed = sample_request();
        changed.set_param("partNumber", "10");
        let other = BceV1Signer
            .authorization(&changed, &credentials(), &options)
            .unwrap();
        assert_ne!(base, other);

        let longer = BceV1Signer
            .authorization(
                &sample_request(),
                &credentials(),
                &options.with_expire_seconds(3600),
            )
            .unwrap();
        assert!(longer.contains("/3600/"));
        assert_ne!(base.rsplit('/').next(), longer.rsplit('/').next());
    }

    #[test]
    fn test_unsigned_headers_do_not_affect_signature() {
        let options = SignOptions::default().with_timestamp(fixed_time());
        let base = BceV1Signer
            .authorization(&sample_request(), &credentials(), &options)
            .unwrap();

        let mut with_agent = sample_request();
        with_agent.set_header("User-Agent", "something/1.0");
        with_agent.set_header("x-bce-request-id", "another-id");
        let other = BceV1Signer
            .authorization(&with_agent, &credentials(), &options)
            .unwrap();
        assert_eq!(base, other);
    }

    #[test]
    fn test_authorization_param_excluded_from_canonical_query() {
        let mut req = sample_request();
        let before = canonical_query_string(&req);
        req.set_param("authorization", "whatever");
        assert_eq!(canonical_query_string(&req), before);
        assert_eq!(
            before,
            "partNumber=9&uploadId=a44cc9bab11cbd156984767aad637851"
        );
    }

    #[test]
    fn test_canonical_headers_encode_values() {
        let mut req = Request::new(Method::GET, "/v1/metric");
        req.set_header("Host", "tsdb.example.com:8080");
        req.set_header("Content-Type", " application/json;charset=utf-8 ");
        let (headers, signed) = canonical_headers(&req, &SignOptions::default().headers_to_sign);
        assert_eq!(
            headers,
            "content-type:application%2Fjson%3Bcharset%3Dutf-8\nhost:tsdb.example.com%3A8080"
        );
        assert_eq!(signed, vec!["content-type", "host"]);
    }

    #[test]
    fn test_canonical_uri_does_not_double_encode() {
        assert_eq!(canonical_uri("/v1/metric/cpu%2Fload/tag"), "/v1/metric/cpu%2Fload/tag");
        assert_eq!(canonical_uri(""), "/");
    }

    #[test]
    fn test_zero_expiration_rejected() {
        let options = SignOptions::default().with_expire_seconds(0);
        let err = BceV1Signer
            .authorization(&sample_request(), &credentials(), &options)
            .unwrap_err();
        assert!(matches!(err, TsdbError::Signing { .. }));
    }

    #[test]
    fn test_sign_sets_authorization_header() {
        let mut req = sample_request();
        BceV1Signer
            .sign(&mut req, &credentials(), &SignOptions::default())
            .unwrap();
        assert!(req
            .header("Authorization")
            .is_some_and(|v| v.starts_with("bce-auth-v1/")));
    }
}
