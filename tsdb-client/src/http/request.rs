use std::collections::BTreeMap;

use reqwest::Method;

use crate::encoding::uri_encode;

pub const HOST: &str = "host";
pub const AUTHORIZATION: &str = "authorization";
pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_LENGTH: &str = "content-length";
pub const USER_AGENT: &str = "user-agent";
pub const BCE_DATE: &str = "x-bce-date";
pub const BCE_REQUEST_ID: &str = "x-bce-request-id";
pub const BCE_SECURITY_TOKEN: &str = "x-bce-security-token";
pub const BCE_PREFIX: &str = "x-bce-";

/// Content type sent with every JSON body.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// An unsent request: what gets signed and then handed to the transport.
///
/// `uri` is the percent-encoded path. Header names are stored lowercased;
/// parameters and headers are kept sorted so the wire query string and the
/// canonical query string are produced by the same code.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        self.headers.insert(key.to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Attach a body and the matching `Content-Length` header.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.set_header(CONTENT_LENGTH, body.len().to_string());
        self.body = Some(body);
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn take_body(&mut self) -> Option<Vec<u8>> {
        self.body.take()
    }

    /// `k=v` pairs, both sides uri-encoded, sorted by key and joined with `&`.
    /// Empty values are kept as `k=`.
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full URL for `endpoint`, which must not end with `/`.
    pub fn url(&self, endpoint: &str) -> String {
        let query = self.query_string();
        if query.is_empty() {
            format!("{}{}", endpoint, self.uri)
        } else {
            format!("{}{}?{}", endpoint, self.uri, query)
        }
    }
}
