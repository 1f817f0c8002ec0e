//! Presigned query URLs.
//!
//! A presigned URL carries its own `authorization` parameter, so whoever
//! holds it can run one fixed datapoint query until the signature expires,
//! without access to the credentials.

use reqwest::Method;
use serde::Serialize;

use crate::encoding::query_escape;
use crate::error::{Result, TsdbError};
use crate::http::request::{self as header, Request};
use crate::http::Transport;
use crate::model::Query;

/// Options for [`TsdbClient::generate_presigned_url`](crate::TsdbClient::generate_presigned_url).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresignOptions {
    /// Endpoint placed in the URL instead of the client's own, e.g. a public
    /// domain for a client configured with a private one. The signature is
    /// still bound to the client's host.
    pub endpoint: Option<String>,
}

impl PresignOptions {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// The `query` parameter never carries the presampling flag.
#[derive(Serialize)]
struct PresignedQuery<'a> {
    queries: &'a [Query],
}

pub(crate) fn presigned_url(
    transport: &Transport,
    uri: &str,
    queries: &[Query],
    expire_seconds: u32,
    options: &PresignOptions,
) -> Result<String> {
    let query = serde_json::to_string(&PresignedQuery { queries }).map_err(|e| {
        TsdbError::Serialization {
            message: e.to_string(),
        }
    })?;

    let mut request = Request::new(Method::GET, uri);
    request.set_param("query", query.as_str());
    request.set_header(header::HOST, transport.host());

    let sign_options = transport.sign_options().with_expire_seconds(expire_seconds);
    transport
        .signer()
        .sign(&mut request, transport.credentials(), &sign_options)?;
    let authorization = request
        .header(header::AUTHORIZATION)
        .ok_or_else(|| TsdbError::Signing {
            message: "signer did not produce an authorization header".to_string(),
        })?;

    let endpoint = options
        .endpoint
        .as_deref()
        .map(|e| e.trim_end_matches('/'))
        .unwrap_or_else(|| transport.endpoint());

    // Keys in sorted order, form-style escaping.
    Ok(format!(
        "{}{}?authorization={}&query={}",
        endpoint,
        uri,
        query_escape(authorization),
        query_escape(&query)
    ))
}
