use std::sync::Arc;

use chrono::Utc;
use reqwest::{Client, Proxy};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{format_iso8601, Credentials, SignOptions, Signer};
use crate::config::TsdbConfig;
use crate::error::{Result, TsdbError};
use crate::http::request::{self as header, Request};
use crate::http::{Response, RetryPolicy};

/// Sends signed requests to the configured endpoint.
///
/// Every attempt is stamped with fresh `x-bce-date` and `x-bce-request-id`
/// headers and re-signed before it is sent.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    signer: Arc<dyn Signer>,
    credentials: Credentials,
    sign_options: SignOptions,
    retry_policy: Arc<dyn RetryPolicy>,
    endpoint: String,
    host: String,
    user_agent: String,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint)
            .field("host", &self.host)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Build the HTTP client for `config`.
    pub fn new(
        config: &TsdbConfig,
        credentials: Credentials,
        signer: Arc<dyn Signer>,
        endpoint: String,
        host: String,
    ) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout());
        if let Some(proxy_url) = config.proxy_url() {
            let proxy = Proxy::all(proxy_url).map_err(|e| TsdbError::Configuration {
                message: format!("Invalid proxy url '{proxy_url}': {e}"),
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| TsdbError::Configuration {
            message: format!("Failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            signer,
            credentials,
            sign_options: config.sign_options().clone(),
            retry_policy: Arc::clone(config.retry_policy()),
            endpoint,
            host,
            user_agent: config.user_agent().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn sign_options(&self) -> &SignOptions {
        &self.sign_options
    }

    /// Send `request`, retrying per the retry policy.
    ///
    /// A response with a failure status is still returned as `Ok` once
    /// retries are exhausted; callers classify it with
    /// [`Response::is_fail`]. `Err` means no response was obtained.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            let outcome = self.send_once(request.clone(), attempt).await;
            let service_error;
            let error = match &outcome {
                Ok(response) if response.is_fail() => {
                    service_error = TsdbError::Service(response.service_error());
                    &service_error
                }
                Ok(_) => return outcome,
                Err(e) => e,
            };

            if !self.retry_policy.should_retry(error, attempt) {
                return outcome;
            }

            let delay = self.retry_policy.delay_before_retry(attempt);
            warn!(
                method = %request.method(),
                uri = request.uri(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying request after error: {}",
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, mut request: Request, attempt: u32) -> Result<Response> {
        let request_id = Uuid::new_v4().to_string();
        request.set_header(header::HOST, self.host.clone());
        request.set_header(header::USER_AGENT, self.user_agent.clone());
        request.set_header(header::BCE_DATE, format_iso8601(&Utc::now()));
        request.set_header(header::BCE_REQUEST_ID, request_id.clone());
        if request.header(header::CONTENT_TYPE).is_none() {
            request.set_header(header::CONTENT_TYPE, header::JSON_CONTENT_TYPE);
        }
        if let Some(token) = self.credentials.session_token() {
            request.set_header(header::BCE_SECURITY_TOKEN, token.expose());
        }
        self.signer
            .sign(&mut request, &self.credentials, &self.sign_options)?;

        let url = request.url(&self.endpoint);
        debug!(
            method = %request.method(),
            uri = request.uri(),
            request_id = %request_id,
            attempt,
            "Sending request"
        );

        let mut builder = self.client.request(request.method().clone(), &url);
        for (key, value) in request.headers() {
            // reqwest derives these from the URL and body.
            if key == header::HOST || key == header::CONTENT_LENGTH {
                continue;
            }
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.take_body() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TsdbError::Network {
            message: e.to_string(),
        })?;
        let response = Response::read(response).await?;

        debug!(
            status = response.status().as_u16(),
            request_id = %request_id,
            "Received response"
        );
        Ok(response)
    }
}
