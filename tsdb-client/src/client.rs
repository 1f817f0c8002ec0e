use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::auth::BceV1Signer;
use crate::config::TsdbConfig;
use crate::encoding::uri_encode;
use crate::error::{Result, TsdbError};
use crate::http::request::{self as header, Request};
use crate::http::{Response, Transport};
use crate::model::{
    Datapoint, Field, ListFieldsResponse, ListMetricsResponse, ListTagsResponse, Query,
    QueryRequest, QueryResponse, QueryResult, RowResult, TagValues, WriteDatapointRequest,
};
use crate::presign::{presigned_url, PresignOptions};

pub const URI_DATAPOINT: &str = "/v1/datapoint";
pub const URI_METRIC: &str = "/v1/metric";
pub const URI_ROW_SQL: &str = "/v1/row";

/// Query parameter added to every request when a database is configured.
pub const PARAM_DATABASE: &str = "database";

/// Options for [`TsdbClient::list_datapoints`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ask the service to read raw points instead of presampled ones.
    pub disable_presampling: bool,
}

impl QueryOptions {
    pub fn disable_presampling() -> Self {
        Self {
            disable_presampling: true,
        }
    }
}

/// Client for the TSDB HTTP API.
///
/// Cheap to clone; clones share configuration and the connection pool.
#[derive(Debug, Clone)]
pub struct TsdbClient {
    config: Arc<TsdbConfig>,
    transport: Transport,
}

impl TsdbClient {
    /// Create a client for `endpoint` with an access key pair.
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(TsdbConfig::new(endpoint, access_key, secret_key))
    }

    /// Create a client whose requests are all scoped to `database`.
    pub fn with_database(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        database: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(TsdbConfig::new(endpoint, access_key, secret_key).with_database(database))
    }

    /// Create a client from a full configuration.
    ///
    /// # Errors
    ///
    /// [`TsdbError::InvalidCredentials`] for empty keys,
    /// [`TsdbError::InvalidEndpoint`] for an endpoint without scheme or host,
    /// or with a path, query or fragment,
    /// [`TsdbError::Configuration`] for an unusable proxy.
    pub fn with_config(config: TsdbConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        let (endpoint, host) = config.resolve_endpoint()?;
        let transport = Transport::new(
            &config,
            credentials,
            Arc::new(BceV1Signer),
            endpoint,
            host,
        )?;

        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &TsdbConfig {
        &self.config
    }

    /// `host[:port]` of the endpoint, as sent in the `Host` header.
    pub fn host(&self) -> &str {
        self.transport.host()
    }

    /// Write datapoints. The service answers with an empty body.
    #[instrument(skip(self, datapoints), fields(count = datapoints.len()))]
    pub async fn write_datapoints(&self, datapoints: &[Datapoint]) -> Result<()> {
        self.send_json(
            Method::POST,
            URI_DATAPOINT,
            &WriteDatapointRequest { datapoints },
            &[],
        )
        .await?;
        Ok(())
    }

    /// List all metric names.
    #[instrument(skip(self))]
    pub async fn list_metrics(&self) -> Result<Vec<String>> {
        let list: ListMetricsResponse = self.get(URI_METRIC, &[]).await?;
        Ok(list.metrics)
    }

    /// List the fields of `metric` with their types.
    #[instrument(skip(self))]
    pub async fn list_fields(&self, metric: &str) -> Result<HashMap<String, Field>> {
        let list: ListFieldsResponse = self.get(&metric_uri(metric, "field"), &[]).await?;
        Ok(list.fields)
    }

    /// List the tag keys of `metric` with their known values.
    #[instrument(skip(self))]
    pub async fn list_tags(&self, metric: &str) -> Result<HashMap<String, TagValues>> {
        let list: ListTagsResponse = self.get(&metric_uri(metric, "tag"), &[]).await?;
        Ok(list.tags)
    }

    /// Run a set of datapoint queries.
    #[instrument(skip(self, queries), fields(count = queries.len()))]
    pub async fn list_datapoints(
        &self,
        queries: &[Query],
        options: QueryOptions,
    ) -> Result<Vec<QueryResult>> {
        let body = QueryRequest {
            queries: queries.to_vec(),
            disable_presampling: options.disable_presampling,
        };
        let response = self
            .send_json(Method::PUT, URI_DATAPOINT, &body, &[("query", "")])
            .await?;
        let list: QueryResponse = response.parse_json()?;
        Ok(list.results)
    }

    /// Run a SQL statement. A result is only returned when the request and
    /// the parse both succeed.
    #[instrument(skip(self))]
    pub async fn list_rows_by_sql(&self, statement: &str) -> Result<RowResult> {
        self.get(URI_ROW_SQL, &[("sql", statement)]).await
    }

    /// Build a URL that runs `queries` without further authentication for
    /// `expire_seconds` seconds.
    ///
    /// # Errors
    ///
    /// [`TsdbError::Signing`] if `expire_seconds` is zero.
    #[instrument(skip(self, queries, options))]
    pub fn generate_presigned_url(
        &self,
        queries: &[Query],
        expire_seconds: u32,
        options: &PresignOptions,
    ) -> Result<String> {
        presigned_url(&self.transport, URI_DATAPOINT, queries, expire_seconds, options)
    }

    fn new_request(&self, method: Method, uri: &str, params: &[(&str, &str)]) -> Request {
        let mut request = Request::new(method, uri);
        if let Some(database) = self.config.database() {
            request.set_param(PARAM_DATABASE, database);
        }
        for (key, value) in params {
            request.set_param(*key, *value);
        }
        request
    }

    async fn get<T: DeserializeOwned>(&self, uri: &str, params: &[(&str, &str)]) -> Result<T> {
        let request = self.new_request(Method::GET, uri, params);
        self.execute(request).await?.parse_json()
    }

    async fn send_json<B: Serialize>(
        &self,
        method: Method,
        uri: &str,
        body: &B,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let body = serde_json::to_vec(body).map_err(|e| TsdbError::Serialization {
            message: e.to_string(),
        })?;

        let mut request = self.new_request(method, uri, params);
        request.set_header(header::CONTENT_TYPE, header::JSON_CONTENT_TYPE);
        request.set_body(body);
        self.execute(request).await
    }

    /// Send and classify: a failed response becomes a service error.
    async fn execute(&self, request: Request) -> Result<Response> {
        let response = self.transport.send(request).await?;
        if response.is_fail() {
            let err = response.service_error();
            debug!(status = err.status, code = %err.code, "Service returned an error");
            return Err(TsdbError::Service(err));
        }
        Ok(response)
    }
}

/// `/v1/metric/{metric}/{leaf}` with the metric escaped as one path segment.
fn metric_uri(metric: &str, leaf: &str) -> String {
    format!("{}/{}/{}", URI_METRIC, uri_encode(metric), leaf)
}
