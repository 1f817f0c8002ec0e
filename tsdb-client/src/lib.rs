//! # tsdb-client - Async client for a cloud TSDB service
//!
//! A client for the HTTP API of a hosted time-series database: write
//! datapoints, list metrics, fields and tags, run datapoint queries and SQL
//! statements, and hand out presigned query URLs. Every request is signed
//! with `bce-auth-v1` (HMAC-SHA256 over a canonical request).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsdb_client::{Datapoint, Filters, Query, QueryOptions, TsdbClient};
//!
//! # async fn example() -> tsdb_client::Result<()> {
//! let client = TsdbClient::with_database(
//!     "http://tsdb.example.com",
//!     "my-access-key",
//!     "my-secret-key",
//!     "production",
//! )?;
//!
//! client
//!     .write_datapoints(&[Datapoint::new("cpu_idle")
//!         .with_tag("host", "server1")
//!         .with_value(1_700_000_000_000, 42.5)])
//!     .await?;
//!
//! let results = client
//!     .list_datapoints(
//!         &[Query::new("cpu_idle").with_filters(Filters::starting_at("1 hour ago"))],
//!         QueryOptions::default(),
//!     )
//!     .await?;
//! println!("{} result sets", results.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`TsdbConfig`] carries everything beyond the endpoint and keys: proxy,
//! timeout, retry policy, session token and sign options. It can also be
//! read from `TSDB_*` environment variables with [`TsdbConfig::from_env`].
//!
//! ## Errors
//!
//! Every operation returns [`Result`]. Failures reported by the service come
//! back as [`TsdbError::Service`] with the service's code, message and
//! request id; the client never swallows an error.

pub mod auth;
mod client;
pub mod config;
pub mod encoding;
mod error;
pub mod http;
pub mod logging;
pub mod model;
mod presign;

pub use client::{QueryOptions, TsdbClient, PARAM_DATABASE, URI_DATAPOINT, URI_METRIC, URI_ROW_SQL};
pub use config::TsdbConfig;
pub use error::{Result, ServiceError, TsdbError};
pub use model::{
    Aggregator, Datapoint, Field, FieldFilter, Fill, Filters, Group, GroupBy, GroupInfo, Query,
    QueryRequest, QueryResult, RowResult, TagValues,
};
pub use presign::PresignOptions;
