//! HTTP plumbing: unsent requests, the retrying transport, and response
//! classification.

pub mod request;
mod response;
mod retry;
mod transport;

pub use request::{Request, JSON_CONTENT_TYPE};
pub use response::Response;
pub use retry::{BackoffRetryPolicy, NoRetryPolicy, RetryPolicy};
pub use transport::Transport;
