use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Result, ServiceError, TsdbError};
use crate::http::request::BCE_REQUEST_ID;

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    request_id: Option<String>,
    body: Vec<u8>,
}

/// Error envelope returned by the service on failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
}

impl Response {
    pub fn new(status: StatusCode, request_id: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            request_id,
            body,
        }
    }

    /// Read status, request id and body from a reqwest response.
    pub async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let request_id = response
            .headers()
            .get(BCE_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| TsdbError::Network {
            message: format!("Failed to read response body: {e}"),
        })?;

        Ok(Self::new(status, request_id, body.to_vec()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Any status of 400 or above is a failure.
    pub fn is_fail(&self) -> bool {
        self.status.as_u16() >= 400
    }

    /// Build the structured service error for a failed response.
    ///
    /// Falls back to the status reason and raw body when the error envelope
    /// is missing or not JSON.
    pub fn service_error(&self) -> ServiceError {
        let reason = self
            .status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        match serde_json::from_slice::<ErrorEnvelope>(&self.body) {
            Ok(envelope) => ServiceError {
                status: self.status.as_u16(),
                code: if envelope.code.is_empty() {
                    reason
                } else {
                    envelope.code
                },
                message: envelope.message,
                request_id: envelope.request_id.or_else(|| self.request_id.clone()),
            },
            Err(_) => {
                let text = String::from_utf8_lossy(&self.body).trim().to_string();
                ServiceError {
                    status: self.status.as_u16(),
                    message: if text.is_empty() { reason.clone() } else { text },
                    code: reason,
                    request_id: self.request_id.clone(),
                }
            }
        }
    }

    /// Deserialize the body as JSON.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| TsdbError::Deserialization {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_is_fail_threshold() {
        assert!(!Response::new(StatusCode::OK, None, vec![]).is_fail());
        assert!(!Response::new(StatusCode::NO_CONTENT, None, vec![]).is_fail());
        assert!(Response::new(StatusCode::BAD_REQUEST, None, vec![]).is_fail());
        assert!(Response::new(StatusCode::SERVICE_UNAVAILABLE, None, vec![]).is_fail());
    }

    #[test]
    fn test_service_error_from_envelope() {
        let body = br#"{"code":"MetricNotExist","message":"metric cpu not found","requestId":"abc-123"}"#;
        let response = Response::new(StatusCode::NOT_FOUND, Some("hdr-id".into()), body.to_vec());
        let err = response.service_error();
        assert_eq!(err.status, 404);
        assert_eq!(err.code, "MetricNotExist");
        assert_eq!(err.message, "metric cpu not found");
        assert_eq!(err.request_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_service_error_without_envelope() {
        let response = Response::new(
            StatusCode::BAD_GATEWAY,
            Some("hdr-id".into()),
            b"<html>bad gateway</html>".to_vec(),
        );
        let err = response.service_error();
        assert_eq!(err.code, "Bad Gateway");
        assert_eq!(err.message, "<html>bad gateway</html>");
        assert_eq!(err.request_id.as_deref(), Some("hdr-id"));
    }

    #[test]
    fn test_service_error_empty_body() {
        let response = Response::new(StatusCode::FORBIDDEN, None, vec![]);
        let err = response.service_error();
        assert_eq!(err.code, "Forbidden");
        assert_eq!(err.message, "Forbidden");
    }

    #[test]
    fn test_parse_json_shape_mismatch() {
        let response = Response::new(StatusCode::OK, None, b"[1,2,3]".to_vec());
        let result: Result<HashMap<String, String>> = response.parse_json();
        assert!(matches!(result, Err(TsdbError::Deserialization { .. })));
    }
}
