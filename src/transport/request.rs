use reqwest::Method;
use serde::Serialize;

use super::policy::TimeoutPolicy;

/// Body of an outgoing call.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Pre-serialized JSON.
    Json(Vec<u8>),
    /// Raw bytes with their media type.
    Binary { bytes: Vec<u8>, content_type: String },
    /// The value could not be serialized; the call fails without a round trip.
    Invalid(String),
}

/// One logical call: endpoint, method, body and the timeout policy chosen by the call site.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub timeout: TimeoutPolicy,
    /// Overrides the client's attempt ceiling (e.g. 1 for single-shot calls).
    pub max_attempts: Option<u32>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, timeout: TimeoutPolicy) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            timeout,
            max_attempts: None,
        }
    }

    pub fn get(path: impl Into<String>, timeout: TimeoutPolicy) -> Self {
        Self::new(Method::GET, path, timeout)
    }

    pub fn post(path: impl Into<String>, timeout: TimeoutPolicy) -> Self {
        Self::new(Method::POST, path, timeout)
    }

    pub fn put(path: impl Into<String>, timeout: TimeoutPolicy) -> Self {
        Self::new(Method::PUT, path, timeout)
    }

    pub fn delete(path: impl Into<String>, timeout: TimeoutPolicy) -> Self {
        Self::new(Method::DELETE, path, timeout)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = match serde_json::to_vec(body) {
            Ok(bytes) => RequestBody::Json(bytes),
            Err(e) => RequestBody::Invalid(e.to_string()),
        };
        self
    }

    pub fn binary(mut self, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Binary {
            bytes,
            content_type: content_type.into(),
        };
        self
    }

    /// Disable retries for this call.
    pub fn single_attempt(mut self) -> Self {
        self.max_attempts = Some(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn builder_sets_fields() {
        let req = Request::post("/policy-generator/generate", TimeoutPolicy::Unbounded)
            .json(&json!({"title": "Access control"}))
            .single_attempt();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.timeout, TimeoutPolicy::Unbounded);
        assert_eq!(req.max_attempts, Some(1));
        match req.body {
            RequestBody::Json(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(value["title"], "Access control");
            }
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn binary_body() {
        let req = Request::post("/upload", TimeoutPolicy::Bounded(Duration::from_secs(5)))
            .binary(vec![1, 2, 3], "application/pdf");
        assert_eq!(
            req.body,
            RequestBody::Binary {
                bytes: vec![1, 2, 3],
                content_type: "application/pdf".into()
            }
        );
    }

    #[test]
    fn unserializable_body_is_recorded() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        let req = Request::post("/x", TimeoutPolicy::Unbounded).json(&map);
        assert!(matches!(req.body, RequestBody::Invalid(_)));
    }
}
