//! The uniform success/failure wrapper returned by every transport call.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::FailureKind;

/// Outcome of one logical call.
///
/// `success` is true exactly when `error` is unset and `status` is 2xx.
/// Client-side short-circuits that never reach the network use status 200.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// HTTP status; 0 when no response arrived at all.
    pub status: u16,
}

/// A response body after content negotiation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Payload {
    Json(Value),
    Text(String),
    Empty,
}

impl<T> Envelope<T> {
    pub fn ok(status: u16, data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status,
        }
    }

    /// Success produced locally without a network round trip.
    pub fn local(data: T) -> Self {
        Self::ok(200, data)
    }

    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            status,
        }
    }

    /// `None` on success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        (!self.success).then(|| FailureKind::from_status(self.status))
    }

    pub fn is_transient(&self) -> bool {
        self.failure_kind() == Some(FailureKind::Transient)
    }

    /// Error text, or a generic one for a failure that carried none.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            status: self.status,
        }
    }

    pub fn into_result(self) -> Result<T, (u16, String)> {
        let message = self.error_message();
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err((self.status, message)),
        }
    }
}

impl Envelope<Payload> {
    /// Decode the payload into a typed value.
    ///
    /// A payload that does not match `T` turns the envelope into a
    /// failure that keeps the original status.
    pub fn decode<T: DeserializeOwned>(self) -> Envelope<T> {
        let status = self.status;
        if !self.success {
            return Envelope {
                success: false,
                data: None,
                error: self.error,
                status,
            };
        }
        let value = match self.data {
            Some(Payload::Json(value)) => value,
            Some(Payload::Text(text)) => Value::String(text),
            Some(Payload::Empty) | None => Value::Null,
        };
        match serde_json::from_value::<T>(value) {
            Ok(data) => Envelope::ok(status, data),
            Err(e) => Envelope::failure(status, format!("Unexpected response shape: {e}")),
        }
    }
}
