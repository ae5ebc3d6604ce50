use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use super::envelope::{Envelope, Payload};
use super::policy::{RetryPolicy, TimeoutPolicy};
use super::request::{Request, RequestBody};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{Session, SessionEvent};

/// Issues logical calls against the API and always answers with an [`Envelope`].
///
/// Stateless apart from the shared [`Session`] it reads the bearer token from.
#[derive(Debug, Clone)]
pub struct TransportClient {
    http: Client,
    base_url: String,
    login_path: String,
    session: Session,
    retry: RetryPolicy,
    default_timeout: Duration,
}

impl TransportClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ClientError> {
        // No client-wide timeout: each attempt gets its own policy.
        let http = Client::builder()
            .connect_timeout(config.transport.connect_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            session,
            retry: config.transport.retry_policy(),
            default_timeout: config.transport.request_timeout(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// The bounded policy with the configured default deadline.
    pub fn bounded(&self) -> TimeoutPolicy {
        TimeoutPolicy::Bounded(self.default_timeout)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Issue one logical call with retry and backoff.
    ///
    /// Transient outcomes (no response, 408, 5xx) are retried up to the
    /// attempt ceiling. A 401 is never retried: the token is cleared and
    /// one invalidation notice is published.
    pub async fn request(&self, req: Request) -> Envelope<Payload> {
        if let RequestBody::Invalid(reason) = &req.body {
            return Envelope::failure(400, format!("Invalid request body: {reason}"));
        }

        let request_id = Uuid::new_v4().to_string();
        let max_attempts = req.max_attempts.unwrap_or(self.retry.max_attempts).max(1);
        let mut attempt = 1;

        loop {
            let envelope = self.attempt(&req, &request_id).await;
            debug!(
                request_id = %request_id,
                method = %req.method,
                endpoint = %req.path,
                attempt,
                status = envelope.status,
                success = envelope.success,
                "transport attempt finished"
            );

            if envelope.status == 401 {
                let event = if self.is_login(&req) {
                    SessionEvent::Unauthorized
                } else {
                    SessionEvent::TokenExpired
                };
                warn!(endpoint = %req.path, %event, "authentication rejected, clearing session");
                self.session.invalidate(event);
                return envelope;
            }

            if envelope.success || !self.retry.should_retry(envelope.status) {
                return envelope;
            }

            if attempt >= max_attempts {
                warn!(
                    endpoint = %req.path,
                    attempts = attempt,
                    status = envelope.status,
                    "giving up after {attempt} attempts: {}",
                    envelope.error_message()
                );
                return envelope;
            }

            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                endpoint = %req.path,
                attempt,
                max_attempts,
                status = envelope.status,
                delay_ms = delay.as_millis() as u64,
                "transient failure, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// [`request`](Self::request) followed by decoding into `T`.
    pub async fn request_json<T: DeserializeOwned>(&self, req: Request) -> Envelope<T> {
        self.request(req).await.decode()
    }

    fn is_login(&self, req: &Request) -> bool {
        req.path == self.login_path
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Build the reqwest call: bearer token (except for login), request id and body.
    pub(super) fn build(&self, req: &Request, request_id: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(req.method.clone(), self.url(&req.path))
            .header("x-request-id", request_id);

        if !self.is_login(req) {
            if let Some(token) = self.session.tokens.get() {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        match &req.body {
            RequestBody::Empty | RequestBody::Invalid(_) => builder,
            RequestBody::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            RequestBody::Binary {
                bytes,
                content_type,
            } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
        }
    }

    /// Run `fut` under the request's timeout policy; `None` means the deadline passed.
    pub(super) async fn with_deadline<F, T>(timeout: TimeoutPolicy, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        match timeout {
            TimeoutPolicy::Bounded(limit) => tokio::time::timeout(limit, fut).await.ok(),
            TimeoutPolicy::Unbounded => Some(fut.await),
        }
    }

    async fn attempt(&self, req: &Request, request_id: &str) -> Envelope<Payload> {
        Self::with_deadline(req.timeout, self.exchange(req, request_id))
            .await
            .unwrap_or_else(|| Envelope::failure(408, "Request timeout"))
    }

    async fn exchange(&self, req: &Request, request_id: &str) -> Envelope<Payload> {
        let response: Response = match self.build(req, request_id).send().await {
            Ok(response) => response,
            Err(e) => return Envelope::failure(0, format!("Network error: {e}")),
        };
        let status = response.status().as_u16();
        let json = declares_json(response.headers());
        match response.bytes().await {
            Ok(body) => interpret(status, json, &body),
            Err(e) => Envelope::failure(0, format!("Network error: {e}")),
        }
    }
}

pub(super) fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let mime = v.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Turn a raw response into an envelope.
///
/// 2xx bodies are parsed as JSON when declared so, kept as text otherwise.
/// A declared-JSON body that fails to parse is a failure with the
/// original status, which is never retried.
pub(super) fn interpret(status: u16, json: bool, body: &[u8]) -> Envelope<Payload> {
    if !(200..300).contains(&status) {
        let message = error_detail(body).unwrap_or_else(|| format!("HTTP {status}"));
        return Envelope::failure(status, message);
    }
    if body.is_empty() {
        return Envelope::ok(status, Payload::Empty);
    }
    if json {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Envelope::ok(status, Payload::Json(value)),
            Err(e) => Envelope::failure(status, format!("Invalid JSON response: {e}")),
        }
    } else {
        Envelope::ok(status, Payload::Text(String::from_utf8_lossy(body).into_owned()))
    }
}

/// Pull a human-readable message out of an error body, if it is JSON.
pub(super) fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    for key in ["detail", "error", "message"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Null) | Some(Value::String(_)) | None => continue,
            Some(other) => return Some(other.to_string()),
        }
    }
    None
}
