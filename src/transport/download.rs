//! Binary export path.
//!
//! Downloads a finished artifact as raw bytes. Unlike [`TransportClient::request`]
//! this is a single attempt with no retries; the caller gets its own
//! success/failure result instead of an envelope.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::{TransportClient, error_detail};
use super::request::{Request, RequestBody};
use crate::error::FailureKind;
use crate::session::SessionEvent;

/// A downloaded artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// From `Content-Disposition`, when the server names the file.
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("download failed (status {status}): {message}")]
pub struct DownloadError {
    pub status: u16,
    pub message: String,
}

impl DownloadError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::from_status(self.status)
    }
}

impl TransportClient {
    /// Fetch an opaque byte stream in one attempt.
    pub async fn download(&self, req: Request) -> Result<DownloadedFile, DownloadError> {
        if let RequestBody::Invalid(reason) = &req.body {
            return Err(DownloadError {
                status: 400,
                message: format!("Invalid request body: {reason}"),
            });
        }

        let request_id = Uuid::new_v4().to_string();
        let exchange = async {
            let response = self
                .build(&req, &request_id)
                .send()
                .await
                .map_err(|e| DownloadError {
                    status: 0,
                    message: format!("Network error: {e}"),
                })?;
            let status = response.status().as_u16();
            let content_type = header_string(response.headers(), CONTENT_TYPE.as_str());
            let filename = header_string(response.headers(), CONTENT_DISPOSITION.as_str())
                .and_then(|v| filename_from_disposition(&v));
            let bytes = response.bytes().await.map_err(|e| DownloadError {
                status: 0,
                message: format!("Network error: {e}"),
            })?;
            Ok::<_, DownloadError>((status, content_type, filename, bytes))
        };

        let (status, content_type, filename, bytes) = Self::with_deadline(req.timeout, exchange)
            .await
            .unwrap_or_else(|| {
                Err(DownloadError {
                    status: 408,
                    message: "Request timeout".into(),
                })
            })?;

        debug!(request_id = %request_id, endpoint = %req.path, status, size = bytes.len(), "download finished");

        if (200..300).contains(&status) {
            return Ok(DownloadedFile {
                bytes: bytes.to_vec(),
                content_type,
                filename,
            });
        }

        if status == 401 {
            warn!(endpoint = %req.path, "download rejected, clearing session");
            self.session().invalidate(SessionEvent::TokenExpired);
        }

        Err(DownloadError {
            status,
            message: error_detail(&bytes).unwrap_or_else(|| format!("HTTP {status}")),
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `attachment; filename="Access_Policy.pdf"` → `Access_Policy.pdf`
fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
