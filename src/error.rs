use http::header::HeaderMap;
use prost::Message;
use thiserror::Error;

use crate::headers::{
    decode_binary_header, percent_decode, GRPC_MESSAGE, GRPC_STATUS, GRPC_STATUS_DETAILS_BIN,
};
use crate::proto;
use crate::status::StatusCode;

/// The one error type a call can close with.
///
/// Carries the gRPC status code, a human-readable message, and any typed
/// detail payloads the server attached via `grpc-status-details-bin`.
#[derive(Error, Debug, Clone)]
#[error("{code:?}: {message}")]
pub struct TransportError {
    pub code: StatusCode,
    pub message: String,
    pub details: Vec<prost_types::Any>,
}

impl TransportError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(
        code: StatusCode,
        message: impl Into<String>,
        details: Vec<prost_types::Any>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(StatusCode::Cancelled, "the call was cancelled")
    }

    /// Unpacks the first detail payload that matches `T`.
    pub fn find_detail<T: prost::Name + Default>(&self) -> Option<T> {
        self.details.iter().find_map(|any| any.to_msg::<T>().ok())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            StatusCode::DeadlineExceeded
        } else if err.is_connect() {
            StatusCode::Unavailable
        } else {
            StatusCode::Unknown
        };
        TransportError::new(code, format!("HTTP request failed: {}", err))
    }
}

/// Runs the full extraction pipeline at response-header arrival:
/// binary details, then textual trailer headers, then the HTTP status.
/// The first extractor that produces an error wins.
pub fn extract_error(http_status: http::StatusCode, headers: &HeaderMap) -> Option<TransportError> {
    extract_binary_details(headers)
        .or_else(|| extract_textual_status(headers))
        .or_else(|| extract_http_status(http_status, headers))
}

/// Runs the extraction pipeline at trailer arrival, where no HTTP status
/// applies: binary details, then textual trailer headers.
pub fn extract_trailer_error(trailer: &HeaderMap) -> Option<TransportError> {
    extract_binary_details(trailer).or_else(|| extract_textual_status(trailer))
}

fn extract_binary_details(headers: &HeaderMap) -> Option<TransportError> {
    let value = headers.get(GRPC_STATUS_DETAILS_BIN)?;

    let bytes = match decode_binary_header(value.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Some(TransportError::new(
                StatusCode::DataLoss,
                format!("invalid grpc-status-details-bin: {}", e),
            ))
        }
    };
    let status = match proto::Status::decode(bytes.as_slice()) {
        Ok(status) => status,
        Err(e) => {
            return Some(TransportError::new(
                StatusCode::DataLoss,
                format!("invalid grpc-status-details-bin: {}", e),
            ))
        }
    };

    match StatusCode::from_i32(status.code) {
        Some(StatusCode::Ok) => None,
        Some(code) => Some(TransportError::with_details(
            code,
            status.message,
            status.details,
        )),
        None => Some(TransportError::new(
            StatusCode::DataLoss,
            format!("invalid grpc-status-details-bin: unknown code {}", status.code),
        )),
    }
}

fn extract_textual_status(headers: &HeaderMap) -> Option<TransportError> {
    let value = headers.get(GRPC_STATUS)?;
    let text = std::str::from_utf8(value.as_bytes()).unwrap_or("");

    match text.parse::<i32>().ok().and_then(StatusCode::from_i32) {
        Some(StatusCode::Ok) => None,
        Some(code) => Some(TransportError::new(code, grpc_message(headers))),
        None => Some(TransportError::new(
            StatusCode::DataLoss,
            format!("invalid grpc-status: {}", text),
        )),
    }
}

fn extract_http_status(status: http::StatusCode, headers: &HeaderMap) -> Option<TransportError> {
    let code = StatusCode::from_http(status.as_u16());
    if code == StatusCode::Ok {
        return None;
    }
    Some(TransportError::new(code, grpc_message(headers)))
}

fn grpc_message(headers: &HeaderMap) -> String {
    headers
        .get(GRPC_MESSAGE)
        .map(percent_decode)
        .unwrap_or_default()
}
