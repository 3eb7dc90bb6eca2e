use crate::domain::model::{RawResponse, Response, ResponseBody};
use reqwest::header::HeaderMap;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("{0}")]
    HttpError(#[from] HttpError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Canceled")]
    Canceled,

    #[error("Call already executed")]
    AlreadyExecuted,

    #[error("HTTP {code} response had no body")]
    EmptyBody { code: u16 },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Conversion error: {message}")]
    ConversionError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequestError { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to start dispatcher: {0}")]
    DispatcherError(io::Error),
}

impl CallError {
    /// Maps a `reqwest` failure onto the crate's error kinds.
    ///
    /// Anything that happened on the wire becomes an `IoError`, keeping the
    /// original `reqwest::Error` as the inner source.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return CallError::InvalidRequestError {
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return CallError::ConversionError {
                message: err.to_string(),
            };
        }
        CallError::IoError(transport_io_error(err))
    }

    pub fn is_http(&self) -> bool {
        matches!(self, CallError::HttpError(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, CallError::IoError(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, CallError::Canceled)
    }

    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            CallError::HttpError(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_io(&self) -> Option<&io::Error> {
        match self {
            CallError::IoError(e) => Some(e),
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CallError::HttpError(e) => format!("Server rejected the request: {}", e),
            CallError::IoError(e) => format!("Could not reach the server ({:?}): {}", e.kind(), e),
            CallError::Canceled => "The request was cancelled".to_string(),
            CallError::SerializationError(_) | CallError::ConversionError { .. } => {
                format!("Could not read the response: {}", self)
            }
            CallError::ConfigError { .. }
            | CallError::ConfigValidationError { .. }
            | CallError::InvalidConfigValueError { .. }
            | CallError::MissingConfigError { .. } => format!("Check your configuration: {}", self),
            _ => self.to_string(),
        }
    }
}

fn transport_io_error(err: reqwest::Error) -> io::Error {
    let mut kind = None;
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            kind = Some(io_err.kind());
            break;
        }
        source = cause.source();
    }

    let kind = kind.unwrap_or_else(|| {
        if err.is_timeout() {
            io::ErrorKind::TimedOut
        } else if err.is_connect() {
            io::ErrorKind::ConnectionRefused
        } else {
            io::ErrorKind::UnexpectedEof
        }
    });
    io::Error::new(kind, err)
}

/// A completed exchange whose status was not 2xx.
#[derive(Debug, Clone)]
pub struct HttpError {
    raw: RawResponse,
    error_body: Option<ResponseBody>,
}

impl HttpError {
    pub fn from_response<T>(response: Response<T>) -> Self {
        let (raw, _, error_body) = response.into_parts();
        Self { raw, error_body }
    }

    pub fn code(&self) -> u16 {
        self.raw.code()
    }

    pub fn message(&self) -> &str {
        self.raw.reason()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn error_body(&self) -> Option<&ResponseBody> {
        self.error_body.as_ref()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} {}", self.code(), self.message())
    }
}

impl StdError for HttpError {}

/// Why a `ListenableFuture` did not yield a value.
#[derive(Error, Debug, Clone)]
pub enum FutureError {
    #[error("Execution failed: {0}")]
    ExecutionError(Arc<CallError>),

    #[error("Future was cancelled")]
    Cancelled,

    #[error("Timed out after {0:?} waiting for the future")]
    Timeout(Duration),
}

impl FutureError {
    /// The error the call failed with, if it failed rather than being
    /// cancelled or timing out.
    pub fn cause(&self) -> Option<&CallError> {
        match self {
            FutureError::ExecutionError(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FutureError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
