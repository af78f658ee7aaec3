use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Vigil application
#[derive(Error, Debug)]
pub enum VigilError {
    // Real-time transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    // REST client errors
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unexpected status {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    // Authentication errors
    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    // Wire protocol errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Cache errors
    #[error("No fetcher registered for query {0}")]
    NoFetcher(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

impl VigilError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            VigilError::InvalidRequest(_)
            | VigilError::Serialization(_)
            | VigilError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            VigilError::SessionExpired
            | VigilError::InvalidCredentials
            | VigilError::MissingAuthHeader
            | VigilError::InvalidAuthHeader
            | VigilError::JwtError(_) => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            VigilError::NotFound(_) | VigilError::NoFetcher(_) => StatusCode::NOT_FOUND,

            // 502 Bad Gateway
            VigilError::Http(_) | VigilError::UnexpectedStatus { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            VigilError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            VigilError::Io(_) | VigilError::MissingEnvVar(_) | VigilError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for mock-server error responses
impl IntoResponse for VigilError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

// Convert from reqwest errors
impl From<reqwest::Error> for VigilError {
    fn from(err: reqwest::Error) -> Self {
        VigilError::Http(err.to_string())
    }
}

// Convert from tungstenite errors
impl From<tokio_tungstenite::tungstenite::Error> for VigilError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        VigilError::Transport(err.to_string())
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for VigilError {
    fn from(err: url::ParseError) -> Self {
        VigilError::InvalidConfig(err.to_string())
    }
}
