//! Error types for the sqlite-rest service

use thiserror::Error;

/// sqlite-rest error types
#[derive(Error, Debug)]
pub enum Error {
    // Request Errors
    #[error("Bad Request - {hint}")]
    BadRequest { hint: String },

    #[error("Unsupported Media Type")]
    UnsupportedMediaType,

    #[error("Unsupported Operator - operator {0:?} is unsupported")]
    UnsupportedOperator(String),

    #[error("invalid order by clause: {0}")]
    InvalidOrder(String),

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    // Authorization Errors
    #[error("Unauthorized - {0}")]
    Unauthorized(String),

    #[error("Access Restricted")]
    AccessRestricted,

    // Service Errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sqlite-rest operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Bad request carrying a human readable hint
    pub fn bad_request(hint: impl Into<String>) -> Self {
        Self::BadRequest { hint: hint.into() }
    }

    /// HTTP status code for each error type
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::BadRequest { .. }
            | Self::UnsupportedOperator(_)
            | Self::InvalidOrder(_)
            | Self::Decode(_) => 400,

            // 401 Unauthorized
            Self::Unauthorized(_) => 401,

            // 403 Forbidden
            Self::AccessRestricted => 403,

            // 415 Unsupported Media Type
            Self::UnsupportedMediaType => 415,

            // 500 Internal Server Error
            Self::Database(_) | Self::Config(_) | Self::Internal(_) | Self::Io(_) => 500,
        }
    }

    /// Stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::UnsupportedOperator(_) => "unsupported_operator",
            Self::InvalidOrder(_) => "invalid_order",
            Self::Decode(_) => "decode_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::AccessRestricted => "access_restricted",
            Self::Database(_) => "database_error",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Short message shown to API clients
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest { .. } => "Bad Request".to_string(),
            Self::UnsupportedMediaType => "Unsupported Media Type".to_string(),
            Self::UnsupportedOperator(_) => "Unsupported Operator".to_string(),
            Self::Unauthorized(_) => "Unauthorized".to_string(),
            Self::AccessRestricted => "Access Restricted".to_string(),
            other => other.to_string(),
        }
    }

    /// Hint explaining how the request was wrong, if any
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::BadRequest { hint } | Self::Unauthorized(hint) => Some(hint.clone()),
            Self::UnsupportedOperator(op) => Some(format!("operator {op:?} is unsupported")),
            Self::InvalidOrder(clause) => Some(format!("invalid order by clause: {clause}")),
            _ => None,
        }
    }
}
