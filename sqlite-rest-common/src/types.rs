//! Common types shared between the compiler and the HTTP layer

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        let api_error = Self::new(err.error_code(), err.message());
        match err.hint() {
            Some(hint) => api_error.with_hint(hint),
            None => api_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error() {
        let error = ApiError::new("bad_request", "Bad Request").with_hint("no data to insert");
        assert_eq!(error.code, "bad_request");
        assert!(error.hint.is_some());
    }

    #[test]
    fn test_api_error_from_error() {
        let error = ApiError::from(&Error::UnsupportedOperator("foo.1".to_string()));
        assert_eq!(error.code, "unsupported_operator");
        assert_eq!(error.message, "Unsupported Operator");
        assert_eq!(error.hint.as_deref(), Some("operator \"foo.1\" is unsupported"));

        let json = serde_json::to_value(ApiError::from(&Error::UnsupportedMediaType)).unwrap();
        assert!(json.get("hint").is_none());
    }
}
