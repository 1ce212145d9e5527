//! Response envelope returned by every facade endpoint.

use serde::Serialize;

use crate::application::MappedError;

/// The `{success, data | error}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Operation result, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Classified error, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Classified error detail.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable description.
    pub description: String,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying data.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A successful response with no data (no-op outcomes).
    #[must_use]
    pub const fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// A failed response carrying the classified error.
    #[must_use]
    pub fn error(mapped: MappedError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: mapped.code,
                description: mapped.description,
            }),
        }
    }
}
