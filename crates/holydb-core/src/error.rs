//! Error classification shared across HolyDB crates.

use std::fmt;

/// The class of a failure, independent of which component produced it.
///
/// Storage and authentication errors each map onto one of these classes so the
/// request boundary can pick a status code without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// An object, bucket, upload, or metadata record does not exist.
    NotFound,
    /// The request was rejected before any mutation took place.
    InvalidRequest,
    /// The request failed authentication.
    Unauthorized,
    /// A filesystem or other internal failure.
    Internal,
}

impl ErrorClass {
    /// Short lowercase name, suitable for structured log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        }
    }

    /// Whether the failure is attributable to the caller rather than the server.
    #[must_use]
    pub fn is_client_error(self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
