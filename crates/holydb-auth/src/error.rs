//! Error types for SigV4 authentication.
//!
//! Every rejection branch of the validator has its own [`AuthError`] variant.
//! They all share the [`ErrorClass::Unauthorized`] class; only the message
//! differs.

use holydb_core::ErrorClass;

/// Reasons a request is refused by the SigV4 validator or signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header and authentication is mandatory.
    #[error("missing credentials")]
    MissingCredentials,

    /// The `Authorization` header does not use `AWS4-HMAC-SHA256`.
    #[error("invalid auth scheme")]
    InvalidScheme,

    /// The `Authorization` header or a signed header value cannot be parsed.
    #[error("malformed authorization: {0}")]
    Malformed(String),

    /// The credential scope names a region or service this server does not
    /// accept.
    #[error("credential scope {region}/{service} is not accepted")]
    ScopeNotAllowed {
        /// Region from the credential scope.
        region: String,
        /// Service from the credential scope.
        service: String,
    },

    /// The resolver has no secret for the access key.
    #[error("unknown access key: {0}")]
    UnknownAccessKey(String),

    /// `X-Amz-Date` is absent.
    #[error("missing X-Amz-Date header")]
    MissingDate,

    /// `X-Amz-Date` is not in `YYYYMMDDTHHMMSSZ` form.
    #[error("invalid X-Amz-Date: {0}")]
    InvalidDate(String),

    /// The request time is further from now than the allowed clock skew.
    #[error("request expired")]
    Expired,

    /// The date of the credential scope differs from the `X-Amz-Date` day.
    #[error("date scope mismatch")]
    ScopeMismatch,

    /// The request body could not be read to hash it.
    #[error("payload hash error: {0}")]
    PayloadHash(String),

    /// A header named in `SignedHeaders` is not on the request.
    #[error("missing signed header: {0}")]
    MissingHeader(String),

    /// The computed signature differs from the provided one.
    #[error("signature mismatch")]
    SignatureMismatch,
}

impl AuthError {
    /// The error class; always [`ErrorClass::Unauthorized`].
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Unauthorized
    }
}
