//! Client-side SigV4 signing.
//!
//! [`RequestSigner`] produces requests the validator accepts. It builds the
//! canonical request through the same functions the validator uses.

use std::fmt;

use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::Request;

use crate::canonical::{build_signed_headers_string, canonical_request};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::sigv4::{
    ALGORITHM, X_AMZ_CONTENT_SHA256, X_AMZ_DATE, build_string_to_sign, compute_signature,
    credential_scope, derive_signing_key, format_amz_date, hash_payload,
};

/// Signs HTTP requests with one access key.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use holydb_auth::RequestSigner;
///
/// let signer = RequestSigner::new("AKID", "secret", "us-east-1", "holydb");
/// let mut req = http::Request::put("http://localhost:9000/photos/cat.jpg")
///     .body(())
///     .unwrap();
///
/// signer.sign(&mut req, b"meow", Utc::now()).unwrap();
/// assert!(req.headers().contains_key("authorization"));
/// assert!(req.headers().contains_key("x-amz-content-sha256"));
/// ```
#[derive(Clone)]
pub struct RequestSigner {
    access_key_id: String,
    secret: String,
    region: String,
    service: String,
}

impl RequestSigner {
    /// Create a signer for one access key and credential scope.
    pub fn new(
        access_key_id: impl Into<String>,
        secret: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret: secret.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Create a signer whose scope matches a validator configuration.
    pub fn for_config(
        access_key_id: impl Into<String>,
        secret: impl Into<String>,
        config: &AuthConfig,
    ) -> Self {
        Self::new(
            access_key_id,
            secret,
            config.region.clone(),
            config.service.clone(),
        )
    }

    /// Sign `req` at time `now`, sending the payload hash in
    /// `X-Amz-Content-Sha256`.
    ///
    /// `payload` must be the exact body that will be sent.
    pub fn sign<B>(
        &self,
        req: &mut Request<B>,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let payload_hash = hash_payload(payload);
        req.headers_mut().insert(
            HeaderName::from_static(X_AMZ_CONTENT_SHA256),
            header_value(&payload_hash)?,
        );
        self.sign_with_hash(req, &payload_hash, now)
    }

    /// Sign `req` at time `now` without an `X-Amz-Content-Sha256` header, so
    /// the validator hashes the body itself.
    pub fn sign_without_content_hash<B>(
        &self,
        req: &mut Request<B>,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        req.headers_mut().remove(X_AMZ_CONTENT_SHA256);
        self.sign_with_hash(req, &hash_payload(payload), now)
    }

    fn sign_with_hash<B>(
        &self,
        req: &mut Request<B>,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let amz_date = format_amz_date(&now);
        let date = now.format("%Y%m%d").to_string();
        req.headers_mut()
            .insert(HeaderName::from_static(X_AMZ_DATE), header_value(&amz_date)?);

        let mut signed_headers = vec!["host", X_AMZ_DATE];
        if req.headers().contains_key(X_AMZ_CONTENT_SHA256) {
            signed_headers.push(X_AMZ_CONTENT_SHA256);
        }

        let canonical = canonical_request(
            req.method(),
            req.uri(),
            req.headers(),
            &signed_headers,
            payload_hash,
        )?;
        let scope = credential_scope(&date, &self.region, &self.service);
        let string_to_sign =
            build_string_to_sign(&amz_date, &scope, &hash_payload(canonical.as_bytes()));
        let signing_key = derive_signing_key(&self.secret, &date, &self.region, &self.service);
        let signature = compute_signature(&signing_key, &string_to_sign);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            self.access_key_id,
            build_signed_headers_string(&signed_headers),
        );
        req.headers_mut()
            .insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value)
        .map_err(|_| AuthError::Malformed(format!("invalid header value: {value}")))
}
