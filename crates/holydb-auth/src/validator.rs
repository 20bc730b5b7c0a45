//! The SigV4 admission pipeline.
//!
//! [`SigV4Validator::authenticate`] runs a fixed, short-circuiting sequence of
//! checks: presence, scheme, structure, scope, credential resolution,
//! timestamp, payload hash, canonical request, and finally a constant-time
//! signature comparison. None of them touch storage.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::AUTHORIZATION;
use http::{HeaderMap, Request};
use http_body::Body;
use http_body_util::BodyExt;
use tracing::{debug, warn};

use crate::body::ReplayBody;
use crate::canonical::canonical_request;
use crate::config::AuthConfig;
use crate::credentials::CredentialResolver;
use crate::error::AuthError;
use crate::sigv4::{
    ParsedAuthorization, X_AMZ_CONTENT_SHA256, X_AMZ_DATE, build_string_to_sign,
    compute_signature, derive_signing_key, hash_payload, parse_amz_date,
    parse_authorization_header, signatures_match,
};

/// The caller an admitted request was signed by.
///
/// Stored in the request extensions on successful verification. Anonymous
/// requests carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    /// Access key ID from the credential scope.
    pub access_key_id: String,
}

/// Verifies AWS Signature Version 4 requests.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use bytes::Bytes;
/// use chrono::Utc;
/// use http_body_util::Full;
/// use holydb_auth::{
///     AuthConfig, AuthenticatedIdentity, RequestSigner, SigV4Validator,
///     StaticCredentialResolver,
/// };
///
/// let config = AuthConfig::default();
/// let resolver = StaticCredentialResolver::new(vec![("AKID".to_owned(), "secret".to_owned())]);
/// let validator = SigV4Validator::new(config.clone(), Arc::new(resolver));
///
/// let mut req = http::Request::put("http://localhost:9000/photos/cat.jpg")
///     .body(Full::new(Bytes::from_static(b"meow")))
///     .unwrap();
/// RequestSigner::for_config("AKID", "secret", &config)
///     .sign(&mut req, b"meow", Utc::now())
///     .unwrap();
///
/// let admitted = tokio_test::block_on(validator.authenticate(req)).unwrap();
/// let identity = admitted.extensions().get::<AuthenticatedIdentity>().unwrap();
/// assert_eq!(identity.access_key_id, "AKID");
/// ```
#[derive(Clone)]
pub struct SigV4Validator {
    config: AuthConfig,
    resolver: Arc<dyn CredentialResolver>,
}

impl SigV4Validator {
    /// Create a validator with an injected credential resolver.
    pub fn new(config: AuthConfig, resolver: Arc<dyn CredentialResolver>) -> Self {
        Self { config, resolver }
    }

    /// The validator configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify `req` against the current time.
    ///
    /// On success the returned request carries a body that yields exactly the
    /// bytes the client sent, and an [`AuthenticatedIdentity`] extension when
    /// the request was signed.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first check that fails.
    pub async fn authenticate<B>(&self, req: Request<B>) -> Result<Request<ReplayBody<B>>, AuthError>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        self.authenticate_at(req, Utc::now()).await
    }

    /// Verify `req` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first check that fails.
    pub async fn authenticate_at<B>(
        &self,
        req: Request<B>,
        now: DateTime<Utc>,
    ) -> Result<Request<ReplayBody<B>>, AuthError>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let header = authorization_header(req.headers())
            .inspect_err(|err| warn!(reason = %err, "rejected request"))?;

        let Some(header) = header else {
            if self.config.require_auth {
                let err = AuthError::MissingCredentials;
                warn!(reason = %err, "rejected request");
                return Err(err);
            }
            debug!("admitting anonymous request");
            return Ok(req.map(ReplayBody::original));
        };

        let parsed = parse_authorization_header(&header)
            .inspect_err(|err| warn!(reason = %err, "rejected request"))?;

        debug!(
            access_key_id = %parsed.access_key_id,
            date = %parsed.date,
            region = %parsed.region,
            service = %parsed.service,
            "verifying SigV4 signature"
        );

        self.verify(req, &parsed, now).await.inspect_err(|err| {
            warn!(
                access_key_id = %parsed.access_key_id,
                region = %parsed.region,
                service = %parsed.service,
                reason = %err,
                "rejected signed request"
            );
        })
    }

    async fn verify<B>(
        &self,
        req: Request<B>,
        parsed: &ParsedAuthorization,
        now: DateTime<Utc>,
    ) -> Result<Request<ReplayBody<B>>, AuthError>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        if parsed.region != self.config.region || parsed.service != self.config.service {
            return Err(AuthError::ScopeNotAllowed {
                region: parsed.region.clone(),
                service: parsed.service.clone(),
            });
        }

        let secret = self
            .resolver
            .resolve(&parsed.access_key_id)
            .ok_or_else(|| AuthError::UnknownAccessKey(parsed.access_key_id.clone()))?;

        let amz_date = amz_date_header(req.headers())?;
        let request_time = parse_amz_date(&amz_date)?;
        if !within_skew(now, request_time, self.config.clock_skew) {
            return Err(AuthError::Expired);
        }
        if amz_date.get(..8) != Some(parsed.date.as_str()) {
            return Err(AuthError::ScopeMismatch);
        }

        let (mut parts, body) = req.into_parts();
        let (payload_hash, body) = match content_hash_header(&parts.headers)? {
            Some(hash) => (hash, ReplayBody::original(body)),
            None => {
                let bytes = body
                    .collect()
                    .await
                    .map_err(|err| AuthError::PayloadHash(err.to_string()))?
                    .to_bytes();
                (hash_payload(&bytes), ReplayBody::buffered(bytes))
            }
        };

        let canonical = canonical_request(
            &parts.method,
            &parts.uri,
            &parts.headers,
            &parsed.signed_header_refs(),
            &payload_hash,
        )?;
        debug!(canonical_request = %canonical, "built canonical request");

        let scope = parsed.credential_scope();
        let string_to_sign =
            build_string_to_sign(&amz_date, &scope, &hash_payload(canonical.as_bytes()));
        debug!(string_to_sign = %string_to_sign, "built string to sign");

        let signing_key =
            derive_signing_key(&secret, &parsed.date, &parsed.region, &parsed.service);
        let expected = compute_signature(&signing_key, &string_to_sign);
        if !signatures_match(&expected, &parsed.signature) {
            return Err(AuthError::SignatureMismatch);
        }

        debug!(access_key_id = %parsed.access_key_id, "signature verification succeeded");
        parts.extensions.insert(AuthenticatedIdentity {
            access_key_id: parsed.access_key_id.clone(),
        });
        Ok(Request::from_parts(parts, body))
    }
}

impl fmt::Debug for SigV4Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigV4Validator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The `Authorization` value; an empty header counts as absent.
fn authorization_header(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::Malformed("authorization header is not visible ASCII".to_owned()))?;
    Ok((!value.is_empty()).then(|| value.to_owned()))
}

fn amz_date_header(headers: &HeaderMap) -> Result<String, AuthError> {
    match headers.get(X_AMZ_DATE) {
        None => Err(AuthError::MissingDate),
        Some(value) if value.is_empty() => Err(AuthError::MissingDate),
        Some(value) => value
            .to_str()
            .map(ToOwned::to_owned)
            .map_err(|_| AuthError::InvalidDate(String::from_utf8_lossy(value.as_bytes()).into_owned())),
    }
}

fn content_hash_header(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(X_AMZ_CONTENT_SHA256) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| {
        AuthError::Malformed(format!("header {X_AMZ_CONTENT_SHA256} is not visible ASCII"))
    })?;
    Ok((!value.is_empty()).then(|| value.to_owned()))
}

fn within_skew(now: DateTime<Utc>, request_time: DateTime<Utc>, max: Duration) -> bool {
    now.signed_duration_since(request_time)
        .abs()
        .to_std()
        .is_ok_and(|skew| skew <= max)
}
