//! Integration tests for HolyDB.
//!
//! Each test builds a [`TestEnv`]: a [`LocalStorage`] rooted in a temporary
//! directory, a [`SigV4Validator`] and a matching [`RequestSigner`].
//! [`TestEnv::handle`] plays the HTTP front end: it authenticates the request
//! and only then maps it onto a storage operation, so a rejected request
//! never reaches the engine.
//!
//! Run them with:
//! ```text
//! cargo test -p holydb-integration
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Once};

use anyhow::{Context, anyhow};
use bytes::Bytes;
use chrono::Utc;
use holydb_auth::{
    AuthConfig, AuthenticatedIdentity, ReplayBody, RequestSigner, SigV4Validator,
    StaticCredentialResolver,
};
use holydb_core::{ErrorClass, HolyDbConfig};
use holydb_storage::{LocalStorage, Metadata, ObjectStore, StorageError, StorageResult};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use percent_encoding::percent_decode_str;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

/// Access key the test signer uses.
pub const ACCESS_KEY: &str = "holydb-test";

/// Secret of [`ACCESS_KEY`].
pub const SECRET_KEY: &str = "holydb-test-secret";

/// Response header echoing the authenticated access key.
pub const IDENTITY_HEADER: &str = "x-holydb-identity";

const ENDPOINT: &str = "http://localhost:9000";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        let _ = holydb_core::logging::init_tracing("warn");
    });
}

/// A storage engine behind a validator, rooted in a temporary directory.
#[derive(Debug)]
pub struct TestEnv {
    dir: TempDir,
    /// The engine, for direct inspection.
    pub store: LocalStorage,
    /// The validator every request goes through.
    pub validator: SigV4Validator,
    /// A signer holding valid credentials.
    pub signer: RequestSigner,
}

impl TestEnv {
    /// Environment with the default auth configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_auth_config(AuthConfig::default())
    }

    /// Environment with a custom auth configuration.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn with_auth_config(auth: AuthConfig) -> Self {
        init_tracing();

        let dir = tempfile::tempdir().expect("create temp dir");
        let config = HolyDbConfig::builder()
            .data_dir(dir.path().join("data"))
            .log_dir(dir.path().join("logs"))
            .build();
        let store = LocalStorage::from_config(&config);

        let resolver =
            StaticCredentialResolver::new(vec![(ACCESS_KEY.to_owned(), SECRET_KEY.to_owned())]);
        let signer = RequestSigner::for_config(ACCESS_KEY, SECRET_KEY, &auth);
        let validator = SigV4Validator::new(auth, Arc::new(resolver));

        Self {
            dir,
            store,
            validator,
            signer,
        }
    }

    /// Scratch directory outside the storage root.
    #[must_use]
    pub fn scratch(&self) -> &Path {
        self.dir.path()
    }

    /// An unsigned request for `path_and_query`.
    ///
    /// # Panics
    ///
    /// Panics if `path_and_query` does not form a valid URI.
    #[must_use]
    pub fn unsigned(
        &self,
        method: Method,
        path_and_query: &str,
        body: impl Into<Bytes>,
    ) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(format!("{ENDPOINT}{path_and_query}"))
            .body(Full::new(body.into()))
            .expect("valid request")
    }

    /// A request signed now with `X-Amz-Content-Sha256`.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    pub fn signed(
        &self,
        method: Method,
        path_and_query: &str,
        body: impl Into<Bytes>,
    ) -> Request<Full<Bytes>> {
        let body = body.into();
        let mut req = self.unsigned(method, path_and_query, body.clone());
        self.signer
            .sign(&mut req, &body, Utc::now())
            .expect("sign request");
        req
    }

    /// A request signed now without a content hash header, so the validator
    /// buffers and hashes the body.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    pub fn signed_unhashed(
        &self,
        method: Method,
        path_and_query: &str,
        body: impl Into<Bytes>,
    ) -> Request<Full<Bytes>> {
        let body = body.into();
        let mut req = self.unsigned(method, path_and_query, body.clone());
        self.signer
            .sign_without_content_hash(&mut req, &body, Utc::now())
            .expect("sign request");
        req
    }

    /// Authenticate `req` and run the storage operation it names.
    ///
    /// | Request                              | Operation            |
    /// |--------------------------------------|----------------------|
    /// | `PUT /b/k`                           | `put`                |
    /// | `PUT /b/k?uploadId=U&partNumber=N`   | `upload_part`        |
    /// | `POST /b/k?uploads`                  | `start_multipart`    |
    /// | `POST /b/k?uploadId=U`               | `complete_multipart` |
    /// | `GET /b/k`                           | `get`                |
    /// | `GET /b?prefix=P`                    | `list`               |
    /// | `DELETE /b/k`                        | `delete`             |
    /// | `DELETE /b/k?uploadId=U`             | `abort_multipart`    |
    ///
    /// Failures become responses whose status follows the error class.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Bytes>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let req = match self.validator.authenticate(req).await {
            Ok(req) => req,
            Err(err) => return error_response(err.class(), &err.to_string()),
        };
        let identity = req.extensions().get::<AuthenticatedIdentity>().cloned();

        let mut resp = match self.dispatch(req).await {
            Ok(resp) => resp,
            Err(err) => error_response(err.class(), &err.to_string()),
        };
        if let Some(value) = identity.and_then(|id| HeaderValue::from_str(&id.access_key_id).ok()) {
            resp.headers_mut().insert(IDENTITY_HEADER, value);
        }
        resp
    }

    async fn dispatch<B>(&self, req: Request<ReplayBody<B>>) -> StorageResult<Response<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let path = percent_decode_str(parts.uri.path())
            .decode_utf8()
            .map_err(|_| StorageError::invalid("request path is not UTF-8"))?;
        let query: HashMap<String, String> =
            parse_query(parts.uri.query().unwrap_or(""));
        let upload_id = query.get("uploadId").map(String::as_str);
        let (bucket, key) = split_path(&path);

        match (parts.method, key) {
            (Method::PUT, Some(key)) => {
                let body = read_body(body).await?;
                match upload_id {
                    Some(upload_id) => {
                        let part_number = query
                            .get("partNumber")
                            .and_then(|n| n.parse().ok())
                            .ok_or_else(|| StorageError::invalid("missing or bad partNumber"))?;
                        self.store
                            .upload_part(bucket, key, upload_id, part_number, &mut &body[..])
                            .await?;
                    }
                    None => self.store.put(bucket, key, &mut &body[..]).await?,
                }
                Ok(response(StatusCode::OK, Bytes::new()))
            }
            (Method::POST, Some(key)) if query.contains_key("uploads") => {
                let upload_id = self.store.start_multipart(bucket, key).await?;
                Ok(response(StatusCode::OK, Bytes::from(upload_id)))
            }
            (Method::POST, Some(key)) => {
                let upload_id =
                    upload_id.ok_or_else(|| StorageError::invalid("missing uploadId"))?;
                self.store
                    .complete_multipart(bucket, key, upload_id, &Metadata::new())
                    .await?;
                Ok(response(StatusCode::OK, Bytes::new()))
            }
            (Method::GET, Some(key)) => {
                let mut reader = self.store.get(bucket, key).await?;
                let mut content = Vec::new();
                reader
                    .read_to_end(&mut content)
                    .await
                    .with_context(|| format!("failed to read {bucket}/{key}"))?;
                Ok(response(StatusCode::OK, Bytes::from(content)))
            }
            (Method::GET, None) => {
                let prefix = query.get("prefix").map_or("", String::as_str);
                let keys = self.store.list(bucket, prefix).await?;
                Ok(response(StatusCode::OK, Bytes::from(keys.join("\n"))))
            }
            (Method::DELETE, Some(key)) => {
                match upload_id {
                    Some(upload_id) => self.store.abort_multipart(bucket, key, upload_id).await?,
                    None => self.store.delete(bucket, key).await?,
                }
                Ok(response(StatusCode::NO_CONTENT, Bytes::new()))
            }
            (method, _) => Err(StorageError::invalid(format!(
                "unsupported request: {method} {path}"
            ))),
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP status for an error class.
#[must_use]
pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorClass::Unauthorized => StatusCode::FORBIDDEN,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The response body as UTF-8 text.
///
/// # Panics
///
/// Panics if the body is not UTF-8.
#[must_use]
pub fn body_text(resp: &Response<Bytes>) -> &str {
    std::str::from_utf8(resp.body()).expect("utf-8 body")
}

/// `/bucket/key/with/slashes` into `("bucket", Some("key/with/slashes"))`.
fn split_path(path: &str) -> (&str, Option<&str>) {
    let path = path.trim_start_matches('/');
    match path.split_once('/') {
        Some((bucket, key)) if !key.is_empty() => (bucket, Some(key)),
        Some((bucket, _)) => (bucket, None),
        None => (path, None),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(k), decode(v))
        })
        .collect()
}

fn decode(component: &str) -> String {
    percent_decode_str(&component.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

async fn read_body<B>(body: ReplayBody<B>) -> StorageResult<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read request body: {err}"))?;
    Ok(collected.to_bytes())
}

fn response(status: StatusCode, body: Bytes) -> Response<Bytes> {
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp
}

fn error_response(class: ErrorClass, message: &str) -> Response<Bytes> {
    response(status_for(class), Bytes::from(format!("{}: {message}", class.as_str())))
}

mod test_auth;
mod test_multipart;
mod test_object;
