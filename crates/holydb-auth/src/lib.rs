//! AWS Signature Version 4 request authentication for HolyDB.
//!
//! [`SigV4Validator`] decides whether an incoming `http::Request` is admitted.
//! It resolves secrets through an injected [`CredentialResolver`], rebuilds the
//! canonical request, and compares signatures in constant time. Admitted
//! requests carry an [`AuthenticatedIdentity`] in their extensions and a
//! [`ReplayBody`] that still yields the full payload.
//!
//! [`RequestSigner`] is the client side of the same protocol and shares the
//! canonicalization code with the validator.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use holydb_auth::{AuthConfig, RootCredentialResolver, SigV4Validator};
//!
//! let config = AuthConfig::builder().require_auth(false).build();
//! let validator = SigV4Validator::new(config, Arc::new(RootCredentialResolver::new("admin", "hunter2")));
//! assert!(!validator.config().require_auth);
//! ```
//!
//! # Modules
//!
//! - [`body`] - Replayable request body handed downstream
//! - [`canonical`] - Canonical request construction
//! - [`credentials`] - Credential resolver trait and implementations
//! - [`error`] - Authentication error types
//! - [`signer`] - Client-side request signing
//! - [`sigv4`] - Header parsing, key derivation and signatures
//! - [`validator`] - The admission pipeline

pub mod body;
pub mod canonical;
mod config;
pub mod credentials;
pub mod error;
pub mod signer;
pub mod sigv4;
pub mod validator;

pub use body::ReplayBody;
pub use config::AuthConfig;
pub use credentials::{CredentialResolver, RootCredentialResolver, StaticCredentialResolver};
pub use error::AuthError;
pub use signer::RequestSigner;
pub use sigv4::hash_payload;
pub use validator::{AuthenticatedIdentity, SigV4Validator};
