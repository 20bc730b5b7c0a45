//! Validator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Settings of the SigV4 validator.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use holydb_auth::AuthConfig;
///
/// let config = AuthConfig::builder()
///     .region("eu-west-3".to_owned())
///     .clock_skew(Duration::from_secs(60))
///     .build();
/// assert_eq!(config.service, "holydb");
/// assert!(config.require_auth);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Region the credential scope must name.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Service the credential scope must name.
    #[builder(default = String::from("holydb"))]
    pub service: String,

    /// Largest accepted distance between `X-Amz-Date` and now.
    #[builder(default = Duration::from_secs(300))]
    #[serde(rename = "clockSkewSeconds", with = "duration_secs")]
    pub clock_skew: Duration,

    /// When false, requests without an `Authorization` header are admitted
    /// anonymously. Requests that do carry one are always verified.
    #[builder(default = true)]
    pub require_auth: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
