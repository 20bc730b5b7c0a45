//! Process-level configuration for HolyDB.
//!
//! Provides [`HolyDbConfig`], which locates the data and log directories and
//! carries the log filter. Loading values from the environment or the command
//! line is left to the binary that embeds HolyDB.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Directory under the user's home that holds HolyDB state.
const HOLYDB_HOME: &str = ".holydb";

/// HolyDB configuration.
///
/// # Examples
///
/// ```
/// use holydb_core::HolyDbConfig;
///
/// let config = HolyDbConfig::builder()
///     .data_dir("/srv/holydb/data".into())
///     .build();
/// assert_eq!(config.data_dir.to_str(), Some("/srv/holydb/data"));
/// assert_eq!(config.log_level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct HolyDbConfig {
    /// Root directory of the storage engine. Each bucket is a subdirectory.
    #[builder(default = default_dir("data"))]
    pub data_dir: PathBuf,

    /// Directory for log files written by the embedding binary.
    #[builder(default = default_dir("logs"))]
    pub log_dir: PathBuf,

    /// Log filter string (e.g. `"info"`, `"holydb_auth=debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Enables verbose diagnostics in the embedding binary.
    #[builder(default = false)]
    pub debug: bool,
}

impl Default for HolyDbConfig {
    fn default() -> Self {
        Self {
            data_dir: default_dir("data"),
            log_dir: default_dir("logs"),
            log_level: String::from("info"),
            debug: false,
        }
    }
}

impl HolyDbConfig {
    /// The effective log filter: `debug` overrides the configured level.
    #[must_use]
    pub fn effective_log_level(&self) -> &str {
        if self.debug { "debug" } else { self.log_level.as_str() }
    }
}

/// `$HOME/.holydb/<leaf>`, or `./.holydb/<leaf>` when no home is known.
fn default_dir(leaf: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(HOLYDB_HOME).join(leaf)
}
