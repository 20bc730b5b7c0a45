//! Core types and configuration shared by the HolyDB crates.
//!
//! This crate holds the pieces that both the storage engine and the request
//! authentication layer depend on: the process configuration, the error
//! classification used to map failures onto wire status classes, and the
//! tracing subscriber setup.

mod config;
mod error;
pub mod logging;

pub use config::HolyDbConfig;
pub use error::ErrorClass;
