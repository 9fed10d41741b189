//! Error types for the scrivano library.
//!
//! This crate provides the foundation error types used throughout the
//! scrivano workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use scrivano_error::{ScrivanoResult, ConfigError};
//!
//! fn load_keys() -> ScrivanoResult<Vec<String>> {
//!     Err(ConfigError::new("no credentials configured"))?
//! }
//!
//! match load_keys() {
//!     Ok(keys) => println!("loaded {} keys", keys.len()),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;

pub use config::ConfigError;
pub use dispatch::{DispatchError, DispatchErrorKind, DispatchResult, RetryableError};
pub use error::{ScrivanoError, ScrivanoErrorKind, ScrivanoResult};
