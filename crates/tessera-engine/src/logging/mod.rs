//! Logging bootstrap.
//!
//! The engine only speaks the `log` facade; this module installs the
//! `env_logger` backend used by binaries and tests.

mod init;

pub use init::{init_logging, LoggingConfig};
