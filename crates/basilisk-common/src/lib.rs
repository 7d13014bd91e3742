//! Common utilities for basilisk
//!
//! This crate provides the error type shared by every basilisk crate.

pub mod error;

pub use error::{BasiliskError, Result};
