//! Mosaic Core: shared error type and `Result` alias.
//!
//! Every Mosaic crate reports failures through [`Error`] so that the binary
//! can surface a single diagnostic chain.

pub mod error;

pub use error::{Error, Result};
