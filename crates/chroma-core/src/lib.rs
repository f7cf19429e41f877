//! # chroma-core
//!
//! Core crate for Chroma. Contains configuration schemas, tracing setup,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Chroma crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use error::ChromaError;
pub use result::ChromaResult;
