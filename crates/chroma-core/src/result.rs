//! Convenience result type alias for Chroma.

use crate::error::ChromaError;

/// A specialized `Result` type for Chroma operations.
///
/// This is defined as a convenience so that every crate does not need to
/// write `Result<T, ChromaError>` explicitly.
pub type ChromaResult<T> = Result<T, ChromaError>;
