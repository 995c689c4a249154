//! Core definitions shared by all tessel-* crates: the error type and the verification helpers.

pub mod error;
pub mod result;

pub use result::Result;
