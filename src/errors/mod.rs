//! # Error Handling
//!
//! Structured error taxonomy shared by the request pipeline, the team store and
//! the MCP tool layer.

pub mod types;

pub use types::{AppError, ErrorKind, Result, CIRCUIT_BREAKER_ERROR_TYPE};
