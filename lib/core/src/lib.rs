//! Core types and utilities for adpipe.
//!
//! This crate provides the foundational id types and error handling shared
//! by the workflow engine, its collaborators and the server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{MessageId, ParseIdError, SessionId};
