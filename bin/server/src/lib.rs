//! adpipe HTTP server.
//!
//! Exposes the workflow orchestrator as a JSON API under `/api/workflow`.

pub mod config;
pub mod error;
pub mod routes;
