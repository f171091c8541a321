//! Conversation types for adpipe.
//!
//! Every session keeps an append-only transcript of what the user typed and
//! what the pipeline answered. The transcript is context for generation
//! collaborators and an audit trail of how the campaign came to be.

pub mod message;

pub use message::{Message, MessageRole, Transcript};
