//! Workflow engine for adpipe.
//!
//! Drives a single ad-content session through a fixed sequence of steps,
//! from scraping a product page to publishing a campaign:
//!
//! - **Steps**: the ordered step catalogue and its field ownership table
//! - **State**: the per-session snapshot and the patches steps produce
//! - **Store**: session persistence, in memory or as JSON files
//! - **Registry**: one executor per step, calling external collaborators
//! - **Navigation**: free-text and relative moves between steps
//! - **Intent**: classification of chat messages
//! - **Orchestrator**: the façade tying the above together, with
//!   per-session serialization

pub mod error;
mod executor;
pub mod intent;
pub mod navigation;
pub mod orchestrator;
pub mod registry;
pub mod state;
pub mod step;
pub mod store;

pub use error::{StoreError, WorkflowError};
pub use intent::{Command, Intent, IntentRouter};
pub use navigation::NavigationTarget;
pub use orchestrator::Orchestrator;
pub use registry::{EngineConfig, StepContext, StepExecutor, StepInput, StepOutcome, StepRegistry};
pub use state::{Artifacts, FeedbackHistory, FieldValue, StatePatch, WorkflowState};
pub use step::{FeedbackKind, FeedbackMode, Field, StepId, UnknownStep};
pub use store::{FileSessionStore, InMemorySessionStore, SessionStore};
