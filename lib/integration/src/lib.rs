//! External collaborators of the adpipe workflow engine.
//!
//! The engine never scrapes, generates or renders anything itself. Every
//! such call goes through one of the traits in this crate:
//!
//! - **Collaborator traits**: scraper, analyst, script writer, image
//!   generator, voice synthesizer, avatar renderer, campaign planner and
//!   ad platform
//! - **Payload types**: what those collaborators exchange with the engine
//! - **Timeouts**: per-collaborator call deadlines
//! - **Offline collaborators**: deterministic local implementations

pub mod collaborator;
pub mod error;
pub mod offline;
pub mod timeout;
pub mod types;

pub use collaborator::{
    AdPlatform, AnalysisRequest, AvatarRenderer, CampaignPlanner, CampaignRequest, Collaborator,
    Collaborators, ImageGenerator, ImageRequest, ProductAnalyst, ProductScraper, PublishRequest,
    ScriptRequest, ScriptWriter, VoiceSynthesizer,
};
pub use error::CollaboratorError;
pub use offline::OfflineCollaborators;
pub use timeout::{CollaboratorTimeouts, with_timeout};
pub use types::{
    AdAccount, Analysis, AudioRef, Avatar, CampaignConfig, CampaignDraft, ImageBatch, MediaKind,
    MediaRef, ProductData, PublishResult, VideoJob, VideoStatus,
};
