//! Collaborator traits.
//!
//! One trait per external system the engine calls. Each method is a single
//! call that returns a typed result or a `CollaboratorError`; retries, if
//! any, belong inside the implementation.

use crate::error::CollaboratorError;
use crate::types::{
    AdAccount, Analysis, AudioRef, Avatar, CampaignConfig, CampaignDraft, ImageBatch, MediaRef,
    ProductData, PublishResult, VideoJob,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Names of the external systems, as reported in failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Scraper,
    Analyst,
    ScriptWriter,
    ImageGenerator,
    VoiceSynthesizer,
    AvatarRenderer,
    CampaignPlanner,
    AdPlatform,
}

impl Collaborator {
    /// Returns the snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraper => "scraper",
            Self::Analyst => "analyst",
            Self::ScriptWriter => "script_writer",
            Self::ImageGenerator => "image_generator",
            Self::VoiceSynthesizer => "voice_synthesizer",
            Self::AvatarRenderer => "avatar_renderer",
            Self::CampaignPlanner => "campaign_planner",
            Self::AdPlatform => "ad_platform",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a product analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub product: &'a ProductData,
    /// The analysis being refined, if one exists.
    pub current: Option<&'a Analysis>,
    /// All feedback given so far, oldest first, including `feedback`.
    pub history: &'a [String],
    pub feedback: Option<&'a str>,
}

/// Input for script generation.
#[derive(Debug, Clone, Copy)]
pub struct ScriptRequest<'a> {
    pub product: &'a ProductData,
    pub analysis: &'a Analysis,
    /// The scripts being replaced, if any.
    pub current: Option<&'a [String]>,
    pub history: &'a [String],
    pub feedback: Option<&'a str>,
}

/// Input for image generation.
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest<'a> {
    pub script: &'a str,
    pub product: Option<&'a ProductData>,
    pub analysis: Option<&'a Analysis>,
    /// The prompt used for the previous batch, if any.
    pub current_prompt: Option<&'a str>,
    pub feedback: Option<&'a str>,
}

/// Input for drafting a campaign.
#[derive(Debug, Clone, Copy)]
pub struct CampaignRequest<'a> {
    pub media: &'a MediaRef,
    pub product: Option<&'a ProductData>,
    pub analysis: Option<&'a Analysis>,
    pub script: Option<&'a str>,
    /// The configuration being revised, if any.
    pub current: Option<&'a CampaignConfig>,
    pub feedback: Option<&'a str>,
}

/// Input for publishing a campaign.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub account_id: &'a str,
    pub config: &'a CampaignConfig,
    pub media: Option<&'a MediaRef>,
}

/// Fetches product data from a URL.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    async fn scrape_product(&self, url: &str) -> Result<ProductData, CollaboratorError>;
}

/// Produces or refines a marketing analysis.
#[async_trait]
pub trait ProductAnalyst: Send + Sync {
    async fn analyze_product(
        &self,
        request: AnalysisRequest<'_>,
    ) -> Result<Analysis, CollaboratorError>;
}

/// Writes ad scripts.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Generates a fresh set of candidate scripts.
    async fn generate_scripts(
        &self,
        request: ScriptRequest<'_>,
    ) -> Result<Vec<String>, CollaboratorError>;

    /// Rewrites one script according to feedback.
    async fn refine_script(&self, script: &str, feedback: &str)
    -> Result<String, CollaboratorError>;
}

/// Generates ad visuals.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_images(
        &self,
        request: ImageRequest<'_>,
    ) -> Result<ImageBatch, CollaboratorError>;
}

/// Turns a script into a voice-over.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize_audio(&self, script: &str) -> Result<AudioRef, CollaboratorError>;
}

/// Renders talking-avatar videos.
///
/// Rendering is asynchronous on the renderer's side: `render_video` only
/// submits the job and `video_status` polls it.
#[async_trait]
pub trait AvatarRenderer: Send + Sync {
    async fn list_avatars(&self) -> Result<Vec<Avatar>, CollaboratorError>;

    async fn render_video(
        &self,
        audio: &AudioRef,
        avatar_id: &str,
    ) -> Result<VideoJob, CollaboratorError>;

    async fn video_status(&self, job_id: &str) -> Result<VideoJob, CollaboratorError>;
}

/// Drafts campaign settings and a preview for the user.
#[async_trait]
pub trait CampaignPlanner: Send + Sync {
    async fn draft_campaign(
        &self,
        request: CampaignRequest<'_>,
    ) -> Result<CampaignDraft, CollaboratorError>;
}

/// The ad platform account API.
#[async_trait]
pub trait AdPlatform: Send + Sync {
    async fn list_ad_accounts(&self) -> Result<Vec<AdAccount>, CollaboratorError>;

    async fn publish_campaign(
        &self,
        request: PublishRequest<'_>,
    ) -> Result<PublishResult, CollaboratorError>;
}

/// The full set of collaborators the engine needs.
#[derive(Clone)]
pub struct Collaborators {
    pub scraper: Arc<dyn ProductScraper>,
    pub analyst: Arc<dyn ProductAnalyst>,
    pub script_writer: Arc<dyn ScriptWriter>,
    pub image_generator: Arc<dyn ImageGenerator>,
    pub voice: Arc<dyn VoiceSynthesizer>,
    pub avatar_renderer: Arc<dyn AvatarRenderer>,
    pub campaign_planner: Arc<dyn CampaignPlanner>,
    pub ad_platform: Arc<dyn AdPlatform>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_names_match_serde() {
        for collaborator in [
            Collaborator::Scraper,
            Collaborator::ScriptWriter,
            Collaborator::AvatarRenderer,
            Collaborator::AdPlatform,
        ] {
            let json = serde_json::to_string(&collaborator).expect("serialize");
            assert_eq!(json, format!("\"{}\"", collaborator.as_str()));
        }
    }
}
