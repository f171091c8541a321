//! Payload types exchanged with collaborators.
//!
//! These are stored verbatim in the session state, so every type here is
//! serializable and compares by value.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// What the scraper extracted from a product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductData {
    /// The page that was scraped.
    pub url: String,
    /// Product title.
    pub title: String,
    /// Product description.
    #[serde(default)]
    pub description: String,
    /// Display price, as shown on the page.
    #[serde(default)]
    pub price: Option<String>,
    /// Product image URLs found on the page.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Remaining page text, used as extra context for generation.
    #[serde(default)]
    pub raw_text: String,
}

/// Marketing analysis of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Product category.
    #[serde(default)]
    pub category: String,
    /// Key product features.
    #[serde(default)]
    pub features: Vec<String>,
    /// Target audience description.
    #[serde(default)]
    pub target_audience: String,
    /// Unique selling propositions.
    #[serde(default)]
    pub usps: Vec<String>,
    /// Marketing angles and emotional triggers.
    #[serde(default)]
    pub marketing_angles: Vec<String>,
    /// Competitive positioning.
    #[serde(default)]
    pub positioning: String,
}

/// A batch of generated images and the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBatch {
    /// The prompt sent to the image model.
    pub prompt: String,
    /// URIs of the generated images, in generation order.
    pub images: Vec<String>,
}

/// A synthesized voice-over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRef {
    /// Where the audio file can be fetched.
    pub uri: String,
    /// Length of the clip, when the synthesizer reports it.
    #[serde(default)]
    pub duration_secs: Option<f32>,
}

/// A presenter avatar offered by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    /// Renderer-specific avatar id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional preview image.
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Rendering status of a video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Accepted, not started.
    Pending,
    /// Rendering.
    Processing,
    /// Finished; the URL is available.
    Completed,
    /// The renderer gave up.
    Failed,
}

impl VideoStatus {
    /// Returns true if the renderer will not change this job any more.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A video render job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    /// Renderer job id, used for polling.
    pub job_id: String,
    /// Last known status.
    pub status: VideoStatus,
    /// Final video URL once completed.
    #[serde(default)]
    pub url: Option<String>,
}

/// An ad account the user can publish to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdAccount {
    /// Platform account id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Billing currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// The kind of creative attached to a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still image.
    Image,
    /// A rendered video.
    Video,
}

/// The creative chosen for a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Where the media lives.
    pub uri: String,
    /// Image or video.
    pub kind: MediaKind,
}

/// Ad campaign settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Campaign name.
    pub name: String,
    /// Platform objective (e.g. `OUTCOME_TRAFFIC`).
    pub objective: String,
    /// Daily budget in the account currency's minor unit.
    pub daily_budget_cents: u64,
    /// Targeted country codes.
    #[serde(default)]
    pub countries: Vec<String>,
    /// Minimum audience age.
    pub age_min: u8,
    /// Maximum audience age.
    pub age_max: u8,
    /// Ad headline.
    pub headline: String,
    /// Ad body text.
    pub primary_text: String,
    /// Call-to-action token (e.g. `LEARN_MORE`).
    pub call_to_action: String,
    /// Landing page.
    pub link: String,
    /// Platform-specific settings the engine does not interpret.
    #[serde(default)]
    pub extra: JsonValue,
}

/// A proposed campaign and its human-readable preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    /// The proposed settings.
    pub config: CampaignConfig,
    /// Preview text shown to the user.
    pub preview: String,
}

/// What the ad platform created on publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Created campaign id.
    pub campaign_id: String,
    /// Created ad set id.
    pub adset_id: String,
    /// Created ad id.
    pub ad_id: String,
    /// Platform-reported delivery status (e.g. `PAUSED`).
    pub status: String,
    /// Link to the campaign in the platform's manager UI.
    #[serde(default)]
    pub manager_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_status_terminal() {
        assert!(!VideoStatus::Pending.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(VideoStatus::Completed.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
    }

    #[test]
    fn analysis_tolerates_missing_keys() {
        let analysis: Analysis =
            serde_json::from_str(r#"{"category": "Home", "usps": ["cheap"]}"#).expect("parse");
        assert_eq!(analysis.category, "Home");
        assert_eq!(analysis.usps, vec!["cheap".to_string()]);
        assert!(analysis.features.is_empty());
    }

    #[test]
    fn media_kind_serializes_snake_case() {
        let media = MediaRef {
            uri: "https://cdn.example/v.mp4".to_string(),
            kind: MediaKind::Video,
        };
        let json = serde_json::to_value(&media).expect("serialize");
        assert_eq!(json["kind"], "video");
    }
}
