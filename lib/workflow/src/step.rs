//! The fixed step sequence and its ownership table.
//!
//! Every step is described by data rather than code: which fields must be
//! set before it can run, which fields it writes, which feedback history
//! it appends to, and whether a successful run invalidates the work of the
//! steps after it.

use adpipe_integration::Collaborator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pipeline step, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Scrape,
    Analyze,
    GenerateScripts,
    SelectScript,
    RefineScript,
    GenerateImages,
    RefineImages,
    GenerateAudio,
    SelectAvatar,
    GenerateVideo,
    SelectAdAccount,
    SelectMedia,
    PreviewCampaign,
    PublishCampaign,
}

/// A nullable payload field of the workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Url,
    ProductData,
    Analysis,
    Scripts,
    SelectedScriptIndex,
    SelectedScript,
    GeneratedImages,
    ImagePrompt,
    Audio,
    AvailableAvatars,
    SelectedAvatarId,
    Video,
    AdAccounts,
    SelectedAdAccountId,
    SelectedMedia,
    CampaignConfig,
    CampaignPreview,
    PublishStatus,
}

/// The per-step feedback histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Analysis,
    Script,
    ScriptRefinement,
    Image,
    Campaign,
}

/// How a step treats feedback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    /// The step never takes feedback.
    None,
    /// Feedback is optional.
    Optional,
    /// The step cannot run without feedback.
    Required,
}

impl StepId {
    /// All steps in pipeline order.
    pub const ALL: [StepId; 14] = [
        StepId::Scrape,
        StepId::Analyze,
        StepId::GenerateScripts,
        StepId::SelectScript,
        StepId::RefineScript,
        StepId::GenerateImages,
        StepId::RefineImages,
        StepId::GenerateAudio,
        StepId::SelectAvatar,
        StepId::GenerateVideo,
        StepId::SelectAdAccount,
        StepId::SelectMedia,
        StepId::PreviewCampaign,
        StepId::PublishCampaign,
    ];

    /// Returns the snake_case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Analyze => "analyze",
            Self::GenerateScripts => "generate_scripts",
            Self::SelectScript => "select_script",
            Self::RefineScript => "refine_script",
            Self::GenerateImages => "generate_images",
            Self::RefineImages => "refine_images",
            Self::GenerateAudio => "generate_audio",
            Self::SelectAvatar => "select_avatar",
            Self::GenerateVideo => "generate_video",
            Self::SelectAdAccount => "select_ad_account",
            Self::SelectMedia => "select_media",
            Self::PreviewCampaign => "preview_campaign",
            Self::PublishCampaign => "publish_campaign",
        }
    }

    /// Position in the pipeline, starting at 0.
    #[must_use]
    pub fn position(&self) -> usize {
        *self as usize
    }

    /// The step after this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<StepId> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// The step before this one, if any.
    #[must_use]
    pub fn previous(&self) -> Option<StepId> {
        self.position()
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Fields that must be set before this step can run or be navigated to.
    #[must_use]
    pub fn prerequisites(&self) -> &'static [Field] {
        match self {
            Self::Scrape | Self::SelectAdAccount => &[],
            Self::Analyze => &[Field::ProductData],
            Self::GenerateScripts => &[Field::ProductData, Field::Analysis],
            Self::SelectScript => &[Field::Scripts],
            Self::RefineScript | Self::GenerateImages | Self::GenerateAudio => {
                &[Field::SelectedScript]
            }
            Self::RefineImages => &[Field::GeneratedImages],
            Self::SelectAvatar => &[Field::Audio],
            Self::GenerateVideo => &[Field::SelectedAvatarId, Field::Audio],
            Self::SelectMedia => &[Field::SelectedAdAccountId],
            Self::PreviewCampaign => &[Field::SelectedAdAccountId, Field::SelectedMedia],
            Self::PublishCampaign => &[Field::CampaignConfig],
        }
    }

    /// Fields a successful run of this step may write.
    #[must_use]
    pub fn writes(&self) -> &'static [Field] {
        match self {
            Self::Scrape => &[Field::Url, Field::ProductData],
            Self::Analyze => &[Field::Analysis],
            Self::GenerateScripts => &[Field::Scripts],
            Self::SelectScript => &[Field::SelectedScriptIndex, Field::SelectedScript],
            Self::RefineScript => &[Field::SelectedScript],
            Self::GenerateImages | Self::RefineImages => {
                &[Field::GeneratedImages, Field::ImagePrompt]
            }
            Self::GenerateAudio => &[Field::Audio],
            Self::SelectAvatar => &[Field::AvailableAvatars, Field::SelectedAvatarId],
            Self::GenerateVideo => &[Field::Video],
            Self::SelectAdAccount => &[Field::AdAccounts, Field::SelectedAdAccountId],
            Self::SelectMedia => &[Field::SelectedMedia],
            Self::PreviewCampaign => &[Field::CampaignConfig, Field::CampaignPreview],
            Self::PublishCampaign => &[Field::PublishStatus],
        }
    }

    /// The feedback history this step appends to, if it keeps one.
    #[must_use]
    pub fn feedback_history(&self) -> Option<FeedbackKind> {
        match self {
            Self::Analyze => Some(FeedbackKind::Analysis),
            Self::GenerateScripts => Some(FeedbackKind::Script),
            Self::RefineScript => Some(FeedbackKind::ScriptRefinement),
            Self::GenerateImages | Self::RefineImages => Some(FeedbackKind::Image),
            Self::PreviewCampaign => Some(FeedbackKind::Campaign),
            _ => None,
        }
    }

    /// How this step treats feedback.
    #[must_use]
    pub fn feedback_mode(&self) -> FeedbackMode {
        match self {
            Self::RefineScript | Self::RefineImages => FeedbackMode::Required,
            _ if self.feedback_history().is_some() => FeedbackMode::Optional,
            _ => FeedbackMode::None,
        }
    }

    /// True if a successful run makes the work of later steps stale.
    ///
    /// Scraping a new product or regenerating the script set invalidates
    /// every downstream selection and artifact.
    #[must_use]
    pub fn regenerates(&self) -> bool {
        matches!(self, Self::Scrape | Self::GenerateScripts)
    }

    /// Fields written by steps strictly after this one, in pipeline order.
    #[must_use]
    pub fn downstream_fields(&self) -> Vec<Field> {
        let mut fields: Vec<Field> = Self::ALL[self.position() + 1..]
            .iter()
            .flat_map(|step| step.writes().iter().copied())
            .filter(|field| !self.writes().contains(field))
            .collect();
        fields.sort();
        fields.dedup();
        fields
    }

    /// The collaborator this step calls, if it calls one.
    #[must_use]
    pub fn collaborator(&self) -> Option<Collaborator> {
        match self {
            Self::Scrape => Some(Collaborator::Scraper),
            Self::Analyze => Some(Collaborator::Analyst),
            Self::GenerateScripts | Self::RefineScript => Some(Collaborator::ScriptWriter),
            Self::GenerateImages | Self::RefineImages => Some(Collaborator::ImageGenerator),
            Self::GenerateAudio => Some(Collaborator::VoiceSynthesizer),
            Self::SelectAvatar | Self::GenerateVideo => Some(Collaborator::AvatarRenderer),
            Self::SelectAdAccount | Self::PublishCampaign => Some(Collaborator::AdPlatform),
            Self::PreviewCampaign => Some(Collaborator::CampaignPlanner),
            Self::SelectScript | Self::SelectMedia => None,
        }
    }

    /// The chat command that runs this step, shown in hints.
    #[must_use]
    pub fn command_hint(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape <url>",
            Self::Analyze => "run analyze",
            Self::GenerateScripts => "run generate_scripts",
            Self::SelectScript => "select script <n>",
            Self::RefineScript => "describe how to change the script",
            Self::GenerateImages => "run generate_images",
            Self::RefineImages => "describe how to change the images",
            Self::GenerateAudio => "generate audio",
            Self::SelectAvatar => "select avatar <id>",
            Self::GenerateVideo => "generate video",
            Self::SelectAdAccount => "select account <id>",
            Self::SelectMedia => "select media <uri>",
            Self::PreviewCampaign => "preview campaign",
            Self::PublishCampaign => "publish campaign",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStep(pub String);

impl fmt::Display for UnknownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown step: {}", self.0)
    }
}

impl std::error::Error for UnknownStep {}

impl FromStr for StepId {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .find(|step| step.as_str() == normalized)
            .copied()
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

impl Field {
    /// Returns the snake_case field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::ProductData => "product_data",
            Self::Analysis => "analysis",
            Self::Scripts => "scripts",
            Self::SelectedScriptIndex => "selected_script_index",
            Self::SelectedScript => "selected_script",
            Self::GeneratedImages => "generated_images",
            Self::ImagePrompt => "image_prompt",
            Self::Audio => "audio",
            Self::AvailableAvatars => "available_avatars",
            Self::SelectedAvatarId => "selected_avatar_id",
            Self::Video => "video",
            Self::AdAccounts => "ad_accounts",
            Self::SelectedAdAccountId => "selected_ad_account_id",
            Self::SelectedMedia => "selected_media",
            Self::CampaignConfig => "campaign_config",
            Self::CampaignPreview => "campaign_preview",
            Self::PublishStatus => "publish_status",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FeedbackKind {
    /// Returns the name of the history field in the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis_feedback",
            Self::Script => "script_feedback",
            Self::ScriptRefinement => "script_refinement_feedback",
            Self::Image => "image_feedback",
            Self::Campaign => "campaign_feedback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_declaration_order() {
        for (i, step) in StepId::ALL.iter().enumerate() {
            assert_eq!(step.position(), i);
        }
    }

    #[test]
    fn next_and_previous() {
        assert_eq!(StepId::Scrape.previous(), None);
        assert_eq!(StepId::Scrape.next(), Some(StepId::Analyze));
        assert_eq!(StepId::SelectScript.previous(), Some(StepId::GenerateScripts));
        assert_eq!(StepId::PublishCampaign.next(), None);
    }

    #[test]
    fn parse_step_names() {
        assert_eq!("generate_scripts".parse(), Ok(StepId::GenerateScripts));
        assert_eq!(" Select-Avatar ".parse(), Ok(StepId::SelectAvatar));
        assert_eq!("refine images".parse(), Ok(StepId::RefineImages));
        assert!("dance".parse::<StepId>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        for step in StepId::ALL {
            let json = serde_json::to_string(&step).expect("serialize");
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
    }

    #[test]
    fn prerequisites_are_written_by_earlier_steps() {
        for step in StepId::ALL {
            for field in step.prerequisites() {
                let producer = StepId::ALL
                    .iter()
                    .find(|s| s.writes().contains(field))
                    .expect("every prerequisite has a producer");
                assert!(
                    producer.position() < step.position(),
                    "{field} needed by {step} is produced later by {producer}"
                );
            }
        }
    }

    #[test]
    fn script_regeneration_invalidates_selection_and_downstream() {
        let fields = StepId::GenerateScripts.downstream_fields();
        for expected in [
            Field::SelectedScriptIndex,
            Field::SelectedScript,
            Field::GeneratedImages,
            Field::ImagePrompt,
            Field::Audio,
            Field::AvailableAvatars,
            Field::SelectedAvatarId,
            Field::Video,
        ] {
            assert!(fields.contains(&expected), "missing {expected}");
        }
        assert!(!fields.contains(&Field::Scripts));
        assert!(!fields.contains(&Field::Analysis));
        assert!(!fields.contains(&Field::ProductData));
    }

    #[test]
    fn refine_image_downstream_keeps_own_fields() {
        // generate_images and refine_images write the same fields
        let fields = StepId::GenerateImages.downstream_fields();
        assert!(!fields.contains(&Field::GeneratedImages));
        assert!(fields.contains(&Field::Audio));
    }

    #[test]
    fn feedback_modes() {
        assert_eq!(StepId::RefineScript.feedback_mode(), FeedbackMode::Required);
        assert_eq!(StepId::Analyze.feedback_mode(), FeedbackMode::Optional);
        assert_eq!(StepId::GenerateAudio.feedback_mode(), FeedbackMode::None);
        assert_eq!(StepId::SelectScript.feedback_mode(), FeedbackMode::None);
    }

    #[test]
    fn only_selections_skip_collaborators() {
        let local: Vec<_> = StepId::ALL
            .into_iter()
            .filter(|s| s.collaborator().is_none())
            .collect();
        assert_eq!(local, vec![StepId::SelectScript, StepId::SelectMedia]);
    }
}
