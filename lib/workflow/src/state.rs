//! Per-session workflow state and the patches that change it.

use crate::step::{FeedbackKind, Field, StepId};
use adpipe_conversation::{Message, Transcript};
use adpipe_core::SessionId;
use adpipe_integration::{
    AdAccount, Analysis, AudioRef, Avatar, CampaignConfig, MediaRef, ProductData, PublishResult,
    VideoJob,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The payload fields produced by steps.
///
/// Each field is `None` until its producing step first succeeds. Only a
/// producing step, or the invalidation that follows a regenerating step,
/// changes a field once it is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub product_data: Option<ProductData>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
    #[serde(default)]
    pub scripts: Option<Vec<String>>,
    #[serde(default)]
    pub selected_script_index: Option<usize>,
    #[serde(default)]
    pub selected_script: Option<String>,
    #[serde(default)]
    pub generated_images: Option<Vec<String>>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub audio: Option<AudioRef>,
    #[serde(default)]
    pub available_avatars: Option<Vec<Avatar>>,
    #[serde(default)]
    pub selected_avatar_id: Option<String>,
    #[serde(default)]
    pub video: Option<VideoJob>,
    #[serde(default)]
    pub ad_accounts: Option<Vec<AdAccount>>,
    #[serde(default)]
    pub selected_ad_account_id: Option<String>,
    #[serde(default)]
    pub selected_media: Option<MediaRef>,
    #[serde(default)]
    pub campaign_config: Option<CampaignConfig>,
    #[serde(default)]
    pub campaign_preview: Option<String>,
    #[serde(default)]
    pub publish_status: Option<PublishResult>,
}

impl Artifacts {
    /// Returns true if `field` holds a value.
    #[must_use]
    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Url => self.url.is_some(),
            Field::ProductData => self.product_data.is_some(),
            Field::Analysis => self.analysis.is_some(),
            Field::Scripts => self.scripts.is_some(),
            Field::SelectedScriptIndex => self.selected_script_index.is_some(),
            Field::SelectedScript => self.selected_script.is_some(),
            Field::GeneratedImages => self.generated_images.is_some(),
            Field::ImagePrompt => self.image_prompt.is_some(),
            Field::Audio => self.audio.is_some(),
            Field::AvailableAvatars => self.available_avatars.is_some(),
            Field::SelectedAvatarId => self.selected_avatar_id.is_some(),
            Field::Video => self.video.is_some(),
            Field::AdAccounts => self.ad_accounts.is_some(),
            Field::SelectedAdAccountId => self.selected_ad_account_id.is_some(),
            Field::SelectedMedia => self.selected_media.is_some(),
            Field::CampaignConfig => self.campaign_config.is_some(),
            Field::CampaignPreview => self.campaign_preview.is_some(),
            Field::PublishStatus => self.publish_status.is_some(),
        }
    }

    /// Resets `field` to `None`.
    pub fn clear(&mut self, field: Field) {
        match field {
            Field::Url => self.url = None,
            Field::ProductData => self.product_data = None,
            Field::Analysis => self.analysis = None,
            Field::Scripts => self.scripts = None,
            Field::SelectedScriptIndex => self.selected_script_index = None,
            Field::SelectedScript => self.selected_script = None,
            Field::GeneratedImages => self.generated_images = None,
            Field::ImagePrompt => self.image_prompt = None,
            Field::Audio => self.audio = None,
            Field::AvailableAvatars => self.available_avatars = None,
            Field::SelectedAvatarId => self.selected_avatar_id = None,
            Field::Video => self.video = None,
            Field::AdAccounts => self.ad_accounts = None,
            Field::SelectedAdAccountId => self.selected_ad_account_id = None,
            Field::SelectedMedia => self.selected_media = None,
            Field::CampaignConfig => self.campaign_config = None,
            Field::CampaignPreview => self.campaign_preview = None,
            Field::PublishStatus => self.publish_status = None,
        }
    }

    /// Returns the fields of `required` that are not set, in order.
    #[must_use]
    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|field| !self.is_set(*field))
            .collect()
    }
}

/// Feedback given to revisable steps, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackHistory {
    #[serde(default)]
    pub analysis_feedback: Vec<String>,
    #[serde(default)]
    pub script_feedback: Vec<String>,
    #[serde(default)]
    pub script_refinement_feedback: Vec<String>,
    #[serde(default)]
    pub image_feedback: Vec<String>,
    #[serde(default)]
    pub campaign_feedback: Vec<String>,
}

impl FeedbackHistory {
    /// Returns the history of one kind.
    #[must_use]
    pub fn get(&self, kind: FeedbackKind) -> &[String] {
        match kind {
            FeedbackKind::Analysis => &self.analysis_feedback,
            FeedbackKind::Script => &self.script_feedback,
            FeedbackKind::ScriptRefinement => &self.script_refinement_feedback,
            FeedbackKind::Image => &self.image_feedback,
            FeedbackKind::Campaign => &self.campaign_feedback,
        }
    }

    /// Appends one entry.
    pub fn push(&mut self, kind: FeedbackKind, feedback: impl Into<String>) {
        let history = match kind {
            FeedbackKind::Analysis => &mut self.analysis_feedback,
            FeedbackKind::Script => &mut self.script_feedback,
            FeedbackKind::ScriptRefinement => &mut self.script_refinement_feedback,
            FeedbackKind::Image => &mut self.image_feedback,
            FeedbackKind::Campaign => &mut self.campaign_feedback,
        };
        history.push(feedback.into());
    }
}

/// Everything the engine knows about one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: SessionId,
    /// Where the user is. Its prerequisites are always satisfied.
    pub current_step: StepId,
    /// A requested jump that has not been resolved yet.
    #[serde(default)]
    pub navigation_intent: Option<String>,
    /// A URL sent mid-pipeline, waiting for the user to confirm a restart.
    #[serde(default)]
    pub pending_url: Option<String>,
    #[serde(default)]
    pub messages: Transcript,
    #[serde(flatten)]
    pub artifacts: Artifacts,
    #[serde(flatten)]
    pub feedback: FeedbackHistory,
    /// Successful runs per step. Absent means never run.
    #[serde(default)]
    pub iteration_count: BTreeMap<StepId, u32>,
    /// The last failure, cleared by the next successful step.
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Creates the initial state for a session.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            current_step: StepId::Scrape,
            navigation_intent: None,
            pending_url: None,
            messages: Transcript::new(),
            artifacts: Artifacts::default(),
            feedback: FeedbackHistory::default(),
            iteration_count: BTreeMap::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the prerequisite fields of `step` that are not set.
    #[must_use]
    pub fn missing_prerequisites(&self, step: StepId) -> Vec<Field> {
        self.artifacts.missing(step.prerequisites())
    }

    /// Returns true if `step` can be run or navigated to.
    #[must_use]
    pub fn is_ready(&self, step: StepId) -> bool {
        self.missing_prerequisites(step).is_empty()
    }

    /// How many times `step` has succeeded.
    #[must_use]
    pub fn iterations(&self, step: StepId) -> u32 {
        self.iteration_count.get(&step).copied().unwrap_or(0)
    }

    /// Records one more successful run of `step`.
    pub fn record_iteration(&mut self, step: StepId) {
        *self.iteration_count.entry(step).or_insert(0) += 1;
    }

    /// Clears every field owned by steps after `step`.
    pub fn invalidate_downstream(&mut self, step: StepId) -> Vec<Field> {
        let cleared: Vec<Field> = step
            .downstream_fields()
            .into_iter()
            .filter(|field| self.artifacts.is_set(*field))
            .collect();
        for field in &cleared {
            self.artifacts.clear(*field);
        }
        cleared
    }

    /// Appends a message typed by the user.
    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Appends a message produced by the pipeline.
    pub fn push_agent_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::agent(content));
    }

    /// Marks the state as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One field value produced by a step.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Url(String),
    ProductData(ProductData),
    Analysis(Analysis),
    Scripts(Vec<String>),
    SelectedScriptIndex(usize),
    SelectedScript(String),
    GeneratedImages(Vec<String>),
    ImagePrompt(String),
    Audio(AudioRef),
    AvailableAvatars(Vec<Avatar>),
    SelectedAvatarId(String),
    Video(VideoJob),
    AdAccounts(Vec<AdAccount>),
    SelectedAdAccountId(String),
    SelectedMedia(MediaRef),
    CampaignConfig(CampaignConfig),
    CampaignPreview(String),
    PublishStatus(PublishResult),
}

impl FieldValue {
    /// The field this value is for.
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Url(_) => Field::Url,
            Self::ProductData(_) => Field::ProductData,
            Self::Analysis(_) => Field::Analysis,
            Self::Scripts(_) => Field::Scripts,
            Self::SelectedScriptIndex(_) => Field::SelectedScriptIndex,
            Self::SelectedScript(_) => Field::SelectedScript,
            Self::GeneratedImages(_) => Field::GeneratedImages,
            Self::ImagePrompt(_) => Field::ImagePrompt,
            Self::Audio(_) => Field::Audio,
            Self::AvailableAvatars(_) => Field::AvailableAvatars,
            Self::SelectedAvatarId(_) => Field::SelectedAvatarId,
            Self::Video(_) => Field::Video,
            Self::AdAccounts(_) => Field::AdAccounts,
            Self::SelectedAdAccountId(_) => Field::SelectedAdAccountId,
            Self::SelectedMedia(_) => Field::SelectedMedia,
            Self::CampaignConfig(_) => Field::CampaignConfig,
            Self::CampaignPreview(_) => Field::CampaignPreview,
            Self::PublishStatus(_) => Field::PublishStatus,
        }
    }

    fn apply(self, artifacts: &mut Artifacts) {
        match self {
            Self::Url(v) => artifacts.url = Some(v),
            Self::ProductData(v) => artifacts.product_data = Some(v),
            Self::Analysis(v) => artifacts.analysis = Some(v),
            Self::Scripts(v) => artifacts.scripts = Some(v),
            Self::SelectedScriptIndex(v) => artifacts.selected_script_index = Some(v),
            Self::SelectedScript(v) => artifacts.selected_script = Some(v),
            Self::GeneratedImages(v) => artifacts.generated_images = Some(v),
            Self::ImagePrompt(v) => artifacts.image_prompt = Some(v),
            Self::Audio(v) => artifacts.audio = Some(v),
            Self::AvailableAvatars(v) => artifacts.available_avatars = Some(v),
            Self::SelectedAvatarId(v) => artifacts.selected_avatar_id = Some(v),
            Self::Video(v) => artifacts.video = Some(v),
            Self::AdAccounts(v) => artifacts.ad_accounts = Some(v),
            Self::SelectedAdAccountId(v) => artifacts.selected_ad_account_id = Some(v),
            Self::SelectedMedia(v) => artifacts.selected_media = Some(v),
            Self::CampaignConfig(v) => artifacts.campaign_config = Some(v),
            Self::CampaignPreview(v) => artifacts.campaign_preview = Some(v),
            Self::PublishStatus(v) => artifacts.publish_status = Some(v),
        }
    }
}

/// The fields a step wants to overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    values: Vec<FieldValue>,
}

impl StatePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(mut self, value: FieldValue) -> Self {
        self.values.push(value);
        self
    }

    /// The fields this patch writes, in insertion order.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        self.values.iter().map(FieldValue::field).collect()
    }

    /// Returns true if the patch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes every value into `artifacts`.
    pub fn apply_to(self, artifacts: &mut Artifacts) {
        for value in self.values {
            value.apply(artifacts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_scripts() -> WorkflowState {
        let mut state = WorkflowState::new(SessionId::new());
        StatePatch::new()
            .with(FieldValue::Scripts(vec!["a".into(), "b".into(), "c".into()]))
            .with(FieldValue::SelectedScriptIndex(1))
            .with(FieldValue::SelectedScript("b".into()))
            .with(FieldValue::Audio(AudioRef {
                uri: "offline://audio/1.mp3".into(),
                duration_secs: None,
            }))
            .apply_to(&mut state.artifacts);
        state
    }

    #[test]
    fn new_state_starts_at_scrape() {
        let state = WorkflowState::new(SessionId::new());
        assert_eq!(state.current_step, StepId::Scrape);
        assert!(state.iteration_count.is_empty());
        assert!(state.is_ready(StepId::Scrape));
        assert!(!state.is_ready(StepId::Analyze));
    }

    #[test]
    fn missing_prerequisites_in_table_order() {
        let state = WorkflowState::new(SessionId::new());
        assert_eq!(
            state.missing_prerequisites(StepId::GenerateVideo),
            vec![Field::SelectedAvatarId, Field::Audio]
        );
    }

    #[test]
    fn patch_applies_values() {
        let state = state_with_scripts();
        assert_eq!(state.artifacts.selected_script.as_deref(), Some("b"));
        assert!(state.is_ready(StepId::SelectAvatar));
    }

    #[test]
    fn invalidate_downstream_reports_cleared_fields() {
        let mut state = state_with_scripts();
        let cleared = state.invalidate_downstream(StepId::GenerateScripts);

        assert_eq!(
            cleared,
            vec![Field::SelectedScriptIndex, Field::SelectedScript, Field::Audio]
        );
        assert!(state.artifacts.scripts.is_some());
        assert!(state.artifacts.selected_script.is_none());
        assert!(state.artifacts.audio.is_none());
    }

    #[test]
    fn iteration_counting() {
        let mut state = WorkflowState::new(SessionId::new());
        assert_eq!(state.iterations(StepId::Analyze), 0);
        state.record_iteration(StepId::Analyze);
        state.record_iteration(StepId::Analyze);
        assert_eq!(state.iterations(StepId::Analyze), 2);
    }

    #[test]
    fn feedback_history_keeps_order() {
        let mut history = FeedbackHistory::default();
        history.push(FeedbackKind::ScriptRefinement, "shorter");
        history.push(FeedbackKind::ScriptRefinement, "punchier");
        assert_eq!(
            history.get(FeedbackKind::ScriptRefinement),
            ["shorter".to_string(), "punchier".to_string()]
        );
        assert!(history.get(FeedbackKind::Image).is_empty());
    }

    #[test]
    fn state_serializes_flat() {
        let mut state = state_with_scripts();
        state.record_iteration(StepId::GenerateScripts);
        state.feedback.push(FeedbackKind::Script, "funnier");

        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(json["current_step"], "scrape");
        assert_eq!(json["selected_script_index"], 1);
        assert_eq!(json["script_feedback"][0], "funnier");
        assert_eq!(json["iteration_count"]["generate_scripts"], 1);
        assert!(json["product_data"].is_null());

        let parsed: WorkflowState = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, state);
    }
}
