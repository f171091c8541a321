//! Built-in step executors.

use crate::error::WorkflowError;
use crate::registry::{StepContext, StepExecutor, StepInput, StepOutcome, wrong_input};
use crate::state::{FieldValue, StatePatch, WorkflowState};
use crate::step::{FeedbackKind, Field, StepId};
use adpipe_integration::{
    AnalysisRequest, CampaignRequest, Collaborator, CollaboratorError, ImageRequest, MediaKind,
    MediaRef, PublishRequest, ScriptRequest, VideoStatus,
};
use async_trait::async_trait;

/// One executor per step, in pipeline order.
pub(crate) fn builtin() -> Vec<Box<dyn StepExecutor>> {
    vec![
        Box::new(Scrape),
        Box::new(Analyze),
        Box::new(GenerateScripts),
        Box::new(SelectScript),
        Box::new(RefineScript),
        Box::new(Images {
            step: StepId::GenerateImages,
        }),
        Box::new(Images {
            step: StepId::RefineImages,
        }),
        Box::new(GenerateAudio),
        Box::new(SelectAvatar),
        Box::new(GenerateVideo),
        Box::new(SelectAdAccount),
        Box::new(SelectMedia),
        Box::new(PreviewCampaign),
        Box::new(PublishCampaign),
    ]
}

/// Normalizes user-typed product links. Returns `None` for anything that
/// is not an http(s) URL.
pub(crate) fn normalize_url(text: &str) -> Option<String> {
    let text = text.trim();
    let url = if text.starts_with("www.") {
        format!("https://{text}")
    } else {
        text.to_string()
    };
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return None;
    }
    Some(url)
}

fn require<'a, T>(
    value: &'a Option<T>,
    step: StepId,
    field: Field,
) -> Result<&'a T, WorkflowError> {
    value.as_ref().ok_or_else(|| WorkflowError::StepNotReady {
        step,
        missing: vec![field],
    })
}

fn empty_response(collaborator: Collaborator, what: &str) -> WorkflowError {
    WorkflowError::collaborator(
        collaborator,
        &CollaboratorError::InvalidResponse {
            reason: format!("returned no {what}"),
        },
    )
}

/// Looks up a media URI among the images and the finished video.
fn resolve_media(state: &WorkflowState, uri: &str) -> Result<MediaRef, WorkflowError> {
    let uri = uri.trim();
    let is_image = state
        .artifacts
        .generated_images
        .as_ref()
        .is_some_and(|images| images.iter().any(|i| i == uri));
    if is_image {
        return Ok(MediaRef {
            uri: uri.to_string(),
            kind: MediaKind::Image,
        });
    }
    let is_video = state.artifacts.video.as_ref().is_some_and(|job| {
        job.status == VideoStatus::Completed && job.url.as_deref() == Some(uri)
    });
    if is_video {
        return Ok(MediaRef {
            uri: uri.to_string(),
            kind: MediaKind::Video,
        });
    }
    Err(WorkflowError::validation(format!(
        "{uri} is neither a generated image nor the finished video"
    )))
}

struct Scrape;

#[async_trait]
impl StepExecutor for Scrape {
    fn step(&self) -> StepId {
        StepId::Scrape
    }

    fn validate(&self, _state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        match input {
            StepInput::Url(url) => normalize_url(url)
                .map(|_| ())
                .ok_or_else(|| WorkflowError::validation(format!("not a product URL: {url}"))),
            other => Err(wrong_input(self.step(), other)),
        }
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        _state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepInput::Url(raw) = input else {
            return Err(wrong_input(self.step(), input));
        };
        let url = normalize_url(raw)
            .ok_or_else(|| WorkflowError::validation(format!("not a product URL: {raw}")))?;

        let product = ctx
            .call(
                Collaborator::Scraper,
                ctx.collaborators.scraper.scrape_product(&url),
            )
            .await?;

        let summary = format!(
            "Scraped \"{}\". Say 'next' to analyze the product.",
            product.title
        );
        Ok(StepOutcome {
            patch: StatePatch::new()
                .with(FieldValue::Url(url))
                .with(FieldValue::ProductData(product)),
            summary,
        })
    }
}

struct Analyze;

#[async_trait]
impl StepExecutor for Analyze {
    fn step(&self) -> StepId {
        StepId::Analyze
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let product = require(&state.artifacts.product_data, self.step(), Field::ProductData)?;
        let request = AnalysisRequest {
            product,
            current: state.artifacts.analysis.as_ref(),
            history: state.feedback.get(FeedbackKind::Analysis),
            feedback: input.feedback(),
        };

        let analysis = ctx
            .call(
                Collaborator::Analyst,
                ctx.collaborators.analyst.analyze_product(request),
            )
            .await?;

        let summary = format!(
            "Analysis ready: {} for {}. Say 'next' to write scripts, or tell me what to change.",
            analysis.category, analysis.target_audience
        );
        Ok(StepOutcome {
            patch: StatePatch::new().with(FieldValue::Analysis(analysis)),
            summary,
        })
    }
}

struct GenerateScripts;

#[async_trait]
impl StepExecutor for GenerateScripts {
    fn step(&self) -> StepId {
        StepId::GenerateScripts
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let product = require(&state.artifacts.product_data, self.step(), Field::ProductData)?;
        let analysis = require(&state.artifacts.analysis, self.step(), Field::Analysis)?;
        let request = ScriptRequest {
            product,
            analysis,
            current: state.artifacts.scripts.as_deref(),
            history: state.feedback.get(FeedbackKind::Script),
            feedback: input.feedback(),
        };

        let scripts = ctx
            .call(
                Collaborator::ScriptWriter,
                ctx.collaborators.script_writer.generate_scripts(request),
            )
            .await?;
        if scripts.is_empty() {
            return Err(empty_response(Collaborator::ScriptWriter, "scripts"));
        }

        let summary = format!(
            "Generated {} scripts. Pick one with 'select script <n>'.",
            scripts.len()
        );
        Ok(StepOutcome {
            patch: StatePatch::new().with(FieldValue::Scripts(scripts)),
            summary,
        })
    }
}

struct SelectScript;

#[async_trait]
impl StepExecutor for SelectScript {
    fn step(&self) -> StepId {
        StepId::SelectScript
    }

    fn validate(&self, state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        let StepInput::ScriptIndex(index) = input else {
            return Err(wrong_input(self.step(), input));
        };
        let available = state.artifacts.scripts.as_ref().map_or(0, Vec::len);
        if *index >= available {
            return Err(WorkflowError::validation(format!(
                "script {} does not exist, there are {available}",
                index + 1
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        _ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        self.validate(state, input)?;
        let &StepInput::ScriptIndex(index) = input else {
            return Err(wrong_input(self.step(), input));
        };
        let scripts = require(&state.artifacts.scripts, self.step(), Field::Scripts)?;
        let script = scripts
            .get(index)
            .cloned()
            .ok_or_else(|| WorkflowError::validation(format!("script {} does not exist", index + 1)))?;

        Ok(StepOutcome {
            patch: StatePatch::new()
                .with(FieldValue::SelectedScriptIndex(index))
                .with(FieldValue::SelectedScript(script)),
            summary: format!(
                "Selected script {}. Tell me how to refine it, or say 'next'.",
                index + 1
            ),
        })
    }
}

struct RefineScript;

#[async_trait]
impl StepExecutor for RefineScript {
    fn step(&self) -> StepId {
        StepId::RefineScript
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let script = require(
            &state.artifacts.selected_script,
            self.step(),
            Field::SelectedScript,
        )?;
        let feedback = input.feedback().ok_or_else(|| wrong_input(self.step(), input))?;

        let refined = ctx
            .call(
                Collaborator::ScriptWriter,
                ctx.collaborators.script_writer.refine_script(script, feedback),
            )
            .await?;

        Ok(StepOutcome {
            patch: StatePatch::new().with(FieldValue::SelectedScript(refined)),
            summary: "Script revised. Keep refining, or say 'next' for visuals.".to_string(),
        })
    }
}

/// Generates or refines the image set. Both steps replace the whole batch.
struct Images {
    step: StepId,
}

#[async_trait]
impl StepExecutor for Images {
    fn step(&self) -> StepId {
        self.step
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let script = require(
            &state.artifacts.selected_script,
            self.step,
            Field::SelectedScript,
        )?;
        let request = ImageRequest {
            script,
            product: state.artifacts.product_data.as_ref(),
            analysis: state.artifacts.analysis.as_ref(),
            current_prompt: state.artifacts.image_prompt.as_deref(),
            feedback: input.feedback(),
        };

        let batch = ctx
            .call(
                Collaborator::ImageGenerator,
                ctx.collaborators.image_generator.generate_images(request),
            )
            .await?;
        if batch.images.is_empty() {
            return Err(empty_response(Collaborator::ImageGenerator, "images"));
        }

        let verb = if self.step == StepId::RefineImages {
            "Updated"
        } else {
            "Generated"
        };
        let summary = format!("{verb} {} images.", batch.images.len());
        Ok(StepOutcome {
            patch: StatePatch::new()
                .with(FieldValue::GeneratedImages(batch.images))
                .with(FieldValue::ImagePrompt(batch.prompt)),
            summary,
        })
    }
}

struct GenerateAudio;

#[async_trait]
impl StepExecutor for GenerateAudio {
    fn step(&self) -> StepId {
        StepId::GenerateAudio
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        _input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let script = require(
            &state.artifacts.selected_script,
            self.step(),
            Field::SelectedScript,
        )?;

        let audio = ctx
            .call(
                Collaborator::VoiceSynthesizer,
                ctx.collaborators.voice.synthesize_audio(script),
            )
            .await?;

        let summary = match audio.duration_secs {
            Some(secs) => format!("Voice-over ready ({secs:.0}s). Pick an avatar next."),
            None => "Voice-over ready. Pick an avatar next.".to_string(),
        };
        Ok(StepOutcome {
            patch: StatePatch::new().with(FieldValue::Audio(audio)),
            summary,
        })
    }
}

struct SelectAvatar;

#[async_trait]
impl StepExecutor for SelectAvatar {
    fn step(&self) -> StepId {
        StepId::SelectAvatar
    }

    fn validate(&self, _state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        match input {
            StepInput::AvatarId(id) if !id.trim().is_empty() => Ok(()),
            other => Err(wrong_input(self.step(), other)),
        }
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        _state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepInput::AvatarId(id) = input else {
            return Err(wrong_input(self.step(), input));
        };
        let id = id.trim();

        let avatars = ctx
            .call(
                Collaborator::AvatarRenderer,
                ctx.collaborators.avatar_renderer.list_avatars(),
            )
            .await?;
        let Some(avatar) = avatars.iter().find(|a| a.id == id) else {
            let known: Vec<_> = avatars.iter().map(|a| a.id.as_str()).collect();
            return Err(WorkflowError::validation(format!(
                "unknown avatar {id}, choose one of: {}",
                known.join(", ")
            )));
        };

        let summary = format!("Selected {} as presenter. Say 'generate video' next.", avatar.name);
        let selected = avatar.id.clone();
        Ok(StepOutcome {
            patch: StatePatch::new()
                .with(FieldValue::AvailableAvatars(avatars))
                .with(FieldValue::SelectedAvatarId(selected)),
            summary,
        })
    }
}

struct GenerateVideo;

#[async_trait]
impl StepExecutor for GenerateVideo {
    fn step(&self) -> StepId {
        StepId::GenerateVideo
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        _input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let audio = require(&state.artifacts.audio, self.step(), Field::Audio)?;
        let avatar_id = require(
            &state.artifacts.selected_avatar_id,
            self.step(),
            Field::SelectedAvatarId,
        )?;

        let job = ctx
            .call_within(
                Collaborator::AvatarRenderer,
                ctx.timeouts.video_render(),
                ctx.collaborators.avatar_renderer.render_video(audio, avatar_id),
            )
            .await?;

        let summary = match (&job.status, &job.url) {
            (VideoStatus::Completed, Some(url)) => format!("Video ready: {url}"),
            (VideoStatus::Failed, _) => format!("Video job {} failed at the renderer.", job.job_id),
            _ => format!(
                "Video rendering started (job {}). Poll for progress.",
                job.job_id
            ),
        };
        Ok(StepOutcome {
            patch: StatePatch::new().with(FieldValue::Video(job)),
            summary,
        })
    }
}

struct SelectAdAccount;

#[async_trait]
impl StepExecutor for SelectAdAccount {
    fn step(&self) -> StepId {
        StepId::SelectAdAccount
    }

    fn validate(&self, _state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        match input {
            StepInput::AdAccountId(id) if !id.trim().is_empty() => Ok(()),
            other => Err(wrong_input(self.step(), other)),
        }
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        _state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepInput::AdAccountId(id) = input else {
            return Err(wrong_input(self.step(), input));
        };
        let id = id.trim();

        let accounts = ctx
            .call(
                Collaborator::AdPlatform,
                ctx.collaborators.ad_platform.list_ad_accounts(),
            )
            .await?;
        let Some(account) = accounts.iter().find(|a| a.id == id) else {
            let known: Vec<_> = accounts.iter().map(|a| a.id.as_str()).collect();
            return Err(WorkflowError::validation(format!(
                "unknown ad account {id}, choose one of: {}",
                known.join(", ")
            )));
        };

        let summary = format!(
            "Using ad account {} ({}). Choose the creative with 'select media <uri>'.",
            account.name, account.id
        );
        let selected = account.id.clone();
        Ok(StepOutcome {
            patch: StatePatch::new()
                .with(FieldValue::AdAccounts(accounts))
                .with(FieldValue::SelectedAdAccountId(selected)),
            summary,
        })
    }
}

struct SelectMedia;

#[async_trait]
impl StepExecutor for SelectMedia {
    fn step(&self) -> StepId {
        StepId::SelectMedia
    }

    fn validate(&self, state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        match input {
            StepInput::MediaUri(uri) => resolve_media(state, uri).map(|_| ()),
            other => Err(wrong_input(self.step(), other)),
        }
    }

    async fn execute(
        &self,
        _ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepInput::MediaUri(uri) = input else {
            return Err(wrong_input(self.step(), input));
        };
        let media = resolve_media(state, uri)?;
        let kind = match media.kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        };

        Ok(StepOutcome {
            summary: format!("Using the {kind} as the ad creative. Say 'preview campaign' next."),
            patch: StatePatch::new().with(FieldValue::SelectedMedia(media)),
        })
    }
}

struct PreviewCampaign;

#[async_trait]
impl StepExecutor for PreviewCampaign {
    fn step(&self) -> StepId {
        StepId::PreviewCampaign
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let media = require(&state.artifacts.selected_media, self.step(), Field::SelectedMedia)?;
        let request = CampaignRequest {
            media,
            product: state.artifacts.product_data.as_ref(),
            analysis: state.artifacts.analysis.as_ref(),
            script: state.artifacts.selected_script.as_deref(),
            current: state.artifacts.campaign_config.as_ref(),
            feedback: input.feedback(),
        };

        let draft = ctx
            .call(
                Collaborator::CampaignPlanner,
                ctx.collaborators.campaign_planner.draft_campaign(request),
            )
            .await?;

        let summary = format!(
            "Campaign preview: {}. Say 'publish campaign' to go live, or tell me what to change.",
            draft.preview
        );
        Ok(StepOutcome {
            patch: StatePatch::new()
                .with(FieldValue::CampaignConfig(draft.config))
                .with(FieldValue::CampaignPreview(draft.preview)),
            summary,
        })
    }
}

struct PublishCampaign;

#[async_trait]
impl StepExecutor for PublishCampaign {
    fn step(&self) -> StepId {
        StepId::PublishCampaign
    }

    fn validate(&self, state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        crate::registry::check_feedback_input(self.step(), input)?;
        let missing = state
            .artifacts
            .missing(&[Field::SelectedAdAccountId, Field::SelectedMedia]);
        if !missing.is_empty() {
            return Err(WorkflowError::StepNotReady {
                step: self.step(),
                missing,
            });
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        _input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let config = require(&state.artifacts.campaign_config, self.step(), Field::CampaignConfig)?;
        let account_id = require(
            &state.artifacts.selected_ad_account_id,
            self.step(),
            Field::SelectedAdAccountId,
        )?;
        let request = PublishRequest {
            account_id,
            config,
            media: state.artifacts.selected_media.as_ref(),
        };

        let result = ctx
            .call(
                Collaborator::AdPlatform,
                ctx.collaborators.ad_platform.publish_campaign(request),
            )
            .await?;

        let summary = format!(
            "Published campaign {} with status {}.",
            result.campaign_id, result.status
        );
        Ok(StepOutcome {
            patch: StatePatch::new().with(FieldValue::PublishStatus(result)),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EngineConfig, StepRegistry};
    use adpipe_core::SessionId;
    use adpipe_integration::{Collaborators, ScriptWriter, VideoJob};
    use std::sync::Arc;

    fn registry() -> StepRegistry {
        StepRegistry::new(Collaborators::offline(), &EngineConfig::default())
    }

    async fn run(
        registry: &StepRegistry,
        state: &mut WorkflowState,
        step: StepId,
        input: StepInput,
    ) -> Result<StepOutcome, WorkflowError> {
        let executor = registry.executor(step)?;
        executor.validate(state, &input)?;
        let outcome = executor.execute(registry.context(), state, &input).await?;
        outcome.patch.clone().apply_to(&mut state.artifacts);
        Ok(outcome)
    }

    #[test]
    fn normalize_urls() {
        assert_eq!(
            normalize_url(" https://shop.example/widget "),
            Some("https://shop.example/widget".to_string())
        );
        assert_eq!(
            normalize_url("www.shop.example/widget"),
            Some("https://www.shop.example/widget".to_string())
        );
        assert_eq!(normalize_url("shop.example/widget"), None);
        assert_eq!(normalize_url("https://"), None);
        assert_eq!(normalize_url("https://shop.example/a b"), None);
    }

    #[tokio::test]
    async fn patches_stay_within_owned_fields() {
        let registry = registry();
        let mut state = WorkflowState::new(SessionId::new());
        let video_url = "offline://video/job-1.mp4".to_string();

        let inputs = [
            (StepId::Scrape, StepInput::Url("https://shop.example/widget".into())),
            (StepId::Analyze, StepInput::None),
            (StepId::GenerateScripts, StepInput::None),
            (StepId::SelectScript, StepInput::ScriptIndex(0)),
            (StepId::RefineScript, StepInput::Feedback("shorter".into())),
            (StepId::GenerateImages, StepInput::None),
            (StepId::RefineImages, StepInput::Feedback("brighter".into())),
            (StepId::GenerateAudio, StepInput::None),
            (StepId::SelectAvatar, StepInput::AvatarId("avatar-anna".into())),
            (StepId::GenerateVideo, StepInput::None),
            (StepId::SelectAdAccount, StepInput::AdAccountId("act_1001".into())),
        ];
        for (step, input) in inputs {
            let outcome = run(&registry, &mut state, step, input)
                .await
                .unwrap_or_else(|e| panic!("{step} failed: {e}"));
            for field in outcome.patch.fields() {
                assert!(step.writes().contains(&field), "{step} wrote {field}");
            }
            assert!(!outcome.summary.is_empty());
        }

        // finish the render so the video can be chosen
        state.artifacts.video = Some(VideoJob {
            job_id: "job-1".into(),
            status: VideoStatus::Completed,
            url: Some(video_url.clone()),
        });
        run(&registry, &mut state, StepId::SelectMedia, StepInput::MediaUri(video_url))
            .await
            .expect("select media");
        assert_eq!(
            state.artifacts.selected_media.as_ref().map(|m| m.kind),
            Some(MediaKind::Video)
        );
        run(&registry, &mut state, StepId::PreviewCampaign, StepInput::None)
            .await
            .expect("preview");
        run(&registry, &mut state, StepId::PublishCampaign, StepInput::None)
            .await
            .expect("publish");
        assert!(state.artifacts.publish_status.is_some());
    }

    #[tokio::test]
    async fn unknown_avatar_is_validation_error() {
        let registry = registry();
        let state = WorkflowState::new(SessionId::new());
        let executor = registry.executor(StepId::SelectAvatar).expect("executor");

        let err = executor
            .execute(
                registry.context(),
                &state,
                &StepInput::AvatarId("avatar-zed".into()),
            )
            .await
            .expect_err("unknown avatar");
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("avatar-anna"));
    }

    #[test]
    fn select_media_rejects_foreign_uri() {
        let registry = registry();
        let mut state = WorkflowState::new(SessionId::new());
        state.artifacts.generated_images = Some(vec!["offline://images/1-1.png".into()]);
        state.artifacts.video = Some(VideoJob {
            job_id: "job-1".into(),
            status: VideoStatus::Processing,
            url: None,
        });
        let executor = registry.executor(StepId::SelectMedia).expect("executor");

        assert!(
            executor
                .validate(&state, &StepInput::MediaUri("offline://images/1-1.png".into()))
                .is_ok()
        );
        assert!(
            executor
                .validate(&state, &StepInput::MediaUri("https://elsewhere.example/x.png".into()))
                .is_err()
        );
    }

    #[test]
    fn publish_needs_account_and_media() {
        let registry = registry();
        let state = WorkflowState::new(SessionId::new());
        let err = registry
            .executor(StepId::PublishCampaign)
            .expect("executor")
            .validate(&state, &StepInput::None)
            .expect_err("not ready");
        assert_eq!(
            err,
            WorkflowError::StepNotReady {
                step: StepId::PublishCampaign,
                missing: vec![Field::SelectedAdAccountId, Field::SelectedMedia],
            }
        );
    }

    struct SilentWriter;

    #[async_trait]
    impl ScriptWriter for SilentWriter {
        async fn generate_scripts(
            &self,
            _request: ScriptRequest<'_>,
        ) -> Result<Vec<String>, CollaboratorError> {
            Ok(Vec::new())
        }

        async fn refine_script(
            &self,
            script: &str,
            _feedback: &str,
        ) -> Result<String, CollaboratorError> {
            Ok(script.to_string())
        }
    }

    #[tokio::test]
    async fn empty_script_set_is_collaborator_failure() {
        let mut collaborators = Collaborators::offline();
        collaborators.script_writer = Arc::new(SilentWriter);
        let registry = StepRegistry::new(collaborators, &EngineConfig::default());

        let mut state = WorkflowState::new(SessionId::new());
        run(
            &registry,
            &mut state,
            StepId::Scrape,
            StepInput::Url("https://shop.example/widget".into()),
        )
        .await
        .expect("scrape");
        run(&registry, &mut state, StepId::Analyze, StepInput::None)
            .await
            .expect("analyze");

        let err = run(&registry, &mut state, StepId::GenerateScripts, StepInput::None)
            .await
            .expect_err("empty scripts");
        assert_eq!(err.kind(), "collaborator_failure");
        assert!(state.artifacts.scripts.is_none());
    }
}
