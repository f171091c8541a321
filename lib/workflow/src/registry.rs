//! Step registry: the executor behind each step.
//!
//! An executor checks its input against the state, then calls at most one
//! collaborator and returns a patch of the fields it owns. Executors never
//! touch `current_step`, feedback histories or iteration counts; the
//! orchestrator applies those around a successful patch.

use crate::error::WorkflowError;
use crate::executor;
use crate::state::{StatePatch, WorkflowState};
use crate::step::{FeedbackMode, StepId};
use adpipe_integration::{Collaborator, CollaboratorError, CollaboratorTimeouts, Collaborators};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Engine settings supplied by the embedding application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timeouts: CollaboratorTimeouts,
}

/// The input a step is run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    None,
    Feedback(String),
    Url(String),
    /// Zero-based index into `scripts`.
    ScriptIndex(usize),
    AvatarId(String),
    AdAccountId(String),
    MediaUri(String),
}

impl StepInput {
    /// Builds the input for a step that takes optional feedback.
    #[must_use]
    pub fn from_feedback(feedback: Option<String>) -> Self {
        match feedback {
            Some(text) if !text.trim().is_empty() => Self::Feedback(text),
            _ => Self::None,
        }
    }

    /// The feedback text, if this input carries one.
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        match self {
            Self::Feedback(text) => Some(text),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::None => "no input",
            Self::Feedback(_) => "feedback",
            Self::Url(_) => "a URL",
            Self::ScriptIndex(_) => "a script index",
            Self::AvatarId(_) => "an avatar id",
            Self::AdAccountId(_) => "an ad account id",
            Self::MediaUri(_) => "a media URI",
        }
    }
}

/// The result of a successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Fields to overwrite.
    pub patch: StatePatch,
    /// Agent message shown to the user.
    pub summary: String,
}

/// What executors get to call collaborators with.
#[derive(Clone)]
pub struct StepContext {
    pub collaborators: Collaborators,
    pub timeouts: CollaboratorTimeouts,
}

impl StepContext {
    /// Runs one collaborator call under that collaborator's deadline.
    ///
    /// Failures and timeouts come back as `CollaboratorFailure`.
    pub async fn call<T, F>(&self, collaborator: Collaborator, fut: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        self.call_within(collaborator, self.timeouts.for_collaborator(collaborator), fut)
            .await
    }

    /// Like [`StepContext::call`], with an explicit deadline.
    pub async fn call_within<T, F>(
        &self,
        collaborator: Collaborator,
        limit: Duration,
        fut: F,
    ) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        adpipe_integration::with_timeout(limit, fut)
            .await
            .map_err(|e| {
                tracing::warn!(%collaborator, error = %e, "collaborator call failed");
                WorkflowError::collaborator(collaborator, &e)
            })
    }
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

/// The executor for one step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// The step this executor runs.
    fn step(&self) -> StepId;

    /// Checks the input against the state before anything is recorded.
    ///
    /// The default accepts what the step's feedback mode allows.
    fn validate(&self, _state: &WorkflowState, input: &StepInput) -> Result<(), WorkflowError> {
        check_feedback_input(self.step(), input)
    }

    /// Produces the patch for this step.
    async fn execute(
        &self,
        ctx: &StepContext,
        state: &WorkflowState,
        input: &StepInput,
    ) -> Result<StepOutcome, WorkflowError>;
}

/// Accepts the inputs a step's feedback mode allows.
pub(crate) fn check_feedback_input(step: StepId, input: &StepInput) -> Result<(), WorkflowError> {
    match (step.feedback_mode(), input) {
        (FeedbackMode::Required, StepInput::Feedback(text)) if !text.trim().is_empty() => Ok(()),
        (FeedbackMode::Required, _) => Err(WorkflowError::validation(format!(
            "{step} needs feedback describing the change"
        ))),
        (FeedbackMode::Optional, StepInput::None) => Ok(()),
        (FeedbackMode::Optional, StepInput::Feedback(text)) if !text.trim().is_empty() => Ok(()),
        (FeedbackMode::None, StepInput::None) => Ok(()),
        (FeedbackMode::None, StepInput::Feedback(_)) => Err(WorkflowError::validation(format!(
            "{step} does not take feedback, use '{}'",
            step.command_hint()
        ))),
        (FeedbackMode::Optional, StepInput::Feedback(_)) => {
            Err(WorkflowError::validation("feedback is empty"))
        }
        (_, other) => Err(wrong_input(step, other)),
    }
}

pub(crate) fn wrong_input(step: StepId, input: &StepInput) -> WorkflowError {
    WorkflowError::validation(format!(
        "{step} cannot take {}, use '{}'",
        input.describe(),
        step.command_hint()
    ))
}

/// The ordered catalogue of steps and their executors.
pub struct StepRegistry {
    executors: BTreeMap<StepId, Box<dyn StepExecutor>>,
    context: StepContext,
}

impl StepRegistry {
    /// Creates a registry with the built-in executor for every step.
    #[must_use]
    pub fn new(collaborators: Collaborators, config: &EngineConfig) -> Self {
        let mut executors: BTreeMap<StepId, Box<dyn StepExecutor>> = BTreeMap::new();
        for executor in executor::builtin() {
            executors.insert(executor.step(), executor);
        }
        Self {
            executors,
            context: StepContext {
                collaborators,
                timeouts: config.timeouts,
            },
        }
    }

    /// Replaces the executor for its step.
    #[must_use]
    pub fn with_executor(mut self, executor: Box<dyn StepExecutor>) -> Self {
        self.executors.insert(executor.step(), executor);
        self
    }

    /// Returns the executor for `step`.
    pub fn executor(&self, step: StepId) -> Result<&dyn StepExecutor, WorkflowError> {
        self.executors
            .get(&step)
            .map(|executor| &**executor)
            .ok_or_else(|| WorkflowError::validation(format!("no executor for {step}")))
    }

    /// The context executors run with.
    #[must_use]
    pub fn context(&self) -> &StepContext {
        &self.context
    }

    /// Steps with an executor, in pipeline order.
    pub fn steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.executors.keys().copied()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.executors.keys().collect::<Vec<_>>())
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpipe_core::SessionId;

    #[test]
    fn every_step_has_an_executor() {
        let registry = StepRegistry::new(Collaborators::offline(), &EngineConfig::default());
        assert_eq!(registry.steps().collect::<Vec<_>>(), StepId::ALL.to_vec());
    }

    #[test]
    fn feedback_input_rules() {
        let feedback = StepInput::Feedback("shorter".to_string());
        assert!(check_feedback_input(StepId::RefineScript, &feedback).is_ok());
        assert!(check_feedback_input(StepId::RefineScript, &StepInput::None).is_err());
        assert!(check_feedback_input(StepId::Analyze, &StepInput::None).is_ok());
        assert!(check_feedback_input(StepId::Analyze, &feedback).is_ok());
        assert!(
            check_feedback_input(StepId::Analyze, &StepInput::Feedback("  ".to_string())).is_err()
        );

        let err = check_feedback_input(StepId::GenerateAudio, &feedback).expect_err("no feedback");
        assert!(err.to_string().contains("generate audio"));
    }

    #[test]
    fn from_feedback_drops_blank_text() {
        assert_eq!(StepInput::from_feedback(None), StepInput::None);
        assert_eq!(
            StepInput::from_feedback(Some("   ".to_string())),
            StepInput::None
        );
        assert_eq!(
            StepInput::from_feedback(Some("funnier".to_string())),
            StepInput::Feedback("funnier".to_string())
        );
    }

    #[tokio::test]
    async fn only_render_submission_gets_the_video_deadline() {
        let ctx = StepContext {
            collaborators: Collaborators::offline(),
            timeouts: CollaboratorTimeouts {
                default_secs: 0,
                ..CollaboratorTimeouts::default()
            },
        };
        let slow = || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, CollaboratorError>(())
        };

        let err = ctx
            .call(Collaborator::AvatarRenderer, slow())
            .await
            .expect_err("catalogue calls use the default deadline");
        assert_eq!(err.kind(), "collaborator_failure");

        ctx.call_within(Collaborator::AvatarRenderer, ctx.timeouts.video_render(), slow())
            .await
            .expect("render fits the video deadline");
    }

    #[test]
    fn select_script_rejects_out_of_range_index() {
        let registry = StepRegistry::new(Collaborators::offline(), &EngineConfig::default());
        let mut state = WorkflowState::new(SessionId::new());
        state.artifacts.scripts = Some(vec!["a".to_string(), "b".to_string()]);

        let executor = registry.executor(StepId::SelectScript).expect("executor");
        assert!(executor.validate(&state, &StepInput::ScriptIndex(1)).is_ok());
        let err = executor
            .validate(&state, &StepInput::ScriptIndex(2))
            .expect_err("out of range");
        assert_eq!(err.kind(), "validation");
    }
}
