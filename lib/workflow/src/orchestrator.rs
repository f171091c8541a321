//! Workflow orchestrator.
//!
//! The façade callers talk to. Every mutating operation:
//! 1. Takes the session's lock, or fails with `SessionBusy`
//! 2. Loads the state snapshot
//! 3. Routes the request to the navigation resolver or a step executor
//! 4. Applies the resulting patch to a working copy
//! 5. Persists the working copy in one `put`
//!
//! Readers never take the lock, so `get_state` during an in-flight step
//! returns the snapshot from before the step.

use crate::error::WorkflowError;
use crate::executor::normalize_url;
use crate::intent::{Command, Intent, IntentRouter};
use crate::navigation;
use crate::registry::{EngineConfig, StepInput, StepRegistry};
use crate::state::WorkflowState;
use crate::step::StepId;
use crate::store::SessionStore;
use adpipe_core::{Result, SessionId};
use adpipe_integration::{Avatar, Collaborator, Collaborators, VideoStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// One lock per session id with an operation in flight.
///
/// Entries live only as long as some guard or acquirer holds them.
#[derive(Debug, Default)]
struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    /// Takes the session's lock without waiting.
    fn try_acquire(
        &self,
        session_id: SessionId,
    ) -> std::result::Result<SessionGuard<'_>, WorkflowError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(session_id).or_default().clone()
        };
        match lock.try_lock_owned() {
            Ok(guard) => Ok(SessionGuard {
                locks: self,
                session_id,
                guard: Some(guard),
            }),
            Err(_) => {
                self.release(session_id);
                Err(WorkflowError::SessionBusy { session_id })
            }
        }
    }

    /// Drops the entry for `session_id` if nobody else holds it.
    ///
    /// Clones are only taken under the map lock, so a count of one here
    /// means no acquirer can be racing for this entry.
    fn release(&self, session_id: SessionId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&session_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Holds a session's lock; prunes the lock entry on drop.
struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.session_id);
    }
}

/// Coordinates step execution, navigation and chat for all sessions.
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    registry: StepRegistry,
    router: IntentRouter,
    locks: SessionLocks,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the built-in step executors.
    pub fn new(
        store: Arc<dyn SessionStore>,
        collaborators: Collaborators,
        config: &EngineConfig,
    ) -> Self {
        Self::with_registry(store, StepRegistry::new(collaborators, config))
    }

    /// Creates an orchestrator with a custom registry.
    pub fn with_registry(store: Arc<dyn SessionStore>, registry: StepRegistry) -> Self {
        Self {
            store,
            registry,
            router: IntentRouter::new(),
            locks: SessionLocks::default(),
        }
    }

    /// Creates a new session. A random id is used if none is given.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<WorkflowState, WorkflowError> {
        let session_id = session_id.unwrap_or_default();
        let _guard = self.locks.try_acquire(session_id)?;
        let state = self
            .store
            .create(session_id)
            .await
            .map_err(WorkflowError::from)?;
        info!(%session_id, "session created");
        Ok(state)
    }

    /// Returns the current snapshot of a session.
    pub async fn get_state(&self, session_id: SessionId) -> Result<WorkflowState, WorkflowError> {
        Ok(self.load(session_id).await?)
    }

    /// Scrapes `url`, creating the session if it does not exist yet.
    #[instrument(skip(self))]
    pub async fn scrape(
        &self,
        session_id: Option<SessionId>,
        url: &str,
    ) -> Result<WorkflowState, WorkflowError> {
        let session_id = session_id.unwrap_or_default();
        let _guard = self.locks.try_acquire(session_id)?;
        let state = self.load_or_new(session_id).await?;
        Ok(self
            .execute(state, StepId::Scrape, StepInput::Url(url.to_string()), None)
            .await?)
    }

    /// Runs one step on an existing session.
    #[instrument(skip(self, input))]
    pub async fn run_step(
        &self,
        session_id: SessionId,
        step: StepId,
        input: StepInput,
    ) -> Result<WorkflowState, WorkflowError> {
        let _guard = self.locks.try_acquire(session_id)?;
        let state = self.load(session_id).await?;
        Ok(self.execute(state, step, input, None).await?)
    }

    /// Moves `current_step` according to a navigation request.
    #[instrument(skip(self))]
    pub async fn navigate(
        &self,
        session_id: SessionId,
        intent: &str,
    ) -> Result<WorkflowState, WorkflowError> {
        let _guard = self.locks.try_acquire(session_id)?;
        let state = self.load(session_id).await?;
        Ok(self.navigate_locked(state, intent, None).await?)
    }

    /// Handles one free-form chat message.
    ///
    /// Without a session id, or with an unknown one, a session is created.
    /// A URL as the first message is scraped right away.
    #[instrument(skip(self, message))]
    pub async fn chat(
        &self,
        session_id: Option<SessionId>,
        message: &str,
    ) -> Result<WorkflowState, WorkflowError> {
        let session_id = session_id.unwrap_or_default();
        let _guard = self.locks.try_acquire(session_id)?;

        let Some(mut state) = self.store.get(session_id).await.map_err(WorkflowError::from)?
        else {
            let state = WorkflowState::new(session_id);
            return match self.router.classify(message, None) {
                Intent::Command(Command::Scrape { url }) => Ok(self
                    .execute(state, StepId::Scrape, StepInput::Url(url), Some(message))
                    .await?),
                _ => {
                    let mut state = state;
                    state.push_user_message(message);
                    state.push_agent_message("Send me a product page URL to get started.");
                    self.persist(&state).await?;
                    Ok(state)
                }
            };
        };

        let intent = self.router.classify(message, Some(&state));
        debug!(%session_id, ?intent, "classified chat message");

        let result = match intent {
            Intent::Navigate(text) => self.navigate_locked(state, &text, Some(message)).await,
            Intent::Command(Command::Scrape { url })
                if state.artifacts.product_data.is_some()
                    && state.current_step != StepId::Scrape =>
            {
                let url = normalize_url(&url)
                    .ok_or_else(|| WorkflowError::validation(format!("not a product URL: {url}")))?;
                state.push_user_message(message);
                state.push_agent_message(format!(
                    "This will restart with {url} and discard the scripts, images, audio and \
                     video made so far. Reply 'yes' to restart or 'no' to keep going."
                ));
                state.pending_url = Some(url);
                state.touch();
                self.persist(&state).await?;
                Ok(state)
            }
            Intent::Command(command) => {
                let input = command.input().ok_or_else(|| {
                    WorkflowError::validation("script numbers start at 1")
                })?;
                self.execute(state, command.step(), input, Some(message))
                    .await
            }
            Intent::Feedback(text) => {
                let step = feedback_target(state.current_step);
                self.execute(state, step, StepInput::Feedback(text), Some(message))
                    .await
            }
            Intent::ConfirmRestart => {
                let url = state.pending_url.clone().unwrap_or_default();
                self.execute(state, StepId::Scrape, StepInput::Url(url), Some(message))
                    .await
            }
            Intent::CancelRestart => {
                state.pending_url = None;
                state.push_user_message(message);
                state.push_agent_message(format!(
                    "Keeping the current product. We're still at {}.",
                    state.current_step
                ));
                state.touch();
                self.persist(&state).await?;
                Ok(state)
            }
        };
        Ok(result?)
    }

    /// Lists the avatars the renderer offers.
    #[instrument(skip(self))]
    pub async fn list_avatars(&self, session_id: SessionId) -> Result<Vec<Avatar>, WorkflowError> {
        self.load(session_id).await?;
        let ctx = self.registry.context();
        Ok(ctx
            .call(
                Collaborator::AvatarRenderer,
                ctx.collaborators.avatar_renderer.list_avatars(),
            )
            .await?)
    }

    /// Refreshes the status of the session's video job.
    ///
    /// Leaves `current_step` and the iteration counts alone.
    #[instrument(skip(self))]
    pub async fn poll_video(&self, session_id: SessionId) -> Result<WorkflowState, WorkflowError> {
        let _guard = self.locks.try_acquire(session_id)?;
        let mut state = self.load(session_id).await?;

        let Some(job) = state.artifacts.video.clone() else {
            return Err(WorkflowError::validation(
                "there is no video job yet, run generate_video first",
            )
            .into());
        };
        if job.status.is_terminal() {
            return Ok(state);
        }
        let previous = job.status;

        let ctx = self.registry.context();
        let polled = ctx
            .call(
                Collaborator::AvatarRenderer,
                ctx.collaborators.avatar_renderer.video_status(&job.job_id),
            )
            .await;
        let polled = match polled {
            Ok(job) => job,
            Err(err) => {
                state.error = Some(err.to_string());
                state.touch();
                self.persist(&state).await?;
                return Err(err.into());
            }
        };

        if polled.status != previous {
            let message = match (polled.status, polled.url.as_deref()) {
                (VideoStatus::Completed, Some(url)) => format!("Video ready: {url}"),
                (VideoStatus::Failed, _) => format!("Video job {} failed.", polled.job_id),
                _ => format!("Video job {} is {:?}.", polled.job_id, polled.status),
            };
            info!(%session_id, job_id = %polled.job_id, status = ?polled.status, "video status changed");
            state.push_agent_message(message);
        }
        state.artifacts.video = Some(polled);
        state.touch();
        self.persist(&state).await?;
        Ok(state)
    }

    async fn load(&self, session_id: SessionId) -> std::result::Result<WorkflowState, WorkflowError> {
        self.store
            .get(session_id)
            .await?
            .ok_or(WorkflowError::NotFound { session_id })
    }

    async fn load_or_new(
        &self,
        session_id: SessionId,
    ) -> std::result::Result<WorkflowState, WorkflowError> {
        Ok(self
            .store
            .get(session_id)
            .await?
            .unwrap_or_else(|| WorkflowState::new(session_id)))
    }

    async fn persist(&self, state: &WorkflowState) -> std::result::Result<(), WorkflowError> {
        self.store
            .put(state.session_id, state.clone())
            .await
            .map_err(WorkflowError::from)
    }

    async fn navigate_locked(
        &self,
        mut state: WorkflowState,
        intent: &str,
        user_message: Option<&str>,
    ) -> std::result::Result<WorkflowState, WorkflowError> {
        state.navigation_intent = Some(intent.to_string());
        let target = navigation::resolve(&state, intent)?;
        let from = state.current_step;

        state.current_step = target;
        state.navigation_intent = None;
        state.pending_url = None;
        if let Some(message) = user_message {
            state.push_user_message(message);
        }
        state.push_agent_message(format!("Now at {target}. {}", entry_hint(&state, target)));
        state.touch();
        self.persist(&state).await?;

        info!(session_id = %state.session_id, %from, to = %target, "navigated");
        Ok(state)
    }

    /// Runs `step` on a working copy of `state` and persists the outcome.
    ///
    /// Prerequisite and input errors return before anything is recorded.
    /// Feedback and the user message are recorded before the collaborator
    /// is called, so they survive a collaborator failure.
    async fn execute(
        &self,
        mut state: WorkflowState,
        step: StepId,
        input: StepInput,
        user_message: Option<&str>,
    ) -> std::result::Result<WorkflowState, WorkflowError> {
        let missing = state.missing_prerequisites(step);
        if !missing.is_empty() {
            return Err(WorkflowError::StepNotReady { step, missing });
        }
        let executor = self.registry.executor(step)?;
        executor.validate(&state, &input)?;

        // any other step abandons an unanswered restart prompt
        if step != StepId::Scrape {
            state.pending_url = None;
        }
        if let Some(message) = user_message {
            state.push_user_message(message);
        }
        if let (Some(kind), Some(feedback)) = (step.feedback_history(), input.feedback()) {
            state.feedback.push(kind, feedback);
        }

        let session_id = state.session_id;
        match executor.execute(self.registry.context(), &state, &input).await {
            Ok(outcome) => {
                if step.regenerates() {
                    let cleared = state.invalidate_downstream(step);
                    if !cleared.is_empty() {
                        info!(%session_id, %step, ?cleared, "invalidated downstream fields");
                    }
                }
                outcome.patch.apply_to(&mut state.artifacts);
                state.current_step = step;
                state.record_iteration(step);
                state.error = None;
                state.navigation_intent = None;
                if step == StepId::Scrape {
                    state.pending_url = None;
                }
                state.push_agent_message(outcome.summary);
                state.touch();
                self.persist(&state).await?;

                info!(%session_id, %step, iteration = state.iterations(step), "step completed");
                Ok(state)
            }
            Err(err @ WorkflowError::CollaboratorFailure { .. }) => {
                warn!(%session_id, %step, error = %err, "step failed");
                state.error = Some(err.to_string());
                state.push_agent_message(format!("{step} failed: {err}. You can retry."));
                state.touch();
                self.persist(&state).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// The step that free-text feedback is meant for while at `current`.
///
/// Feedback on the script selection refines the selected script.
fn feedback_target(current: StepId) -> StepId {
    match current {
        StepId::SelectScript => StepId::RefineScript,
        other => other,
    }
}

/// What to tell the user on entering `step`.
fn entry_hint(state: &WorkflowState, step: StepId) -> String {
    let done = state.iterations(step) > 0;
    match (step, done) {
        (StepId::SelectScript, _) => {
            let count = state.artifacts.scripts.as_ref().map_or(0, Vec::len);
            format!("Pick one of the {count} scripts with 'select script <n>'.")
        }
        (_, true) if step.feedback_history().is_some() => {
            "Your previous work is kept. Send feedback to revise it.".to_string()
        }
        (_, true) => format!("Your previous work is kept. Use '{}' to redo it.", step.command_hint()),
        (_, false) => format!("Use '{}' to run it.", step.command_hint()),
    }
}
