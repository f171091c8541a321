//! Navigation resolver.
//!
//! Turns a navigation request into a step id and checks that the step is
//! reachable. Requests are either an exact step id (`generate_scripts`),
//! a relative move (`back`, `next`), or free text matched against each
//! step's vocabulary (`go back to the analysis`).

use crate::error::WorkflowError;
use crate::state::WorkflowState;
use crate::step::StepId;

/// What a navigation request points at, before reachability is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    Step(StepId),
    Previous,
    Next,
}

const STOPWORDS: &[&str] = &["the", "a", "an", "my", "step", "stage", "please", "our"];

const PREVIOUS_PHRASES: &[&str] = &[
    "back",
    "go back",
    "previous",
    "go previous",
    "go to previous",
    "go back one",
];

const NEXT_PHRASES: &[&str] = &[
    "next",
    "go next",
    "go to next",
    "continue",
    "proceed",
    "move on",
    "looks good",
];

/// Words and phrases that name each step. Longer phrases win over shorter
/// ones, so `refine script` beats `script`.
const VOCABULARY: &[(StepId, &[&str])] = &[
    (
        StepId::Scrape,
        &["scrape", "scraping", "url", "link", "product page", "start", "beginning"],
    ),
    (
        StepId::Analyze,
        &["analyze", "analyse", "analysis", "product analysis", "target audience", "research"],
    ),
    (
        StepId::GenerateScripts,
        &["generate scripts", "scripts", "script generation", "write scripts", "script options"],
    ),
    (
        StepId::SelectScript,
        &["select script", "script selection", "choose script", "pick script"],
    ),
    (
        StepId::RefineScript,
        &["refine script", "script refinement", "edit script", "script"],
    ),
    (
        StepId::GenerateImages,
        &["generate images", "images", "image generation", "visuals", "pictures"],
    ),
    (
        StepId::RefineImages,
        &["refine images", "image refinement", "edit images", "refine visuals"],
    ),
    (
        StepId::GenerateAudio,
        &["generate audio", "audio", "voiceover", "voice over", "voice", "narration"],
    ),
    (
        StepId::SelectAvatar,
        &["select avatar", "avatar", "avatars", "presenter", "choose avatar"],
    ),
    (
        StepId::GenerateVideo,
        &["generate video", "video", "render video"],
    ),
    (
        StepId::SelectAdAccount,
        &["select ad account", "ad account", "ad accounts", "account", "accounts"],
    ),
    (
        StepId::SelectMedia,
        &["select media", "media", "creative"],
    ),
    (
        StepId::PreviewCampaign,
        &["preview campaign", "campaign preview", "preview", "campaign", "campaign settings"],
    ),
    (
        StepId::PublishCampaign,
        &["publish campaign", "publish", "launch"],
    ),
];

/// Lowercases, splits on anything that is not a letter or digit, and drops
/// filler words.
fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty()
        && haystack
            .windows(phrase.len())
            .any(|window| window == phrase)
}

/// Finds the step whose vocabulary best matches `text`.
///
/// The longest matching phrase wins; on a tie the earlier step wins.
#[must_use]
pub fn match_step(text: &str) -> Option<StepId> {
    let words = tokens(text);
    let mut best: Option<(usize, StepId)> = None;
    for (step, phrases) in VOCABULARY {
        for phrase in *phrases {
            let phrase_tokens = tokens(phrase);
            if !contains_phrase(&words, &phrase_tokens) {
                continue;
            }
            let score = phrase_tokens.len();
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, *step));
            }
        }
    }
    best.map(|(_, step)| step)
}

/// Parses a navigation request without looking at state.
#[must_use]
pub fn parse_target(text: &str) -> Option<NavigationTarget> {
    if let Ok(step) = text.parse::<StepId>() {
        return Some(NavigationTarget::Step(step));
    }
    let phrase = tokens(text).join(" ");
    if PREVIOUS_PHRASES.contains(&phrase.as_str()) {
        return Some(NavigationTarget::Previous);
    }
    if NEXT_PHRASES.contains(&phrase.as_str()) {
        return Some(NavigationTarget::Next);
    }
    match_step(text).map(NavigationTarget::Step)
}

/// Checks that `target` can be entered from `state`.
pub fn check_reachable(state: &WorkflowState, target: StepId) -> Result<StepId, WorkflowError> {
    let missing = state.missing_prerequisites(target);
    if missing.is_empty() {
        Ok(target)
    } else {
        Err(WorkflowError::PrerequisiteNotMet { target, missing })
    }
}

/// Resolves a navigation request against the current state.
///
/// Does not change the state; the caller moves `current_step`.
pub fn resolve(state: &WorkflowState, text: &str) -> Result<StepId, WorkflowError> {
    let target = parse_target(text).ok_or_else(|| WorkflowError::AmbiguousNavigation {
        text: text.to_string(),
    })?;
    let step = match target {
        NavigationTarget::Step(step) => step,
        NavigationTarget::Previous => state.current_step.previous().ok_or_else(|| {
            WorkflowError::validation(format!("{} is the first step", state.current_step))
        })?,
        NavigationTarget::Next => state.current_step.next().ok_or_else(|| {
            WorkflowError::validation(format!("{} is the last step", state.current_step))
        })?,
    };
    check_reachable(state, step)
}
