//! Intent router.
//!
//! Classifies one chat message as navigation, a structured command, or
//! feedback for the current step. Patterns are tried in a fixed order:
//! navigation first, then commands, and whatever is left is feedback.
//! Within a group the first registered pattern wins.

use crate::registry::StepInput;
use crate::state::WorkflowState;
use crate::step::StepId;
use regex::{Captures, Regex};

/// What a chat message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Move to another step. Carries the text for the navigation resolver.
    Navigate(String),
    /// Run a step with parsed arguments.
    Command(Command),
    /// Re-run the current step with this feedback.
    Feedback(String),
    /// Accept the pending restart with a new URL.
    ConfirmRestart,
    /// Drop the pending restart.
    CancelRestart,
}

/// A recognized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scrape { url: String },
    /// One-based, as typed.
    SelectScript { number: usize },
    SelectAvatar { id: String },
    SelectAdAccount { id: String },
    SelectMedia { uri: String },
    Run { step: StepId },
}

impl Command {
    /// The step this command runs.
    #[must_use]
    pub fn step(&self) -> StepId {
        match self {
            Self::Scrape { .. } => StepId::Scrape,
            Self::SelectScript { .. } => StepId::SelectScript,
            Self::SelectAvatar { .. } => StepId::SelectAvatar,
            Self::SelectAdAccount { .. } => StepId::SelectAdAccount,
            Self::SelectMedia { .. } => StepId::SelectMedia,
            Self::Run { step } => *step,
        }
    }

    /// The input the step runs with. `None` for script number 0.
    #[must_use]
    pub fn input(&self) -> Option<StepInput> {
        Some(match self {
            Self::Scrape { url } => StepInput::Url(url.clone()),
            Self::SelectScript { number } => StepInput::ScriptIndex(number.checked_sub(1)?),
            Self::SelectAvatar { id } => StepInput::AvatarId(id.clone()),
            Self::SelectAdAccount { id } => StepInput::AdAccountId(id.clone()),
            Self::SelectMedia { uri } => StepInput::MediaUri(uri.clone()),
            Self::Run { .. } => StepInput::None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    NavigateTo,
    NavigateRelative,
    Scrape,
    SelectScript,
    SelectAvatar,
    SelectAdAccount,
    SelectMedia,
    RunFixed(StepId),
    RunNamed,
}

const NAVIGATION_PATTERNS: &[(&str, Rule)] = &[
    (
        r"(?i)^\s*(?:please\s+)?(?:go\s+back\s+to|go\s+to|back\s+to|navigate\s+to|jump\s+to|return\s+to|switch\s+to|take\s+me\s+to)\s+(?P<target>.+?)\s*[.!]*$",
        Rule::NavigateTo,
    ),
    (
        r"(?i)^\s*(?:go\s+back|back|previous(?:\s+step)?|next(?:\s+step)?|continue|looks\s+good)\s*[.!]*$",
        Rule::NavigateRelative,
    ),
];

const COMMAND_PATTERNS: &[(&str, Rule)] = &[
    (
        r"(?i)^\s*(?:scrape\s+)?(?P<url>(?:https?://|www\.)\S+)\s*$",
        Rule::Scrape,
    ),
    (
        r"(?i)^\s*(?:select|choose|pick|use)\s+script\s+(?:#\s*|number\s+)?(?P<n>\d+)\s*$",
        Rule::SelectScript,
    ),
    (
        r"(?i)^\s*(?:choose|option|pick)\s+(?:#\s*)?(?P<n>\d+)\s*$",
        Rule::SelectScript,
    ),
    (
        r"(?i)^\s*(?:select|choose|use)\s+avatar\s+(?P<id>\S+)\s*$",
        Rule::SelectAvatar,
    ),
    (
        r"(?i)^\s*(?:select|choose|use)\s+(?:ad\s+)?account\s+(?P<id>\S+)\s*$",
        Rule::SelectAdAccount,
    ),
    (
        r"(?i)^\s*(?:select|choose|use)\s+media\s+(?P<uri>\S+)\s*$",
        Rule::SelectMedia,
    ),
    (
        r"(?i)^\s*preview(?:\s+(?:the\s+)?campaign)?\s*[.!]*$",
        Rule::RunFixed(StepId::PreviewCampaign),
    ),
    (
        r"(?i)^\s*publish(?:\s+(?:the\s+)?campaign)?\s*[.!]*$",
        Rule::RunFixed(StepId::PublishCampaign),
    ),
    (
        r"(?i)^\s*(?:generate|create|make)\s+(?:the\s+)?(?:audio|voice\s*-?\s*over)\s*[.!]*$",
        Rule::RunFixed(StepId::GenerateAudio),
    ),
    (
        r"(?i)^\s*(?:generate|create|make|render)\s+(?:the\s+)?video\s*[.!]*$",
        Rule::RunFixed(StepId::GenerateVideo),
    ),
    (r"(?i)^\s*run\s+(?P<step>[a-z_ -]+?)\s*$", Rule::RunNamed),
];

const CONFIRM_WORDS: &[&str] = &["yes", "confirm", "restart"];
const CANCEL_WORDS: &[&str] = &["no", "n", "cancel", "keep", "keep going", "nevermind"];

/// Ordered pattern matcher for chat messages.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    navigation: Vec<(Regex, Rule)>,
    commands: Vec<(Regex, Rule)>,
}

fn compile(patterns: &[(&str, Rule)]) -> Vec<(Regex, Rule)> {
    patterns
        .iter()
        .filter_map(|(pattern, rule)| match Regex::new(pattern) {
            Ok(regex) => Some((regex, *rule)),
            Err(e) => {
                tracing::error!(pattern, error = %e, "invalid intent pattern");
                None
            }
        })
        .collect()
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentRouter {
    /// Compiles the built-in patterns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            navigation: compile(NAVIGATION_PATTERNS),
            commands: compile(COMMAND_PATTERNS),
        }
    }

    /// Classifies `message` given the session's state, if it has one.
    #[must_use]
    pub fn classify(&self, message: &str, state: Option<&WorkflowState>) -> Intent {
        let trimmed = message.trim();

        if state.is_some_and(|s| s.pending_url.is_some()) {
            let answer = trimmed
                .trim_end_matches(['.', '!'])
                .to_lowercase();
            if CONFIRM_WORDS.contains(&answer.as_str()) {
                return Intent::ConfirmRestart;
            }
            if CANCEL_WORDS.contains(&answer.as_str()) {
                return Intent::CancelRestart;
            }
        }

        for (regex, rule) in self.navigation.iter().chain(&self.commands) {
            let intent = regex
                .captures(trimmed)
                .and_then(|caps| build(*rule, &caps, trimmed));
            if let Some(intent) = intent {
                return intent;
            }
        }

        Intent::Feedback(trimmed.to_string())
    }
}

fn capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

fn build(rule: Rule, caps: &Captures<'_>, message: &str) -> Option<Intent> {
    let command = match rule {
        Rule::NavigateTo => return capture(caps, "target").map(Intent::Navigate),
        Rule::NavigateRelative => return Some(Intent::Navigate(message.to_string())),
        Rule::Scrape => Command::Scrape {
            url: capture(caps, "url")?,
        },
        Rule::SelectScript => Command::SelectScript {
            number: capture(caps, "n")?.parse().ok()?,
        },
        Rule::SelectAvatar => Command::SelectAvatar {
            id: capture(caps, "id")?,
        },
        Rule::SelectAdAccount => Command::SelectAdAccount {
            id: capture(caps, "id")?,
        },
        Rule::SelectMedia => Command::SelectMedia {
            uri: capture(caps, "uri")?,
        },
        Rule::RunFixed(step) => Command::Run { step },
        Rule::RunNamed => Command::Run {
            step: capture(caps, "step")?.parse().ok()?,
        },
    };
    Some(Intent::Command(command))
}
