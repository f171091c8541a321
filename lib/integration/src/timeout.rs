//! Per-collaborator call deadlines.

use crate::collaborator::Collaborator;
use crate::error::CollaboratorError;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// How long each collaborator may take before the call is abandoned.
///
/// Video rendering, scraping and publishing have their own budgets;
/// everything else, including the avatar catalogue and render polling,
/// shares `default_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CollaboratorTimeouts {
    #[serde(default = "default_secs")]
    pub default_secs: u64,
    #[serde(default = "default_scrape_secs")]
    pub scrape_secs: u64,
    #[serde(default = "default_video_secs")]
    pub video_secs: u64,
    #[serde(default = "default_secs")]
    pub publish_secs: u64,
}

fn default_secs() -> u64 {
    120
}

fn default_scrape_secs() -> u64 {
    60
}

fn default_video_secs() -> u64 {
    600
}

impl Default for CollaboratorTimeouts {
    fn default() -> Self {
        Self {
            default_secs: default_secs(),
            scrape_secs: default_scrape_secs(),
            video_secs: default_video_secs(),
            publish_secs: default_secs(),
        }
    }
}

impl CollaboratorTimeouts {
    /// Returns the deadline for calls to `collaborator`.
    #[must_use]
    pub fn for_collaborator(&self, collaborator: Collaborator) -> Duration {
        let secs = match collaborator {
            Collaborator::Scraper => self.scrape_secs,
            Collaborator::AdPlatform => self.publish_secs,
            _ => self.default_secs,
        };
        Duration::from_secs(secs)
    }

    /// Returns the deadline for submitting a video render.
    #[must_use]
    pub fn video_render(&self) -> Duration {
        Duration::from_secs(self.video_secs)
    }
}

/// Runs `fut`, failing with `CollaboratorError::Timeout` if it does not
/// finish within `limit`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(limit_secs = limit.as_secs(), "collaborator call timed out");
            Err(CollaboratorError::Timeout {
                after_secs: limit.as_secs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let timeouts = CollaboratorTimeouts::default();
        assert_eq!(
            timeouts.for_collaborator(Collaborator::Scraper),
            Duration::from_secs(60)
        );
        assert_eq!(
            timeouts.for_collaborator(Collaborator::AvatarRenderer),
            Duration::from_secs(120)
        );
        assert_eq!(timeouts.video_render(), Duration::from_secs(600));
        assert_eq!(
            timeouts.for_collaborator(Collaborator::ScriptWriter),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn partial_deserialize_fills_defaults() {
        let timeouts: CollaboratorTimeouts =
            serde_json::from_str(r#"{"video_secs": 30}"#).expect("parse");
        assert_eq!(timeouts.video_secs, 30);
        assert_eq!(timeouts.video_render(), Duration::from_secs(30));
        assert_eq!(
            timeouts.for_collaborator(Collaborator::AvatarRenderer),
            Duration::from_secs(120)
        );
        assert_eq!(timeouts.default_secs, 120);
        assert_eq!(timeouts.publish_secs, 120);
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, CollaboratorError>(7) })
            .await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(CollaboratorError::Timeout { after_secs: 0 }));
    }
}
