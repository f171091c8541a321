//! Deterministic local collaborators.
//!
//! These stand in for the scraper, the generation models, the renderer and
//! the ad platform when no vendor adapter is configured. Output depends only
//! on the input and on per-instance call counters, which makes them usable
//! as test doubles as well as for running the server without credentials.

use crate::collaborator::{
    AdPlatform, AnalysisRequest, AvatarRenderer, CampaignPlanner, CampaignRequest, Collaborators,
    ImageGenerator, ImageRequest, ProductAnalyst, ProductScraper, PublishRequest, ScriptRequest,
    ScriptWriter, VoiceSynthesizer,
};
use crate::error::CollaboratorError;
use crate::types::{
    AdAccount, Analysis, AudioRef, Avatar, CampaignConfig, CampaignDraft, ImageBatch, MediaKind,
    ProductData, PublishResult, VideoJob, VideoStatus,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const SCRIPTS_PER_RUN: usize = 3;
const IMAGES_PER_RUN: usize = 2;
const DEFAULT_DAILY_BUDGET_CENTS: u64 = 2000;

/// Offline implementation of every collaborator trait.
#[derive(Debug, Default)]
pub struct OfflineCollaborators {
    script_runs: AtomicU64,
    image_runs: AtomicU64,
    audio_runs: AtomicU64,
    video_jobs: AtomicU64,
    publishes: AtomicU64,
}

impl OfflineCollaborators {
    /// Creates a fresh set with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn avatars() -> Vec<Avatar> {
        [
            ("avatar-anna", "Anna"),
            ("avatar-ben", "Ben"),
            ("avatar-chloe", "Chloe"),
        ]
        .into_iter()
        .map(|(id, name)| Avatar {
            id: id.to_string(),
            name: name.to_string(),
            preview_url: Some(format!("offline://avatars/{id}.png")),
        })
        .collect()
    }

    fn ad_accounts() -> Vec<AdAccount> {
        vec![
            AdAccount {
                id: "act_1001".to_string(),
                name: "Main Store".to_string(),
                currency: Some("USD".to_string()),
            },
            AdAccount {
                id: "act_2002".to_string(),
                name: "Outlet".to_string(),
                currency: Some("EUR".to_string()),
            },
        ]
    }
}

impl Collaborators {
    /// Wires every collaborator to one shared `OfflineCollaborators`.
    #[must_use]
    pub fn offline() -> Self {
        let offline = Arc::new(OfflineCollaborators::new());
        Self {
            scraper: offline.clone(),
            analyst: offline.clone(),
            script_writer: offline.clone(),
            image_generator: offline.clone(),
            voice: offline.clone(),
            avatar_renderer: offline.clone(),
            campaign_planner: offline.clone(),
            ad_platform: offline,
        }
    }
}

/// Turns the last path segment of a URL into a product title.
fn title_from_url(url: &str) -> String {
    let path = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains('.'))
        .unwrap_or("product");

    segment
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl ProductScraper for OfflineCollaborators {
    async fn scrape_product(&self, url: &str) -> Result<ProductData, CollaboratorError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CollaboratorError::Rejected {
                reason: format!("not an http(s) URL: {url}"),
            });
        }
        let title = title_from_url(url);
        tracing::debug!(url, title = %title, "offline scrape");

        Ok(ProductData {
            url: url.to_string(),
            description: format!("{title} for everyday use."),
            price: Some("$29.99".to_string()),
            image_urls: vec![format!("{}/image.jpg", url.trim_end_matches('/'))],
            raw_text: format!("{title}. Free shipping. 30-day returns."),
            title,
        })
    }
}

#[async_trait]
impl ProductAnalyst for OfflineCollaborators {
    async fn analyze_product(
        &self,
        request: AnalysisRequest<'_>,
    ) -> Result<Analysis, CollaboratorError> {
        let title = &request.product.title;
        let mut marketing_angles = vec![format!("{title} makes the day easier")];
        marketing_angles.extend(request.history.iter().map(|f| format!("Adjusted: {f}")));

        Ok(Analysis {
            category: "General".to_string(),
            features: vec![format!("{title} quality"), "Fast shipping".to_string()],
            target_audience: match request.feedback {
                Some(feedback) => format!("Shoppers ({feedback})"),
                None => "Online shoppers".to_string(),
            },
            usps: vec!["Free shipping".to_string(), "30-day returns".to_string()],
            marketing_angles,
            positioning: format!("{title} at a fair price"),
        })
    }
}

#[async_trait]
impl ScriptWriter for OfflineCollaborators {
    async fn generate_scripts(
        &self,
        request: ScriptRequest<'_>,
    ) -> Result<Vec<String>, CollaboratorError> {
        let run = self.script_runs.fetch_add(1, Ordering::Relaxed) + 1;
        let title = &request.product.title;
        let tone = request.feedback.unwrap_or("upbeat");

        Ok((1..=SCRIPTS_PER_RUN)
            .map(|n| {
                format!(
                    "[v{run}.{n}] Meet {title}. {} Tone: {tone}.",
                    request
                        .analysis
                        .usps
                        .first()
                        .map_or("Made for you.", String::as_str)
                )
            })
            .collect())
    }

    async fn refine_script(
        &self,
        script: &str,
        feedback: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(format!("{script} (revised: {feedback})"))
    }
}

#[async_trait]
impl ImageGenerator for OfflineCollaborators {
    async fn generate_images(
        &self,
        request: ImageRequest<'_>,
    ) -> Result<ImageBatch, CollaboratorError> {
        let run = self.image_runs.fetch_add(1, Ordering::Relaxed) + 1;
        let subject = request.product.map_or("the product", |p| p.title.as_str());
        let mut prompt = format!("Ad visual of {subject}: {}", request.script);
        if let Some(feedback) = request.feedback {
            prompt.push_str(&format!(" Style: {feedback}."));
        }

        Ok(ImageBatch {
            prompt,
            images: (1..=IMAGES_PER_RUN)
                .map(|n| format!("offline://images/{run}-{n}.png"))
                .collect(),
        })
    }
}

#[async_trait]
impl VoiceSynthesizer for OfflineCollaborators {
    async fn synthesize_audio(&self, script: &str) -> Result<AudioRef, CollaboratorError> {
        if script.trim().is_empty() {
            return Err(CollaboratorError::Rejected {
                reason: "empty script".to_string(),
            });
        }
        let run = self.audio_runs.fetch_add(1, Ordering::Relaxed) + 1;
        let words = script.split_whitespace().count();

        Ok(AudioRef {
            uri: format!("offline://audio/{run}.mp3"),
            // roughly 2.5 words per second of speech
            duration_secs: Some(words as f32 / 2.5),
        })
    }
}

#[async_trait]
impl AvatarRenderer for OfflineCollaborators {
    async fn list_avatars(&self) -> Result<Vec<Avatar>, CollaboratorError> {
        Ok(Self::avatars())
    }

    async fn render_video(
        &self,
        _audio: &AudioRef,
        avatar_id: &str,
    ) -> Result<VideoJob, CollaboratorError> {
        if !Self::avatars().iter().any(|a| a.id == avatar_id) {
            return Err(CollaboratorError::Rejected {
                reason: format!("unknown avatar: {avatar_id}"),
            });
        }
        let job = self.video_jobs.fetch_add(1, Ordering::Relaxed) + 1;

        Ok(VideoJob {
            job_id: format!("job-{job}"),
            status: VideoStatus::Processing,
            url: None,
        })
    }

    async fn video_status(&self, job_id: &str) -> Result<VideoJob, CollaboratorError> {
        if !job_id.starts_with("job-") {
            return Err(CollaboratorError::Rejected {
                reason: format!("unknown job: {job_id}"),
            });
        }

        Ok(VideoJob {
            job_id: job_id.to_string(),
            status: VideoStatus::Completed,
            url: Some(format!("offline://video/{job_id}.mp4")),
        })
    }
}

#[async_trait]
impl CampaignPlanner for OfflineCollaborators {
    async fn draft_campaign(
        &self,
        request: CampaignRequest<'_>,
    ) -> Result<CampaignDraft, CollaboratorError> {
        let title = request.product.map_or("Product", |p| p.title.as_str());
        let link = request.product.map_or_else(String::new, |p| p.url.clone());
        let objective = match request.media.kind {
            MediaKind::Video => "VIDEO_VIEWS",
            MediaKind::Image => "OUTCOME_TRAFFIC",
        };
        let mut config = match request.current {
            Some(current) => current.clone(),
            None => CampaignConfig {
                name: format!("{title} campaign"),
                objective: objective.to_string(),
                daily_budget_cents: DEFAULT_DAILY_BUDGET_CENTS,
                countries: vec!["US".to_string()],
                age_min: 18,
                age_max: 65,
                headline: title.to_string(),
                primary_text: request.script.unwrap_or(title).to_string(),
                call_to_action: "SHOP_NOW".to_string(),
                link,
                extra: serde_json::Value::Null,
            },
        };
        config.objective = objective.to_string();
        if let Some(feedback) = request.feedback {
            config.primary_text = format!("{} ({feedback})", config.primary_text);
        }

        let preview = format!(
            "{}: {} per day, {} targeting {} aged {}-{}, creative {}",
            config.name,
            format_cents(config.daily_budget_cents),
            config.objective,
            config.countries.join(", "),
            config.age_min,
            config.age_max,
            request.media.uri,
        );
        Ok(CampaignDraft { config, preview })
    }
}

fn format_cents(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

#[async_trait]
impl AdPlatform for OfflineCollaborators {
    async fn list_ad_accounts(&self) -> Result<Vec<AdAccount>, CollaboratorError> {
        Ok(Self::ad_accounts())
    }

    async fn publish_campaign(
        &self,
        request: PublishRequest<'_>,
    ) -> Result<PublishResult, CollaboratorError> {
        if !Self::ad_accounts().iter().any(|a| a.id == request.account_id) {
            return Err(CollaboratorError::Rejected {
                reason: format!("unknown ad account: {}", request.account_id),
            });
        }
        if request.media.is_none() {
            return Err(CollaboratorError::Rejected {
                reason: "campaign has no creative".to_string(),
            });
        }
        let n = self.publishes.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(account_id = request.account_id, campaign = %request.config.name, "offline publish");

        Ok(PublishResult {
            campaign_id: format!("cmp-{n}"),
            adset_id: format!("adset-{n}"),
            ad_id: format!("ad-{n}"),
            status: "PAUSED".to_string(),
            manager_url: Some(format!(
                "offline://ads-manager/{}/campaigns/cmp-{n}",
                request.account_id
            )),
        })
    }
}
