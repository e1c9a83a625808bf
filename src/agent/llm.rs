use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::CareerAgent;
use super::prompts::{
    AUGMENT_PROFILE_TEMPLATE, COVER_LETTER_SYSTEM, COVER_LETTER_TEMPLATE, EXTRACT_JOB_TEMPLATE,
    INTERPRET_COMMAND_TEMPLATE, JSON_SYSTEM, MUTATE_RESUME_TEMPLATE, SCORE_MATCH_TEMPLATE,
    SEARCH_JOBS_TEMPLATE, STRATEGY_TEMPLATE,
};
use crate::anthropic::{MessageSender, MessagesRequest};
use crate::error::CollaboratorError;
use crate::model::{
    CommandResult, CoverLetterStyle, DiscoveredJob, Job, MatchResult, MirroredPhrase,
    MutationReport, MutationTiming, ResumeJson, ResumeMutation, ResumeTrack, SearchPreferences,
    StrategyPlan, UserProfile,
};

/// Most search hits requested from the model per call.
const SEARCH_LIMIT: usize = 10;

/// [`CareerAgent`] backed by the Anthropic Messages API.
pub struct LlmCareerAgent<C> {
    client: C,
    model: String,
    max_tokens: u32,
    /// Prompt of the last request, kept for `--verbose` diagnostics.
    last_prompt: Mutex<Option<String>>,
}

impl<C: MessageSender> LlmCareerAgent<C> {
    pub fn new(client: C, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            last_prompt: Mutex::new(None),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    async fn ask_text(&self, system: &str, prompt: String) -> Result<String, CollaboratorError> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.clone());
        }
        let req = MessagesRequest::single_turn(&self.model, self.max_tokens, system, prompt);
        let response = self.client.send_message(&req).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(CollaboratorError::Malformed("model returned no text".into()));
        }
        Ok(text)
    }

    async fn ask_json<T: DeserializeOwned>(&self, prompt: String) -> Result<T, CollaboratorError> {
        let text = self.ask_text(JSON_SYSTEM, prompt).await?;
        parse_json(&text)
    }
}

fn to_prompt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, CollaboratorError> {
    serde_json::from_str(extract_json_body(text)).map_err(|e| {
        tracing::debug!(error = %e, "unparseable model output");
        CollaboratorError::Malformed(e.to_string())
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

/// The JSON value inside model output, tolerating fences and surrounding prose.
fn extract_json_body(text: &str) -> &str {
    let text = strip_json_fences(text);
    if text.starts_with('{') || text.starts_with('[') {
        return text;
    }
    match (text.find(['{', '[']), text.rfind(['}', ']'])) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    apply_url: String,
    #[serde(default)]
    platform: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload {
    #[serde(default)]
    track_id: Option<String>,
    resume: ResumeJson,
    report: ReportPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportPayload {
    #[serde(default)]
    injected_keywords: Vec<String>,
    #[serde(default)]
    mirrored_phrases: Vec<MirroredPhrase>,
    #[serde(default)]
    reordering_justification: String,
    ats_score_estimate: u8,
    #[serde(default)]
    iterations: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    jobs: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    platform: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    salary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AugmentPayload {
    #[serde(default)]
    track_id: Option<String>,
    resume: ResumeJson,
    #[serde(default)]
    target_roles: Vec<String>,
}

impl<C: MessageSender> CareerAgent for LlmCareerAgent<C> {
    async fn extract_job(&self, source_text: &str) -> Result<Job, CollaboratorError> {
        if source_text.trim().is_empty() {
            return Err(CollaboratorError::Rejected("posting text is empty".into()));
        }
        let prompt = EXTRACT_JOB_TEMPLATE.replace("{source_text}", source_text);
        let raw: ExtractedJob = self.ask_json(prompt).await?;

        if raw.title.trim().is_empty() || raw.company.trim().is_empty() {
            return Err(CollaboratorError::Malformed(
                "extracted job is missing title or company".into(),
            ));
        }

        Ok(Job {
            id: Uuid::new_v4().to_string(),
            title: raw.title,
            company: raw.company,
            location: raw.location,
            skills: raw.skills,
            description: raw.description,
            apply_url: raw.apply_url,
            platform: raw.platform,
            scraped_at: Utc::now(),
        })
    }

    async fn score_match(
        &self,
        job: &Job,
        profile: &UserProfile,
    ) -> Result<MatchResult, CollaboratorError> {
        let prompt = SCORE_MATCH_TEMPLATE
            .replace("{job_json}", &to_prompt_json(job))
            .replace("{profile_json}", &to_prompt_json(profile));
        let mut result: MatchResult = self.ask_json(prompt).await?;
        result.score = result.score.min(100);
        Ok(result)
    }

    async fn generate_cover_letter(
        &self,
        job: &Job,
        profile: &UserProfile,
        style: CoverLetterStyle,
    ) -> Result<String, CollaboratorError> {
        let resume = profile
            .primary_track()
            .map(|t| to_prompt_json(&t.content))
            .unwrap_or_default();
        let prompt = COVER_LETTER_TEMPLATE
            .replace("{style}", &style.to_string())
            .replace("{full_name}", &profile.full_name)
            .replace("{title}", &job.title)
            .replace("{company}", &job.company)
            .replace("{job_json}", &to_prompt_json(job))
            .replace("{resume_json}", &resume);
        let letter = self.ask_text(COVER_LETTER_SYSTEM, prompt).await?;
        Ok(letter.trim().to_string())
    }

    async fn mutate_resume(
        &self,
        job: &Job,
        profile: &UserProfile,
    ) -> Result<ResumeMutation, CollaboratorError> {
        if profile.resume_tracks.is_empty() {
            return Err(CollaboratorError::Rejected("profile has no resume tracks".into()));
        }

        let started = Instant::now();
        let prompt = MUTATE_RESUME_TEMPLATE
            .replace("{job_json}", &to_prompt_json(job))
            .replace("{tracks_json}", &to_prompt_json(&profile.resume_tracks));
        let text = self.ask_text(JSON_SYSTEM, prompt).await?;
        let analysis_ms = started.elapsed().as_millis() as u64;

        let payload: MutationPayload = parse_json(&text)?;
        let track = payload
            .track_id
            .as_deref()
            .and_then(|id| profile.track(id))
            .or_else(|| profile.primary_track())
            .ok_or_else(|| CollaboratorError::Rejected("profile has no resume tracks".into()))?;
        let total_ms = started.elapsed().as_millis() as u64;

        Ok(ResumeMutation {
            resume: payload.resume,
            report: MutationReport {
                selected_track_id: track.id.clone(),
                selected_track_name: track.name.clone(),
                injected_keywords: payload.report.injected_keywords,
                mirrored_phrases: payload.report.mirrored_phrases,
                reordering_justification: payload.report.reordering_justification,
                ats_score_estimate: payload.report.ats_score_estimate.min(100),
                iterations: payload.report.iterations.unwrap_or(1),
                timing: MutationTiming {
                    analysis_ms,
                    rewrite_ms: total_ms.saturating_sub(analysis_ms),
                    total_ms,
                },
            },
        })
    }

    async fn search_jobs(
        &self,
        preferences: &SearchPreferences,
    ) -> Result<Vec<DiscoveredJob>, CollaboratorError> {
        let prompt = SEARCH_JOBS_TEMPLATE
            .replace("{limit}", &SEARCH_LIMIT.to_string())
            .replace("{preferences_json}", &to_prompt_json(preferences));
        let payload: SearchPayload = self.ask_json(prompt).await?;

        let jobs: Vec<DiscoveredJob> = payload
            .jobs
            .into_iter()
            .filter(|hit| !hit.title.trim().is_empty() && !hit.url.trim().is_empty())
            .take(SEARCH_LIMIT)
            .map(|hit| DiscoveredJob {
                id: Uuid::new_v4().to_string(),
                title: hit.title,
                company: hit.company,
                location: hit.location,
                url: hit.url,
                platform: hit.platform,
                snippet: hit.snippet,
                salary: hit.salary,
            })
            .collect();
        Ok(jobs)
    }

    async fn interpret_command(&self, text: &str) -> Result<CommandResult, CollaboratorError> {
        let prompt = INTERPRET_COMMAND_TEMPLATE.replace("{text}", text);
        self.ask_json(prompt).await
    }

    async fn create_strategy_plan(
        &self,
        goal: &str,
        profile: &UserProfile,
    ) -> Result<StrategyPlan, CollaboratorError> {
        let prompt = STRATEGY_TEMPLATE
            .replace("{goal}", goal)
            .replace("{profile_json}", &to_prompt_json(profile));
        let mut plan: StrategyPlan = self.ask_json(prompt).await?;
        if plan.goal.trim().is_empty() {
            plan.goal = goal.to_string();
        }
        Ok(plan)
    }

    async fn augment_profile(
        &self,
        profile: &UserProfile,
        source_text: &str,
    ) -> Result<UserProfile, CollaboratorError> {
        let prompt = AUGMENT_PROFILE_TEMPLATE
            .replace("{tracks_json}", &to_prompt_json(&profile.resume_tracks))
            .replace("{source_text}", source_text);
        let payload: AugmentPayload = self.ask_json(prompt).await?;

        let mut updated = profile.clone();
        let target = payload
            .track_id
            .as_deref()
            .and_then(|id| updated.resume_tracks.iter().position(|t| t.id == id))
            .or_else(|| (!updated.resume_tracks.is_empty()).then_some(0));
        match target {
            Some(index) => updated.resume_tracks[index].content = payload.resume,
            None => updated.resume_tracks.push(ResumeTrack {
                id: "primary".into(),
                name: "Primary".into(),
                content: payload.resume,
            }),
        }
        for role in payload.target_roles {
            if !updated.preferences.target_roles.contains(&role) {
                updated.preferences.target_roles.push(role);
            }
        }
        Ok(updated)
    }
}
