use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::Job;
use super::profile::{ResumeJson, UserProfile};
use crate::error::PreconditionError;
use crate::state_machine::ApplicationStatus;

/// ATS estimate reported when the mutation collaborator's output could not be parsed.
pub const FALLBACK_ATS_SCORE: u8 = 50;

/// Output of the match-scoring collaborator. Score is clamped to 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub score: u8,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverLetterStyle {
    #[default]
    Professional,
    Enthusiastic,
    Concise,
    Technical,
    Storytelling,
}

impl fmt::Display for CoverLetterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoverLetterStyle::Professional => "professional",
            CoverLetterStyle::Enthusiastic => "enthusiastic",
            CoverLetterStyle::Concise => "concise",
            CoverLetterStyle::Technical => "technical",
            CoverLetterStyle::Storytelling => "storytelling",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredPhrase {
    pub original: String,
    pub mirrored: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationTiming {
    pub analysis_ms: u64,
    pub rewrite_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationReport {
    pub selected_track_id: String,
    pub selected_track_name: String,
    #[serde(default)]
    pub injected_keywords: Vec<String>,
    #[serde(default)]
    pub mirrored_phrases: Vec<MirroredPhrase>,
    #[serde(default)]
    pub reordering_justification: String,
    pub ats_score_estimate: u8,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default)]
    pub timing: MutationTiming,
}

/// A tailored resume and the report explaining how it was produced.
///
/// The resume is a full replacement of the selected track's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeMutation {
    pub resume: ResumeJson,
    pub report: MutationReport,
}

impl ResumeMutation {
    /// The first resume track verbatim with a placeholder report.
    pub fn fallback(profile: &UserProfile) -> Result<Self, PreconditionError> {
        let track = profile
            .primary_track()
            .ok_or(PreconditionError::NoResumeTrack)?;
        Ok(Self {
            resume: track.content.clone(),
            report: MutationReport {
                selected_track_id: track.id.clone(),
                selected_track_name: track.name.clone(),
                injected_keywords: Vec::new(),
                mirrored_phrases: Vec::new(),
                reordering_justification: "Mutation output unreadable; original track used."
                    .to_string(),
                ats_score_estimate: FALLBACK_ATS_SCORE,
                iterations: 0,
                timing: MutationTiming::default(),
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTiming {
    pub dispatch_ms: u64,
    pub verify_ms: u64,
}

/// Simulated dispatch receipt. Nothing in here is independently verifiable;
/// it exists for display only and must never drive workflow decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationProof {
    pub dispatch_hash: String,
    pub network_log: Vec<String>,
    pub server_status: u16,
    pub timing: DispatchTiming,
    #[serde(default)]
    pub receipt_svg: Option<String>,
    /// Always true. Marks the proof as fabricated.
    pub simulated: bool,
}

/// Durable record of one finished workflow run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationLog {
    pub id: String,
    pub job_id: String,
    pub job_title: String,
    pub company: String,
    pub status: ApplicationStatus,
    pub timestamp: DateTime<Utc>,
    pub apply_url: String,
    pub platform: String,
    pub location: String,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub cover_letter_style: Option<CoverLetterStyle>,
    #[serde(default)]
    pub mutated_resume: Option<ResumeJson>,
    #[serde(default)]
    pub mutation_report: Option<MutationReport>,
    #[serde(default)]
    pub verification: Option<VerificationProof>,
    #[serde(default)]
    pub match_result: Option<MatchResult>,
}

/// Everything a completed apply cycle produced.
#[derive(Debug, Clone)]
pub struct CycleArtifacts {
    pub cover_letter: String,
    pub style: CoverLetterStyle,
    pub mutation: ResumeMutation,
    pub verification: VerificationProof,
    pub match_result: Option<MatchResult>,
}

impl ApplicationLog {
    /// A `COMPLETED` record. Taking the artifacts by value means a completed
    /// log cannot be built with any of them missing.
    pub fn completed(job: &Job, artifacts: CycleArtifacts) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company: job.company.clone(),
            status: ApplicationStatus::Completed,
            timestamp: Utc::now(),
            apply_url: job.apply_url.clone(),
            platform: job.platform.clone(),
            location: job.location.clone(),
            cover_letter: Some(artifacts.cover_letter),
            cover_letter_style: Some(artifacts.style),
            mutated_resume: Some(artifacts.mutation.resume),
            mutation_report: Some(artifacts.mutation.report),
            verification: Some(artifacts.verification),
            match_result: artifacts.match_result,
        }
    }

    /// True when a completed record carries every required artifact.
    pub fn has_required_artifacts(&self) -> bool {
        self.cover_letter.is_some() && self.mutated_resume.is_some() && self.verification.is_some()
    }
}
