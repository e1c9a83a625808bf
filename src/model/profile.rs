use serde::{Deserialize, Serialize};

use super::command::SearchFilters;

/// The operator's identity, resume tracks and search preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub resume_tracks: Vec<ResumeTrack>,
    #[serde(default)]
    pub preferences: SearchPreferences,
}

impl UserProfile {
    pub fn primary_track(&self) -> Option<&ResumeTrack> {
        self.resume_tracks.first()
    }

    pub fn track(&self, id: &str) -> Option<&ResumeTrack> {
        self.resume_tracks.iter().find(|t| t.id == id)
    }
}

/// A named resume variant (e.g. "Backend", "Platform").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTrack {
    pub id: String,
    pub name: String,
    pub content: ResumeJson,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeJson {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPreferences {
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub salary_floor: Option<u32>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub remote_only: bool,
    /// Minimum match score for bulk deployment. Falls back to the configured default.
    #[serde(default)]
    pub match_threshold: Option<u8>,
    #[serde(default)]
    pub preferred_platforms: Vec<String>,
}

impl SearchPreferences {
    /// Preferences narrowed by command filters. Non-empty filter fields win.
    pub fn with_filters(&self, filters: &SearchFilters) -> SearchPreferences {
        let mut merged = self.clone();
        if !filters.roles.is_empty() {
            merged.target_roles = filters.roles.clone();
        }
        if !filters.locations.is_empty() {
            merged.locations = filters.locations.clone();
        }
        if let Some(remote) = filters.remote_only {
            merged.remote_only = remote;
        }
        if filters.min_salary.is_some() {
            merged.salary_floor = filters.min_salary;
        }
        if !filters.platforms.is_empty() {
            merged.preferred_platforms = filters.platforms.clone();
        }
        merged
    }
}
