use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting produced by the extraction collaborator. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub apply_url: String,
    #[serde(default)]
    pub platform: String,
    pub scraped_at: DateTime<Utc>,
}

impl Job {
    /// Host part of the apply URL, if it parses.
    pub fn apply_host(&self) -> Option<String> {
        url::Url::parse(&self.apply_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// A search hit that has not been extracted into a full [`Job`] yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredJob {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    pub url: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub salary: Option<String>,
}

impl DiscoveredJob {
    /// Source text handed to the extraction collaborator.
    pub fn source_text(&self) -> String {
        let mut text = format!(
            "Title: {}\nCompany: {}\nLocation: {}\nApply URL: {}\nPlatform: {}\n",
            self.title, self.company, self.location, self.url, self.platform
        );
        if let Some(salary) = &self.salary {
            text.push_str(&format!("Salary: {salary}\n"));
        }
        text.push('\n');
        text.push_str(&self.snippet);
        text
    }
}
