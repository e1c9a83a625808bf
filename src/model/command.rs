use serde::{Deserialize, Serialize};

/// Action tag produced by the command interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Search,
    Pause,
    Resume,
    Strategy,
    Apply,
    Blocked,
}

/// Structured command returned by `interpret_command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub action: CommandAction,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub filters: Option<SearchFilters>,
    /// Why the interpreter refused. Only meaningful for `Blocked`.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub remote_only: Option<bool>,
    #[serde(default)]
    pub min_salary: Option<u32>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPlan {
    pub goal: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<StrategyStep>,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub weekly_application_target: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStep {
    pub action: String,
    #[serde(default)]
    pub rationale: String,
}
