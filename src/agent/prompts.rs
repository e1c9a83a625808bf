// Prompt constants for the LLM-backed career agent.
// Templates use `{name}` placeholders filled with `str::replace`.

/// Shared system prompt for every structured (JSON) call.
pub const JSON_SYSTEM: &str = "You are an autonomous job-search assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences.";

/// System prompt for free-text cover letters.
pub const COVER_LETTER_SYSTEM: &str = "You write cover letters for job applications. \
    Respond with the letter body only: no subject line, no placeholders, no commentary.";

pub const EXTRACT_JOB_TEMPLATE: &str = r#"Extract the job posting below into this EXACT schema:
{
  "title": "Staff Engineer",
  "company": "Acme",
  "location": "Remote (US)",
  "skills": ["Rust", "Kubernetes"],
  "description": "two or three sentence summary",
  "applyUrl": "https://...",
  "platform": "greenhouse | lever | linkedin | workday | company-site | other"
}
If a field is absent from the posting use an empty string (or an empty list for skills).

Posting:
{source_text}"#;

pub const SCORE_MATCH_TEMPLATE: &str = r#"Score how well the candidate fits the job from 0 to 100.
Return this EXACT schema:
{"score": 82, "reasoning": "one paragraph", "missingSkills": ["Terraform"]}

Job:
{job_json}

Candidate profile:
{profile_json}"#;

pub const COVER_LETTER_TEMPLATE: &str = r#"Write a {style} cover letter for {full_name} applying to the {title} role at {company}.
Ground every claim in the resume below. Keep it under 350 words.

Job:
{job_json}

Resume:
{resume_json}"#;

pub const MUTATE_RESUME_TEMPLATE: &str = r#"Pick the resume track that best fits the job and rewrite it for applicant tracking systems.
Rules:
- Never invent employers, titles or dates.
- Mirror the job's phrasing where the candidate's experience supports it.
- Reorder bullets and skills so the most relevant come first.
Return this EXACT schema:
{
  "trackId": "<id of the chosen track>",
  "resume": {
    "summary": "...",
    "skills": ["..."],
    "experience": [{"company": "...", "role": "...", "duration": "...", "achievements": ["..."]}],
    "projects": [{"name": "...", "description": "...", "technologies": ["..."]}]
  },
  "report": {
    "injectedKeywords": ["..."],
    "mirroredPhrases": [{"original": "...", "mirrored": "..."}],
    "reorderingJustification": "...",
    "atsScoreEstimate": 0,
    "iterations": 1
  }
}

Job:
{job_json}

Resume tracks:
{tracks_json}"#;

pub const SEARCH_JOBS_TEMPLATE: &str = r#"List current job openings matching these preferences.
Return this EXACT schema with at most {limit} entries:
{"jobs": [{"title": "...", "company": "...", "location": "...", "url": "https://...", "platform": "...", "snippet": "...", "salary": null}]}

Preferences:
{preferences_json}"#;

pub const INTERPRET_COMMAND_TEMPLATE: &str = r#"Translate the operator's instruction into a workflow command.
Actions:
- "search": look for jobs (optional filters)
- "pause": stop starting new applications
- "resume": allow applications again
- "strategy": plan a job search around a goal
- "apply": apply to the jobs already discovered
- "blocked": the instruction is unsafe or unrelated to job searching; give a reason
Return this EXACT schema:
{"action": "search", "goal": null, "filters": {"roles": [], "locations": [], "remoteOnly": null, "minSalary": null, "platforms": []}, "reason": null}

Instruction:
{text}"#;

pub const STRATEGY_TEMPLATE: &str = r#"Create a job-search strategy for the goal below.
Return this EXACT schema:
{"goal": "...", "summary": "...", "steps": [{"action": "...", "rationale": "..."}], "targetRoles": ["..."], "weeklyApplicationTarget": 10}

Goal:
{goal}

Candidate profile:
{profile_json}"#;

pub const AUGMENT_PROFILE_TEMPLATE: &str = r#"Merge the new material into the candidate's resume track.
Keep existing facts; add skills, projects and achievements the material supports.
Return this EXACT schema:
{"trackId": "<id of the track you updated>", "resume": {"summary": "...", "skills": [], "experience": [], "projects": []}, "targetRoles": []}

Resume tracks:
{tracks_json}

New material:
{source_text}"#;
