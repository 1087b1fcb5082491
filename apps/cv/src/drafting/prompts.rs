// Prompt text for drafting requests. Facts are embedded as pretty JSON so the model sees the
// same field names the grounding checks use.

use serde_json::{json, Value};

use crate::models::{JobSpec, Profile, ProjectEntry};

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or apologies.";

/// Appended to every drafting prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every claim must be traceable to the projects listed above. \
    Do NOT infer, interpolate, or invent details. \
    Only use numbers that appear verbatim in the cited projects. \
    If the projects do not support a claim, omit it entirely.";

const EXPERIENCE_TEMPLATE: &str = r#"Group the projects below into at most 5 experience entries.

Rules:
- Every entry cites its projects in "source_project_ids"; all cited projects share one company.
- At most 3 bullets per entry, at most 8 keywords per entry.
- "role" is optional; omit it to use the role from the projects.

Return a JSON object with this EXACT schema:
{"experiences": [{"id": "...", "role": "...", "source_project_ids": ["..."], "bullets": ["..."], "keywords": ["..."]}]}

PROJECTS:
{projects}

JOB:
{job}
"#;

const SKILLS_TEMPLATE: &str = r#"Pick at most 5 skills from the list below that best fit the job.
Only pick skills from the list, spelled exactly as listed.

Return a JSON object with this EXACT schema:
{"highlighted_skills": ["..."]}

HEADLINE: {headline}

SKILLS:
{skills}

JOB:
{job}
"#;

const INGEST_TEMPLATE: &str = r#"Convert the CV text below into structured facts.
Copy wording from the CV; do not invent employers, dates, numbers or skills.
Use null for anything the CV does not state. Dates use YYYY-MM where possible.

Return a JSON object with this EXACT schema:
{"profile": {"name": "...", "headline": "...", "location": "...", "email": "...", "about_me": "...", "links": [{"label": "...", "url": "..."}]},
 "experience": [{"company": "...", "title": "...", "location": "...", "start_date": "...", "end_date": "...", "tags": ["..."], "bullets": ["..."]}],
 "projects": [{"name": "...", "company": "...", "role": "...", "start_date": "...", "end_date": "...", "tags": ["..."], "bullets": ["..."]}],
 "skills": [{"name": "...", "items": ["..."]}],
 "education": [{"institution": "...", "degree": "...", "location": "...", "start_date": "...", "end_date": "..."}]}

CV TEXT:
{cv_text}
"#;

fn job_payload(job: Option<&JobSpec>) -> Value {
    match job {
        Some(job) => json!({
            "id": job.id,
            "title": job.title,
            "raw_text": job.raw_text,
            "keywords": job.keywords,
        }),
        None => json!({}),
    }
}

pub fn experience_prompt(
    projects: &[ProjectEntry],
    job: Option<&JobSpec>,
) -> Result<String, serde_json::Error> {
    let projects = serde_json::to_string_pretty(projects)?;
    let job = serde_json::to_string_pretty(&job_payload(job))?;
    Ok(format!(
        "{}\n{GROUNDING_INSTRUCTION}\n",
        EXPERIENCE_TEMPLATE
            .replace("{projects}", &projects)
            .replace("{job}", &job)
    ))
}

pub fn skills_prompt(
    skills: &[String],
    profile: &Profile,
    job: Option<&JobSpec>,
) -> Result<String, serde_json::Error> {
    let skills = serde_json::to_string_pretty(skills)?;
    let job = serde_json::to_string_pretty(&job_payload(job))?;
    Ok(SKILLS_TEMPLATE
        .replace("{headline}", &profile.headline)
        .replace("{skills}", &skills)
        .replace("{job}", &job))
}

pub fn ingest_prompt(cv_text: &str) -> String {
    INGEST_TEMPLATE.replace("{cv_text}", cv_text.trim())
}
