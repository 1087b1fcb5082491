//! Canonical fact entities.
//!
//! Anything that appears in rendered output must be attributable to a field on one of these
//! records. Values are immutable once loaded; `id` is the join key for selection and rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub about_me: String,
    #[serde(skip)]
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub id: String,
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    /// `YYYY-MM`
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Curated search terms.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(skip)]
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(skip)]
    pub source_path: Option<String>,
}

impl ProjectEntry {
    /// Every free-text field of the project, in a fixed order.
    pub fn text_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.company.as_deref());
        fields.extend(self.role.as_deref());
        fields.extend(self.start_date.as_deref());
        fields.extend(self.end_date.as_deref());
        fields.extend(self.tags.iter().map(String::as_str));
        fields.extend(self.bullets.iter().map(String::as_str));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsCategory {
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    pub id: String,
    #[serde(default)]
    pub categories: Vec<SkillsCategory>,
    #[serde(skip)]
    pub source_path: Option<String>,
}

impl Skills {
    pub fn all_items(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub id: String,
    #[serde(default)]
    pub entries: Vec<EducationEntry>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(skip)]
    pub source_path: Option<String>,
}

/// The validated, user-owned source of truth for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalData {
    pub profile: Profile,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub skills: Skills,
    pub education: Option<Education>,
}

impl CanonicalData {
    pub fn project(&self, id: &str) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// `(id, source)` for every entity, in load order. Used for uniqueness checks.
    pub fn ids(&self) -> Vec<(&str, Option<&str>)> {
        let mut ids = vec![
            (self.profile.id.as_str(), self.profile.source_path.as_deref()),
            (self.skills.id.as_str(), self.skills.source_path.as_deref()),
        ];
        if let Some(education) = &self.education {
            ids.push((education.id.as_str(), education.source_path.as_deref()));
        }
        ids.extend(
            self.experience
                .iter()
                .map(|e| (e.id.as_str(), e.source_path.as_deref())),
        );
        ids.extend(
            self.projects
                .iter()
                .map(|p| (p.id.as_str(), p.source_path.as_deref())),
        );
        ids
    }
}

/// A target job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(skip)]
    pub source_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_text_fields_skip_missing_values() {
        let project = ProjectEntry {
            id: "proj".to_string(),
            name: "Importer".to_string(),
            company: Some("Acme".to_string()),
            role: None,
            start_date: Some("2024-01".to_string()),
            end_date: None,
            tags: vec!["etl".to_string()],
            bullets: vec!["Built it.".to_string()],
            source_path: None,
        };
        assert_eq!(
            project.text_fields(),
            vec!["Importer", "Acme", "2024-01", "etl", "Built it."]
        );
    }

    #[test]
    fn test_experience_deserializes_with_defaults() {
        let json = r#"{
            "id": "exp_one",
            "company": "Acme",
            "title": "Engineer",
            "start_date": "2023-01"
        }"#;
        let entry: ExperienceEntry = serde_json::from_str(json).unwrap();
        assert!(entry.tags.is_empty());
        assert!(entry.end_date.is_none());
        assert!(entry.source_path.is_none());
    }

    #[test]
    fn test_job_spec_defaults() {
        let job: JobSpec = serde_json::from_str(r#"{"id": "acme"}"#).unwrap();
        assert!(job.keywords.is_empty());
        assert_eq!(job.raw_text, "");
    }
}
