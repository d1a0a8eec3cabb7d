//! Prompt templates with named-placeholder substitution.
//!
//! Three templates back the pipeline and matching engine: résumé analysis
//! (extraction), candidate matching (scoring), and source selection (which
//! external profiles to fetch before scoring). Each is a system/user pair;
//! placeholders use `{name}` syntax and are substituted with
//! [`render_template`].
//!
//! Templates are built in from compile-time defaults, but a deployment can
//! override any or all of them from a YAML file (see [`PromptTemplateSet::load_from_file`])
//! without touching the binary.

use std::borrow::Cow;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TemplateFileError {
    #[error("failed to read template file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A system/user prompt pair with named placeholders in the user template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system: Cow<'static, str>,
    pub user: Cow<'static, str>,
}

/// Substitutes every `{key}` occurrence in `template` with its value from
/// `vars`. Placeholders with no matching entry are left untouched.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

/// Extracts structured candidate data from résumé text.
pub const RESUME_ANALYSIS: PromptTemplate = PromptTemplate {
    system: Cow::Borrowed(r#"You are an expert résumé analyst. Extract structured candidate information from the résumé text provided.

Respond with a single JSON object with these exact keys: name, email, phone, experienceSummary, skills, domainKnowledge, academicBackground, yearsOfExperience, confidence.

- yearsOfExperience is a number.
- confidence is a number between 0 and 1 reflecting how certain you are of the extraction.
- If a field cannot be determined, use an empty string (or 0 for numeric fields).
Output only the JSON object, no commentary, no markdown fences."#),
    user: Cow::Borrowed(r#"Résumé text:

{resume_text}

Extract the candidate's information as described."#),
};

/// Scores a candidate against a job using résumé data and external context.
pub const CANDIDATE_MATCHING: PromptTemplate = PromptTemplate {
    system: Cow::Borrowed(r#"You are a technical recruiter scoring how well a candidate fits a job opening.

Respond with a single JSON object with these exact keys: matchScore, skillsScore, experienceScore, educationScore, domainScore, explanation, strengths, gaps, recommendation.

- All score fields are numbers from 0 to 100.
- strengths and gaps are short arrays of strings.
- recommendation is one short sentence.
Output only the JSON object, no commentary, no markdown fences."#),
    user: Cow::Borrowed(r#"Job: {job_title}

Job description:
{job_description}

Required skills: {job_required_skills}
Domain requirements: {job_domain_requirements}
Experience range: {job_min_years} to {job_max_years} years

Candidate name: {candidate_name}
Candidate skills: {candidate_skills}
Candidate domain knowledge: {candidate_domain_knowledge}
Candidate academic background: {candidate_academic_background}
Candidate years of experience: {candidate_years_of_experience}

External profile context:
{external_context}

Score this candidate for the job above."#),
};

/// Chooses which external sources to fetch before scoring a candidate.
pub const SOURCE_SELECTION: PromptTemplate = PromptTemplate {
    system: Cow::Borrowed(r#"You decide which external profile sources are worth fetching before scoring a candidate for a job.

Valid source tags: GITHUB, LINKEDIN, TWITTER, INTERNET_SEARCH.

Respond with a single JSON object with exactly two keys: sources (an ordered array of valid source tags, most useful first) and reasoning (a short string).
Output only the JSON object, no commentary, no markdown fences."#),
    user: Cow::Borrowed(r#"Job: {job_title}
Job description: {job_description}
Required skills: {job_required_skills}

Candidate name: {candidate_name}
Candidate skills: {candidate_skills}

Which external sources should be fetched to best evaluate this candidate for this job?"#),
};

#[derive(Debug, Deserialize)]
struct RawTemplatePair {
    system: String,
    user: String,
}

impl From<RawTemplatePair> for PromptTemplate {
    fn from(raw: RawTemplatePair) -> Self {
        PromptTemplate {
            system: Cow::Owned(raw.system),
            user: Cow::Owned(raw.user),
        }
    }
}

/// On-disk shape of a template override file. Every template is optional;
/// a file overriding only `candidate_matching` leaves the other two at
/// their compiled-in defaults.
#[derive(Debug, Deserialize)]
struct RawTemplateFile {
    resume_analysis: Option<RawTemplatePair>,
    candidate_matching: Option<RawTemplatePair>,
    source_selection: Option<RawTemplatePair>,
}

/// The three templates the pipeline and matching engine need, resolved once
/// at startup and carried on [`crate::llm::LlmClient`].
#[derive(Debug, Clone)]
pub struct PromptTemplateSet {
    pub resume_analysis: PromptTemplate,
    pub candidate_matching: PromptTemplate,
    pub source_selection: PromptTemplate,
}

impl PromptTemplateSet {
    /// The compiled-in defaults, used when no template file is configured.
    pub fn defaults() -> Self {
        Self {
            resume_analysis: RESUME_ANALYSIS,
            candidate_matching: CANDIDATE_MATCHING,
            source_selection: SOURCE_SELECTION,
        }
    }

    /// Loads a YAML override file. Keys absent from the file fall back to
    /// the compiled-in default for that template.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, TemplateFileError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TemplateFileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let parsed: RawTemplateFile =
            serde_yaml::from_str(&raw).map_err(|source| TemplateFileError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let defaults = Self::defaults();
        Ok(Self {
            resume_analysis: parsed.resume_analysis.map(Into::into).unwrap_or(defaults.resume_analysis),
            candidate_matching: parsed
                .candidate_matching
                .map(Into::into)
                .unwrap_or(defaults.candidate_matching),
            source_selection: parsed
                .source_selection
                .map(Into::into)
                .unwrap_or(defaults.source_selection),
        })
    }

    /// Resolves the active template set: loads `path` if given, falling back
    /// to the compiled-in defaults when no path is configured or the file
    /// can't be read/parsed. A bad template file must never stop the
    /// pipeline from running, so failures are logged and swallowed here.
    pub fn resolve(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::defaults();
        };

        match Self::load_from_file(path) {
            Ok(set) => set,
            Err(e) => {
                warn!(path, error = %e, "failed to load prompt template file, using built-in defaults");
                Self::defaults()
            }
        }
    }
}

impl Default for PromptTemplateSet {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_substitutes_named_placeholders() {
        let rendered = render_template("Hello {name}, you are {age}", &[("name", "Ada"), ("age", "36")]);
        assert_eq!(rendered, "Hello Ada, you are 36");
    }

    #[test]
    fn render_template_leaves_unmatched_placeholders() {
        let rendered = render_template("Hello {name}", &[]);
        assert_eq!(rendered, "Hello {name}");
    }

    #[test]
    fn resume_analysis_user_template_has_resume_text_placeholder() {
        assert!(RESUME_ANALYSIS.user.contains("{resume_text}"));
    }

    #[test]
    fn candidate_matching_user_template_has_all_placeholders() {
        for key in [
            "job_title",
            "job_description",
            "job_required_skills",
            "candidate_name",
            "external_context",
        ] {
            assert!(CANDIDATE_MATCHING.user.contains(&format!("{{{key}}}")));
        }
    }

    #[test]
    fn default_template_set_matches_the_builtin_consts() {
        let set = PromptTemplateSet::defaults();
        assert_eq!(set.resume_analysis.user, RESUME_ANALYSIS.user);
        assert_eq!(set.candidate_matching.system, CANDIDATE_MATCHING.system);
    }

    #[test]
    fn resolve_with_no_path_returns_defaults() {
        let set = PromptTemplateSet::resolve(None);
        assert_eq!(set.source_selection.system, SOURCE_SELECTION.system);
    }

    #[test]
    fn resolve_with_missing_file_falls_back_to_defaults() {
        let set = PromptTemplateSet::resolve(Some("/nonexistent/templates.yaml"));
        assert_eq!(set.resume_analysis.user, RESUME_ANALYSIS.user);
    }

    #[test]
    fn load_from_file_overrides_only_the_templates_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("templates.yaml");
        std::fs::write(
            &path,
            r#"
candidate_matching:
  system: "custom system prompt"
  user: "custom user prompt with {job_title}"
"#,
        )
        .expect("write template file");

        let set = PromptTemplateSet::load_from_file(&path).expect("should parse");
        assert_eq!(set.candidate_matching.system, "custom system prompt");
        assert_eq!(set.candidate_matching.user, "custom user prompt with {job_title}");
        // untouched keys keep their compiled-in defaults
        assert_eq!(set.resume_analysis.user, RESUME_ANALYSIS.user);
        assert_eq!(set.source_selection.system, SOURCE_SELECTION.system);
    }

    #[test]
    fn load_from_file_rejects_malformed_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("templates.yaml");
        std::fs::write(&path, "not: [valid: yaml").expect("write template file");

        assert!(PromptTemplateSet::load_from_file(&path).is_err());
    }
}
