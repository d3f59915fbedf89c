use serde::{Deserialize, Serialize};

/// A job posting as handed over by the ingestion side: free text plus the
/// required skills used for the keyword boost. Skills never feed the embedding.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            required_skills: Vec::new(),
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }
}

/// Extracted resume text for one candidate, keyed by the caller's opaque id.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ResumeSubmission {
    pub candidate_id: String,
    pub text: String,
}

impl ResumeSubmission {
    pub fn new(candidate_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            text: text.into(),
        }
    }
}
