//! Collaborator-facing orchestration: score a resume against a job, embed it and
//! register the embedding under the caller's candidate id.

use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::document::{Document, ResumeSubmission};
use crate::embedding::{EmbeddingGenerator, EmbeddingVector};
use crate::error::Result;
use crate::index::{SearchHit, VectorIndex};
use crate::scoring::{LexicalScorer, ScoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate_id: String,
    #[serde(flatten)]
    pub result: ScoreResult,
}

/// Inclusive score range for `rank`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFilter {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreFilter {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
        }
    }
}

impl ScoreFilter {
    fn accepts(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

pub struct MatchingPipeline {
    scorer: LexicalScorer,
    embedder: EmbeddingGenerator,
    index: Arc<VectorIndex>,
}

impl MatchingPipeline {
    /// Scorer and embedder take their parameters from the index's settings, so
    /// embeddings always match the index width.
    pub fn new(index: Arc<VectorIndex>) -> Self {
        let settings = index.settings();
        Self {
            scorer: LexicalScorer::from_settings(settings),
            embedder: EmbeddingGenerator::from_settings(settings),
            index,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Scores `resume_text` against `job` and indexes its embedding under
    /// `candidate_id`. An unscoreable resume still gets indexed, with score 0.
    pub fn process(
        &self,
        job: &Document,
        candidate_id: &str,
        resume_text: &str,
    ) -> Result<ScoreResult> {
        let result = self
            .scorer
            .score_breakdown(&job.text, &job.required_skills, resume_text);
        let vector = self.embedder.embed(resume_text);

        self.index.add(&[vector], &[candidate_id.to_string()])?;
        log::info!("processed candidate {} with score {}", candidate_id, result.score);
        Ok(result)
    }

    /// Scores and embeds `resumes` in parallel, then indexes them with a single
    /// `add`, so the batch costs one snapshot write and lands all-or-nothing.
    pub fn process_batch(
        &self,
        job: &Document,
        resumes: &[ResumeSubmission],
    ) -> Result<Vec<ScoredCandidate>> {
        let computed: Vec<(ScoreResult, EmbeddingVector)> = resumes
            .par_iter()
            .map(|resume| {
                let result =
                    self.scorer
                        .score_breakdown(&job.text, &job.required_skills, &resume.text);
                (result, self.embedder.embed(&resume.text))
            })
            .collect();

        let ids: Vec<String> = resumes.iter().map(|r| r.candidate_id.clone()).collect();
        let (results, vectors): (Vec<ScoreResult>, Vec<EmbeddingVector>) =
            computed.into_iter().unzip();

        self.index.add(&vectors, &ids)?;
        log::info!("processed batch of {} candidates", ids.len());

        Ok(ids
            .into_iter()
            .zip(results)
            .map(|(candidate_id, result)| ScoredCandidate {
                candidate_id,
                result,
            })
            .collect())
    }

    /// Scores `resumes` without touching the index and returns those inside
    /// `filter`, best first. Equal scores keep their input order.
    pub fn rank(
        &self,
        job: &Document,
        resumes: &[ResumeSubmission],
        filter: ScoreFilter,
    ) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<ScoredCandidate> = resumes
            .par_iter()
            .map(|resume| ScoredCandidate {
                candidate_id: resume.candidate_id.clone(),
                result: self
                    .scorer
                    .score_breakdown(&job.text, &job.required_skills, &resume.text),
            })
            .filter(|candidate| filter.accepts(candidate.result.score))
            .collect();

        ranked.sort_by(|a, b| b.result.score.total_cmp(&a.result.score));
        ranked
    }

    /// Candidates whose indexed resumes are closest to `text`.
    pub fn find_similar(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query = self.embedder.embed(text);
        self.index.search(&query, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::error::MatchError;
    use tempfile::TempDir;

    fn pipeline_in(dir: &TempDir) -> MatchingPipeline {
        let settings = Settings::new(dir.path().join("faiss.index"), 256).unwrap();
        let (index, _) = VectorIndex::open(&settings).unwrap();
        MatchingPipeline::new(Arc::new(index))
    }

    fn python_job() -> Document {
        Document::new("Looking for Python developer with AWS experience")
            .with_skills(["python", "aws"])
    }

    #[test]
    fn process_scores_and_indexes() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);
        let resume = "I have 5 years experience in Python and AWS cloud.";

        let result = pipeline.process(&python_job(), "c1", resume).unwrap();
        assert_eq!(result.keyword_hits, 2);
        assert_eq!(pipeline.index().ids(), vec!["c1".to_string()]);

        let hits = pipeline.find_similar(resume, 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_deref(), Some("c1"));
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_resume_is_indexed_with_zero_score() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);

        let result = pipeline.process(&python_job(), "blank", "").unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(pipeline.index().len(), 1);
    }

    #[test]
    fn batch_lands_in_input_order() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);
        let resumes = vec![
            ResumeSubmission::new("a", "Python and AWS, Lambda, S3"),
            ResumeSubmission::new("b", "Pastry chef"),
            ResumeSubmission::new("c", "Python scripting"),
        ];

        let scored = pipeline.process_batch(&python_job(), &resumes).unwrap();
        let order: Vec<_> = scored.iter().map(|s| s.candidate_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(pipeline.index().ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn batch_with_bad_id_indexes_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);
        let resumes = vec![
            ResumeSubmission::new("a", "Python"),
            ResumeSubmission::new("", "AWS"),
        ];

        let err = pipeline.process_batch(&python_job(), &resumes).unwrap_err();
        assert!(matches!(err, MatchError::InvalidId(_)));
        assert!(pipeline.index().is_empty());
    }

    #[test]
    fn rank_sorts_and_filters_without_indexing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(&dir);
        let resumes = vec![
            ResumeSubmission::new("weak", "Pastry chef"),
            ResumeSubmission::new("strong", "Python developer, AWS experience"),
            ResumeSubmission::new("middle", "Some Python"),
        ];

        let ranked = pipeline.rank(&python_job(), &resumes, ScoreFilter::default());
        let order: Vec<_> = ranked.iter().map(|s| s.candidate_id.as_str()).collect();
        assert_eq!(order, vec!["strong", "middle", "weak"]);

        let filtered = pipeline.rank(
            &python_job(),
            &resumes,
            ScoreFilter {
                min: 1.0,
                max: 100.0,
            },
        );
        assert!(filtered.iter().all(|s| s.candidate_id != "weak"));
        assert!(pipeline.index().is_empty());
    }
}
