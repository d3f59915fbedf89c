//! Hybrid lexical relevance: TF-IDF cosine between a job description and a resume,
//! plus a capped boost for required skills the resume mentions.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{Settings, DEFAULT_BOOST_CAP, DEFAULT_BOOST_PER_HIT};
use crate::normalize::{normalize, terms};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Final score in `[0, 100]`, rounded to 2 decimals.
    pub score: f64,
    /// TF-IDF cosine scaled to `[0, 100]`.
    pub base: f64,
    pub boost: f64,
    pub keyword_hits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalScorer {
    pub boost_per_hit: f64,
    pub boost_cap: f64,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self {
            boost_per_hit: DEFAULT_BOOST_PER_HIT,
            boost_cap: DEFAULT_BOOST_CAP,
        }
    }
}

impl LexicalScorer {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            boost_per_hit: settings.boost_per_hit,
            boost_cap: settings.boost_cap,
        }
    }

    pub fn score(&self, job_description: &str, required_skills: &[String], resume_text: &str) -> f64 {
        self.score_breakdown(job_description, required_skills, resume_text)
            .score
    }

    pub fn score_breakdown(
        &self,
        job_description: &str,
        required_skills: &[String],
        resume_text: &str,
    ) -> ScoreResult {
        let base = round2(tfidf_cosine(job_description, resume_text) * 100.0);
        let keyword_hits = keyword_hits(required_skills, resume_text);
        let boost = (keyword_hits as f64 * self.boost_per_hit).min(self.boost_cap);
        let score = round2((base + boost).min(100.0));

        log::debug!(
            "score: base={} hits={} boost={} final={}",
            base,
            keyword_hits,
            boost,
            score
        );

        ScoreResult {
            score,
            base,
            boost,
            keyword_hits,
        }
    }
}

/// Score with the default boost (4 points per hit, capped at 20).
pub fn score(job_description: &str, required_skills: &[String], resume_text: &str) -> f64 {
    LexicalScorer::default().score(job_description, required_skills, resume_text)
}

pub fn score_breakdown(
    job_description: &str,
    required_skills: &[String],
    resume_text: &str,
) -> ScoreResult {
    LexicalScorer::default().score_breakdown(job_description, required_skills, resume_text)
}

/// Cosine similarity of the two documents' TF-IDF vectors, with the vocabulary and
/// document frequencies taken from just these two documents.
///
/// Uses smoothed idf, `ln((1 + n) / (1 + df)) + 1` with `n = 2`. Returns 0 when
/// either side has no terms. Symmetric bit-for-bit: the vocabulary is walked in
/// sorted order and every product commutes.
pub fn tfidf_cosine(left: &str, right: &str) -> f64 {
    let left = normalize(left);
    let right = normalize(right);

    let mut counts: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for term in terms(&left) {
        counts.entry(term).or_default().0 += 1;
    }
    for term in terms(&right) {
        counts.entry(term).or_default().1 += 1;
    }

    let mut dot = 0.0f64;
    let mut norm_left = 0.0f64;
    let mut norm_right = 0.0f64;
    for &(tf_left, tf_right) in counts.values() {
        let df = u32::from(tf_left > 0) + u32::from(tf_right > 0);
        let idf = (3.0 / (1.0 + df as f64)).ln() + 1.0;
        let w_left = tf_left as f64 * idf;
        let w_right = tf_right as f64 * idf;
        dot += w_left * w_right;
        norm_left += w_left * w_left;
        norm_right += w_right * w_right;
    }

    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }
    (dot / (norm_left.sqrt() * norm_right.sqrt())).clamp(0.0, 1.0)
}

/// Required skills whose lowercase form occurs in the lowercased resume.
/// Blank skills never count.
pub fn keyword_hits(required_skills: &[String], resume_text: &str) -> usize {
    let resume = resume_text.to_lowercase();
    required_skills
        .iter()
        .filter(|skill| !skill.trim().is_empty())
        .filter(|skill| resume.contains(&skill.to_lowercase()))
        .count()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
