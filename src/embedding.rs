//! Fixed-width text embeddings over a shared, hashed feature basis.
//!
//! Every term maps to a slot through SipHash-1-3 with fixed keys, so the same term
//! lands in the same component for every document and every process. Embeddings
//! produced at different times are therefore directly comparable by inner product.

use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::Hasher;

use crate::config::{validate_dimensions, Number, Settings};
use crate::error::Result;
use crate::normalize::{normalize, terms};
use crate::vector_ops::normalize_vector;

/// Changing these keys reshuffles every slot; persisted indexes built with the old
/// keys must be re-embedded.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;
const SIGN_SEED_K0: u64 = 0x9e37_79b9_7f4a_7c15;
const SIGN_SEED_K1: u64 = 0xc2b2_ae3d_27d4_eb4f;

pub type EmbeddingVector = Vec<Number>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingGenerator {
    dimensions: usize,
}

impl EmbeddingGenerator {
    pub fn new(dimensions: i64) -> Result<Self> {
        Ok(Self {
            dimensions: validate_dimensions(dimensions)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            dimensions: settings.dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Term-frequency vector of the normalized text folded into `dimensions` hashed
    /// slots, then L2-normalized. Text without terms yields the all-zero vector.
    ///
    /// Terms that share a slot with opposite signs and equal counts cancel. If every
    /// occupied slot cancels, a document with terms also yields the all-zero vector;
    /// callers cannot tell that apart from an empty document by the vector alone.
    pub fn embed(&self, text: &str) -> EmbeddingVector {
        let normalized = normalize(text);

        // Within one document every term shares the same idf, so plain counts are
        // its TF-IDF weights up to a constant that normalization removes.
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for term in terms(&normalized) {
            *counts.entry(term).or_default() += 1;
        }

        let mut vector = vec![0.0; self.dimensions];
        for (term, count) in &counts {
            let (slot, sign) = self.slot(term);
            vector[slot] += sign * *count as Number;
        }

        normalize_vector(&mut vector);
        log::debug!(
            "embedded {} distinct terms into {} dimensions",
            counts.len(),
            self.dimensions
        );
        vector
    }

    /// Slot index and sign for a term. The sign comes from an independently keyed
    /// hash so it is uncorrelated with the slot, and keeps colliding terms from
    /// piling up in one direction.
    fn slot(&self, term: &str) -> (usize, Number) {
        let slot_hash = keyed_hash(term, HASH_SEED_K0, HASH_SEED_K1);
        let slot = (slot_hash % self.dimensions as u64) as usize;
        let sign = if keyed_hash(term, SIGN_SEED_K0, SIGN_SEED_K1) & 1 == 0 {
            1.0
        } else {
            -1.0
        };
        (slot, sign)
    }
}

fn keyed_hash(term: &str, k0: u64, k1: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(k0, k1);
    hasher.write(term.as_bytes());
    hasher.finish()
}

/// Embeds `text` into `dim` components. Fails only when `dim <= 0`.
pub fn embed(text: &str, dim: i64) -> Result<EmbeddingVector> {
    Ok(EmbeddingGenerator::new(dim)?.embed(text))
}
