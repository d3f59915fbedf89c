//! Exact inner-product index over embeddings with a durable two-file snapshot.
//!
//! Readers share the lock; `add` holds it exclusively across both the in-memory
//! append and the snapshot write, so concurrent ingestion serializes on disk
//! latency and searches never observe a half-applied batch.

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

use crate::config::{Number, Settings};
use crate::embedding::EmbeddingVector;
use crate::error::{MatchError, Result};
use crate::snapshot::{self, SnapshotStatus};
use crate::vector_ops::dot_product_simd;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: Number,
    /// `None` only if the position has no identifier, which the load-time checks
    /// keep from happening.
    pub id: Option<String>,
    pub position: usize,
}

#[derive(Default)]
struct IndexState {
    ids: Vec<String>,
    /// Flat, `ids.len() * dimensions` components, entry `i` at `i * dimensions`.
    vectors: Vec<Number>,
}

pub struct VectorIndex {
    settings: Settings,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Opens the index described by `settings`, restoring its snapshot if one exists.
    /// A corrupt or half-written snapshot is an error, never an empty index.
    pub fn open(settings: &Settings) -> Result<(Self, SnapshotStatus)> {
        let (state, status) = match snapshot::load(settings)? {
            Some(data) => {
                let entries = data.ids.len();
                (
                    IndexState {
                        ids: data.ids,
                        vectors: data.vectors,
                    },
                    SnapshotStatus::Loaded { entries },
                )
            }
            None => {
                log::info!(
                    "no snapshot at {}, starting empty",
                    settings.index_path.display()
                );
                (IndexState::default(), SnapshotStatus::Empty)
            }
        };

        let index = Self {
            settings: settings.clone(),
            state: RwLock::new(state),
        };
        Ok((index, status))
    }

    /// Restores the identifier artifact from the committed vector artifact.
    /// Run by an operator after `open` reported an interrupted write.
    pub fn repair(settings: &Settings) -> Result<usize> {
        snapshot::repair(settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dimensions(&self) -> usize {
        self.settings.dimensions
    }

    pub fn len(&self) -> usize {
        self.state.read().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.state.read().ids.clone()
    }

    /// Appends `vectors` under `ids` and persists the snapshot before returning.
    /// On any failure neither memory nor disk reflects the call.
    pub fn add(&self, vectors: &[EmbeddingVector], ids: &[String]) -> Result<()> {
        if vectors.len() != ids.len() {
            return Err(MatchError::LengthMismatch {
                vectors: vectors.len(),
                ids: ids.len(),
            });
        }
        let dimensions = self.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
            return Err(MatchError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }
        if let Some(bad) = ids.iter().find(|id| !is_valid_id(id)) {
            return Err(MatchError::InvalidId(bad.clone()));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let mut state = self.state.write();
        let previous = state.ids.len();

        state.ids.extend_from_slice(ids);
        for vector in vectors {
            state.vectors.extend_from_slice(vector);
        }

        if let Err(e) = snapshot::write(&self.settings, &state.ids, &state.vectors) {
            state.ids.truncate(previous);
            state.vectors.truncate(previous * dimensions);
            log::warn!("snapshot write failed, rolled back {} entries: {}", ids.len(), e);
            return Err(e);
        }

        log::info!(
            "added {} entries ({} total) in {:?}",
            ids.len(),
            state.ids.len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Exact top-`top_k` by inner product, best first, ties by insertion order.
    /// Returns `min(top_k, len)` hits.
    pub fn search(&self, query: &[Number], top_k: usize) -> Result<Vec<SearchHit>> {
        let dimensions = self.dimensions();
        if query.len() != dimensions {
            return Err(MatchError::DimensionMismatch {
                expected: dimensions,
                actual: query.len(),
            });
        }

        let start = Instant::now();
        let state = self.state.read();

        let mut scored: Vec<(Number, usize)> = state
            .vectors
            .par_chunks_exact(dimensions)
            .enumerate()
            .map(|(position, vector)| {
                let score = dot_product_simd(query, vector).unwrap_or(0.0);
                (score, position)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(top_k);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .map(|(score, position)| SearchHit {
                score,
                id: state.ids.get(position).cloned(),
                position,
            })
            .collect();

        log::debug!(
            "searched {} entries for top {} in {:?}",
            state.ids.len(),
            top_k,
            start.elapsed()
        );
        Ok(hits)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(|c| c == '\n' || c == '\r')
}
