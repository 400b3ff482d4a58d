//! Cache-side filtering with population on demand.
//!
//! All four forms evaluate the predicate over the in-memory cache of one
//! type; the transport is only used to fill in missing required fields.
//! They differ in what happens when a required field is absent: fail,
//! fetch in batches, fetch and report statistics, or fetch lazily behind
//! an async stream.

use std::collections::VecDeque;

use futures::future;
use futures::stream::{self, Stream};
use tracing::debug;

use crate::core::error::{Result, StoreError};
use crate::entity::Entity;
use crate::store::populate::missing_paths;
use crate::store::store::EntityStore;

/// Statistics from `filter_and_populate_with_stats`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PopulateStats {
    pub total_cached: usize,
    pub needed_population: usize,
    /// Number of field paths fetched across all populated entities.
    pub populated_fields: usize,
    pub matches: usize,
    /// Fraction of cached entities that needed no population.
    pub cache_hit_rate: f64,
}

impl EntityStore {
    /// Strict filter: every cached entity of the type must already have the
    /// required fields. The first entity with a gap fails the call with an
    /// error naming the entity and the missing set.
    pub fn filter_strict<F>(
        &self,
        type_name: &str,
        required: &[&str],
        predicate: F,
    ) -> Result<Vec<Entity>>
    where
        F: Fn(&Entity) -> bool,
    {
        let entities = self.snapshot_type(type_name);
        let mut matches = Vec::new();
        for entity in entities {
            let missing = missing_paths(&entity, required, false)?;
            if !missing.is_empty() {
                return Err(StoreError::MissingFields {
                    type_name: type_name.to_string(),
                    id: entity.id(),
                    fields: missing,
                });
            }
            if predicate(&entity) {
                matches.push(entity);
            }
        }
        Ok(matches)
    }

    /// Filter after fetching whatever required fields are missing, in
    /// concurrency-limited batches of `batch_size` entities.
    pub async fn filter_and_populate<F>(
        &self,
        type_name: &str,
        required: &[&str],
        predicate: F,
        batch_size: usize,
    ) -> Result<Vec<Entity>>
    where
        F: Fn(&Entity) -> bool,
    {
        let (matches, _) = self
            .filter_and_populate_inner(type_name, required, predicate, batch_size)
            .await?;
        Ok(matches)
    }

    /// Same as `filter_and_populate`, returning population statistics.
    pub async fn filter_and_populate_with_stats<F>(
        &self,
        type_name: &str,
        required: &[&str],
        predicate: F,
        batch_size: usize,
    ) -> Result<(Vec<Entity>, PopulateStats)>
    where
        F: Fn(&Entity) -> bool,
    {
        self.filter_and_populate_inner(type_name, required, predicate, batch_size)
            .await
    }

    async fn filter_and_populate_inner<F>(
        &self,
        type_name: &str,
        required: &[&str],
        predicate: F,
        batch_size: usize,
    ) -> Result<(Vec<Entity>, PopulateStats)>
    where
        F: Fn(&Entity) -> bool,
    {
        let entities = self.snapshot_type(type_name);
        let mut stats = PopulateStats {
            total_cached: entities.len(),
            ..PopulateStats::default()
        };

        let mut needing: Vec<Entity> = Vec::new();
        for entity in &entities {
            let missing = missing_paths(entity, required, false)?;
            if !missing.is_empty() {
                stats.populated_fields += missing.len();
                needing.push(entity.clone());
            }
        }
        stats.needed_population = needing.len();
        stats.cache_hit_rate = if entities.is_empty() {
            1.0
        } else {
            (entities.len() - needing.len()) as f64 / entities.len() as f64
        };

        debug!(
            type_name,
            total = entities.len(),
            needing = needing.len(),
            "filter_and_populate"
        );
        self.populate_batched(&needing, required, batch_size).await?;

        let matches: Vec<Entity> = entities
            .into_iter()
            .filter(|e| predicate(e))
            .collect();
        stats.matches = matches.len();
        Ok((matches, stats))
    }

    /// Lazy filtered stream: candidates are drawn in sub-batches of
    /// `yield_batch`, populated in sub-batches of `populate_batch`, and
    /// matches are yielded one at a time. Dropping the stream stops
    /// further population.
    pub fn populated_filter_iter<'a, F>(
        &'a self,
        type_name: &'a str,
        required: &'a [&'a str],
        predicate: F,
        populate_batch: usize,
        yield_batch: usize,
    ) -> impl Stream<Item = Result<Entity>> + 'a
    where
        F: Fn(&Entity) -> bool + 'a,
    {
        struct IterState<F> {
            pending: VecDeque<Entity>,
            matched: VecDeque<Entity>,
            predicate: F,
        }
        let state = IterState {
            pending: self.snapshot_type(type_name).into(),
            matched: VecDeque::new(),
            predicate,
        };
        let yield_batch = yield_batch.max(1);

        stream::try_unfold(state, move |mut state| async move {
            loop {
                if let Some(entity) = state.matched.pop_front() {
                    return Ok(Some((entity, state)));
                }
                if state.pending.is_empty() {
                    return Ok(None);
                }

                let take = yield_batch.min(state.pending.len());
                let candidates: Vec<Entity> = state.pending.drain(..take).collect();

                let mut needing: Vec<Entity> = Vec::new();
                for entity in &candidates {
                    if !missing_paths(entity, required, false)?.is_empty() {
                        needing.push(entity.clone());
                    }
                }
                self.populate_batched(&needing, required, populate_batch)
                    .await?;

                for entity in candidates {
                    if (state.predicate)(&entity) {
                        state.matched.push_back(entity);
                    }
                }
            }
        })
    }

    async fn populate_batched(
        &self,
        entities: &[Entity],
        required: &[&str],
        batch_size: usize,
    ) -> Result<()> {
        for chunk in entities.chunks(batch_size.max(1)) {
            let results =
                future::join_all(chunk.iter().map(|e| self.populate(e, required, false))).await;
            results.into_iter().collect::<Result<Vec<()>>>()?;
        }
        Ok(())
    }
}
