//! Visit count query with a per-property freshness window

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::visit::VisitCountState,
    repository::Repository,
};

/// Cache of visit counts keyed by property id.
///
/// Each property carries a generation bumped by `invalidate`. A count is
/// only stored when the generation read before querying the store is still
/// current, so a count read before a write never lands after it.
#[async_trait]
pub trait CountCache: Send + Sync {
    async fn get(&self, property_id: Uuid) -> AppResult<Option<i64>>;
    async fn generation(&self, property_id: Uuid) -> AppResult<u64>;
    /// Store `count` unless the property was invalidated since `generation`
    /// was read. Returns whether the count was stored.
    async fn put(
        &self,
        property_id: Uuid,
        count: i64,
        ttl: Duration,
        generation: u64,
    ) -> AppResult<bool>;
    async fn invalidate(&self, property_id: Uuid) -> AppResult<()>;
}

#[derive(Default)]
struct CacheEntries {
    counts: HashMap<Uuid, (i64, Instant)>,
    generations: HashMap<Uuid, u64>,
}

/// In-process count cache
#[derive(Default)]
pub struct MemoryCountCache {
    entries: Mutex<CacheEntries>,
}

impl MemoryCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CountCache for MemoryCountCache {
    async fn get(&self, property_id: Uuid) -> AppResult<Option<i64>> {
        let mut entries = self.lock();
        match entries.counts.get(&property_id) {
            Some(&(count, expires_at)) if Instant::now() < expires_at => Ok(Some(count)),
            Some(_) => {
                entries.counts.remove(&property_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn generation(&self, property_id: Uuid) -> AppResult<u64> {
        Ok(self.lock().generations.get(&property_id).copied().unwrap_or(0))
    }

    async fn put(
        &self,
        property_id: Uuid,
        count: i64,
        ttl: Duration,
        generation: u64,
    ) -> AppResult<bool> {
        let mut entries = self.lock();
        let current = entries.generations.get(&property_id).copied().unwrap_or(0);
        if current != generation {
            return Ok(false);
        }
        entries
            .counts
            .insert(property_id, (count, Instant::now() + ttl));
        Ok(true)
    }

    async fn invalidate(&self, property_id: Uuid) -> AppResult<()> {
        let mut entries = self.lock();
        *entries.generations.entry(property_id).or_insert(0) += 1;
        entries.counts.remove(&property_id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct VisitCountQuery {
    repository: Repository,
    cache: Arc<dyn CountCache>,
    freshness: Duration,
}

impl VisitCountQuery {
    pub fn new(repository: Repository, cache: Arc<dyn CountCache>, freshness: Duration) -> Self {
        Self {
            repository,
            cache,
            freshness,
        }
    }

    /// Resolve the visit count, hitting the store only when the cached
    /// count is missing or stale
    pub async fn fetch(&self, property_id: Uuid) -> VisitCountState {
        match self.cache.get(property_id).await {
            Ok(Some(count)) => {
                tracing::debug!("Visit count cache hit for property {}", property_id);
                return VisitCountState::Ready { count };
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Visit count cache read failed for {}: {}", property_id, e),
        }

        // Read before the store so a write landing mid-query discards this count
        let generation = match self.cache.generation(property_id).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!("Visit count cache generation failed for {}: {}", property_id, e);
                None
            }
        };

        match self.repository.visits.count_by_property(property_id).await {
            Ok(count) => {
                if let Some(generation) = generation {
                    match self
                        .cache
                        .put(property_id, count, self.freshness, generation)
                        .await
                    {
                        Ok(true) => {}
                        Ok(false) => tracing::debug!(
                            "Visit count for {} superseded by a newer visit, not cached",
                            property_id
                        ),
                        Err(e) => {
                            tracing::warn!("Failed to cache visit count for {}: {}", property_id, e)
                        }
                    }
                }
                VisitCountState::Ready { count }
            }
            Err(e) => {
                tracing::error!("Visit count query failed for {}: {}", property_id, e);
                VisitCountState::Unavailable {
                    reason: e.client_message(),
                }
            }
        }
    }

    /// Start a fetch in the background; the receiver holds `Loading` until
    /// it resolves
    pub fn watch(&self, property_id: Uuid) -> watch::Receiver<VisitCountState> {
        let (tx, rx) = watch::channel(VisitCountState::Loading);
        let query = self.clone();
        tokio::spawn(async move {
            let state = query.fetch(property_id).await;
            let _ = tx.send(state);
        });
        rx
    }

    /// Forget the cached count so the next fetch re-queries the store
    pub async fn invalidate(&self, property_id: Uuid) {
        if let Err(e) = self.cache.invalidate(property_id).await {
            tracing::warn!("Failed to invalidate visit count for {}: {}", property_id, e);
        }
    }
}
