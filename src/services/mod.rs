//! Business logic services

pub mod redis;
pub mod token_store;
pub mod visit_counts;
pub mod visits;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{VisitorConfig, VisitsConfig},
    repository::Repository,
};

use visit_counts::{CountCache, MemoryCountCache, VisitCountQuery};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub visits: visits::VisitsService,
    pub visit_counts: VisitCountQuery,
}

impl Services {
    /// Create all services with the given repository.
    ///
    /// Visit counts are cached in Redis when a service is given, in process
    /// otherwise.
    pub fn new(
        repository: Repository,
        visitor_config: VisitorConfig,
        visits_config: VisitsConfig,
        redis_service: Option<redis::RedisService>,
    ) -> Self {
        let cache: Arc<dyn CountCache> = match redis_service {
            Some(redis) => Arc::new(redis),
            None => Arc::new(MemoryCountCache::new()),
        };
        let visit_counts = VisitCountQuery::new(
            repository.clone(),
            cache,
            Duration::from_secs(visits_config.count_ttl_seconds),
        );

        Self {
            visits: visits::VisitsService::new(
                repository.clone(),
                visit_counts.clone(),
                visitor_config,
            ),
            visit_counts,
            repository,
        }
    }
}
