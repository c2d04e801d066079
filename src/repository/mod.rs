//! Repository layer for database operations

#[cfg(test)]
pub mod memory;
pub mod visits;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use visits::{VisitStore, VisitsRepository};

/// Main repository struct holding the visit store
#[derive(Clone)]
pub struct Repository {
    pub visits: Arc<dyn VisitStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::from_store(Arc::new(VisitsRepository::new(pool)))
    }

    /// Create a repository around any visit store
    pub fn from_store(visits: Arc<dyn VisitStore>) -> Self {
        Self { visits }
    }
}
