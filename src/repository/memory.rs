//! In-memory visit store for tests

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::visit::{NewVisit, Visit},
};

use super::VisitStore;

#[derive(Default)]
pub struct MemoryVisitStore {
    rows: Mutex<Vec<Visit>>,
    next_id: AtomicI64,
    count_queries: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Visit> {
        self.rows.lock().unwrap().clone()
    }

    /// Number of count queries that reached the store
    pub fn count_queries(&self) -> usize {
        self.count_queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("visit store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn insert(&self, visit: &NewVisit) -> AppResult<Visit> {
        self.check()?;

        let row = Visit {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            property_id: visit.property_id,
            visitor_id: visit
                .visitor_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn count_by_property(&self, property_id: Uuid) -> AppResult<i64> {
        self.count_queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|v| v.property_id == property_id).count() as i64)
    }

    async fn ping(&self) -> AppResult<()> {
        self.check()
    }
}
