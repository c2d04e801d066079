//! Visits repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::visit::{NewVisit, Visit},
};

/// Storage for visit records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Insert a visit and return the stored row, including the
    /// store-assigned `visitor_id` when none was given
    async fn insert(&self, visit: &NewVisit) -> AppResult<Visit>;

    /// Number of visits recorded for a property
    async fn count_by_property(&self, property_id: Uuid) -> AppResult<i64>;

    /// Connectivity check
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct VisitsRepository {
    pool: Pool<Postgres>,
}

impl VisitsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitStore for VisitsRepository {
    async fn insert(&self, visit: &NewVisit) -> AppResult<Visit> {
        let row = sqlx::query_as::<_, Visit>(
            r#"
            INSERT INTO visits (property_id, visitor_id)
            VALUES ($1, COALESCE($2, gen_random_uuid()::text))
            RETURNING id, property_id, visitor_id, created_at
            "#,
        )
        .bind(visit.property_id)
        .bind(&visit.visitor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn count_by_property(&self, property_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits WHERE property_id = $1")
            .bind(property_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
