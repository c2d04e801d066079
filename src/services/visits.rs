//! Visit recording with pseudonymous visitor identity

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::VisitorConfig,
    error::AppResult,
    models::visit::{NewVisit, RecordedVisit},
    repository::Repository,
};

use super::{
    token_store::{PersistOptions, TokenStore},
    visit_counts::VisitCountQuery,
};

#[derive(Clone)]
pub struct VisitsService {
    repository: Repository,
    counts: VisitCountQuery,
    visitor: VisitorConfig,
}

impl VisitsService {
    pub fn new(repository: Repository, counts: VisitCountQuery, visitor: VisitorConfig) -> Self {
        Self {
            repository,
            counts,
            visitor,
        }
    }

    /// Record one visit of `property_id`.
    ///
    /// Reuses the visitor token found in `tokens`; without one the store
    /// issues a new token, which is then persisted site-wide for
    /// `max_age_days`. Concurrent first visits from one client may each
    /// mint a token.
    pub async fn record_visit(
        &self,
        tokens: &dyn TokenStore,
        property_id: Uuid,
    ) -> AppResult<RecordedVisit> {
        let key = self.visitor.cookie_name.as_str();
        let existing = tokens.get(key);

        let new_visit = match &existing {
            Some(token) => NewVisit::for_visitor(property_id, token.as_str()),
            None => NewVisit::anonymous(property_id),
        };

        let visit = self
            .repository
            .visits
            .insert(&new_visit)
            .await
            .map_err(|e| {
                tracing::error!("Failed to record visit for property {}: {}", property_id, e);
                e
            })?;

        let minted = existing.is_none();
        if minted {
            let options = PersistOptions::site_wide(
                Utc::now(),
                self.visitor.max_age_days,
                self.visitor.secure,
            );
            tokens.set(key, &visit.visitor_id, &options);
            tracing::info!("Issued visitor token on first visit to property {}", property_id);
        } else {
            tracing::debug!("Recorded visit {} for property {}", visit.id, property_id);
        }

        self.counts.invalidate(property_id).await;

        Ok(RecordedVisit {
            visitor_id: visit.visitor_id.clone(),
            visit,
            minted,
        })
    }

    /// Count query invalidated by this service
    pub fn counts(&self) -> &VisitCountQuery {
        &self.counts
    }
}
