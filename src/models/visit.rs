//! Property visit models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Stored visit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Visit {
    pub id: i64,
    /// Listing that was viewed
    pub property_id: Uuid,
    /// Pseudonymous visitor token
    pub visitor_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `visitor_id` when it is absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub property_id: Uuid,
    pub visitor_id: Option<String>,
}

impl NewVisit {
    pub fn for_visitor(property_id: Uuid, visitor_id: impl Into<String>) -> Self {
        Self {
            property_id,
            visitor_id: Some(visitor_id.into()),
        }
    }

    pub fn anonymous(property_id: Uuid) -> Self {
        Self {
            property_id,
            visitor_id: None,
        }
    }
}

/// Outcome of recording a visit
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordedVisit {
    pub visit: Visit,
    pub visitor_id: String,
    /// True when this call issued a new visitor token
    pub minted: bool,
}

/// Lifecycle of a visit-count query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitCountState {
    Loading,
    Ready { count: i64 },
    Unavailable { reason: String },
}

impl VisitCountState {
    pub fn is_loading(&self) -> bool {
        matches!(self, VisitCountState::Loading)
    }

    pub fn count(&self) -> Option<i64> {
        match self {
            VisitCountState::Ready { count } => Some(*count),
            _ => None,
        }
    }
}

/// Visit count as exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VisitCountView {
    pub property_id: Uuid,
    /// Undefined until the count query resolves
    pub count: Option<i64>,
    pub is_loading: bool,
    /// Reason the count is unavailable
    pub error: Option<String>,
}

impl VisitCountView {
    pub fn new(property_id: Uuid, state: &VisitCountState) -> Self {
        let error = match state {
            VisitCountState::Unavailable { reason } => Some(reason.clone()),
            _ => None,
        };

        Self {
            property_id,
            count: state.count(),
            is_loading: state.is_loading(),
            error,
        }
    }
}
