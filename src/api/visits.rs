//! Property visit API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::visit::{RecordedVisit, VisitCountState, VisitCountView},
    services::token_store::CookieTokenStore,
};

/// Record a visit of a property
///
/// The visitor cookie is reused when present, otherwise a new one is set.
#[utoipa::path(
    post,
    path = "/properties/{property_id}/visits",
    tag = "visits",
    params(("property_id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 201, description = "Visit recorded", body = RecordedVisit),
        (status = 400, description = "Malformed property ID", body = crate::error::ErrorResponse),
        (status = 503, description = "Visit store unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn record_visit(
    State(state): State<crate::AppState>,
    WithRejection(Path(property_id), _): WithRejection<Path<Uuid>, AppError>,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar, Json<RecordedVisit>)> {
    let tokens = CookieTokenStore::new(jar);
    let recorded = state
        .services
        .visits
        .record_visit(&tokens, property_id)
        .await?;

    Ok((StatusCode::CREATED, tokens.into_jar(), Json(recorded)))
}

/// Get the number of recorded visits of a property
#[utoipa::path(
    get,
    path = "/properties/{property_id}/visits/count",
    tag = "visits",
    params(("property_id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Visit count", body = VisitCountView),
        (status = 400, description = "Malformed property ID", body = crate::error::ErrorResponse),
        (status = 503, description = "Visit count unavailable", body = VisitCountView)
    )
)]
pub async fn get_visit_count(
    State(state): State<crate::AppState>,
    WithRejection(Path(property_id), _): WithRejection<Path<Uuid>, AppError>,
) -> (StatusCode, Json<VisitCountView>) {
    let count = state.services.visit_counts.fetch(property_id).await;

    let status = match count {
        VisitCountState::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(VisitCountView::new(property_id, &count)))
}
