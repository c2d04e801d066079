//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, visits};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Staybook Visits API",
        version = "1.0.0",
        description = "Visitor tracking and visit counts for rental listings",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Visits
        visits::record_visit,
        visits::get_visit_count,
    ),
    components(
        schemas(
            crate::models::visit::Visit,
            crate::models::visit::RecordedVisit,
            crate::models::visit::VisitCountView,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "visits", description = "Property visit tracking")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
