//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Audit logger → 2. CORS → 3. `Cache-Control: no-store` → 4. Envelope normalizer

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, Uri};
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{
    admin, appointments, auth, catalog, clinical, doctors, equipment, feedback, health, patients,
};
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router with every endpoint under `/api/`.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Browser origins come from configuration; unparseable entries are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

pub(crate) fn build_router(ctx: ApiContext) -> Router {
    let cors = cors_layer(&ctx.core.config().cors_origins);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(health::check))
        // Accounts
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        // Catalogs
        .route("/departments", get(catalog::departments))
        .route("/doctors", get(catalog::doctors))
        .route("/timeslots", get(catalog::time_slots))
        .route("/medications", get(catalog::medications))
        // Doctors
        .route("/doctors/:doctor_id/availability", get(doctors::availability))
        .route(
            "/doctors/:doctor_id/unavailability",
            get(doctors::list_unavailability).post(doctors::declare_unavailability),
        )
        .route("/doctors/:doctor_id/appointments", get(doctors::appointments))
        .route("/doctors/:doctor_id/feedback", get(doctors::list_feedback))
        // Patients
        .route("/appointments", post(appointments::book))
        .route("/patients/:patient_id/appointments", get(patients::appointments))
        .route("/patients/:patient_id/balance", get(patients::balance))
        .route("/patients/:patient_id/health-card", get(patients::health_card))
        .route("/patients/:patient_id/blood-tests", get(patients::blood_tests))
        .route("/feedback", post(feedback::give))
        // Clinical records
        .route("/blood-tests", post(clinical::create_blood_test))
        .route("/blood-tests/recent", get(clinical::recent_blood_tests))
        .route("/blood-tests/:bt_id", put(clinical::update_blood_test))
        .route("/prescriptions", post(clinical::create_prescription))
        .route(
            "/prescriptions/:p_id/medications",
            post(clinical::prescribe_medication),
        )
        // Inventory
        .route(
            "/equipment",
            get(equipment::list).post(equipment::create).put(equipment::update),
        )
        .route("/equipment/:me_id", patch(equipment::adjust))
        // Administration
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/admin/users/:user_id",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/users/:user_id/role", put(admin::change_role))
        .route("/admin/stats", get(admin::stats));

    Router::new()
        .nest("/api", api)
        .fallback(route_not_found)
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::audit::log_access))
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(axum::middleware::from_fn(middleware::envelope::normalize)),
        )
}
