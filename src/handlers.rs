use crate::config::Config;
use crate::enrichment::is_plausible_email;
use crate::errors::AppError;
use crate::models::{SearchQuery, SignupForm};
use crate::notifier::SignupNotifier;
use crate::pipeline::{LeadPipeline, TracingObserver};
use crate::query_parser::parse_search_input;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Landing page compiled into the binary, served when the configured file is missing.
const EMBEDDED_LANDING_PAGE: &str = include_str!("../static/index.html");

/// Largest target a single API search may ask for.
pub const MAX_REQUEST_TARGET: usize = 50;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Pipeline wired to the live directory, search engine and registry.
    pub pipeline: Arc<LeadPipeline>,
    /// Relay for landing-page signups.
    pub notifier: SignupNotifier,
}

/// Health check endpoint.
///
/// Returns the service status, version, and whether optional integrations are configured.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "leadseeds",
            "version": env!("CARGO_PKG_VERSION"),
            "registryConfigured": state.config.companies_house_api_key.is_some(),
            "signupRelayConfigured": state.notifier.is_configured(),
        })),
    )
}

/// GET /
///
/// Serves the landing page from `LANDING_PAGE_PATH`, falling back to the built-in copy.
pub async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    match tokio::fs::read_to_string(&state.config.landing_page_path).await {
        Ok(page) => Html(page),
        Err(e) => {
            tracing::debug!(
                "Landing page {} unavailable ({}), serving built-in page",
                state.config.landing_page_path,
                e
            );
            Html(EMBEDDED_LANDING_PAGE.to_string())
        }
    }
}

/// POST /api/v1/signup
///
/// Validates the form and relays it through the notifier.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignupForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if form.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if !is_plausible_email(&form.email) {
        return Err(AppError::BadRequest(format!(
            "'{}' is not a valid email address",
            form.email.trim()
        )));
    }

    state.notifier.notify(&form).await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free text, e.g. "plumbers in Chester".
    pub query: String,
    /// Overrides `TARGET_LEAD_COUNT` for this request.
    #[serde(default)]
    pub target_count: Option<usize>,
}

/// POST /api/v1/search
///
/// Parses the free-text query and runs one discovery. When either slot is missing the
/// partial parse is returned with 400 so the caller can ask for the rest.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Response, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("query is required".to_string()));
    }

    let query: SearchQuery = parse_search_input(&request.query);
    if !query.is_complete() {
        tracing::info!("Incomplete search query {:?} -> {:?}", request.query, query);
        let missing: Vec<&str> = [
            ("businessType", query.business_type.trim().is_empty()),
            ("location", query.location.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, is_missing)| is_missing.then_some(field))
        .collect();

        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Could not determine both business type and location",
                "missing": missing,
                "parsed": query,
            })),
        )
            .into_response());
    }

    let target = request
        .target_count
        .unwrap_or(state.pipeline.settings().target_count)
        .min(MAX_REQUEST_TARGET);
    let pipeline = state
        .pipeline
        .with_settings(state.pipeline.settings().clone().with_target(target));

    // Dropping this future (client gone) abandons the run
    let report = pipeline
        .run(&query, &TracingObserver, &CancellationToken::new())
        .await;

    Ok(Json(report).into_response())
}
