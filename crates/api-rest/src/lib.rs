//! # API REST
//!
//! REST API implementation for the clinic visit records system.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, API key checks)
//!
//! Uses `api-shared` for wire types and `clinic-core` for all business logic.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::{validate_api_key, API_KEY_HEADER};
use api_shared::{self as wire, HealthService};
use clinic_core::{
    ClinicError, ClinicStore, CoreConfig, PatientService, SpecialtyProfile, VisitService,
};

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    patients: PatientService,
    visits: VisitService,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Builds handler state over `store`.
    ///
    /// When `api_key` is `Some`, every route except `/health` requires a matching
    /// `x-api-key` header.
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicStore>, api_key: Option<String>) -> Self {
        Self {
            patients: PatientService::new(store.clone()),
            visits: VisitService::new(cfg.clone(), store),
            cfg,
            api_key: api_key.map(Arc::from),
        }
    }
}

/// Error returned by handlers, rendered as a JSON `ErrorRes` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        let status = match &err {
            ClinicError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClinicError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClinicError::InvalidState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if err.is_storage() {
            tracing::error!("storage error: {:?}", err);
            return Self {
                status,
                message: "Internal error".into(),
            };
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(wire::ErrorRes {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        get_patient,
        delete_patient,
        list_patient_visits,
        start_or_resume_visit,
        list_paused_visits,
        get_visit,
        pause_visit,
        resume_visit,
        end_visit,
        add_entry,
        record_vitals,
        list_sections,
    ),
    components(schemas(
        wire::HealthRes,
        wire::ErrorRes,
        wire::CreatePatientReq,
        wire::PatientRes,
        wire::ListPatientsRes,
        wire::StartVisitReq,
        wire::VisitStartRes,
        wire::VitalsDto,
        wire::VisitEntryRes,
        wire::VisitRes,
        wire::ListVisitsRes,
        wire::AddEntryReq,
        wire::PausedVisitSummaryRes,
        wire::ListPausedVisitsRes,
        wire::SectionsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with OpenAPI docs, CORS and API key checks applied.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", get(get_patient).delete(delete_patient))
        .route("/patients/:id/visits", get(list_patient_visits))
        .route("/visits", post(start_or_resume_visit))
        .route("/visits/paused", get(list_paused_visits))
        .route("/visits/:id", get(get_visit))
        .route("/visits/:id/pause", post(pause_visit))
        .route("/visits/:id/resume", post(resume_visit))
        .route("/visits/:id/end", post(end_visit))
        .route("/visits/:id/entries", post(add_entry))
        .route("/visits/:id/vitals", put(record_vitals))
        .route("/sections", get(list_sections))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the REST API until the server fails.
///
/// # Errors
/// Returns an error if the address cannot be bound or the HTTP server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Clinic REST API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.api_key.as_deref() {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if let Err(e) = validate_api_key(provided, expected) {
            tracing::warn!("rejected request to {}: {}", req.uri().path(), e);
            return Err(ApiError {
                status: StatusCode::UNAUTHORIZED,
                message: e.to_string(),
            });
        }
    }
    Ok(next.run(req).await)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = wire::HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Never requires an API key.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<wire::HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = wire::ListPatientsRes),
        (status = 500, description = "Internal server error", body = wire::ErrorRes)
    )
)]
/// List all patients that have not been deleted
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<wire::ListPatientsRes>> {
    let patients = state.patients.list_patients()?;
    Ok(Json(wire::ListPatientsRes {
        patients: patients.into_iter().map(wire::PatientRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = wire::CreatePatientReq,
    responses(
        (status = 201, description = "Patient created", body = wire::PatientRes),
        (status = 400, description = "Bad request", body = wire::ErrorRes),
        (status = 500, description = "Internal server error", body = wire::ErrorRes)
    )
)]
/// Register a new patient
///
/// # Errors
/// Returns `400 Bad Request` if a name is blank or the birth date is malformed.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<wire::CreatePatientReq>,
) -> ApiResult<(StatusCode, Json<wire::PatientRes>)> {
    let patient = state.patients.create_patient(
        &req.first_name,
        &req.last_name,
        req.birth_date.as_deref(),
        req.phone.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = wire::PatientRes),
        (status = 404, description = "Patient not found", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<wire::PatientRes>> {
    Ok(Json(state.patients.get_patient(id)?.into()))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient soft-deleted"),
        (status = 404, description = "Patient not found", body = wire::ErrorRes),
        (status = 409, description = "Patient has a visit that has not ended", body = wire::ErrorRes)
    )
)]
/// Soft-delete a patient
///
/// The record is kept in storage but hidden from listings and visit operations.
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<StatusCode> {
    state.patients.soft_delete_patient(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/visits",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Visits, oldest first", body = wire::ListVisitsRes),
        (status = 404, description = "Patient not found", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_patient_visits(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<wire::ListVisitsRes>> {
    let visits = state.visits.visits_for_patient(id)?;
    Ok(Json(wire::ListVisitsRes {
        visits: visits.iter().map(wire::VisitRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/visits",
    request_body = wire::StartVisitReq,
    responses(
        (status = 200, description = "Visit started, resumed or reported", body = wire::VisitStartRes),
        (status = 400, description = "Bad request", body = wire::ErrorRes),
        (status = 404, description = "Patient not found", body = wire::ErrorRes)
    )
)]
/// Start a visit for a patient, or return the visit they already have open
///
/// A paused visit is either reported back (`has_paused_visit`) or resumed (`is_resumed`),
/// depending on the server's paused visit policy.
#[axum::debug_handler]
async fn start_or_resume_visit(
    State(state): State<AppState>,
    Json(req): Json<wire::StartVisitReq>,
) -> ApiResult<Json<wire::VisitStartRes>> {
    let result = state.visits.start_or_resume_visit(
        req.patient_id,
        &req.symptom,
        &req.duration,
        req.note.as_deref(),
    )?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    get,
    path = "/visits/paused",
    responses(
        (status = 200, description = "Paused visits, longest paused first", body = wire::ListPausedVisitsRes)
    )
)]
#[axum::debug_handler]
async fn list_paused_visits(
    State(state): State<AppState>,
) -> ApiResult<Json<wire::ListPausedVisitsRes>> {
    let visits = state.visits.list_paused_visits(chrono::Utc::now())?;
    Ok(Json(wire::ListPausedVisitsRes {
        visits: visits
            .into_iter()
            .map(wire::PausedVisitSummaryRes::from)
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/visits/{id}",
    params(("id" = i64, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit", body = wire::VisitRes),
        (status = 404, description = "Visit not found", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_visit(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<wire::VisitRes>> {
    Ok(Json((&state.visits.get_visit(id)?).into()))
}

#[utoipa::path(
    post,
    path = "/visits/{id}/pause",
    params(("id" = i64, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit paused", body = wire::VisitRes),
        (status = 404, description = "Visit not found", body = wire::ErrorRes),
        (status = 409, description = "Visit is not active", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn pause_visit(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<wire::VisitRes>> {
    Ok(Json((&state.visits.pause_visit(id)?).into()))
}

#[utoipa::path(
    post,
    path = "/visits/{id}/resume",
    params(("id" = i64, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit resumed", body = wire::VisitRes),
        (status = 404, description = "Visit not found", body = wire::ErrorRes),
        (status = 409, description = "Visit is not paused", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn resume_visit(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<wire::VisitRes>> {
    Ok(Json((&state.visits.resume_visit(id)?).into()))
}

#[utoipa::path(
    post,
    path = "/visits/{id}/end",
    params(("id" = i64, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit ended (or was already ended)", body = wire::VisitRes),
        (status = 404, description = "Visit not found", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn end_visit(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<wire::VisitRes>> {
    Ok(Json((&state.visits.end_visit(id)?).into()))
}

#[utoipa::path(
    post,
    path = "/visits/{id}/entries",
    params(("id" = i64, Path, description = "Visit id")),
    request_body = wire::AddEntryReq,
    responses(
        (status = 201, description = "Entry added", body = wire::VisitEntryRes),
        (status = 400, description = "Bad request", body = wire::ErrorRes),
        (status = 404, description = "Visit not found", body = wire::ErrorRes),
        (status = 409, description = "Visit has ended", body = wire::ErrorRes)
    )
)]
/// Append a clinical entry to an open visit
#[axum::debug_handler]
async fn add_entry(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(req): Json<wire::AddEntryReq>,
) -> ApiResult<(StatusCode, Json<wire::VisitEntryRes>)> {
    let profile = req
        .profile
        .as_deref()
        .map(str::parse::<SpecialtyProfile>)
        .transpose()?
        .unwrap_or(SpecialtyProfile::Generic);

    let entry = state.visits.add_entry(
        id,
        profile,
        &req.section,
        &req.content,
        req.system_code.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json((&entry).into())))
}

#[utoipa::path(
    put,
    path = "/visits/{id}/vitals",
    params(("id" = i64, Path, description = "Visit id")),
    request_body = wire::VitalsDto,
    responses(
        (status = 200, description = "Vitals recorded", body = wire::VisitRes),
        (status = 400, description = "Implausible readings", body = wire::ErrorRes),
        (status = 404, description = "Visit not found", body = wire::ErrorRes),
        (status = 409, description = "Visit has ended", body = wire::ErrorRes)
    )
)]
#[axum::debug_handler]
async fn record_vitals(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(req): Json<wire::VitalsDto>,
) -> ApiResult<Json<wire::VisitRes>> {
    Ok(Json((&state.visits.record_vitals(id, req.into())?).into()))
}

#[utoipa::path(
    get,
    path = "/sections",
    responses(
        (status = 200, description = "Sections new visits are created with", body = wire::SectionsRes)
    )
)]
#[axum::debug_handler]
async fn list_sections(State(state): State<AppState>) -> Json<wire::SectionsRes> {
    Json(wire::SectionsRes {
        profiles: state
            .cfg
            .specialty_profiles()
            .iter()
            .map(|p| p.name().to_string())
            .collect(),
        sections: state.visits.active_sections(),
    })
}
