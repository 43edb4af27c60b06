// rest_api/src/handlers.rs

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use models::medical::{
    Action, ActionType, ActionUpdate, EntityId, NewAction, NewOrganization, NewPatient, NewStaff, NewTransfer,
    NewVisit, Organization, Patient, Staff, Visit, VisitPatch,
};
use models::read_models::{EmergencyEntry, PatientDetails, QueueEntry, Stats};
use security::Claims;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult, RestApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub org_code: String,
    pub employee_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub staff: Staff,
    pub organization: Organization,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredOrganization {
    pub organization: Organization,
    pub admin: Staff,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffQuery {
    pub organization_id: EntityId,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendantRequest {
    pub staff_id: EntityId,
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    #[serde(rename = "type")]
    pub action_type: ActionType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransfersQuery {
    pub target_org_id: EntityId,
}

/// Every `/api` route except the WebSocket upgrade.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/session", get(session))
        .route("/staff", get(list_staff).post(create_staff))
        .route("/admin/organizations", get(list_organizations).post(register_organization))
        .route("/admin/organizations/:id", axum::routing::delete(delete_organization))
        .route("/hospitals", get(list_hospitals))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/search", get(search_patients))
        .route("/patients/:id", get(get_patient).put(update_patient).delete(delete_patient))
        .route("/patients/:id/details", get(patient_details))
        .route("/visits", post(create_visit))
        .route("/visits/active-emergencies", get(active_emergencies))
        .route("/visits/:id", get(get_visit).patch(update_visit))
        .route("/visits/:id/attendant", patch(assign_attendant))
        .route("/actions", get(actions_by_type).post(create_action))
        .route("/actions/:id", get(get_action).patch(update_action))
        .route("/departments/:role/queue", get(department_queue))
        .route("/transfers", get(incoming_transfers).post(create_transfer))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .route("/version", get(version))
}

async fn login(State(state): State<AppState>, ApiJson(request): ApiJson<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    let (staff, organization) = state
        .app
        .identity
        .authenticate(&request.org_code, &request.employee_id, &request.password)
        .await?;
    let token = state.tokens.issue(&staff)?;
    Ok(Json(LoginResponse { staff, organization, token }))
}

async fn session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Claims>> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| RestApiError::Unauthorized("Missing bearer token".into()))?;
    let claims = state.tokens.verify(token.trim()).map_err(|e| {
        debug!(error = %e, "Session token rejected");
        RestApiError::Unauthorized("Invalid or expired token".into())
    })?;
    Ok(Json(claims))
}

async fn list_staff(State(state): State<AppState>, ApiQuery(query): ApiQuery<StaffQuery>) -> ApiResult<Json<Vec<Staff>>> {
    Ok(Json(state.app.identity.list_staff(query.organization_id).await?))
}

async fn create_staff(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewStaff>,
) -> ApiResult<(StatusCode, Json<Staff>)> {
    let staff = state.app.identity.create_staff(request).await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

async fn list_organizations(State(state): State<AppState>) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(state.app.identity.list_organizations().await?))
}

async fn register_organization(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewOrganization>,
) -> ApiResult<(StatusCode, Json<RegisteredOrganization>)> {
    let (organization, admin) = state.app.identity.register_organization(request).await?;
    info!(organization_id = organization.id, code = %organization.code, "Organization registered");
    Ok((StatusCode::CREATED, Json(RegisteredOrganization { organization, admin })))
}

async fn delete_organization(State(state): State<AppState>, ApiPath(id): ApiPath<EntityId>) -> ApiResult<Json<Value>> {
    state.app.identity.delete_organization(id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Organization {} deleted", id),
    })))
}

async fn list_hospitals(State(state): State<AppState>) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(state.app.identity.list_hospitals().await?))
}

async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.app.patients.list().await?))
}

async fn create_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let patient = state.app.patients.create(request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn search_patients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.app.patients.search(&query.query).await?))
}

async fn get_patient(State(state): State<AppState>, ApiPath(id): ApiPath<EntityId>) -> ApiResult<Json<Patient>> {
    Ok(Json(state.app.patients.get(id).await?))
}

async fn update_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(request): ApiJson<NewPatient>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.app.patients.update(id, request).await?))
}

async fn delete_patient(State(state): State<AppState>, ApiPath(id): ApiPath<EntityId>) -> ApiResult<Json<Value>> {
    let removed = state.app.patients.delete(id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Patient {} deleted", id),
        "removed": removed,
    })))
}

async fn patient_details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<PatientDetails>> {
    Ok(Json(state.app.patients.details(id).await?))
}

async fn create_visit(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewVisit>,
) -> ApiResult<(StatusCode, Json<Visit>)> {
    let visit = state.app.encounters.create_visit(request).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

async fn active_emergencies(State(state): State<AppState>) -> ApiResult<Json<Vec<EmergencyEntry>>> {
    Ok(Json(state.app.encounters.list_active_emergencies().await?))
}

async fn get_visit(State(state): State<AppState>, ApiPath(id): ApiPath<EntityId>) -> ApiResult<Json<Visit>> {
    Ok(Json(state.app.encounters.get_visit(id).await?))
}

async fn update_visit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(patch): ApiJson<VisitPatch>,
) -> ApiResult<Json<Visit>> {
    Ok(Json(state.app.encounters.update_visit(id, patch).await?))
}

async fn assign_attendant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(request): ApiJson<AttendantRequest>,
) -> ApiResult<Json<Visit>> {
    Ok(Json(state.app.encounters.assign_attendant(id, request.staff_id).await?))
}

async fn actions_by_type(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ActionsQuery>,
) -> ApiResult<Json<Vec<Action>>> {
    Ok(Json(state.app.router.actions_by_type(query.action_type).await?))
}

async fn create_action(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewAction>,
) -> ApiResult<(StatusCode, Json<Action>)> {
    let action = state.app.router.create_action(request).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn get_action(State(state): State<AppState>, ApiPath(id): ApiPath<EntityId>) -> ApiResult<Json<Action>> {
    Ok(Json(state.app.router.get_action(id).await?))
}

async fn update_action(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(update): ApiJson<ActionUpdate>,
) -> ApiResult<Json<Action>> {
    Ok(Json(state.app.router.update_action(id, update).await?))
}

async fn department_queue(
    State(state): State<AppState>,
    ApiPath(role): ApiPath<String>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(state.app.router.department_queue(&role).await?))
}

async fn incoming_transfers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransfersQuery>,
) -> ApiResult<Json<Vec<Action>>> {
    Ok(Json(state.app.router.incoming_transfers(query.target_org_id).await?))
}

async fn create_transfer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewTransfer>,
) -> ApiResult<(StatusCode, Json<Action>)> {
    let transfer = state.app.router.create_transfer(request).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

async fn stats(State(state): State<AppState>) -> ApiResult<Json<Stats>> {
    Ok(Json(state.app.stats.get_stats().await?))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "MediConnect API is healthy",
        "sessions": state.app.notifier.session_count().await,
    }))
}

async fn version() -> impl IntoResponse {
    Json(json!({
        "name": "mediconnect",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
