// src/handlers/reconciliation.rs

use crate::{
    errors::AppResult,
    models::{
        CreateReconciliationRequest, ImportReconciliationRequest, ReconciliationItem,
        ReconciliationReport,
    },
    services::reconciliation::ReconciliationService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Reconcile the government's inspections of one day against the platform
#[utoipa::path(
    post,
    path = "/api/v1/reconciliations",
    request_body = CreateReconciliationRequest,
    responses(
        (status = 201, description = "Reconciliation report", body = ReconciliationReport),
        (status = 400, description = "Empty list or unusable row"),
        (status = 404, description = "Tenant not found"),
    ),
    tag = "Reconciliations"
)]
pub async fn create_reconciliation(
    State(state): State<AppState>,
    Json(body): Json<CreateReconciliationRequest>,
) -> AppResult<(StatusCode, Json<ReconciliationReport>)> {
    let report = ReconciliationService::create(state.repo.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Same as creating a reconciliation, from a CSV export of the registry
#[utoipa::path(
    post,
    path = "/api/v1/reconciliations/import",
    request_body = ImportReconciliationRequest,
    responses(
        (status = 201, description = "Reconciliation report", body = ReconciliationReport),
        (status = 400, description = "CSV could not be read or a row is unusable"),
        (status = 404, description = "Tenant not found"),
    ),
    tag = "Reconciliations"
)]
pub async fn import_reconciliation(
    State(state): State<AppState>,
    Json(body): Json<ImportReconciliationRequest>,
) -> AppResult<(StatusCode, Json<ReconciliationReport>)> {
    let report = ReconciliationService::import_csv(state.repo.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/reconciliations",
    params(("tenant_id" = i64, Path, description = "Tenant ID")),
    responses((status = 200, description = "Reports, newest first", body = Vec<ReconciliationReport>)),
    tag = "Reconciliations"
)]
pub async fn list_tenant_reconciliations(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> AppResult<Json<Vec<ReconciliationReport>>> {
    let reports = ReconciliationService::list_by_tenant(state.repo.as_ref(), tenant_id).await?;
    Ok(Json(reports))
}

#[utoipa::path(
    get,
    path = "/api/v1/reconciliations/{id}",
    params(("id" = Uuid, Path, description = "Reconciliation report ID")),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconciliationReport),
        (status = 404, description = "Report not found"),
    ),
    tag = "Reconciliations"
)]
pub async fn get_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReconciliationReport>> {
    let report = ReconciliationService::get(state.repo.as_ref(), id).await?;
    Ok(Json(report))
}

/// Per-row classification of a report
#[utoipa::path(
    get,
    path = "/api/v1/reconciliations/{id}/items",
    params(("id" = Uuid, Path, description = "Reconciliation report ID")),
    responses(
        (status = 200, description = "Classified rows", body = Vec<ReconciliationItem>),
        (status = 404, description = "Report not found"),
    ),
    tag = "Reconciliations"
)]
pub async fn list_reconciliation_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ReconciliationItem>>> {
    let items = ReconciliationService::items(state.repo.as_ref(), id).await?;
    Ok(Json(items))
}
