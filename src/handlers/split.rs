// src/handlers/split.rs

use crate::{
    errors::AppResult,
    models::{
        CreateSplitRequest, SplitConfiguration, SplitPreview, SplitPreviewQuery,
        UpdateSplitRequest,
    },
    services::split::SplitService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Create the revenue split between a tenant and the platform for one service
#[utoipa::path(
    post,
    path = "/api/v1/split-configurations",
    request_body = CreateSplitRequest,
    responses(
        (status = 201, description = "Split configuration created", body = SplitConfiguration),
        (status = 400, description = "Percentages are not positive or do not add up to 100%"),
        (status = 404, description = "Tenant or service not found"),
        (status = 409, description = "An active split already exists for this service"),
    ),
    tag = "Split Configurations"
)]
pub async fn create_split(
    State(state): State<AppState>,
    Json(body): Json<CreateSplitRequest>,
) -> AppResult<(StatusCode, Json<SplitConfiguration>)> {
    let split = SplitService::create(state.repo.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(split)))
}

/// Change percentages or (de)activate a split configuration
#[utoipa::path(
    patch,
    path = "/api/v1/split-configurations/{id}",
    params(("id" = Uuid, Path, description = "Split configuration ID")),
    request_body = UpdateSplitRequest,
    responses(
        (status = 200, description = "Split configuration updated", body = SplitConfiguration),
        (status = 400, description = "Resulting split is invalid"),
        (status = 404, description = "Split configuration not found"),
        (status = 409, description = "Another active split exists for this service"),
    ),
    tag = "Split Configurations"
)]
pub async fn update_split(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSplitRequest>,
) -> AppResult<Json<SplitConfiguration>> {
    let split = SplitService::update(state.repo.as_ref(), id, body).await?;
    Ok(Json(split))
}

/// Every split configuration of a tenant, active and inactive, newest first
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/split-configurations",
    params(("tenant_id" = i64, Path, description = "Tenant ID")),
    responses((status = 200, description = "Split configurations", body = Vec<SplitConfiguration>)),
    tag = "Split Configurations"
)]
pub async fn list_tenant_splits(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> AppResult<Json<Vec<SplitConfiguration>>> {
    let splits = SplitService::list_by_tenant(state.repo.as_ref(), tenant_id).await?;
    Ok(Json(splits))
}

/// How an amount would be divided at settlement
#[utoipa::path(
    get,
    path = "/api/v1/split-configurations/{id}/preview",
    params(
        ("id" = Uuid, Path, description = "Split configuration ID"),
        SplitPreviewQuery,
    ),
    responses(
        (status = 200, description = "Amount divided between tenant and platform", body = SplitPreview),
        (status = 404, description = "Split configuration not found"),
    ),
    tag = "Split Configurations"
)]
pub async fn preview_split(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SplitPreviewQuery>,
) -> AppResult<Json<SplitPreview>> {
    let preview = SplitService::preview(state.repo.as_ref(), id, query.valor).await?;
    Ok(Json(preview))
}
