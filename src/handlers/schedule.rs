// src/handlers/schedule.rs

use crate::{
    errors::AppResult,
    models::{
        HorarioQuery, NextRunResponse, QuantizedHorario, ReconciliationConfig,
        UpsertReconciliationConfigRequest,
    },
    services::schedule::{ScheduleService, quantize_horario},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

/// Current reconciliation schedule, `null` when never configured
#[utoipa::path(
    get,
    path = "/api/v1/reconciliation-config",
    responses((status = 200, description = "Schedule, or null when never configured", body = ReconciliationConfig)),
    tag = "Reconciliation Schedule"
)]
pub async fn get_reconciliation_config(
    State(state): State<AppState>,
) -> AppResult<Json<Option<ReconciliationConfig>>> {
    let config = ScheduleService::get(state.repo.as_ref()).await?;
    Ok(Json(config))
}

#[utoipa::path(
    put,
    path = "/api/v1/reconciliation-config",
    request_body = UpsertReconciliationConfigRequest,
    responses(
        (status = 200, description = "Schedule saved", body = ReconciliationConfig),
        (status = 400, description = "Day field missing, out of range or not allowed for the frequency"),
    ),
    tag = "Reconciliation Schedule"
)]
pub async fn upsert_reconciliation_config(
    State(state): State<AppState>,
    Json(body): Json<UpsertReconciliationConfigRequest>,
) -> AppResult<Json<ReconciliationConfig>> {
    let config = ScheduleService::upsert(state.repo.as_ref(), body).await?;
    Ok(Json(config))
}

/// When the schedule fires next, in UTC
#[utoipa::path(
    get,
    path = "/api/v1/reconciliation-config/next-run",
    responses(
        (status = 200, description = "Next run", body = NextRunResponse),
        (status = 404, description = "No schedule configured"),
    ),
    tag = "Reconciliation Schedule"
)]
pub async fn next_reconciliation_run(
    State(state): State<AppState>,
) -> AppResult<Json<NextRunResponse>> {
    let (config, at) = ScheduleService::next_run(
        state.repo.as_ref(),
        Utc::now(),
        state.config.platform_utc_offset,
    )
    .await?;

    Ok(Json(NextRunResponse {
        proxima_execucao: at,
        frequencia: config.frequencia,
    }))
}

/// Rounds a time to the nearest half hour, as offered by the time picker
#[utoipa::path(
    get,
    path = "/api/v1/reconciliation-config/quantize",
    params(HorarioQuery),
    responses(
        (status = 200, description = "Rounded time", body = QuantizedHorario),
        (status = 400, description = "Not HH:MM"),
    ),
    tag = "Reconciliation Schedule"
)]
pub async fn quantize_reconciliation_horario(
    Query(query): Query<HorarioQuery>,
) -> AppResult<Json<QuantizedHorario>> {
    let horario = quantize_horario(&query.horario)?;
    Ok(Json(QuantizedHorario { horario }))
}
