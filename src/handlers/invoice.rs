// src/handlers/invoice.rs

use crate::{
    errors::AppResult,
    models::{GenerateBoletoRequest, Invoice, UninvoicedCompany},
    services::invoicing::{InvoiceService, default_due_date},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::warn;

/// Appointments not yet invoiced, grouped by billing company
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/uninvoiced",
    params(("tenant_id" = i64, Path, description = "Tenant ID")),
    responses((status = 200, description = "Un-invoiced appointments per company", body = Vec<UninvoicedCompany>)),
    tag = "Invoices"
)]
pub async fn list_uninvoiced(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> AppResult<Json<Vec<UninvoicedCompany>>> {
    let groups = InvoiceService::uninvoiced_by_company(state.repo.as_ref(), tenant_id).await?;
    Ok(Json(groups))
}

/// Issue one boleto (or PIX charge) for a batch of a company's appointments.
/// The notification e-mail goes out in the background.
#[utoipa::path(
    post,
    path = "/api/v1/invoices/boleto",
    request_body = GenerateBoletoRequest,
    responses(
        (status = 201, description = "Invoice issued", body = Invoice),
        (status = 400, description = "Empty, duplicated or foreign appointments, or zero total"),
        (status = 404, description = "Company or appointment not found"),
        (status = 409, description = "An appointment is already invoiced"),
        (status = 502, description = "Payment gateway rejected the charge"),
    ),
    tag = "Invoices"
)]
pub async fn generate_boleto(
    State(state): State<AppState>,
    Json(body): Json<GenerateBoletoRequest>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let default_due = default_due_date(
        Utc::now(),
        state.config.platform_utc_offset,
        state.config.invoice_due_days,
    );

    let issued = InvoiceService::generate_boleto(
        state.repo.as_ref(),
        state.gateway.as_ref(),
        body,
        default_due,
        state.config.platform_utc_offset,
    )
    .await?;

    if let Some(email_svc) = state.email.clone() {
        let company = issued.company.clone();
        let invoice = issued.invoice.clone();

        tokio::spawn(async move {
            if let Err(e) = email_svc.send_invoice_issued(&company, &invoice).await {
                warn!(numero = %invoice.numero, "Invoice email failed: {}", e);
            }
        });
    }

    Ok((StatusCode::CREATED, Json(issued.invoice)))
}

/// Invoices of a tenant, newest first
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/invoices",
    params(("tenant_id" = i64, Path, description = "Tenant ID")),
    responses((status = 200, description = "Invoices", body = Vec<Invoice>)),
    tag = "Invoices"
)]
pub async fn list_tenant_invoices(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> AppResult<Json<Vec<Invoice>>> {
    let invoices = InvoiceService::list_by_tenant(state.repo.as_ref(), tenant_id).await?;
    Ok(Json(invoices))
}
