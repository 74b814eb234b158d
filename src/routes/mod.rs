// src/routes/mod.rs

use crate::{
    handlers::{
        general::{health_handler, root_handler},
        invoice::{generate_boleto, list_tenant_invoices, list_uninvoiced},
        reconciliation::{
            create_reconciliation, get_reconciliation, import_reconciliation,
            list_reconciliation_items, list_tenant_reconciliations,
        },
        schedule::{
            get_reconciliation_config, next_reconciliation_run, quantize_reconciliation_horario,
            upsert_reconciliation_config,
        },
        split::{create_split, list_tenant_splits, preview_split, update_split},
        webhook::iugu_webhook,
    },
    openapi::ApiDoc,
    state::AppState,
};
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Split Configurations ─────────────────────────────
        .route("/split-configurations", post(create_split))
        .route("/split-configurations/{id}", patch(update_split))
        .route("/split-configurations/{id}/preview", get(preview_split))
        .route(
            "/tenants/{tenant_id}/split-configurations",
            get(list_tenant_splits),
        )
        // ─── Invoices ─────────────────────────────────────────
        .route("/tenants/{tenant_id}/uninvoiced", get(list_uninvoiced))
        .route("/invoices/boleto", post(generate_boleto))
        .route("/tenants/{tenant_id}/invoices", get(list_tenant_invoices))
        // ─── Reconciliations ──────────────────────────────────
        .route("/reconciliations", post(create_reconciliation))
        .route("/reconciliations/import", post(import_reconciliation))
        .route("/reconciliations/{id}", get(get_reconciliation))
        .route("/reconciliations/{id}/items", get(list_reconciliation_items))
        .route(
            "/tenants/{tenant_id}/reconciliations",
            get(list_tenant_reconciliations),
        )
        // ─── Reconciliation Schedule ──────────────────────────
        .route(
            "/reconciliation-config",
            get(get_reconciliation_config).put(upsert_reconciliation_config),
        )
        .route(
            "/reconciliation-config/next-run",
            get(next_reconciliation_run),
        )
        .route(
            "/reconciliation-config/quantize",
            get(quantize_reconciliation_horario),
        )
        // ─── Gateway Webhooks ─────────────────────────────────
        .route("/webhooks/iugu", post(iugu_webhook))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/v1", api_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
