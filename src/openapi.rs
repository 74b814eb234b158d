// src/openapi.rs

use crate::{
    models::{
        Appointment, Classificacao, ColumnMapping, CreateReconciliationRequest,
        CreateSplitRequest, FormaPagamento, Frequencia, GenerateBoletoRequest,
        GovernmentInspection, ImportReconciliationRequest, Invoice, InvoiceStatus, IuguWebhook,
        NextRunResponse, QuantizedHorario, ReconciliationConfig, ReconciliationItem,
        ReconciliationReport, ReconciliationStatus, SplitConfiguration, SplitPreview,
        UninvoicedCompany, UpdateSplitRequest, UpsertReconciliationConfigRequest,
    },
    money::{BasisPoints, Cents, PercentualInput},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vistoria Platform API",
        version = "1.0.0",
        description = "Billing and reconciliation core of a multi-tenant vehicle-inspection \
            platform. Configures tenant/platform revenue splits, issues boletos and PIX \
            charges through Iugu for batches of company appointments, and reconciles the \
            platform's inspections against the government registry.",
        license(name = "MIT")
    ),
    paths(
        // Split configurations
        crate::handlers::split::create_split,
        crate::handlers::split::update_split,
        crate::handlers::split::list_tenant_splits,
        crate::handlers::split::preview_split,
        // Invoices
        crate::handlers::invoice::list_uninvoiced,
        crate::handlers::invoice::generate_boleto,
        crate::handlers::invoice::list_tenant_invoices,
        // Reconciliations
        crate::handlers::reconciliation::create_reconciliation,
        crate::handlers::reconciliation::import_reconciliation,
        crate::handlers::reconciliation::list_tenant_reconciliations,
        crate::handlers::reconciliation::get_reconciliation,
        crate::handlers::reconciliation::list_reconciliation_items,
        // Schedule
        crate::handlers::schedule::get_reconciliation_config,
        crate::handlers::schedule::upsert_reconciliation_config,
        crate::handlers::schedule::next_reconciliation_run,
        crate::handlers::schedule::quantize_reconciliation_horario,
        // Webhooks
        crate::handlers::webhook::iugu_webhook,
    ),
    components(
        schemas(
            Cents, BasisPoints, PercentualInput,
            SplitConfiguration, CreateSplitRequest, UpdateSplitRequest, SplitPreview,
            Appointment, UninvoicedCompany, GenerateBoletoRequest, Invoice, InvoiceStatus,
            FormaPagamento,
            GovernmentInspection, CreateReconciliationRequest, ImportReconciliationRequest,
            ColumnMapping, ReconciliationReport, ReconciliationItem, ReconciliationStatus,
            Classificacao,
            ReconciliationConfig, UpsertReconciliationConfigRequest, NextRunResponse,
            QuantizedHorario, Frequencia,
            IuguWebhook,
        )
    ),
    tags(
        (name = "Split Configurations", description = "Tenant/platform revenue split per service"),
        (name = "Invoices", description = "Batch boleto and PIX issuance for companies"),
        (name = "Reconciliations", description = "Platform vs. government inspection reconciliation"),
        (name = "Reconciliation Schedule", description = "When automatic reconciliation runs"),
        (name = "Webhooks", description = "Payment gateway notifications"),
    )
)]
pub struct ApiDoc;
