// src/db/mod.rs

//! Persistence seams. Services talk to these traits; `PgRepository` is the
//! production implementation.

use crate::{
    errors::AppResult,
    models::{
        Appointment, BillableAppointment, Company, Invoice, InvoiceStatus, PlatformInspection,
        ReconciliationConfig, ReconciliationItem, ReconciliationReport, SplitConfiguration,
    },
    services::split::SplitChange,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub mod postgres;

pub use postgres::PgRepository;

#[async_trait]
pub trait SplitRepository: Send + Sync {
    /// Tenant that owns the service, `None` when the service does not exist
    async fn service_tenant(&self, service_id: i64) -> AppResult<Option<i64>>;

    /// Fails with `Conflict` when another active row exists for the pair
    async fn insert_split(&self, split: &SplitConfiguration) -> AppResult<SplitConfiguration>;

    async fn find_split(&self, id: Uuid) -> AppResult<Option<SplitConfiguration>>;

    /// Applies `change` to the stored row and writes the result atomically.
    /// The row stays locked between read and write.
    async fn update_split(&self, id: Uuid, change: &SplitChange) -> AppResult<SplitConfiguration>;

    async fn list_splits(&self, tenant_id: i64) -> AppResult<Vec<SplitConfiguration>>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_company(&self, company_id: i64) -> AppResult<Option<Company>>;

    /// Non-cancelled appointments of the tenant that have a billing company
    /// and are not linked to any invoice
    async fn list_uninvoiced(&self, tenant_id: i64) -> AppResult<Vec<Appointment>>;

    async fn find_billable(&self, ids: &[i64]) -> AppResult<Vec<BillableAppointment>>;

    /// Inserts the invoice and links `invoice.appointment_ids` in one
    /// transaction. An appointment already linked yields `Conflict`.
    async fn insert_invoice(&self, invoice: &Invoice) -> AppResult<Invoice>;

    async fn list_invoices(&self, tenant_id: i64) -> AppResult<Vec<Invoice>>;

    async fn find_invoice_by_gateway_id(&self, gateway_id: &str) -> AppResult<Option<Invoice>>;

    /// Moves a `pendente` invoice to `status`; `None` when it was not pending
    async fn settle_invoice(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        data_pagamento: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Invoice>>;
}

#[async_trait]
pub trait ReconciliationRepository: Send + Sync {
    async fn tenant_exists(&self, tenant_id: i64) -> AppResult<bool>;

    async fn platform_inspections(
        &self,
        tenant_id: i64,
        data_referencia: NaiveDate,
    ) -> AppResult<Vec<PlatformInspection>>;

    /// Report and items are written together or not at all
    async fn insert_report(
        &self,
        report: &ReconciliationReport,
        items: &[ReconciliationItem],
    ) -> AppResult<ReconciliationReport>;

    async fn list_reports(&self, tenant_id: i64) -> AppResult<Vec<ReconciliationReport>>;

    async fn find_report(&self, id: Uuid) -> AppResult<Option<ReconciliationReport>>;

    async fn list_items(&self, report_id: Uuid) -> AppResult<Vec<ReconciliationItem>>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn get_schedule(&self) -> AppResult<Option<ReconciliationConfig>>;

    async fn upsert_schedule(&self, config: &ReconciliationConfig)
    -> AppResult<ReconciliationConfig>;
}
