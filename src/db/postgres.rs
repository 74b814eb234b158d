// src/db/postgres.rs

use crate::{
    db::{InvoiceRepository, ReconciliationRepository, ScheduleRepository, SplitRepository},
    errors::{AppError, AppResult},
    models::{
        Appointment, BillableAppointment, Company, Invoice, InvoiceStatus, PlatformInspection,
        ReconciliationConfig, ReconciliationItem, ReconciliationReport, SplitConfiguration,
    },
    services::split::SplitChange,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations become `Conflict`, foreign-key violations `NotFound`.
fn map_constraint(
    err: sqlx::Error,
    conflict: impl FnOnce() -> String,
    missing: impl FnOnce() -> String,
) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(conflict());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(missing());
        }
    }
    AppError::Database(err)
}

// Select list for invoices aliased as `i`
const INVOICE_COLUMNS: &str = r#"
    i.id, i.tenant_id, i.company_id, i.numero, i.valor_total, i.status,
    i.forma_pagamento, i.data_vencimento, i.data_pagamento, i.boleto_url,
    i.linha_digitavel, i.qr_code, i.gateway_id, i.created_at,
    ARRAY(
        SELECT ia.appointment_id FROM invoice_appointments ia
        WHERE ia.invoice_id = i.id ORDER BY ia.appointment_id
    ) AS appointment_ids"#;

// Select list for appointments aliased as `a`, joined with vehicles as `v`
const APPOINTMENT_COLUMNS: &str = r#"
    a.id, a.tenant_id, a.company_id, a.customer_id, a.vehicle_id, v.placa,
    a.data_agendamento, a.preco, a.status"#;

// ─── Split Configurations ─────────────────────────────────────────────────────

#[async_trait]
impl SplitRepository for PgRepository {
    async fn service_tenant(&self, service_id: i64) -> AppResult<Option<i64>> {
        let tenant_id = sqlx::query_scalar::<_, i64>("SELECT tenant_id FROM services WHERE id = $1")
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant_id)
    }

    async fn insert_split(&self, split: &SplitConfiguration) -> AppResult<SplitConfiguration> {
        sqlx::query_as::<_, SplitConfiguration>(
            r#"INSERT INTO split_configurations (
                id, tenant_id, service_id, percentual_tenant, percentual_plataforma,
                ativo, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *"#,
        )
        .bind(split.id)
        .bind(split.tenant_id)
        .bind(split.service_id)
        .bind(split.percentual_tenant)
        .bind(split.percentual_plataforma)
        .bind(split.ativo)
        .bind(split.created_at)
        .bind(split.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || {
                    format!(
                        "Tenant {} already has an active split configuration for service {}",
                        split.tenant_id, split.service_id
                    )
                },
                || {
                    format!(
                        "Tenant {} or service {} not found",
                        split.tenant_id, split.service_id
                    )
                },
            )
        })
    }

    async fn find_split(&self, id: Uuid) -> AppResult<Option<SplitConfiguration>> {
        let split = sqlx::query_as::<_, SplitConfiguration>(
            "SELECT * FROM split_configurations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(split)
    }

    async fn update_split(&self, id: Uuid, change: &SplitChange) -> AppResult<SplitConfiguration> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, SplitConfiguration>(
            "SELECT * FROM split_configurations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Split configuration {} not found", id)))?;

        let next = change.apply(&current, Utc::now())?;

        let updated = sqlx::query_as::<_, SplitConfiguration>(
            r#"UPDATE split_configurations
               SET percentual_tenant = $2,
                   percentual_plataforma = $3,
                   ativo = $4,
                   updated_at = $5
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(next.percentual_tenant)
        .bind(next.percentual_plataforma)
        .bind(next.ativo)
        .bind(next.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || {
                    format!(
                        "Tenant {} already has an active split configuration for service {}",
                        current.tenant_id, current.service_id
                    )
                },
                || format!("Split configuration {} not found", id),
            )
        })?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn list_splits(&self, tenant_id: i64) -> AppResult<Vec<SplitConfiguration>> {
        let splits = sqlx::query_as::<_, SplitConfiguration>(
            r#"SELECT * FROM split_configurations
               WHERE tenant_id = $1
               ORDER BY created_at DESC, id"#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(splits)
    }
}

// ─── Invoices ─────────────────────────────────────────────────────────────────

#[async_trait]
impl InvoiceRepository for PgRepository {
    async fn find_company(&self, company_id: i64) -> AppResult<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, tenant_id, nome, cnpj, email FROM companies WHERE id = $1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }

    async fn list_uninvoiced(&self, tenant_id: i64) -> AppResult<Vec<Appointment>> {
        let query = format!(
            r#"SELECT {APPOINTMENT_COLUMNS}
               FROM appointments a
               JOIN vehicles v ON v.id = a.vehicle_id
               WHERE a.tenant_id = $1
                 AND a.company_id IS NOT NULL
                 AND a.status <> 'cancelado'
                 AND NOT EXISTS (
                     SELECT 1 FROM invoice_appointments ia WHERE ia.appointment_id = a.id
                 )
               ORDER BY a.company_id, a.data_agendamento, a.id"#
        );

        let appointments = sqlx::query_as::<_, Appointment>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(appointments)
    }

    async fn find_billable(&self, ids: &[i64]) -> AppResult<Vec<BillableAppointment>> {
        let query = format!(
            r#"SELECT {APPOINTMENT_COLUMNS}, ia.invoice_id
               FROM appointments a
               JOIN vehicles v ON v.id = a.vehicle_id
               LEFT JOIN invoice_appointments ia ON ia.appointment_id = a.id
               WHERE a.id = ANY($1)
               ORDER BY a.id"#
        );

        let rows = sqlx::query_as::<_, BillableAppointment>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> AppResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO invoices (
                id, tenant_id, company_id, numero, valor_total, status, forma_pagamento,
                data_vencimento, data_pagamento, boleto_url, linha_digitavel, qr_code,
                gateway_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
        )
        .bind(invoice.id)
        .bind(invoice.tenant_id)
        .bind(invoice.company_id)
        .bind(&invoice.numero)
        .bind(invoice.valor_total)
        .bind(invoice.status)
        .bind(invoice.forma_pagamento)
        .bind(invoice.data_vencimento)
        .bind(invoice.data_pagamento)
        .bind(&invoice.boleto_url)
        .bind(&invoice.linha_digitavel)
        .bind(&invoice.qr_code)
        .bind(&invoice.gateway_id)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || format!("Invoice number {} already exists", invoice.numero),
                || format!("Company {} not found", invoice.company_id),
            )
        })?;

        // The primary key on appointment_id is what prevents double billing
        sqlx::query(
            r#"INSERT INTO invoice_appointments (appointment_id, invoice_id)
               SELECT UNNEST($2::BIGINT[]), $1"#,
        )
        .bind(invoice.id)
        .bind(&invoice.appointment_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || "One or more appointments were invoiced by another request".to_string(),
                || "One or more appointments no longer exist".to_string(),
            )
        })?;

        let query = format!("SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = $1");
        let saved = sqlx::query_as::<_, Invoice>(&query)
            .bind(invoice.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn list_invoices(&self, tenant_id: i64) -> AppResult<Vec<Invoice>> {
        let query = format!(
            r#"SELECT {INVOICE_COLUMNS} FROM invoices i
               WHERE i.tenant_id = $1
               ORDER BY i.created_at DESC, i.id"#
        );

        let invoices = sqlx::query_as::<_, Invoice>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices)
    }

    async fn find_invoice_by_gateway_id(&self, gateway_id: &str) -> AppResult<Option<Invoice>> {
        let query = format!("SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.gateway_id = $1");

        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(gateway_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    async fn settle_invoice(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        data_pagamento: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Invoice>> {
        let query = format!(
            r#"WITH i AS (
                   UPDATE invoices
                   SET status = $2, data_pagamento = $3
                   WHERE id = $1 AND status = 'pendente'
                   RETURNING *
               )
               SELECT {INVOICE_COLUMNS} FROM i"#
        );

        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(status)
            .bind(data_pagamento)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }
}

// ─── Reconciliation ───────────────────────────────────────────────────────────

#[async_trait]
impl ReconciliationRepository for PgRepository {
    async fn tenant_exists(&self, tenant_id: i64) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tenants WHERE id = $1)")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn platform_inspections(
        &self,
        tenant_id: i64,
        data_referencia: NaiveDate,
    ) -> AppResult<Vec<PlatformInspection>> {
        let rows = sqlx::query_as::<_, PlatformInspection>(
            r#"SELECT a.id AS appointment_id, v.placa, v.renavam, a.data_agendamento,
                      a.tipo_inspecao, a.numero_protocolo
               FROM appointments a
               JOIN vehicles v ON v.id = a.vehicle_id
               WHERE a.tenant_id = $1
                 AND a.data_agendamento = $2
                 AND a.status <> 'cancelado'
               ORDER BY a.id"#,
        )
        .bind(tenant_id)
        .bind(data_referencia)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_report(
        &self,
        report: &ReconciliationReport,
        items: &[ReconciliationItem],
    ) -> AppResult<ReconciliationReport> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, ReconciliationReport>(
            r#"INSERT INTO reconciliation_reports (
                id, tenant_id, data_referencia, data_conciliacao,
                total_inspecoes_plataforma, total_inspecoes_governo,
                inspecoes_conciliadas, inspecoes_divergentes, inspecoes_fora_sistema,
                status, observacoes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *"#,
        )
        .bind(report.id)
        .bind(report.tenant_id)
        .bind(report.data_referencia)
        .bind(report.data_conciliacao)
        .bind(report.total_inspecoes_plataforma)
        .bind(report.total_inspecoes_governo)
        .bind(report.inspecoes_conciliadas)
        .bind(report.inspecoes_divergentes)
        .bind(report.inspecoes_fora_sistema)
        .bind(report.status)
        .bind(&report.observacoes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || format!("Reconciliation report {} already exists", report.id),
                || format!("Tenant {} not found", report.tenant_id),
            )
        })?;

        for item in items {
            sqlx::query(
                r#"INSERT INTO reconciliation_items (
                    id, report_id, placa, renavam, data_inspecao, tipo_inspecao,
                    numero_protocolo, appointment_id, classificacao, motivo
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
            )
            .bind(item.id)
            .bind(item.report_id)
            .bind(&item.placa)
            .bind(&item.renavam)
            .bind(item.data_inspecao)
            .bind(&item.tipo_inspecao)
            .bind(&item.numero_protocolo)
            .bind(item.appointment_id)
            .bind(item.classificacao)
            .bind(&item.motivo)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn list_reports(&self, tenant_id: i64) -> AppResult<Vec<ReconciliationReport>> {
        let reports = sqlx::query_as::<_, ReconciliationReport>(
            r#"SELECT * FROM reconciliation_reports
               WHERE tenant_id = $1
               ORDER BY data_conciliacao DESC, id"#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }

    async fn find_report(&self, id: Uuid) -> AppResult<Option<ReconciliationReport>> {
        let report = sqlx::query_as::<_, ReconciliationReport>(
            "SELECT * FROM reconciliation_reports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    async fn list_items(&self, report_id: Uuid) -> AppResult<Vec<ReconciliationItem>> {
        let items = sqlx::query_as::<_, ReconciliationItem>(
            r#"SELECT * FROM reconciliation_items
               WHERE report_id = $1
               ORDER BY classificacao, placa, id"#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// ─── Reconciliation Scheduling ────────────────────────────────────────────────

#[async_trait]
impl ScheduleRepository for PgRepository {
    async fn get_schedule(&self) -> AppResult<Option<ReconciliationConfig>> {
        let config = sqlx::query_as::<_, ReconciliationConfig>(
            r#"SELECT frequencia, dia_semana, dia_mes, horario, updated_at
               FROM reconciliation_config
               WHERE id = 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn upsert_schedule(
        &self,
        config: &ReconciliationConfig,
    ) -> AppResult<ReconciliationConfig> {
        let saved = sqlx::query_as::<_, ReconciliationConfig>(
            r#"INSERT INTO reconciliation_config (id, frequencia, dia_semana, dia_mes, horario, updated_at)
               VALUES (1, $1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE
               SET frequencia = EXCLUDED.frequencia,
                   dia_semana = EXCLUDED.dia_semana,
                   dia_mes = EXCLUDED.dia_mes,
                   horario = EXCLUDED.horario,
                   updated_at = EXCLUDED.updated_at
               RETURNING frequencia, dia_semana, dia_mes, horario, updated_at"#,
        )
        .bind(config.frequencia)
        .bind(config.dia_semana)
        .bind(config.dia_mes)
        .bind(&config.horario)
        .bind(config.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }
}
