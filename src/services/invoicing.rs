// src/services/invoicing.rs

use crate::{
    db::InvoiceRepository,
    errors::{AppError, AppResult},
    models::{Appointment, Company, GenerateBoletoRequest, Invoice, InvoiceStatus, UninvoicedCompany},
    money::Cents,
    services::gateway::{ChargeItem, ChargeRequest, Payer, PaymentGateway},
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

pub struct InvoiceService;

/// A freshly issued invoice together with the company it bills
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub invoice: Invoice,
    pub company: Company,
}

/// Calendar date at the platform's UTC offset
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Due date used when the request does not carry one: the platform's
/// local date plus `days`.
pub fn default_due_date(now: DateTime<Utc>, offset: FixedOffset, days: i64) -> NaiveDate {
    local_date(now, offset) + Duration::days(days)
}

/// Groups appointments by billing company, ordered by company id.
/// Appointments without a company are left out.
pub fn group_by_company(appointments: Vec<Appointment>) -> AppResult<Vec<UninvoicedCompany>> {
    let mut groups: BTreeMap<i64, Vec<Appointment>> = BTreeMap::new();
    for appointment in appointments {
        if let Some(company_id) = appointment.company_id {
            groups.entry(company_id).or_default().push(appointment);
        }
    }

    groups
        .into_iter()
        .map(|(company_id, appointments)| {
            let total = Cents::checked_sum(appointments.iter().map(|a| a.preco)).ok_or_else(|| {
                AppError::Internal(format!("Amount overflow for company {}", company_id))
            })?;
            Ok(UninvoicedCompany {
                company_id,
                count: appointments.len() as i64,
                total,
                appointments,
            })
        })
        .collect()
}

/// Rejects an empty batch or one naming the same appointment twice
pub fn validate_batch(appointment_ids: &[i64]) -> AppResult<()> {
    if appointment_ids.is_empty() {
        return Err(AppError::InvalidBatch(
            "Select at least one appointment to invoice".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(appointment_ids.len());
    let duplicates: Vec<String> = appointment_ids
        .iter()
        .filter(|id| !seen.insert(**id))
        .map(|id| id.to_string())
        .collect();

    if !duplicates.is_empty() {
        return Err(AppError::InvalidBatch(format!(
            "Appointments listed more than once: {}",
            duplicates.join(", ")
        )));
    }

    Ok(())
}

/// `FAT-20241101-1A2B3C4D`
pub fn invoice_number(id: Uuid, issued_on: NaiveDate) -> String {
    let suffix = id.simple().to_string()[..8].to_uppercase();
    format!("FAT-{}-{}", issued_on.format("%Y%m%d"), suffix)
}

/// Iugu invoice statuses we act on; everything else leaves the invoice as is
pub fn map_gateway_status(status: &str) -> Option<InvoiceStatus> {
    match status.trim().to_ascii_lowercase().as_str() {
        "paid" => Some(InvoiceStatus::Pago),
        "canceled" | "cancelled" | "expired" => Some(InvoiceStatus::Cancelado),
        _ => None,
    }
}

impl InvoiceService {
    pub async fn uninvoiced_by_company(
        repo: &dyn InvoiceRepository,
        tenant_id: i64,
    ) -> AppResult<Vec<UninvoicedCompany>> {
        let appointments = repo.list_uninvoiced(tenant_id).await?;
        group_by_company(appointments)
    }

    /// Issues one boleto (or PIX charge) for a batch of appointments of a
    /// single company.
    pub async fn generate_boleto(
        repo: &dyn InvoiceRepository,
        gateway: &dyn PaymentGateway,
        req: GenerateBoletoRequest,
        default_due: NaiveDate,
        offset: FixedOffset,
    ) -> AppResult<IssuedInvoice> {
        validate_batch(&req.appointment_ids)?;

        let company = repo
            .find_company(req.company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {} not found", req.company_id)))?;

        let rows = repo.find_billable(&req.appointment_ids).await?;

        let found: HashSet<i64> = rows.iter().map(|r| r.appointment.id).collect();
        let missing: Vec<String> = req
            .appointment_ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::NotFound(format!(
                "Appointments not found: {}",
                missing.join(", ")
            )));
        }

        for row in &rows {
            let a = &row.appointment;
            if a.company_id != Some(company.id) || a.tenant_id != company.tenant_id {
                return Err(AppError::InvalidBatch(format!(
                    "Appointment {} does not belong to company {}",
                    a.id, company.id
                )));
            }
            if a.is_cancelled() {
                return Err(AppError::InvalidBatch(format!(
                    "Appointment {} is cancelled",
                    a.id
                )));
            }
        }

        let already: Vec<String> = rows
            .iter()
            .filter_map(|r| r.invoice_id.map(|inv| format!("{} (invoice {})", r.appointment.id, inv)))
            .collect();
        if !already.is_empty() {
            return Err(AppError::Conflict(format!(
                "Appointments already invoiced: {}",
                already.join(", ")
            )));
        }

        let valor_total = Cents::checked_sum(rows.iter().map(|r| r.appointment.preco))
            .ok_or_else(|| AppError::Internal("Invoice total overflows".to_string()))?;
        if !valor_total.is_positive() {
            return Err(AppError::InvalidBatch(format!(
                "Invoice total must be greater than zero, got {}",
                valor_total
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let numero = invoice_number(id, local_date(now, offset));
        let forma_pagamento = req.forma_pagamento.unwrap_or_default();
        let data_vencimento = req.data_vencimento.unwrap_or(default_due);

        let charge_request = ChargeRequest {
            referencia: numero.clone(),
            payer: Payer {
                nome: company.nome.clone(),
                cpf_cnpj: company.cnpj.clone(),
                email: company.email.clone(),
            },
            valor_total,
            data_vencimento,
            forma_pagamento,
            itens: rows
                .iter()
                .map(|r| ChargeItem {
                    descricao: format!(
                        "Vistoria {} em {}",
                        r.appointment.placa,
                        r.appointment.data_agendamento.format("%d/%m/%Y")
                    ),
                    valor: r.appointment.preco,
                })
                .collect(),
        };

        let charge = gateway.create_charge(&charge_request).await?;

        let mut appointment_ids = req.appointment_ids.clone();
        appointment_ids.sort_unstable();

        let invoice = Invoice {
            id,
            tenant_id: company.tenant_id,
            company_id: company.id,
            numero,
            valor_total,
            status: InvoiceStatus::Pendente,
            forma_pagamento,
            data_vencimento,
            data_pagamento: None,
            boleto_url: charge.url.clone(),
            linha_digitavel: charge.linha_digitavel.clone(),
            qr_code: charge.qr_code.clone(),
            gateway_id: Some(charge.id.clone()),
            appointment_ids,
            created_at: now,
        };

        let saved = match repo.insert_invoice(&invoice).await {
            Ok(saved) => saved,
            Err(e) => {
                // Don't leave a payable charge behind for an invoice we never stored
                if let Err(cancel_err) = gateway.cancel_charge(&charge.id).await {
                    warn!(
                        gateway_id = %charge.id,
                        "Failed to cancel orphaned charge: {}",
                        cancel_err
                    );
                }
                return Err(e);
            }
        };

        info!(
            invoice_id = %saved.id,
            numero = %saved.numero,
            company_id = saved.company_id,
            appointments = saved.appointment_ids.len(),
            "Invoice issued for {}",
            saved.valor_total
        );

        Ok(IssuedInvoice {
            invoice: saved,
            company,
        })
    }

    pub async fn list_by_tenant(
        repo: &dyn InvoiceRepository,
        tenant_id: i64,
    ) -> AppResult<Vec<Invoice>> {
        repo.list_invoices(tenant_id).await
    }

    /// Applies a status reported by the gateway. Returns the invoice when it
    /// changed; statuses we don't track and non-pending invoices are no-ops.
    pub async fn apply_gateway_status(
        repo: &dyn InvoiceRepository,
        gateway_id: &str,
        status: &str,
    ) -> AppResult<Option<Invoice>> {
        let invoice = repo
            .find_invoice_by_gateway_id(gateway_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No invoice for gateway charge {}", gateway_id))
            })?;

        let Some(next) = map_gateway_status(status) else {
            info!(gateway_id, status, "Gateway status ignored");
            return Ok(None);
        };

        let data_pagamento = (next == InvoiceStatus::Pago).then(Utc::now);
        let updated = repo.settle_invoice(invoice.id, next, data_pagamento).await?;

        match &updated {
            Some(inv) => info!(
                invoice_id = %inv.id,
                numero = %inv.numero,
                status = ?inv.status,
                "Invoice settled by gateway"
            ),
            None => info!(
                invoice_id = %invoice.id,
                current = ?invoice.status,
                "Invoice no longer pending, gateway status {} ignored",
                status
            ),
        }

        Ok(updated)
    }
}
