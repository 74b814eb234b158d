// src/testing.rs

//! In-memory doubles for service tests. They follow the same contracts as
//! `PgRepository` and the Iugu client.

use crate::{
    db::{InvoiceRepository, ReconciliationRepository, ScheduleRepository, SplitRepository},
    errors::{AppError, AppResult},
    models::{
        Appointment, BillableAppointment, Company, FormaPagamento, Invoice, InvoiceStatus,
        PlatformInspection, ReconciliationConfig, ReconciliationItem, ReconciliationReport,
        SplitConfiguration,
    },
    money::Cents,
    services::{
        gateway::{Charge, ChargeRequest, PaymentGateway},
        split::SplitChange,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Mutex,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredAppointment {
    appointment: Appointment,
    renavam: Option<String>,
    tipo_inspecao: Option<String>,
    numero_protocolo: Option<String>,
}

#[derive(Default)]
struct Inner {
    tenants: HashSet<i64>,
    services: HashMap<i64, i64>,
    companies: HashMap<i64, Company>,
    appointments: BTreeMap<i64, StoredAppointment>,
    splits: Vec<SplitConfiguration>,
    invoices: Vec<Invoice>,
    links: HashMap<i64, Uuid>,
    reports: Vec<ReconciliationReport>,
    items: Vec<ReconciliationItem>,
    schedule: Option<ReconciliationConfig>,
    link_on_next_insert: Option<i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn add_tenant(&self, id: i64) {
        self.inner.lock().unwrap().tenants.insert(id);
    }

    pub fn add_service(&self, id: i64, tenant_id: i64) {
        self.inner.lock().unwrap().services.insert(id, tenant_id);
    }

    pub fn add_company(&self, id: i64, tenant_id: i64) -> Company {
        let company = Company {
            id,
            tenant_id,
            nome: format!("Empresa {}", id),
            cnpj: format!("{:02}.345.678/0001-90", id % 100),
            email: Some(format!("financeiro@empresa{}.com.br", id)),
        };
        self.inner
            .lock()
            .unwrap()
            .companies
            .insert(id, company.clone());
        company
    }

    pub fn add_appointment(
        &self,
        id: i64,
        tenant_id: i64,
        company_id: Option<i64>,
        placa: &str,
        data_agendamento: NaiveDate,
        preco: i64,
    ) -> Appointment {
        let appointment = Appointment {
            id,
            tenant_id,
            company_id,
            customer_id: 500 + id,
            vehicle_id: 900 + id,
            placa: placa.to_string(),
            data_agendamento,
            preco: Cents(preco),
            status: "confirmado".to_string(),
        };
        self.inner.lock().unwrap().appointments.insert(
            id,
            StoredAppointment {
                appointment: appointment.clone(),
                renavam: None,
                tipo_inspecao: None,
                numero_protocolo: None,
            },
        );
        appointment
    }

    pub fn set_inspection_details(
        &self,
        appointment_id: i64,
        renavam: Option<&str>,
        tipo_inspecao: Option<&str>,
        numero_protocolo: Option<&str>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .appointments
            .get_mut(&appointment_id)
            .expect("appointment seeded");
        stored.renavam = renavam.map(str::to_string);
        stored.tipo_inspecao = tipo_inspecao.map(str::to_string);
        stored.numero_protocolo = numero_protocolo.map(str::to_string);
    }

    pub fn cancel_appointment(&self, id: i64) {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner.appointments.get_mut(&id).expect("appointment seeded");
        stored.appointment.status = "cancelado".to_string();
    }

    /// Simulates a concurrent request invoicing `appointment_id` between
    /// validation and the write of the next invoice
    pub fn link_on_next_insert(&self, appointment_id: i64) {
        self.inner.lock().unwrap().link_on_next_insert = Some(appointment_id);
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        self.inner.lock().unwrap().invoices.clone()
    }

    pub fn report_count(&self) -> usize {
        self.inner.lock().unwrap().reports.len()
    }
}

fn active_conflict(inner: &Inner, split: &SplitConfiguration) -> bool {
    split.ativo
        && inner.splits.iter().any(|s| {
            s.id != split.id
                && s.ativo
                && s.tenant_id == split.tenant_id
                && s.service_id == split.service_id
        })
}

fn active_conflict_error(split: &SplitConfiguration) -> AppError {
    AppError::Conflict(format!(
        "Tenant {} already has an active split configuration for service {}",
        split.tenant_id, split.service_id
    ))
}

#[async_trait]
impl SplitRepository for MemoryStore {
    async fn service_tenant(&self, service_id: i64) -> AppResult<Option<i64>> {
        Ok(self.inner.lock().unwrap().services.get(&service_id).copied())
    }

    async fn insert_split(&self, split: &SplitConfiguration) -> AppResult<SplitConfiguration> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.tenants.contains(&split.tenant_id) || !inner.services.contains_key(&split.service_id)
        {
            return Err(AppError::NotFound(format!(
                "Tenant {} or service {} not found",
                split.tenant_id, split.service_id
            )));
        }
        if active_conflict(&inner, split) {
            return Err(active_conflict_error(split));
        }

        inner.splits.push(split.clone());
        Ok(split.clone())
    }

    async fn find_split(&self, id: Uuid) -> AppResult<Option<SplitConfiguration>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.splits.iter().find(|s| s.id == id).cloned())
    }

    async fn update_split(&self, id: Uuid, change: &SplitChange) -> AppResult<SplitConfiguration> {
        let mut inner = self.inner.lock().unwrap();

        let position = inner
            .splits
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Split configuration {} not found", id)))?;

        let next = change.apply(&inner.splits[position], Utc::now())?;
        if active_conflict(&inner, &next) {
            return Err(active_conflict_error(&next));
        }

        inner.splits[position] = next.clone();
        Ok(next)
    }

    async fn list_splits(&self, tenant_id: i64) -> AppResult<Vec<SplitConfiguration>> {
        let inner = self.inner.lock().unwrap();
        let mut splits: Vec<_> = inner
            .splits
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        // Insertion order stands in for created_at
        splits.reverse();
        Ok(splits)
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn find_company(&self, company_id: i64) -> AppResult<Option<Company>> {
        Ok(self.inner.lock().unwrap().companies.get(&company_id).cloned())
    }

    async fn list_uninvoiced(&self, tenant_id: i64) -> AppResult<Vec<Appointment>> {
        let inner = self.inner.lock().unwrap();
        let mut appointments: Vec<_> = inner
            .appointments
            .values()
            .map(|s| &s.appointment)
            .filter(|a| {
                a.tenant_id == tenant_id
                    && a.company_id.is_some()
                    && !a.is_cancelled()
                    && !inner.links.contains_key(&a.id)
            })
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.company_id, a.data_agendamento, a.id));
        Ok(appointments)
    }

    async fn find_billable(&self, ids: &[i64]) -> AppResult<Vec<BillableAppointment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .values()
            .filter(|s| ids.contains(&s.appointment.id))
            .map(|s| BillableAppointment {
                appointment: s.appointment.clone(),
                invoice_id: inner.links.get(&s.appointment.id).copied(),
            })
            .collect())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> AppResult<Invoice> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(stolen) = inner.link_on_next_insert.take() {
            inner.links.insert(stolen, Uuid::new_v4());
        }

        if !inner.companies.contains_key(&invoice.company_id) {
            return Err(AppError::NotFound(format!(
                "Company {} not found",
                invoice.company_id
            )));
        }
        if inner.invoices.iter().any(|i| i.numero == invoice.numero) {
            return Err(AppError::Conflict(format!(
                "Invoice number {} already exists",
                invoice.numero
            )));
        }
        if invoice
            .appointment_ids
            .iter()
            .any(|id| inner.links.contains_key(id))
        {
            return Err(AppError::Conflict(
                "One or more appointments were invoiced by another request".to_string(),
            ));
        }

        for id in &invoice.appointment_ids {
            inner.links.insert(*id, invoice.id);
        }
        let mut saved = invoice.clone();
        saved.appointment_ids.sort_unstable();
        inner.invoices.push(saved.clone());
        Ok(saved)
    }

    async fn list_invoices(&self, tenant_id: i64) -> AppResult<Vec<Invoice>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .invoices
            .iter()
            .rev()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_invoice_by_gateway_id(&self, gateway_id: &str) -> AppResult<Option<Invoice>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .invoices
            .iter()
            .find(|i| i.gateway_id.as_deref() == Some(gateway_id))
            .cloned())
    }

    async fn settle_invoice(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        data_pagamento: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Invoice>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(invoice) = inner
            .invoices
            .iter_mut()
            .find(|i| i.id == id && i.status == InvoiceStatus::Pendente)
        else {
            return Ok(None);
        };

        invoice.status = status;
        invoice.data_pagamento = data_pagamento;
        Ok(Some(invoice.clone()))
    }
}

#[async_trait]
impl ReconciliationRepository for MemoryStore {
    async fn tenant_exists(&self, tenant_id: i64) -> AppResult<bool> {
        Ok(self.inner.lock().unwrap().tenants.contains(&tenant_id))
    }

    async fn platform_inspections(
        &self,
        tenant_id: i64,
        data_referencia: NaiveDate,
    ) -> AppResult<Vec<PlatformInspection>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .values()
            .filter(|s| {
                s.appointment.tenant_id == tenant_id
                    && s.appointment.data_agendamento == data_referencia
                    && !s.appointment.is_cancelled()
            })
            .map(|s| PlatformInspection {
                appointment_id: s.appointment.id,
                placa: s.appointment.placa.clone(),
                renavam: s.renavam.clone(),
                data_agendamento: s.appointment.data_agendamento,
                tipo_inspecao: s.tipo_inspecao.clone(),
                numero_protocolo: s.numero_protocolo.clone(),
            })
            .collect())
    }

    async fn insert_report(
        &self,
        report: &ReconciliationReport,
        items: &[ReconciliationItem],
    ) -> AppResult<ReconciliationReport> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.tenants.contains(&report.tenant_id) {
            return Err(AppError::NotFound(format!(
                "Tenant {} not found",
                report.tenant_id
            )));
        }

        inner.reports.push(report.clone());
        inner.items.extend_from_slice(items);
        Ok(report.clone())
    }

    async fn list_reports(&self, tenant_id: i64) -> AppResult<Vec<ReconciliationReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .reports
            .iter()
            .rev()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_report(&self, id: Uuid) -> AppResult<Option<ReconciliationReport>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_items(&self, report_id: Uuid) -> AppResult<Vec<ReconciliationItem>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .items
            .iter()
            .filter(|i| i.report_id == report_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn get_schedule(&self) -> AppResult<Option<ReconciliationConfig>> {
        Ok(self.inner.lock().unwrap().schedule.clone())
    }

    async fn upsert_schedule(
        &self,
        config: &ReconciliationConfig,
    ) -> AppResult<ReconciliationConfig> {
        self.inner.lock().unwrap().schedule = Some(config.clone());
        Ok(config.clone())
    }
}

// ─── Payment Gateway ──────────────────────────────────────────────────────────

#[derive(Default)]
struct GatewayState {
    fail_with: Option<String>,
    fail_cancel: bool,
    charges: Vec<ChargeRequest>,
    cancelled: Vec<String>,
}

/// Records every request and answers like a successful Iugu call
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn failing(message: &str) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().fail_with = Some(message.to_string());
        gateway
    }

    pub fn fail_cancellations(&self) {
        self.state.lock().unwrap().fail_cancel = true;
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.state.lock().unwrap().charges.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<Charge> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.fail_with {
            return Err(AppError::Gateway(message.clone()));
        }

        state.charges.push(request.clone());
        let id = format!("iugu-{}", state.charges.len());
        let (linha_digitavel, qr_code) = match request.forma_pagamento {
            FormaPagamento::Boleto => (
                Some("34191790010104351004791020150008291070026000".to_string()),
                None,
            ),
            FormaPagamento::Pix => (None, Some("00020101021226850014br.gov.bcb.pix".to_string())),
        };

        Ok(Charge {
            url: Some(format!("https://faturas.iugu.com/{}", id)),
            id,
            linha_digitavel,
            qr_code,
            status: "pending".to_string(),
        })
    }

    async fn cancel_charge(&self, charge_id: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_cancel {
            return Err(AppError::Gateway("cancel refused".to_string()));
        }
        state.cancelled.push(charge_id.to_string());
        Ok(())
    }
}
