// src/models/mod.rs

use crate::money::{BasisPoints, Cents, PercentualInput};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Split Configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfiguration {
    pub id: Uuid,
    pub tenant_id: i64,
    pub service_id: i64,
    /// Tenant share in basis points, e.g. 8500 means 85,00%
    pub percentual_tenant: BasisPoints,
    /// Platform share in basis points
    pub percentual_plataforma: BasisPoints,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSplitRequest {
    pub tenant_id: i64,
    pub service_id: i64,
    /// Basis points (8500) or a formatted percentage ("85,00")
    pub percentual_tenant: PercentualInput,
    pub percentual_plataforma: PercentualInput,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSplitRequest {
    pub percentual_tenant: Option<PercentualInput>,
    pub percentual_plataforma: Option<PercentualInput>,
    pub ativo: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SplitPreviewQuery {
    /// Amount in cents to divide
    pub valor: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SplitPreview {
    pub split_configuration_id: Uuid,
    pub valor: Cents,
    pub parte_tenant: Cents,
    pub parte_plataforma: Cents,
}

// ─── Companies & Appointments (owned elsewhere, read-only here) ───────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    pub tenant_id: i64,
    pub nome: String,
    pub cnpj: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub tenant_id: i64,
    pub company_id: Option<i64>,
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub placa: String,
    pub data_agendamento: NaiveDate,
    pub preco: Cents,
    pub status: String,
}

pub const STATUS_AGENDAMENTO_CANCELADO: &str = "cancelado";

impl Appointment {
    pub fn is_cancelled(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_AGENDAMENTO_CANCELADO)
    }
}

/// An appointment together with the invoice it is linked to, if any
#[derive(Debug, Clone, FromRow)]
pub struct BillableAppointment {
    #[sqlx(flatten)]
    pub appointment: Appointment,
    pub invoice_id: Option<Uuid>,
}

// ─── Invoices ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pendente,
    Pago,
    Cancelado,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "forma_pagamento", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FormaPagamento {
    Pix,
    #[default]
    Boleto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: i64,
    pub company_id: i64,
    pub numero: String,
    pub valor_total: Cents,
    pub status: InvoiceStatus,
    pub forma_pagamento: FormaPagamento,
    pub data_vencimento: NaiveDate,
    pub data_pagamento: Option<DateTime<Utc>>,
    pub boleto_url: Option<String>,
    pub linha_digitavel: Option<String>,
    pub qr_code: Option<String>,
    /// Charge identifier at the payment gateway
    pub gateway_id: Option<String>,
    pub appointment_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UninvoicedCompany {
    pub company_id: i64,
    pub count: i64,
    pub total: Cents,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBoletoRequest {
    pub company_id: i64,
    pub appointment_ids: Vec<i64>,
    #[serde(default)]
    pub forma_pagamento: Option<FormaPagamento>,
    /// Defaults to today plus the configured number of days
    #[serde(default)]
    pub data_vencimento: Option<NaiveDate>,
}

// ─── Reconciliation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "reconciliation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Aberto,
    Fechado,
    Erro,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "reconciliation_classification", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Classificacao {
    Conciliada,
    Divergente,
    ForaSistema,
}

/// One inspection as reported by the government registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentInspection {
    pub placa: Option<String>,
    pub renavam: Option<String>,
    pub data_inspecao: Option<NaiveDate>,
    pub tipo_inspecao: Option<String>,
    pub numero_protocolo: Option<String>,
}

/// A platform appointment seen from the reconciliation side
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PlatformInspection {
    pub appointment_id: i64,
    pub placa: String,
    pub renavam: Option<String>,
    pub data_agendamento: NaiveDate,
    pub tipo_inspecao: Option<String>,
    pub numero_protocolo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub id: Uuid,
    pub tenant_id: i64,
    pub data_referencia: NaiveDate,
    pub data_conciliacao: DateTime<Utc>,
    pub total_inspecoes_plataforma: i32,
    pub total_inspecoes_governo: i32,
    pub inspecoes_conciliadas: i32,
    pub inspecoes_divergentes: i32,
    pub inspecoes_fora_sistema: i32,
    pub status: ReconciliationStatus,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationItem {
    pub id: Uuid,
    pub report_id: Uuid,
    pub placa: String,
    pub renavam: Option<String>,
    pub data_inspecao: NaiveDate,
    pub tipo_inspecao: Option<String>,
    pub numero_protocolo: Option<String>,
    pub appointment_id: Option<i64>,
    pub classificacao: Classificacao,
    pub motivo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReconciliationRequest {
    pub tenant_id: i64,
    pub data_referencia: NaiveDate,
    pub inspecoes_governo: Vec<GovernmentInspection>,
    #[serde(default)]
    pub observacoes: Option<String>,
}

/// Header names of the government export; matched case-insensitively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMapping {
    pub placa: String,
    pub data_inspecao: String,
    pub renavam: Option<String>,
    pub tipo_inspecao: Option<String>,
    pub numero_protocolo: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            placa: "placa".to_string(),
            data_inspecao: "data_inspecao".to_string(),
            renavam: Some("renavam".to_string()),
            tipo_inspecao: Some("tipo_inspecao".to_string()),
            numero_protocolo: Some("numero_protocolo".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReconciliationRequest {
    pub tenant_id: i64,
    pub data_referencia: NaiveDate,
    /// Raw CSV text including the header line
    pub csv: String,
    #[serde(default)]
    pub mapeamento: Option<ColumnMapping>,
    /// Single ASCII character, defaults to ','
    #[serde(default)]
    pub delimitador: Option<char>,
    #[serde(default)]
    pub observacoes: Option<String>,
}

// ─── Reconciliation Scheduling ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "reconciliation_frequency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Frequencia {
    Diaria,
    Semanal,
    Mensal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationConfig {
    pub frequencia: Frequencia,
    /// 0 = Sunday … 6 = Saturday, only for `semanal`
    pub dia_semana: Option<i32>,
    /// 1–31, only for `mensal`
    pub dia_mes: Option<i32>,
    /// "HH:MM"
    pub horario: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReconciliationConfigRequest {
    pub frequencia: Frequencia,
    #[serde(default)]
    pub dia_semana: Option<i32>,
    #[serde(default)]
    pub dia_mes: Option<i32>,
    #[serde(default)]
    pub horario: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextRunResponse {
    pub proxima_execucao: DateTime<Utc>,
    pub frequencia: Frequencia,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HorarioQuery {
    /// "HH:MM"
    pub horario: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuantizedHorario {
    pub horario: String,
}

// ─── Gateway Webhook ──────────────────────────────────────────────────────────

/// Iugu posts webhooks form-encoded with bracketed keys
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IuguWebhook {
    pub event: String,
    #[serde(rename = "data[id]")]
    pub data_id: Option<String>,
    #[serde(rename = "data[status]")]
    pub data_status: Option<String>,
}
