// src/services/gateway.rs

use crate::{errors::AppResult, models::FormaPagamento, money::Cents};
use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Payer {
    pub nome: String,
    pub cpf_cnpj: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeItem {
    pub descricao: String,
    pub valor: Cents,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    /// Our invoice number, echoed back by the gateway
    pub referencia: String,
    pub payer: Payer,
    pub valor_total: Cents,
    pub data_vencimento: NaiveDate,
    pub forma_pagamento: FormaPagamento,
    pub itens: Vec<ChargeItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    pub id: String,
    pub url: Option<String>,
    pub linha_digitavel: Option<String>,
    pub qr_code: Option<String>,
    pub status: String,
}

/// Creates payable documents (boleto or PIX) at an external provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<Charge>;

    async fn cancel_charge(&self, charge_id: &str) -> AppResult<()>;
}
