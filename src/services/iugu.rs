use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::FormaPagamento,
    services::gateway::{Charge, ChargeRequest, PaymentGateway},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct IuguService {
    client: Client,
    config: Arc<Config>,
}

// ─── Iugu Invoice ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateInvoiceRequest<'a> {
    email: &'a str,
    due_date: String,
    items: Vec<InvoiceItem<'a>>,
    payable_with: &'static str,
    payer: IuguPayer<'a>,
    order_id: &'a str,
    ensure_workday_due_date: bool,
}

#[derive(Debug, Serialize)]
struct InvoiceItem<'a> {
    description: &'a str,
    quantity: u32,
    price_cents: i64,
}

#[derive(Debug, Serialize)]
struct IuguPayer<'a> {
    cpf_cnpj: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct IuguInvoiceResponse {
    id: String,
    status: Option<String>,
    secure_url: Option<String>,
    bank_slip: Option<IuguBankSlip>,
    pix: Option<IuguPix>,
}

#[derive(Debug, Deserialize)]
struct IuguBankSlip {
    digitable_line: Option<String>,
    bank_slip_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IuguPix {
    qrcode_text: Option<String>,
}

fn payable_with(forma: FormaPagamento) -> &'static str {
    match forma {
        FormaPagamento::Boleto => "bank_slip",
        FormaPagamento::Pix => "pix",
    }
}

/// Iugu reports errors as a string, a list, or a map of field → messages
fn describe_errors(errors: &Value) -> String {
    match errors {
        Value::String(message) => message.clone(),
        Value::Array(items) => items
            .iter()
            .map(describe_errors)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(fields) => fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, describe_errors(messages)))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

impl IuguService {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Iugu authenticates with the API token as the basic-auth user name
    fn authorization(&self) -> String {
        let encoded = general_purpose::STANDARD.encode(format!("{}:", self.config.iugu_api_token));
        format!("Basic {}", encoded)
    }

    async fn read_body(resp: reqwest::Response) -> AppResult<Value> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        debug!(status = %status, body = %text, "Iugu response");

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(AppError::Gateway(format!(
                "Iugu rejected the request ({}): {}",
                status,
                describe_errors(errors)
            )));
        }

        if !status.is_success() {
            return Err(AppError::Gateway(format!(
                "Iugu returned {}: {}",
                status,
                describe_errors(&body)
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl PaymentGateway for IuguService {
    /// Create an invoice at Iugu payable by boleto or PIX
    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<Charge> {
        let email = request
            .payer
            .email
            .as_deref()
            .or(self.config.iugu_default_email.as_deref())
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Company '{}' has no e-mail and no default billing e-mail is configured",
                    request.payer.nome
                ))
            })?;

        let url = format!("{}/v1/invoices", self.config.iugu_base_url);

        let payload = CreateInvoiceRequest {
            email,
            due_date: request.data_vencimento.format("%Y-%m-%d").to_string(),
            items: request
                .itens
                .iter()
                .map(|item| InvoiceItem {
                    description: &item.descricao,
                    quantity: 1,
                    price_cents: item.valor.0,
                })
                .collect(),
            payable_with: payable_with(request.forma_pagamento),
            payer: IuguPayer {
                cpf_cnpj: &request.payer.cpf_cnpj,
                name: &request.payer.nome,
                email: request.payer.email.as_deref(),
            },
            order_id: &request.referencia,
            ensure_workday_due_date: true,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.authorization())
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let body = Self::read_body(resp).await?;
        let invoice: IuguInvoiceResponse = serde_json::from_value(body)
            .map_err(|e| AppError::Gateway(format!("Unexpected Iugu response: {}", e)))?;

        info!(
            gateway_id = %invoice.id,
            reference = %request.referencia,
            valor = %request.valor_total.to_decimal(),
            "Iugu invoice created"
        );

        let (linha_digitavel, boleto_url) = match invoice.bank_slip {
            Some(slip) => (slip.digitable_line, slip.bank_slip_url),
            None => (None, None),
        };

        Ok(Charge {
            id: invoice.id,
            url: boleto_url.or(invoice.secure_url),
            linha_digitavel,
            qr_code: invoice.pix.and_then(|pix| pix.qrcode_text),
            status: invoice.status.unwrap_or_else(|| "pending".to_string()),
        })
    }

    async fn cancel_charge(&self, charge_id: &str) -> AppResult<()> {
        let url = format!(
            "{}/v1/invoices/{}/cancel",
            self.config.iugu_base_url, charge_id
        );

        let resp = self
            .client
            .put(&url)
            .header("Authorization", self.authorization())
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        Self::read_body(resp).await?;
        info!(gateway_id = %charge_id, "Iugu invoice cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{money::Cents, services::gateway::{ChargeItem, Payer}};
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    fn service(base_url: &str) -> IuguService {
        let mut config = Config::test_defaults();
        config.iugu_base_url = base_url.to_string();
        config.iugu_api_token = "secret-token".to_string();
        IuguService::new(Arc::new(config))
    }

    fn charge_request(forma: FormaPagamento) -> ChargeRequest {
        ChargeRequest {
            referencia: "FAT-20241101-ABCDEF12".to_string(),
            payer: Payer {
                nome: "Transportes Silva".to_string(),
                cpf_cnpj: "12.345.678/0001-90".to_string(),
                email: Some("financeiro@silva.com.br".to_string()),
            },
            valor_total: Cents(21490),
            data_vencimento: NaiveDate::from_ymd_opt(2024, 11, 8).unwrap(),
            forma_pagamento: forma,
            itens: vec![
                ChargeItem {
                    descricao: "Vistoria ABC1234".to_string(),
                    valor: Cents(12990),
                },
                ChargeItem {
                    descricao: "Vistoria XYZ9876".to_string(),
                    valor: Cents(8500),
                },
            ],
        }
    }

    #[tokio::test]
    async fn creates_bank_slip_invoice() {
        let server = MockServer::start().await;
        let expected_auth = format!(
            "Basic {}",
            general_purpose::STANDARD.encode("secret-token:")
        );

        Mock::given(method("POST"))
            .and(path("/v1/invoices"))
            .and(header("Authorization", expected_auth.as_str()))
            .and(body_partial_json(json!({
                "email": "financeiro@silva.com.br",
                "due_date": "2024-11-08",
                "payable_with": "bank_slip",
                "order_id": "FAT-20241101-ABCDEF12",
                "items": [
                    { "description": "Vistoria ABC1234", "quantity": 1, "price_cents": 12990 },
                    { "description": "Vistoria XYZ9876", "quantity": 1, "price_cents": 8500 }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "A1B2C3",
                "status": "pending",
                "secure_url": "https://faturas.iugu.com/a1b2c3",
                "bank_slip": {
                    "digitable_line": "34191790010104351004791020150008291070026000",
                    "bank_slip_url": "https://faturas.iugu.com/a1b2c3.pdf"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let charge = service(&server.uri())
            .create_charge(&charge_request(FormaPagamento::Boleto))
            .await
            .unwrap();

        assert_eq!(charge.id, "A1B2C3");
        assert_eq!(charge.url.as_deref(), Some("https://faturas.iugu.com/a1b2c3.pdf"));
        assert_eq!(
            charge.linha_digitavel.as_deref(),
            Some("34191790010104351004791020150008291070026000")
        );
        assert_eq!(charge.qr_code, None);
        assert_eq!(charge.status, "pending");
    }

    #[tokio::test]
    async fn creates_pix_invoice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/invoices"))
            .and(body_partial_json(json!({ "payable_with": "pix" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "PIX1",
                "status": "pending",
                "secure_url": "https://faturas.iugu.com/pix1",
                "pix": { "qrcode_text": "00020101021226850014br.gov.bcb.pix" }
            })))
            .mount(&server)
            .await;

        let charge = service(&server.uri())
            .create_charge(&charge_request(FormaPagamento::Pix))
            .await
            .unwrap();

        assert_eq!(charge.url.as_deref(), Some("https://faturas.iugu.com/pix1"));
        assert_eq!(
            charge.qr_code.as_deref(),
            Some("00020101021226850014br.gov.bcb.pix")
        );
    }

    #[tokio::test]
    async fn rejected_request_surfaces_gateway_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/invoices"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": { "payer.cpf_cnpj": ["não é válido"] }
            })))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .create_charge(&charge_request(FormaPagamento::Boleto))
            .await
            .unwrap_err();

        match err {
            AppError::Gateway(message) => assert!(message.contains("payer.cpf_cnpj: não é válido")),
            other => panic!("expected gateway error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_a_gateway_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .create_charge(&charge_request(FormaPagamento::Boleto))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Gateway(ref m) if m.contains("upstream down")));
    }

    #[tokio::test]
    async fn missing_payer_email_without_default_is_rejected_locally() {
        let server = MockServer::start().await;
        let mut request = charge_request(FormaPagamento::Boleto);
        request.payer.email = None;

        let err = service(&server.uri())
            .create_charge(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancels_invoice() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v1/invoices/A1B2C3/cancel"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "A1B2C3", "status": "canceled" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        service(&server.uri()).cancel_charge("A1B2C3").await.unwrap();
    }
}
