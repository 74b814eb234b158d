use crate::{
    config::Config,
    errors::AppError,
    models::{Company, FormaPagamento, Invoice},
};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
    smtp_host: String,
    from_address: String,
}

impl EmailService {
    /// `None` unless both an SMTP host and a sender address are configured
    pub fn from_config(config: Arc<Config>) -> Option<Self> {
        let smtp_host = config.smtp_host.clone()?;
        let from_address = config.email_from_address.clone()?;
        Some(Self {
            config,
            smtp_host,
            from_address,
        })
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)
            .map_err(|e| AppError::Email(e.to_string()))?
            .port(self.config.smtp_port);

        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }

        Ok(builder.build())
    }

    /// Tell the billed company its boleto/PIX charge is available
    pub async fn send_invoice_issued(
        &self,
        company: &Company,
        invoice: &Invoice,
    ) -> Result<(), AppError> {
        let Some(company_email) = company.email.as_deref() else {
            return Ok(());
        };

        let subject = format!("Fatura {} - {}", invoice.numero, self.config.email_from_name);

        let html_body = build_invoice_html(&self.config.email_from_name, company, invoice);
        let text_body = build_invoice_text(&self.config.email_from_name, company, invoice);

        let from_mailbox = format!("{} <{}>", self.config.email_from_name, self.from_address)
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::Email(e.to_string()))?;

        let to_mailbox = format!("{} <{}>", company.nome, company_email)
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::Email(e.to_string()))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::Email(e.to_string()))?;

        let transport = self.build_transport()?;

        match transport.send(email).await {
            Ok(_) => {
                info!(numero = %invoice.numero, "Invoice email sent to {}", company_email);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send invoice email to {}: {}", company_email, e);
                Err(AppError::Email(e.to_string()))
            }
        }
    }
}

fn payment_label(forma: FormaPagamento) -> &'static str {
    match forma {
        FormaPagamento::Boleto => "Boleto bancário",
        FormaPagamento::Pix => "PIX",
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn build_invoice_html(platform_name: &str, company: &Company, invoice: &Invoice) -> String {
    let linha = invoice
        .linha_digitavel
        .as_deref()
        .map(|l| {
            format!(
                r#"<tr><td>Linha digitável</td><td><code>{}</code></td></tr>"#,
                escape_html(l)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <style>
    body {{ font-family: Arial, sans-serif; background: #f4f4f4; color: #333; }}
    .container {{ max-width: 600px; margin: 30px auto; background: #fff; border-radius: 8px; overflow: hidden; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
    .header {{ background: #0f766e; color: #fff; padding: 24px 32px; }}
    .header h1 {{ margin: 0; font-size: 22px; }}
    .header p {{ margin: 4px 0 0; opacity: 0.85; }}
    .body {{ padding: 24px 32px; }}
    table {{ width: 100%; border-collapse: collapse; margin-bottom: 16px; }}
    td {{ padding: 8px 4px; border-bottom: 1px solid #f1f1f1; }}
    td:last-child {{ text-align: right; font-weight: 600; }}
    .total-row td {{ font-size: 16px; color: #0f766e; border-top: 2px solid #0f766e; border-bottom: none; }}
    .button {{ display: inline-block; background: #0f766e; color: #fff; padding: 12px 24px; border-radius: 6px; text-decoration: none; }}
    .footer {{ background: #f9fafb; padding: 16px 32px; font-size: 12px; color: #6b7280; text-align: center; }}
  </style>
</head>
<body>
<div class="container">
  <div class="header">
    <h1>{platform_name}</h1>
    <p>Fatura {numero}</p>
  </div>
  <div class="body">
    <p>Olá, <strong>{company_name}</strong>.</p>
    <p>Sua fatura referente a {count} vistoria(s) está disponível para pagamento.</p>

    <table>
      <tr><td>Número</td><td>{numero}</td></tr>
      <tr><td>Forma de pagamento</td><td>{forma}</td></tr>
      <tr><td>Vencimento</td><td>{vencimento}</td></tr>
      {linha}
      <tr class="total-row"><td>Total</td><td>{total}</td></tr>
    </table>

    <p><a class="button" href="{url}">Pagar fatura</a></p>
  </div>
  <div class="footer">
    <p>Mensagem automática de {platform_name}. Por favor, não responda este e-mail.</p>
  </div>
</div>
</body>
</html>"#,
        platform_name = escape_html(platform_name),
        numero = escape_html(&invoice.numero),
        company_name = escape_html(&company.nome),
        count = invoice.appointment_ids.len(),
        forma = payment_label(invoice.forma_pagamento),
        vencimento = invoice.data_vencimento.format("%d/%m/%Y"),
        linha = linha,
        total = invoice.valor_total,
        url = escape_html(invoice.boleto_url.as_deref().unwrap_or("#")),
    )
}

fn build_invoice_text(platform_name: &str, company: &Company, invoice: &Invoice) -> String {
    format!(
        "Olá, {company_name}.\n\n\
        Sua fatura referente a {count} vistoria(s) está disponível para pagamento.\n\n\
        Número:              {numero}\n\
        Forma de pagamento:  {forma}\n\
        Vencimento:          {vencimento}\n\
        Linha digitável:     {linha}\n\
        Total:               {total}\n\n\
        Pagar: {url}\n\n\
        Mensagem automática de {platform_name}.",
        company_name = company.nome,
        count = invoice.appointment_ids.len(),
        numero = invoice.numero,
        forma = payment_label(invoice.forma_pagamento),
        vencimento = invoice.data_vencimento.format("%d/%m/%Y"),
        linha = invoice.linha_digitavel.as_deref().unwrap_or("-"),
        total = invoice.valor_total,
        url = invoice.boleto_url.as_deref().unwrap_or("-"),
        platform_name = platform_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::InvoiceStatus, money::Cents};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn company() -> Company {
        Company {
            id: 7,
            tenant_id: 1,
            nome: "Transportes Silva".to_string(),
            cnpj: "12.345.678/0001-90".to_string(),
            email: Some("financeiro@silva.com.br".to_string()),
        }
    }

    fn invoice() -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            tenant_id: 1,
            company_id: 7,
            numero: "FAT-20241101-1A2B3C4D".to_string(),
            valor_total: Cents(36490),
            status: InvoiceStatus::Pendente,
            forma_pagamento: FormaPagamento::Boleto,
            data_vencimento: NaiveDate::from_ymd_opt(2024, 11, 8).unwrap(),
            data_pagamento: None,
            boleto_url: Some("https://faturas.iugu.com/a1b2c3".to_string()),
            linha_digitavel: Some("34191.79001".to_string()),
            qr_code: None,
            gateway_id: Some("A1B2C3".to_string()),
            appointment_ids: vec![40, 41, 42],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bodies_carry_amount_due_date_and_link() {
        let html = build_invoice_html("Vistoria Platform", &company(), &invoice());
        let text = build_invoice_text("Vistoria Platform", &company(), &invoice());

        for body in [&html, &text] {
            assert!(body.contains("R$ 364,90"));
            assert!(body.contains("08/11/2024"));
            assert!(body.contains("https://faturas.iugu.com/a1b2c3"));
            assert!(body.contains("FAT-20241101-1A2B3C4D"));
            assert!(body.contains("34191.79001"));
        }
    }

    #[test]
    fn html_body_escapes_company_name_and_link() {
        let company = Company {
            nome: "Silva & Filhos <Ltda>".to_string(),
            ..company()
        };
        let invoice = Invoice {
            boleto_url: Some(r#"https://faturas.iugu.com/a?x=1&y="2""#.to_string()),
            ..invoice()
        };

        let html = build_invoice_html("Vistoria Platform", &company, &invoice);

        assert!(html.contains("Silva &amp; Filhos &lt;Ltda&gt;"));
        assert!(html.contains(r#"href="https://faturas.iugu.com/a?x=1&amp;y=&quot;2&quot;""#));
        assert!(!html.contains("<Ltda>"));

        let text = build_invoice_text("Vistoria Platform", &company, &invoice);
        assert!(text.contains("Silva & Filhos <Ltda>"));
    }

    #[test]
    fn disabled_without_smtp_host_or_sender() {
        let mut config = Config::test_defaults();
        assert!(EmailService::from_config(Arc::new(config.clone())).is_none());

        config.smtp_host = Some("smtp.example.com".to_string());
        assert!(EmailService::from_config(Arc::new(config.clone())).is_none());

        config.email_from_address = Some("nao-responda@example.com".to_string());
        assert!(EmailService::from_config(Arc::new(config)).is_some());
    }
}
