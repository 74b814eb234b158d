use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Root handler: HTML landing page with links to the docs and the route list
pub async fn root_handler() -> impl IntoResponse {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>Vistoria Platform API</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: 'Segoe UI', system-ui, sans-serif; background: #0f172a; color: #e2e8f0; min-height: 100vh; padding: 40px 20px; }
    .container { max-width: 860px; margin: 0 auto; }
    header { text-align: center; margin-bottom: 48px; }
    header h1 { font-size: 2.8rem; font-weight: 800; background: linear-gradient(135deg, #14b8a6, #0ea5e9); -webkit-background-clip: text; -webkit-text-fill-color: transparent; margin-bottom: 8px; }
    header p { color: #94a3b8; font-size: 1.1rem; }
    .badge { display: inline-block; background: #1e293b; border: 1px solid #334155; color: #2dd4bf; padding: 4px 12px; border-radius: 20px; font-size: 0.8rem; margin-top: 12px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 16px; margin-bottom: 32px; }
    .card { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 20px; }
    .card h3 { font-size: 1rem; font-weight: 600; color: #f1f5f9; margin-bottom: 6px; }
    .card p { font-size: 0.875rem; color: #94a3b8; line-height: 1.5; }
    .card a { color: #2dd4bf; text-decoration: none; font-weight: 500; display: inline-block; margin-top: 8px; font-size: 0.875rem; }
    .routes { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 24px; }
    .routes h2 { font-size: 1.2rem; font-weight: 700; color: #f1f5f9; margin-bottom: 16px; }
    .route-group { margin-bottom: 20px; }
    .route-group h4 { font-size: 0.8rem; font-weight: 600; text-transform: uppercase; letter-spacing: 0.1em; color: #64748b; margin-bottom: 8px; }
    .route-item { display: flex; align-items: flex-start; gap: 12px; padding: 8px 0; border-bottom: 1px solid #0f172a; }
    .route-item:last-child { border-bottom: none; }
    .method { font-size: 0.7rem; font-weight: 700; padding: 2px 8px; border-radius: 4px; min-width: 52px; text-align: center; font-family: monospace; }
    .get { background: #064e3b; color: #34d399; }
    .post { background: #1e3a5f; color: #60a5fa; }
    .put, .patch { background: #451a03; color: #fb923c; }
    .route-path { font-family: monospace; font-size: 0.85rem; color: #e2e8f0; flex: 1; }
    .route-desc { font-size: 0.8rem; color: #64748b; }
    footer { text-align: center; margin-top: 40px; color: #475569; font-size: 0.85rem; }
  </style>
</head>
<body>
<div class="container">
  <header>
    <h1>Vistoria Platform API</h1>
    <p>Split configuration, batch boleto issuance and government reconciliation for inspection centres</p>
    <span class="badge">v1.0.0 · REST API · JSON</span>
  </header>

  <div class="grid">
    <div class="card">
      <h3>API Documentation</h3>
      <p>Interactive Swagger UI with every endpoint and its request/response schemas.</p>
      <a href="/docs">Open Swagger UI →</a>
    </div>
    <div class="card">
      <h3>Health Check</h3>
      <p>Confirm the service is running and the database is reachable.</p>
      <a href="/health">GET /health →</a>
    </div>
    <div class="card">
      <h3>Iugu Payments</h3>
      <p>Boletos and PIX charges are issued through Iugu; payment confirmations arrive by webhook.</p>
    </div>
  </div>

  <div class="routes">
    <h2>API Routes</h2>

    <div class="route-group">
      <h4>Split Configurations</h4>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/split-configurations</span><span class="route-desc">Create a tenant/platform split</span></div>
      <div class="route-item"><span class="method patch">PATCH</span><span class="route-path">/api/v1/split-configurations/{id}</span><span class="route-desc">Change percentages or activation</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/split-configurations/{id}/preview?valor=</span><span class="route-desc">Divide an amount</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/tenants/{tenantId}/split-configurations</span><span class="route-desc">List a tenant's splits</span></div>
    </div>

    <div class="route-group">
      <h4>Invoices</h4>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/tenants/{tenantId}/uninvoiced</span><span class="route-desc">Un-invoiced appointments per company</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/invoices/boleto</span><span class="route-desc">Issue a boleto for a batch</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/tenants/{tenantId}/invoices</span><span class="route-desc">List a tenant's invoices</span></div>
    </div>

    <div class="route-group">
      <h4>Reconciliations</h4>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/reconciliations</span><span class="route-desc">Reconcile a day's government inspections</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/reconciliations/import</span><span class="route-desc">Reconcile from a CSV export</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/reconciliations/{id}</span><span class="route-desc">Get a report</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/reconciliations/{id}/items</span><span class="route-desc">Per-row classification</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/tenants/{tenantId}/reconciliations</span><span class="route-desc">List a tenant's reports</span></div>
    </div>

    <div class="route-group">
      <h4>Reconciliation Schedule</h4>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/reconciliation-config</span><span class="route-desc">Current schedule</span></div>
      <div class="route-item"><span class="method put">PUT</span><span class="route-path">/api/v1/reconciliation-config</span><span class="route-desc">Replace the schedule</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/reconciliation-config/next-run</span><span class="route-desc">Next scheduled run</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/reconciliation-config/quantize?horario=</span><span class="route-desc">Round a time to the half hour</span></div>
    </div>

    <div class="route-group">
      <h4>Webhooks</h4>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/webhooks/iugu</span><span class="route-desc">Iugu invoice status notifications</span></div>
    </div>
  </div>

  <footer>
    <p>Built with Rust · Axum · SQLx · Iugu · lettre</p>
  </footer>
</div>
</body>
</html>"#)
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "vistoria-platform",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}
