use crate::{
    config::Config,
    db::PgRepository,
    services::{email::EmailService, gateway::PaymentGateway, iugu::IuguService},
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub repo: Arc<PgRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// `None` when SMTP is not configured
    pub email: Option<EmailService>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            repo: Arc::new(PgRepository::new(db.clone())),
            gateway: Arc::new(IuguService::new(Arc::clone(&config))),
            email: EmailService::from_config(Arc::clone(&config)),
            db,
            config,
        }
    }
}
