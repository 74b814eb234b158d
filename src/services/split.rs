// src/services/split.rs

use crate::{
    db::SplitRepository,
    errors::{AppError, AppResult},
    models::{
        CreateSplitRequest, SplitConfiguration, SplitPreview, UpdateSplitRequest,
    },
    money::{BasisPoints, Cents, split_amount},
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

pub struct SplitService;

/// Both shares must be positive and add up to exactly 100,00%.
pub fn validate_split(tenant: BasisPoints, plataforma: BasisPoints) -> AppResult<()> {
    if tenant.0 <= 0 || plataforma.0 <= 0 {
        return Err(AppError::InvalidSplit(format!(
            "Both percentages must be greater than zero (tenant {}, platform {})",
            tenant, plataforma
        )));
    }

    if i64::from(tenant.0) + i64::from(plataforma.0) != i64::from(BasisPoints::FULL.0) {
        return Err(AppError::InvalidSplit(format!(
            "Percentages must add up to {}: tenant {} + platform {} (platform would be {})",
            BasisPoints::FULL,
            tenant,
            plataforma,
            tenant.complement()
        )));
    }

    Ok(())
}

/// A partial update, resolved against the stored row at write time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitChange {
    pub percentual_tenant: Option<BasisPoints>,
    pub percentual_plataforma: Option<BasisPoints>,
    pub ativo: Option<bool>,
}

impl SplitChange {
    pub fn from_request(req: &UpdateSplitRequest) -> AppResult<Self> {
        Ok(Self {
            percentual_tenant: req
                .percentual_tenant
                .as_ref()
                .map(|p| p.to_basis_points())
                .transpose()?,
            percentual_plataforma: req
                .percentual_plataforma
                .as_ref()
                .map(|p| p.to_basis_points())
                .transpose()?,
            ativo: req.ativo,
        })
    }

    /// The row as it would be written. Validation always runs on the merged
    /// values, so flipping only `ativo` still checks the stored percentages.
    pub fn apply(
        &self,
        current: &SplitConfiguration,
        now: DateTime<Utc>,
    ) -> AppResult<SplitConfiguration> {
        let percentual_tenant = self.percentual_tenant.unwrap_or(current.percentual_tenant);
        let percentual_plataforma = self
            .percentual_plataforma
            .unwrap_or(current.percentual_plataforma);

        validate_split(percentual_tenant, percentual_plataforma)?;

        Ok(SplitConfiguration {
            percentual_tenant,
            percentual_plataforma,
            ativo: self.ativo.unwrap_or(current.ativo),
            updated_at: now,
            ..current.clone()
        })
    }
}

impl SplitService {
    pub async fn create(
        repo: &dyn SplitRepository,
        req: CreateSplitRequest,
    ) -> AppResult<SplitConfiguration> {
        let percentual_tenant = req.percentual_tenant.to_basis_points()?;
        let percentual_plataforma = req.percentual_plataforma.to_basis_points()?;
        validate_split(percentual_tenant, percentual_plataforma)?;

        if repo.service_tenant(req.service_id).await? != Some(req.tenant_id) {
            return Err(AppError::NotFound(format!(
                "Service {} not found for tenant {}",
                req.service_id, req.tenant_id
            )));
        }

        let now = Utc::now();
        let split = SplitConfiguration {
            id: Uuid::new_v4(),
            tenant_id: req.tenant_id,
            service_id: req.service_id,
            percentual_tenant,
            percentual_plataforma,
            ativo: true,
            created_at: now,
            updated_at: now,
        };

        let saved = repo.insert_split(&split).await?;

        info!(
            split_id = %saved.id,
            tenant_id = saved.tenant_id,
            service_id = saved.service_id,
            "Split configuration created: tenant {} / platform {}",
            saved.percentual_tenant,
            saved.percentual_plataforma
        );

        Ok(saved)
    }

    pub async fn update(
        repo: &dyn SplitRepository,
        id: Uuid,
        req: UpdateSplitRequest,
    ) -> AppResult<SplitConfiguration> {
        let change = SplitChange::from_request(&req)?;
        let saved = repo.update_split(id, &change).await?;

        info!(
            split_id = %saved.id,
            ativo = saved.ativo,
            "Split configuration updated: tenant {} / platform {}",
            saved.percentual_tenant,
            saved.percentual_plataforma
        );

        Ok(saved)
    }

    pub async fn list_by_tenant(
        repo: &dyn SplitRepository,
        tenant_id: i64,
    ) -> AppResult<Vec<SplitConfiguration>> {
        repo.list_splits(tenant_id).await
    }

    /// How an amount would be divided at settlement under this configuration
    pub async fn preview(
        repo: &dyn SplitRepository,
        id: Uuid,
        valor: i64,
    ) -> AppResult<SplitPreview> {
        if valor < 0 {
            return Err(AppError::Validation(
                "valor must be zero or positive".to_string(),
            ));
        }

        let split = repo
            .find_split(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Split configuration {} not found", id)))?;

        let (parte_tenant, parte_plataforma) = split_amount(Cents(valor), split.percentual_tenant);

        Ok(SplitPreview {
            split_configuration_id: split.id,
            valor: Cents(valor),
            parte_tenant,
            parte_plataforma,
        })
    }
}
