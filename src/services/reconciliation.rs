// src/services/reconciliation.rs

use crate::{
    db::ReconciliationRepository,
    errors::{AppError, AppResult},
    models::{
        Classificacao, CreateReconciliationRequest, GovernmentInspection,
        ImportReconciliationRequest, PlatformInspection, ReconciliationItem,
        ReconciliationReport, ReconciliationStatus,
    },
    services::csv_import::parse_government_csv,
};
use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

pub struct ReconciliationService;

/// `abc-1d23` → `ABC1D23`
pub fn normalize_placa(placa: &str) -> String {
    placa
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Lower-cases and strips Portuguese diacritics so "Periódica" == "PERIODICA"
fn fold(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Rejects the whole batch on the first unusable row
pub fn validate_government_rows(
    rows: &[GovernmentInspection],
    data_referencia: NaiveDate,
) -> AppResult<()> {
    if rows.is_empty() {
        return Err(AppError::Validation(
            "inspecoesGoverno must contain at least one inspection".to_string(),
        ));
    }

    for (index, row) in rows.iter().enumerate() {
        let n = index + 1;

        let placa = present(&row.placa).map(normalize_placa).unwrap_or_default();
        if placa.is_empty() {
            return Err(AppError::Validation(format!("Row {}: placa is required", n)));
        }

        match row.data_inspecao {
            None => {
                return Err(AppError::Validation(format!(
                    "Row {} ({}): dataInspecao is required",
                    n, placa
                )));
            }
            Some(date) if date != data_referencia => {
                return Err(AppError::Validation(format!(
                    "Row {} ({}): dataInspecao {} differs from dataReferencia {}",
                    n, placa, date, data_referencia
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Attributes on which the two sides disagree. Values missing on either side
/// are not compared.
fn divergences(gov: &GovernmentInspection, platform: &PlatformInspection) -> Vec<String> {
    let mut found = Vec::new();

    if let (Some(g), Some(p)) = (present(&gov.tipo_inspecao), present(&platform.tipo_inspecao)) {
        if fold(g) != fold(p) {
            found.push(format!("tipoInspecao (platform '{}', government '{}')", p, g));
        }
    }
    if let (Some(g), Some(p)) = (present(&gov.renavam), present(&platform.renavam)) {
        if g != p {
            found.push(format!("renavam (platform '{}', government '{}')", p, g));
        }
    }
    if let (Some(g), Some(p)) = (
        present(&gov.numero_protocolo),
        present(&platform.numero_protocolo),
    ) {
        if !g.eq_ignore_ascii_case(p) {
            found.push(format!(
                "numeroProtocolo (platform '{}', government '{}')",
                p, g
            ));
        }
    }

    found
}

/// How strongly a platform inspection fits a government row
#[derive(Clone, Copy)]
enum Affinity {
    Renavam,
    Tipo,
    Any,
}

fn fits(affinity: Affinity, gov: &GovernmentInspection, platform: &PlatformInspection) -> bool {
    match affinity {
        Affinity::Renavam => {
            present(&gov.renavam).is_some() && present(&gov.renavam) == present(&platform.renavam)
        }
        Affinity::Tipo => {
            let tipo = present(&gov.tipo_inspecao).map(fold);
            tipo.is_some() && present(&platform.tipo_inspecao).map(fold) == tipo
        }
        Affinity::Any => true,
    }
}

/// Classifies validated government rows against the platform's inspections
/// of the same day. Each platform inspection is matched at most once.
///
/// Rows of a plate are assigned in passes: every renavam match first, then
/// inspection type among what is left, then any remaining candidate. The
/// counts therefore do not depend on the order of the rows.
pub fn classify(
    report_id: Uuid,
    data_referencia: NaiveDate,
    government: &[GovernmentInspection],
    platform: &[PlatformInspection],
) -> Vec<ReconciliationItem> {
    let platform_placas: Vec<String> = platform
        .iter()
        .map(|inspection| normalize_placa(&inspection.placa))
        .collect();
    let placas: Vec<String> = government
        .iter()
        .map(|gov| present(&gov.placa).map(normalize_placa).unwrap_or_default())
        .collect();

    let mut used = vec![false; platform.len()];
    let mut chosen: Vec<Option<usize>> = vec![None; government.len()];
    for affinity in [Affinity::Renavam, Affinity::Tipo, Affinity::Any] {
        for (row, gov) in government.iter().enumerate() {
            if chosen[row].is_some() {
                continue;
            }
            let candidate = (0..platform.len()).find(|&i| {
                !used[i] && platform_placas[i] == placas[row] && fits(affinity, gov, &platform[i])
            });
            if let Some(i) = candidate {
                used[i] = true;
                chosen[row] = Some(i);
            }
        }
    }

    government
        .iter()
        .zip(placas)
        .zip(chosen)
        .map(|((gov, placa), chosen)| {
            let had_candidates = platform_placas.contains(&placa);

            let (appointment_id, classificacao, motivo) = match chosen {
                None if had_candidates => (
                    None,
                    Classificacao::ForaSistema,
                    Some("Every platform inspection for this plate was already matched".to_string()),
                ),
                None => (
                    None,
                    Classificacao::ForaSistema,
                    Some("No platform inspection for this plate on this date".to_string()),
                ),
                Some(i) => {
                    let found = divergences(gov, &platform[i]);
                    if found.is_empty() {
                        (Some(platform[i].appointment_id), Classificacao::Conciliada, None)
                    } else {
                        (
                            Some(platform[i].appointment_id),
                            Classificacao::Divergente,
                            Some(format!("Mismatch in {}", found.join("; "))),
                        )
                    }
                }
            };

            ReconciliationItem {
                id: Uuid::new_v4(),
                report_id,
                placa,
                renavam: present(&gov.renavam).map(str::to_string),
                data_inspecao: gov.data_inspecao.unwrap_or(data_referencia),
                tipo_inspecao: present(&gov.tipo_inspecao).map(str::to_string),
                numero_protocolo: present(&gov.numero_protocolo).map(str::to_string),
                appointment_id,
                classificacao,
                motivo,
            }
        })
        .collect()
}

fn count(items: &[ReconciliationItem], classificacao: Classificacao) -> i32 {
    items
        .iter()
        .filter(|i| i.classificacao == classificacao)
        .count() as i32
}

impl ReconciliationService {
    /// Runs one reconciliation and stores it as a new report. Repeating the
    /// call with the same input produces another report.
    pub async fn create(
        repo: &dyn ReconciliationRepository,
        req: CreateReconciliationRequest,
    ) -> AppResult<ReconciliationReport> {
        validate_government_rows(&req.inspecoes_governo, req.data_referencia)?;

        if !repo.tenant_exists(req.tenant_id).await? {
            return Err(AppError::NotFound(format!(
                "Tenant {} not found",
                req.tenant_id
            )));
        }

        let platform = repo
            .platform_inspections(req.tenant_id, req.data_referencia)
            .await?;

        let report_id = Uuid::new_v4();
        let items = classify(
            report_id,
            req.data_referencia,
            &req.inspecoes_governo,
            &platform,
        );

        let report = ReconciliationReport {
            id: report_id,
            tenant_id: req.tenant_id,
            data_referencia: req.data_referencia,
            data_conciliacao: Utc::now(),
            total_inspecoes_plataforma: platform.len() as i32,
            total_inspecoes_governo: items.len() as i32,
            inspecoes_conciliadas: count(&items, Classificacao::Conciliada),
            inspecoes_divergentes: count(&items, Classificacao::Divergente),
            inspecoes_fora_sistema: count(&items, Classificacao::ForaSistema),
            status: ReconciliationStatus::Fechado,
            observacoes: req.observacoes.filter(|o| !o.trim().is_empty()),
        };

        let saved = repo.insert_report(&report, &items).await?;

        info!(
            report_id = %saved.id,
            tenant_id = saved.tenant_id,
            data_referencia = %saved.data_referencia,
            plataforma = saved.total_inspecoes_plataforma,
            governo = saved.total_inspecoes_governo,
            conciliadas = saved.inspecoes_conciliadas,
            divergentes = saved.inspecoes_divergentes,
            fora_sistema = saved.inspecoes_fora_sistema,
            "Reconciliation completed"
        );

        Ok(saved)
    }

    /// Parses a government CSV export and reconciles it
    pub async fn import_csv(
        repo: &dyn ReconciliationRepository,
        req: ImportReconciliationRequest,
    ) -> AppResult<ReconciliationReport> {
        let mapping = req.mapeamento.unwrap_or_default();
        let inspecoes_governo = parse_government_csv(&req.csv, &mapping, req.delimitador)?;

        Self::create(
            repo,
            CreateReconciliationRequest {
                tenant_id: req.tenant_id,
                data_referencia: req.data_referencia,
                inspecoes_governo,
                observacoes: req.observacoes,
            },
        )
        .await
    }

    pub async fn list_by_tenant(
        repo: &dyn ReconciliationRepository,
        tenant_id: i64,
    ) -> AppResult<Vec<ReconciliationReport>> {
        repo.list_reports(tenant_id).await
    }

    pub async fn get(
        repo: &dyn ReconciliationRepository,
        id: Uuid,
    ) -> AppResult<ReconciliationReport> {
        repo.find_report(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reconciliation report {} not found", id)))
    }

    pub async fn items(
        repo: &dyn ReconciliationRepository,
        id: Uuid,
    ) -> AppResult<Vec<ReconciliationItem>> {
        // 404 for an unknown report rather than an empty list
        Self::get(repo, id).await?;
        repo.list_items(id).await
    }
}
