// src/services/schedule.rs

use crate::{
    db::ScheduleRepository,
    errors::{AppError, AppResult},
    models::{Frequencia, ReconciliationConfig, UpsertReconciliationConfigRequest},
};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use tracing::info;

pub struct ScheduleService;

/// Strict `HH:MM`, 00–23 and 00–59
pub fn parse_horario(raw: &str) -> AppResult<NaiveTime> {
    let invalid = || AppError::Validation(format!("horario '{}' must be HH:MM", raw));

    let (h, m) = raw.split_once(':').ok_or_else(invalid)?;
    if h.len() != 2 || m.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Rounds to the nearest half hour, wrapping past midnight:
/// 09:17 → 09:30, 09:14 → 09:00, 23:50 → 00:00
pub fn quantize_horario(raw: &str) -> AppResult<String> {
    let time = parse_horario(raw)?;
    let minutes = time.hour() * 60 + time.minute();
    let rounded = ((minutes + 15) / 30 * 30) % (24 * 60);

    Ok(format!("{:02}:{:02}", rounded / 60, rounded % 60))
}

pub fn validate_schedule(req: &UpsertReconciliationConfigRequest) -> AppResult<()> {
    match req.frequencia {
        Frequencia::Semanal => match req.dia_semana {
            None => {
                return Err(AppError::Validation(
                    "diaSemana is required for a weekly schedule".to_string(),
                ));
            }
            Some(d) if !(0..=6).contains(&d) => {
                return Err(AppError::Validation(format!(
                    "diaSemana must be between 0 (Sunday) and 6 (Saturday), got {}",
                    d
                )));
            }
            Some(_) => {}
        },
        Frequencia::Mensal => match req.dia_mes {
            None => {
                return Err(AppError::Validation(
                    "diaMes is required for a monthly schedule".to_string(),
                ));
            }
            Some(d) if !(1..=31).contains(&d) => {
                return Err(AppError::Validation(format!(
                    "diaMes must be between 1 and 31, got {}",
                    d
                )));
            }
            Some(_) => {}
        },
        Frequencia::Diaria => {}
    }

    if req.frequencia != Frequencia::Semanal && req.dia_semana.is_some() {
        return Err(AppError::Validation(
            "diaSemana is only allowed for a weekly schedule".to_string(),
        ));
    }
    if req.frequencia != Frequencia::Mensal && req.dia_mes.is_some() {
        return Err(AppError::Validation(
            "diaMes is only allowed for a monthly schedule".to_string(),
        ));
    }

    if let Some(horario) = &req.horario {
        parse_horario(horario)?;
    }

    Ok(())
}

fn last_day_of_month(year: i32, month: u32) -> AppResult<u32> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .ok_or_else(|| AppError::Internal(format!("Invalid month {}-{}", year, month)))
}

fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::seconds(offset.local_minus_utc().into())))
}

/// First instant at or after `now` matching the schedule, evaluated in the
/// platform's local time.
pub fn next_run(
    config: &ReconciliationConfig,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<DateTime<Utc>> {
    let time = match &config.horario {
        Some(h) => parse_horario(h)?,
        None => NaiveTime::MIN,
    };
    let today = now.with_timezone(&offset).date_naive();

    match config.frequencia {
        Frequencia::Diaria => {
            let candidate = to_utc(today.and_time(time), offset);
            if candidate >= now {
                Ok(candidate)
            } else {
                Ok(to_utc((today + Duration::days(1)).and_time(time), offset))
            }
        }
        Frequencia::Semanal => {
            let dia = config
                .dia_semana
                .ok_or_else(|| AppError::Internal("Weekly schedule without diaSemana".to_string()))?;

            (0..=7)
                .map(|d| today + Duration::days(d))
                .filter(|date| i64::from(date.weekday().num_days_from_sunday()) == i64::from(dia))
                .map(|date| to_utc(date.and_time(time), offset))
                .find(|candidate| *candidate >= now)
                .ok_or_else(|| AppError::Internal(format!("No weekday {} within a week", dia)))
        }
        Frequencia::Mensal => {
            let dia = config
                .dia_mes
                .ok_or_else(|| AppError::Internal("Monthly schedule without diaMes".to_string()))?;
            let dia = u32::try_from(dia)
                .map_err(|_| AppError::Internal(format!("Invalid diaMes {}", dia)))?;

            let (mut year, mut month) = (today.year(), today.month());
            for _ in 0..2 {
                let day = dia.min(last_day_of_month(year, month)?);
                let date = NaiveDate::from_ymd_opt(year, month, day)
                    .ok_or_else(|| AppError::Internal(format!("Invalid date {}-{}-{}", year, month, day)))?;
                let candidate = to_utc(date.and_time(time), offset);
                if candidate >= now {
                    return Ok(candidate);
                }
                (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
            }

            Err(AppError::Internal("No monthly run within two months".to_string()))
        }
    }
}

impl ScheduleService {
    pub async fn get(repo: &dyn ScheduleRepository) -> AppResult<Option<ReconciliationConfig>> {
        repo.get_schedule().await
    }

    /// Replaces the single schedule row
    pub async fn upsert(
        repo: &dyn ScheduleRepository,
        req: UpsertReconciliationConfigRequest,
    ) -> AppResult<ReconciliationConfig> {
        validate_schedule(&req)?;

        let config = ReconciliationConfig {
            frequencia: req.frequencia,
            dia_semana: req.dia_semana,
            dia_mes: req.dia_mes,
            horario: req.horario,
            updated_at: Utc::now(),
        };

        let saved = repo.upsert_schedule(&config).await?;

        info!(
            frequencia = ?saved.frequencia,
            dia_semana = ?saved.dia_semana,
            dia_mes = ?saved.dia_mes,
            horario = ?saved.horario,
            "Reconciliation schedule updated"
        );

        Ok(saved)
    }

    pub async fn next_run(
        repo: &dyn ScheduleRepository,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> AppResult<(ReconciliationConfig, DateTime<Utc>)> {
        let config = repo
            .get_schedule()
            .await?
            .ok_or_else(|| AppError::NotFound("No reconciliation schedule configured".to_string()))?;

        let at = next_run(&config, now, offset)?;
        Ok((config, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn request(
        frequencia: Frequencia,
        dia_semana: Option<i32>,
        dia_mes: Option<i32>,
        horario: Option<&str>,
    ) -> UpsertReconciliationConfigRequest {
        UpsertReconciliationConfigRequest {
            frequencia,
            dia_semana,
            dia_mes,
            horario: horario.map(str::to_string),
        }
    }

    fn config(
        frequencia: Frequencia,
        dia_semana: Option<i32>,
        dia_mes: Option<i32>,
        horario: Option<&str>,
    ) -> ReconciliationConfig {
        ReconciliationConfig {
            frequencia,
            dia_semana,
            dia_mes,
            horario: horario.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn weekly_schedule_requires_weekday() {
        let store = MemoryStore::default();

        let err = ScheduleService::upsert(&store, request(Frequencia::Semanal, None, None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(ScheduleService::get(&store).await.unwrap().is_none());

        let saved = ScheduleService::upsert(&store, request(Frequencia::Semanal, Some(3), None, Some("09:30")))
            .await
            .unwrap();

        let stored = ScheduleService::get(&store).await.unwrap().unwrap();
        assert_eq!(stored, saved);
        assert_eq!(stored.frequencia, Frequencia::Semanal);
        assert_eq!(stored.dia_semana, Some(3));
        assert_eq!(stored.dia_mes, None);
        assert_eq!(stored.horario.as_deref(), Some("09:30"));
    }

    #[tokio::test]
    async fn upsert_replaces_previous_schedule() {
        let store = MemoryStore::default();
        ScheduleService::upsert(&store, request(Frequencia::Semanal, Some(1), None, None))
            .await
            .unwrap();

        ScheduleService::upsert(&store, request(Frequencia::Mensal, None, Some(15), Some("02:00")))
            .await
            .unwrap();

        let stored = ScheduleService::get(&store).await.unwrap().unwrap();
        assert_eq!(stored.frequencia, Frequencia::Mensal);
        assert_eq!(stored.dia_semana, None);
        assert_eq!(stored.dia_mes, Some(15));
    }

    #[test]
    fn day_fields_only_for_their_frequency() {
        assert!(validate_schedule(&request(Frequencia::Mensal, None, None, None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Mensal, None, Some(32), None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Mensal, None, Some(0), None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Mensal, Some(2), Some(10), None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Semanal, Some(7), None, None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Semanal, Some(0), Some(1), None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Diaria, Some(1), None, None)).is_err());
        assert!(validate_schedule(&request(Frequencia::Diaria, None, None, None)).is_ok());
        assert!(validate_schedule(&request(Frequencia::Mensal, None, Some(31), None)).is_ok());
    }

    #[test]
    fn horario_must_be_hh_mm() {
        assert!(validate_schedule(&request(Frequencia::Diaria, None, None, Some("9:30"))).is_err());
        assert!(validate_schedule(&request(Frequencia::Diaria, None, None, Some("24:00"))).is_err());
        assert!(validate_schedule(&request(Frequencia::Diaria, None, None, Some("12:60"))).is_err());
        assert!(validate_schedule(&request(Frequencia::Diaria, None, None, Some("ab:cd"))).is_err());
        // Granularity is a client concern
        assert!(validate_schedule(&request(Frequencia::Diaria, None, None, Some("09:17"))).is_ok());
    }

    #[test]
    fn quantizes_to_half_hours() {
        assert_eq!(quantize_horario("09:17").unwrap(), "09:30");
        assert_eq!(quantize_horario("09:14").unwrap(), "09:00");
        assert_eq!(quantize_horario("09:15").unwrap(), "09:30");
        assert_eq!(quantize_horario("23:50").unwrap(), "00:00");
        assert_eq!(quantize_horario("00:00").unwrap(), "00:00");
        assert!(quantize_horario("7h").is_err());
    }

    // 2024-11-01 is a Friday; 12:00Z is 09:00 in UTC-3

    #[test]
    fn daily_runs_tomorrow_once_time_has_passed() {
        let now = utc("2024-11-01T12:00:00Z");

        let at = next_run(&config(Frequencia::Diaria, None, None, Some("08:00")), now, brt()).unwrap();
        assert_eq!(at, utc("2024-11-02T11:00:00Z"));

        let at = next_run(&config(Frequencia::Diaria, None, None, Some("10:00")), now, brt()).unwrap();
        assert_eq!(at, utc("2024-11-01T13:00:00Z"));
    }

    #[test]
    fn weekly_runs_on_next_matching_weekday() {
        let now = utc("2024-11-01T12:00:00Z");

        let at = next_run(&config(Frequencia::Semanal, Some(3), None, Some("08:00")), now, brt()).unwrap();
        assert_eq!(at, utc("2024-11-06T11:00:00Z"));

        // Same weekday, time already gone: a week later
        let at = next_run(&config(Frequencia::Semanal, Some(5), None, Some("08:00")), now, brt()).unwrap();
        assert_eq!(at, utc("2024-11-08T11:00:00Z"));

        // Sunday at the default midnight
        let at = next_run(&config(Frequencia::Semanal, Some(0), None, None), now, brt()).unwrap();
        assert_eq!(at, utc("2024-11-03T03:00:00Z"));
    }

    #[test]
    fn monthly_clamps_to_last_day() {
        let now = utc("2024-11-01T12:00:00Z");
        let at = next_run(&config(Frequencia::Mensal, None, Some(31), None), now, brt()).unwrap();
        assert_eq!(at, utc("2024-11-30T03:00:00Z"));

        let now = utc("2024-11-30T04:00:00Z");
        let at = next_run(&config(Frequencia::Mensal, None, Some(31), None), now, brt()).unwrap();
        assert_eq!(at, utc("2024-12-31T03:00:00Z"));

        let now = utc("2025-02-01T12:00:00Z");
        let at = next_run(&config(Frequencia::Mensal, None, Some(30), Some("06:00")), now, brt()).unwrap();
        assert_eq!(at, utc("2025-02-28T09:00:00Z"));
    }

    #[test]
    fn exact_instant_counts_as_next_run() {
        let now = utc("2024-11-01T13:00:00Z");
        let at = next_run(&config(Frequencia::Mensal, None, Some(1), Some("10:00")), now, brt()).unwrap();
        assert_eq!(at, now);
    }

    #[tokio::test]
    async fn next_run_without_schedule_is_not_found() {
        let store = MemoryStore::default();

        let err = ScheduleService::next_run(&store, Utc::now(), brt()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
