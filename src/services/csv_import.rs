// src/services/csv_import.rs

use crate::{
    errors::{AppError, AppResult},
    models::{ColumnMapping, GovernmentInspection},
};
use chrono::NaiveDate;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    headers.iter().position(|h| *h == wanted)
}

fn required_column(headers: &[String], name: &str) -> AppResult<usize> {
    find_column(headers, name).ok_or_else(|| {
        AppError::Validation(format!(
            "CSV has no '{}' column (found: {})",
            name,
            headers.join(", ")
        ))
    })
}

/// Reads a government inspection export. The first line is the header; the
/// mapping names which headers carry which field.
pub fn parse_government_csv(
    text: &str,
    mapping: &ColumnMapping,
    delimiter: Option<char>,
) -> AppResult<Vec<GovernmentInspection>> {
    let delimiter = match delimiter.unwrap_or(',') {
        c if c.is_ascii() => c as u8,
        c => {
            return Err(AppError::Validation(format!(
                "Delimiter '{}' must be a single ASCII character",
                c
            )));
        }
    };

    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("CSV header could not be read: {e}")))?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let placa_col = required_column(&headers, &mapping.placa)?;
    let data_col = required_column(&headers, &mapping.data_inspecao)?;
    let optional = |name: &Option<String>| name.as_deref().and_then(|n| find_column(&headers, n));
    let renavam_col = optional(&mapping.renavam);
    let tipo_col = optional(&mapping.tipo_inspecao);
    let protocolo_col = optional(&mapping.numero_protocolo);

    let mut rows = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AppError::Validation(format!("CSV parse error: {e}")))?;
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 2);

        let cell = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let data_inspecao = match cell(Some(data_col)) {
            None => None,
            Some(raw) => Some(parse_date(&raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "Line {}: invalid date '{}', expected YYYY-MM-DD or DD/MM/YYYY",
                    line, raw
                ))
            })?),
        };

        rows.push(GovernmentInspection {
            placa: cell(Some(placa_col)),
            renavam: cell(renavam_col),
            data_inspecao,
            tipo_inspecao: cell(tipo_col),
            numero_protocolo: cell(protocolo_col),
        });
    }

    Ok(rows)
}
