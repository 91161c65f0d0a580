//! CSV encoding and decoding for bulk export and import.

use serde::{de::DeserializeOwned, Serialize};

use super::error::AppError;

/// Serialize `records` into CSV under an explicit header row, so an empty
/// export still carries its columns. `headers` must follow the field order of `T`.
pub fn to_csv<T: Serialize>(headers: &[&str], records: &[T]) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))
}

/// Parse CSV with a header row. Fields are trimmed; a malformed row fails the
/// whole parse with its line number.
pub fn from_csv<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    reader
        .deserialize()
        .map(|row| {
            row.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                AppError::BadRequest(format!("Invalid CSV at line {}: {}", line, e))
            })
        })
        .collect()
}
