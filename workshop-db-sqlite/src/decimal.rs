//! Money and quantity columns are stored as SQLite REAL. These helpers move
//! them in and out of [`Decimal`] without a lossy detour through the caller.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use workshop_core::RepositoryError;

fn read_column(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{column}' not found: {e}")))?;
    if value_ref.is_null() {
        return Ok(None);
    }
    let type_name = value_ref.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{column}': {e}"))
            })?;
            Decimal::from(val)
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{column}': {e}"))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {val} to Decimal: {e}"))
            })?
        }
        // Rows written by the CSV importer or by hand may carry numeric text.
        "TEXT" => {
            let val: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{column}': {e}"))
            })?;
            Decimal::from_str(val.trim()).map_err(|_| {
                RepositoryError::Database(format!(
                    "Unexpected type 'TEXT' for column '{column}'"
                ))
            })?
        }
        other => {
            return Err(RepositoryError::Database(format!(
                "Unexpected type '{other}' for column '{column}'"
            )));
        }
    };
    Ok(Some(value))
}

/// Decimal value of a column. NULL reads as zero.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    read_column(row, column).map(Option::unwrap_or_default)
}

pub fn get_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    read_column(row, column)
}

pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

pub fn optional_decimal_to_f64(d: Option<Decimal>) -> Option<f64> {
    d.map(decimal_to_f64)
}
