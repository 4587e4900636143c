//! Dump command implementation.

use super::CliError;
use serde_json::Value;
use shelfdb_core::{Config, Database, FieldValue};
use std::path::Path;
use tracing::info;

/// Runs the dump command.
///
/// Opens the database through the regular API, without creating it and
/// without taking the exclusive lock, and prints the collection as a JSON
/// array.
pub fn run(
    path: &Path,
    collection: &str,
    filter: Option<&str>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()).into());
    }

    let config = Config::default()
        .create_if_missing(false)
        .exclusive_lock(false);
    let db = Database::open_with_config(path, config)?;

    let records = match filter {
        Some(arg) => {
            let (field, value) = parse_filter(arg)?;
            info!("Dumping {collection} where {field} = {value}");
            db.filter_equals(collection, &field, value)?
        }
        None => {
            info!("Dumping {collection}");
            db.fetch_collection(collection)?
        }
    };

    let output = if pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    println!("{output}");

    Ok(())
}

/// Parses a `FIELD=VALUE` filter argument.
///
/// `VALUE` is read as a JSON literal (`42`, `true`, `"quoted"`); text that
/// is not valid JSON is taken as a plain string.
pub fn parse_filter(arg: &str) -> Result<(String, FieldValue), CliError> {
    let (field, raw) = arg
        .split_once('=')
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| CliError::InvalidFilter(arg.to_string()))?;

    let value = match serde_json::from_str::<Value>(raw) {
        Ok(json) => FieldValue::from_json(&json)
            .ok_or_else(|| CliError::UnsupportedFilterValue(raw.to_string()))?,
        Err(_) => FieldValue::from(raw),
    };

    Ok((field.to_string(), value))
}
