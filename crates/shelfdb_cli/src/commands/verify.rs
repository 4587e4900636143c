//! Verify command implementation.
//!
//! Reads the image file directly, without going through the database, so
//! that an undecodable image is reported instead of being replaced.

use super::{read_image_bytes, CliError};
use shelfdb_core::{Image, ID_FIELD};
use std::collections::HashSet;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of collections checked.
    pub collections_checked: usize,
    /// Number of records checked.
    pub records_checked: usize,
    /// Problems that break identity guarantees.
    pub errors: Vec<String>,
    /// Problems the next write repairs.
    pub warnings: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying database at {:?}", path);
    println!();

    let bytes = read_image_bytes(path)?;
    let result = verify_image(&bytes);
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Database verification passed");
        Ok(())
    } else {
        println!("✗ Database verification failed");
        Err(CliError::VerificationFailed(result.errors.len()).into())
    }
}

/// Checks an encoded image.
pub fn verify_image(bytes: &[u8]) -> VerifyResult {
    let mut result = VerifyResult::default();

    let image = match Image::decode(bytes) {
        Ok(image) => image,
        Err(e) => {
            result
                .errors
                .push(format!("Image does not decode (it would be reset on next open): {e}"));
            return result;
        }
    };

    for name in image.collection_names() {
        result.collections_checked += 1;
        verify_collection(&image, name, &mut result);
    }

    for name in image.data_indexes.keys() {
        if !image.has_collection(name) {
            result
                .warnings
                .push(format!("Counter for unknown collection {name:?}"));
        }
    }

    let total = image.record_count();
    if image.meta.total != total {
        result.warnings.push(format!(
            "meta.total is {} but the image holds {} records",
            image.meta.total, total
        ));
    }

    result
}

fn verify_collection(image: &Image, name: &str, result: &mut VerifyResult) {
    let mut seen = HashSet::new();
    let mut highest = 0u64;

    for (index, record) in image.records(name).iter().enumerate() {
        result.records_checked += 1;

        let Some(object) = record.as_object() else {
            result
                .errors
                .push(format!("{name}[{index}]: record is not an object"));
            continue;
        };

        let Some(id) = object.get(ID_FIELD).and_then(|v| v.as_str()) else {
            result
                .errors
                .push(format!("{name}[{index}]: record has no string id"));
            continue;
        };

        if !seen.insert(id) {
            result
                .errors
                .push(format!("{name}[{index}]: duplicate id {id:?}"));
        }
        if let Ok(sequence) = id.parse::<u64>() {
            highest = highest.max(sequence);
        }
    }

    match image.data_indexes.get(name) {
        None => result.warnings.push(format!(
            "{name}: counter missing (would restart at {highest})"
        )),
        Some(&counter) if counter < highest => result.errors.push(format!(
            "{name}: counter {counter} is below highest id {highest}; ids would repeat"
        )),
        Some(_) => {}
    }
}

fn print_result(result: &VerifyResult) {
    println!("  Collections checked: {}", result.collections_checked);
    println!("  Records checked:     {}", result.records_checked);

    if !result.warnings.is_empty() {
        println!("  Warnings:");
        for warning in &result.warnings {
            println!("    - {}", warning);
        }
    }

    if !result.errors.is_empty() {
        println!("  Errors:");
        for error in result.errors.iter().take(10) {
            println!("    - {}", error);
        }
        if result.errors.len() > 10 {
            println!("    ... and {} more", result.errors.len() - 10);
        }
    }
}
