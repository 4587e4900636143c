//! Inspect command implementation.

use super::{read_image, OutputFormat};
use serde::Serialize;
use shelfdb_core::{CollectionSummary, Image};
use std::path::Path;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Image path.
    pub path: String,
    /// Image size in bytes.
    pub image_size: u64,
    /// Records across all collections.
    pub total_records: u64,
    /// The `meta.total` stored in the image.
    pub stored_total: u64,
    /// Per-collection figures.
    pub collections: Vec<CollectionSummary>,
}

impl InspectResult {
    /// Summarizes a decoded image.
    pub fn from_image(path: &Path, image: &Image, image_size: u64) -> Self {
        let mut names: Vec<&str> = image.collection_names().collect();
        for name in image.data_indexes.keys() {
            if !image.has_collection(name) {
                names.push(name.as_str());
            }
        }
        names.sort_unstable();

        let collections = names
            .into_iter()
            .map(|name| CollectionSummary {
                name: name.to_string(),
                records: image.records(name).len() as u64,
                counter: image.counter(name),
            })
            .collect();

        Self {
            path: path.display().to_string(),
            image_size,
            total_records: image.record_count(),
            stored_total: image.meta.total,
            collections,
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let (image, size) = read_image(path)?;
    let result = InspectResult::from_image(path, &image, size);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("ShelfDB Database Inspection");
    println!("===========================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {} bytes", format_size(result.image_size));
    println!();
    println!("Records:");
    println!("  Total:        {}", result.total_records);
    println!("  Stored total: {}", result.stored_total);

    if !result.collections.is_empty() {
        println!();
        println!("Collections:");
        for col in &result.collections {
            println!(
                "  {} - {} records, last id {}",
                col.name, col.records, col.counter
            );
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
