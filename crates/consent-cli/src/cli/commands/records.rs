//! Prints stored records as a table.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use consent_core::config::Config;
use consent_core::sink::read_records;
use consent_core::study::table_header;

pub fn show(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| config.sink.records_path());
    let records = read_records(&path)?;

    if records.is_empty() {
        println!("No records in {}", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(table_header(&config.options));
    for record in &records {
        table.add_row(record.table_row(&config.options));
    }

    println!("{table}");
    println!("{} records in {}", records.len(), path.display());
    Ok(())
}
