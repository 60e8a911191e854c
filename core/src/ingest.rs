//! CSV ingest: header check, then checked row conversion.
//!
//! Schema errors surface before any row is read. The first row that
//! fails conversion stops the load; rows are never skipped.

use crate::{
    error::ReportResult,
    record::{HeaderMap, Record, RowReader, Table},
    validate,
};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load a table from a CSV file on disk.
pub fn load_table<R: Record>(path: &Path) -> ReportResult<Table<R>> {
    let file = File::open(path)?;
    let table = read_table::<R, _>(file)?;
    log::info!(
        "loaded {} rows into '{}' from {}",
        table.len(),
        table.name,
        path.display()
    );
    Ok(table)
}

/// Read a table from any CSV source (files, in-memory buffers in tests).
pub fn read_table<R: Record, S: Read>(source: S) -> ReportResult<Table<R>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = build_header_map(reader.headers()?);
    validate::require_columns(R::TABLE, headers.keys().map(String::as_str), R::REQUIRED_COLUMNS)?;

    let mut rows = Vec::new();
    // RowReader decodes each cell as UTF-8.
    for (index, result) in reader.byte_records().enumerate() {
        let record = result?;
        let row = RowReader::new(R::TABLE, index, &record, &headers);
        rows.push(R::from_row(&row)?);
    }

    Ok(Table::new(rows))
}

fn build_header_map(headers: &StringRecord) -> HeaderMap {
    headers
        .iter()
        .enumerate()
        .map(|(pos, name)| (normalize_header_name(name), pos))
        .collect()
}

/// Spreadsheet exports sometimes prefix the first header with a BOM.
fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Customer;

    #[test]
    fn bom_prefixed_header_is_recognised() {
        let csv = "\u{feff}customer_id,gender,age_group,income_group,education_level,marital_status,state,customer_job,total_income,cust_satisfaction_score\n\
                   C000001,F,30-40,Med,Graduate,Single,TX,Govt,52000.5,3.4\n";
        let table = read_table::<Customer, _>(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].customer_id, "C000001");
    }
}
