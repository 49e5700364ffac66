//! Tabular Codecs
//!
//! CSV in both directions, XLSX out. Uploads arrive as CSV; exports leave as
//! either format.

use std::collections::HashSet;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use analyst_core::{Cell, Dataset, DatasetError};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("CSV input has no header row")]
    MissingHeader,

    #[error("table too large for a worksheet: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse CSV bytes. The first record is the header; cells are inferred
/// as missing, numeric or text.
pub fn read_csv(bytes: &[u8]) -> Result<Dataset, CodecError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(bytes);

    let raw_headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if raw_headers.is_empty() {
        return Err(CodecError::MissingHeader);
    }
    let columns = normalize_headers(raw_headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::infer).collect());
    }

    tracing::debug!(rows = rows.len(), columns = columns.len(), "Parsed CSV");
    Ok(Dataset::new(columns, rows)?)
}

/// Blank headers become `Unnamed: {i}`; repeats get a `.{n}` suffix.
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.is_empty() { format!("Unnamed: {i}") } else { name };
            let mut candidate = base.clone();
            let mut n = 1;
            while seen.contains(&candidate) {
                candidate = format!("{base}.{n}");
                n += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Serialize with a header row; missing cells are written empty.
pub fn write_csv(dataset: &Dataset) -> Result<Vec<u8>, CodecError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(csv_field))?;
    }
    writer.into_inner().map_err(|e| CodecError::Io(e.into_error()))
}

fn csv_field(cell: &Cell) -> String {
    match cell {
        Cell::Missing => String::new(),
        other => other.to_string(),
    }
}

/// Single-sheet workbook: bold header row, numbers as numbers, missing
/// cells left blank.
pub fn write_xlsx(dataset: &Dataset) -> Result<Vec<u8>, CodecError> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        let header = Format::new().set_bold();

        for (c, name) in dataset.columns().iter().enumerate() {
            sheet.write_string_with_format(0, sheet_col(c)?, name, &header)?;
        }
        for (r, row) in dataset.rows().iter().enumerate() {
            let sheet_row = sheet_row(r + 1)?;
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Number(v) => {
                        sheet.write_number(sheet_row, sheet_col(c)?, *v)?;
                    }
                    Cell::Text(s) => {
                        sheet.write_string(sheet_row, sheet_col(c)?, s)?;
                    }
                    Cell::Missing => {}
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn sheet_row(index: usize) -> Result<u32, CodecError> {
    u32::try_from(index).map_err(|_| CodecError::TooLarge(format!("{index} rows")))
}

fn sheet_col(index: usize) -> Result<u16, CodecError> {
    u16::try_from(index).map_err(|_| CodecError::TooLarge(format!("{index} columns")))
}
