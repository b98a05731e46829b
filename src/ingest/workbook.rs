//! Workbook reading.
//!
//! Turns an uploaded spreadsheet (xlsx, xls, xlsb, ods or csv) into a
//! [`Sheet`]: the header row of the first worksheet plus its data rows as
//! ordered header → value mappings.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::CertError;

/// One spreadsheet row: cell values keyed by header, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Iterate `(header, value)` pairs in column order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    #[cfg(test)]
    fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }
}

impl<H: Into<String>, V: Into<String>> FromIterator<(H, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(h, v)| (h.into(), v.into())).collect(),
        }
    }
}

/// The first worksheet of a workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Build a sheet from a raw grid whose first row is the header row.
    ///
    /// Blank headers become `__EMPTY`, `__EMPTY_1`, ...; repeated headers get
    /// `_1`, `_2` suffixes. Missing cells default to `""` and rows with no
    /// non-blank cell are skipped.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut lines = grid.into_iter();
        let Some(raw_headers) = lines.next() else {
            return Self::default();
        };
        let headers = unique_headers(raw_headers);

        let rows = lines
            .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|mut cells| {
                cells.resize(headers.len(), String::new());
                headers.iter().cloned().zip(cells).collect::<Row>()
            })
            .collect();

        Self { headers, rows }
    }
}

fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for header in raw {
        let base = if header.trim().is_empty() {
            "__EMPTY".to_string()
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while out.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", base, n);
        }
        out.push(candidate);
    }
    out
}

/// Read the first sheet of a workbook.
///
/// `file_name` is only used to pick the CSV reader; binary formats are
/// detected from the bytes themselves. Bytes that no workbook reader accepts
/// are tried as CSV before giving up.
pub fn read_first_sheet(bytes: &[u8], file_name: Option<&str>) -> Result<Sheet, CertError> {
    let is_csv = file_name
        .map(|n| n.to_lowercase().ends_with(".csv"))
        .unwrap_or(false);
    if is_csv {
        return read_csv(bytes);
    }

    match read_workbook(bytes) {
        Ok(sheet) => Ok(sheet),
        Err(workbook_err) => read_csv(bytes).map_err(|_| workbook_err),
    }
}

fn read_workbook(bytes: &[u8]) -> Result<Sheet, CertError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| CertError::Spreadsheet(format!("Failed to open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CertError::Spreadsheet("Workbook has no sheets".to_string()))?
        .map_err(|e| CertError::Spreadsheet(format!("Failed to read first sheet: {}", e)))?;

    let grid = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok(Sheet::from_grid(grid))
}

fn read_csv(bytes: &[u8]) -> Result<Sheet, CertError> {
    let bytes = bytes.strip_prefix("\u{feff}".as_bytes()).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| CertError::Spreadsheet(format!("Failed to parse CSV: {}", e)))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(Sheet::from_grid(grid))
}

/// Render a cell the way a spreadsheet shows it as plain text.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // f64's Display drops the fractional part of integral values
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{:?}", e),
    }
}
