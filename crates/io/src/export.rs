// Recap export: XLSX or CSV, chosen by extension

use std::path::Path;

use chrono::NaiveDateTime;
use recap_drill::Record;
use rust_xlsxwriter::{Format, Workbook};

pub const SHEET_NAME: &str = "Recap";

/// `Recap_YYYYMMDD_HHMM.xlsx` for the given local time.
pub fn default_file_name(now: NaiveDateTime) -> String {
    format!("Recap_{}.xlsx", now.format("%Y%m%d_%H%M"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Tsv,
}

impl ExportFormat {
    /// Anything that is not `.csv` / `.tsv` is written as XLSX.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Self::Csv,
            Some("tsv") => Self::Tsv,
            _ => Self::Xlsx,
        }
    }
}

/// Write `headers` then one row per record. Returns the number of data rows.
pub fn export(headers: &[String], records: &[Record], path: &Path) -> Result<usize, String> {
    match ExportFormat::from_path(path) {
        ExportFormat::Xlsx => export_xlsx(headers, records, path),
        ExportFormat::Csv => export_with_delimiter(headers, records, path, b','),
        ExportFormat::Tsv => export_with_delimiter(headers, records, path, b'\t'),
    }
}

pub fn export_xlsx(headers: &[String], records: &[Record], path: &Path) -> Result<usize, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| format!("Failed to create sheet '{}': {}", SHEET_NAME, e))?;

    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &bold)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }

    for (idx, record) in records.iter().enumerate() {
        // rust_xlsxwriter uses 0-based row/col as u32/u16
        let row = (idx + 1) as u32;
        for (col, value) in record.to_row().iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet
                .write_string(row, col as u16, value)
                .map_err(|e| format!("Failed to write row {}: {}", row, e))?;
        }
    }
    worksheet.autofit();

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(records.len())
}

fn export_with_delimiter(
    headers: &[String],
    records: &[Record],
    path: &Path,
    delimiter: u8,
) -> Result<usize, String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    writer.write_record(headers).map_err(|e| e.to_string())?;
    for record in records {
        writer.write_record(record.to_row()).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn record(id: &str, source: &str) -> Record {
        Record {
            identifier: id.into(),
            type_code: "8204".into(),
            description: "Meter, tampering".into(),
            date: "15/01/2024".into(),
            fields: vec!["UP3".into()],
            source_file: source.into(),
        }
    }

    fn headers() -> Vec<String> {
        ["Case No", "Case Type", "Description", "Date", "Unit", "Source"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn default_name_uses_minute_timestamp() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap().and_hms_opt(9, 5, 59).unwrap();
        assert_eq!(default_file_name(now), "Recap_20240307_0905.xlsx");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.tsv")), ExportFormat::Tsv);
        assert_eq!(ExportFormat::from_path(Path::new("a.xlsx")), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::from_path(Path::new("recap")), ExportFormat::Xlsx);
    }

    #[test]
    fn csv_quotes_and_orders_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let n = export(&headers(), &[record("C-1", "a.xlsx")], &path).unwrap();
        assert_eq!(n, 1);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Case No,Case Type,Description,Date,Unit,Source");
        assert_eq!(lines[1], "C-1,8204,\"Meter, tampering\",15/01/2024,UP3,a.xlsx");
    }

    #[test]
    fn xlsx_round_trips_through_calamine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        export(&headers(), &[record("C-1", "a.xlsx"), record("C-2", "b.xlsx")], &path).unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        assert_eq!(range.get_size(), (3, 6));
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Case No".into())));
        assert_eq!(range.get_value((2, 5)), Some(&Data::String("b.xlsx".into())));
    }

    #[test]
    fn empty_export_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(export(&headers(), &[], &path).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
