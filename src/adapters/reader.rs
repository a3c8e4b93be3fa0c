use crate::domain::model::RawRow;
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Map, Number, Value};
use std::io::Cursor;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["csv", "tsv", "json", "xlsx", "xls"];

/// Parses an uploaded recipient file into rows, picking the format by extension.
pub fn read_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<RawRow>> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => read_delimited(bytes, b',')?,
        "tsv" => read_delimited(bytes, b'\t')?,
        "json" => read_json(bytes)?,
        "xlsx" | "xls" => read_spreadsheet(bytes)?,
        _ => {
            return Err(EtlError::UnsupportedInputError {
                file: file_name.to_string(),
                extension,
            })
        }
    };

    tracing::debug!("Read {} rows from {}", rows.len(), file_name);
    Ok(rows)
}

fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        // every header becomes a key; short rows get nulls
        let mut data = Map::new();
        for (index, header) in headers.iter().enumerate() {
            data.entry(header.to_string()).or_insert_with(|| {
                record
                    .get(index)
                    .map(|field| Value::String(field.to_string()))
                    .unwrap_or(Value::Null)
            });
        }
        rows.push(RawRow { data });
    }

    Ok(rows)
}

fn read_json(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let value: Value = serde_json::from_slice(bytes)?;

    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(data) => Some(RawRow { data }),
                _ => None,
            })
            .collect()),
        Value::Object(data) => Ok(vec![RawRow { data }]),
        _ => Err(EtlError::ProcessingError {
            message: "JSON input must be an array of objects".to_string(),
        }),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EtlError::ProcessingError {
            message: "No worksheet found in spreadsheet".to_string(),
        })??;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let rows = sheet_rows
        .map(|cells| {
            let mut data = Map::new();
            for (index, header) in headers.iter().enumerate() {
                data.entry(header.clone())
                    .or_insert_with(|| cells.get(index).map(cell_value).unwrap_or(Value::Null));
            }
            RawRow { data }
        })
        .collect();

    Ok(rows)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::Empty => Value::Null,
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::{resolve, DEFAULT_COLUMN_HINT};
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_read_csv_keeps_column_order() {
        let csv = "Name,Email\nAnn,ann@example.com\nBob,bob@example.com\n";
        let rows = read_rows("people.csv", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(columns, vec!["Name", "Email"]);
        assert_eq!(rows[1].get("Email"), Some(&Value::String("bob@example.com".to_string())));
    }

    #[test]
    fn test_read_csv_tolerates_ragged_rows() {
        let csv = "Name,Email\nAnn\nBob,bob@example.com,extra\n";
        let rows = read_rows("people.CSV", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Email"), Some(&Value::Null));
        assert_eq!(rows[1].data.len(), 2);
    }

    #[test]
    fn test_short_first_row_keeps_declared_columns() {
        let rows = read_rows("people.csv", b"Name,Email\nAnn\nBob,bob@example.com\n").unwrap();

        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(columns, vec!["Name", "Email"]);

        let recipients = resolve(&rows, DEFAULT_COLUMN_HINT).unwrap();
        let addresses: Vec<&str> = recipients.iter().map(|a| a.as_str()).collect();
        assert_eq!(addresses, vec!["bob@example.com"]);
    }

    #[test]
    fn test_short_first_tsv_row_keeps_declared_columns() {
        let rows = read_rows("people.tsv", b"name\temail\nx\ny\ty@example.org\n").unwrap();
        let recipients = resolve(&rows, DEFAULT_COLUMN_HINT).unwrap();
        assert_eq!(recipients.len(), 1);
    }

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Name").unwrap();
        sheet.write_string(0, 1, " Email ").unwrap();
        sheet.write_string(1, 0, "Ann").unwrap();
        sheet.write_string(1, 1, "ann@example.com").unwrap();
        // row 2 leaves the address cell empty
        sheet.write_string(2, 0, "Nobody").unwrap();
        sheet.write_string(3, 0, "Numeric").unwrap();
        sheet.write_number(3, 1, 42.0).unwrap();
        sheet.write_string(4, 0, "Ann again").unwrap();
        sheet.write_string(4, 1, " ann@example.com").unwrap();
        sheet.write_string(5, 0, "Bob").unwrap();
        sheet.write_string(5, 1, "bob@example.org").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_xlsx_uses_header_row() {
        let rows = read_rows("people.xlsx", &workbook_bytes()).unwrap();

        assert_eq!(rows.len(), 5);
        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(columns, vec!["Name", " Email "]);
        assert_eq!(rows[0].get(" Email "), Some(&Value::from("ann@example.com")));
        assert_eq!(rows[1].get(" Email "), Some(&Value::Null));
        assert_eq!(rows[2].get(" Email "), Some(&Value::from(42.0)));
    }

    #[test]
    fn test_xlsx_resolves_end_to_end() {
        let rows = read_rows("People.XLSX", &workbook_bytes()).unwrap();
        let recipients = resolve(&rows, DEFAULT_COLUMN_HINT).unwrap();

        let addresses: Vec<&str> = recipients.iter().map(|a| a.as_str()).collect();
        assert_eq!(addresses, vec!["ann@example.com", "bob@example.org"]);
    }

    #[test]
    fn test_read_tsv() {
        let tsv = "email\tname\nx@y.io\tX\n";
        let rows = read_rows("list.tsv", tsv.as_bytes()).unwrap();
        assert_eq!(rows[0].get("email"), Some(&Value::String("x@y.io".to_string())));
    }

    #[test]
    fn test_read_json_array() {
        let json = r#"[{"email": "a@b.com", "age": 3}, "skipped", {"email": null}]"#;
        let rows = read_rows("people.json", json.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("age"), Some(&Value::from(3)));
        assert_eq!(rows[1].get("email"), Some(&Value::Null));
    }

    #[test]
    fn test_read_json_rejects_scalars() {
        assert!(read_rows("people.json", b"42").is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_rows("people.txt", b"email\na@b.com").unwrap_err();
        assert!(matches!(
            err,
            EtlError::UnsupportedInputError { ref extension, .. } if extension == "txt"
        ));
    }

    #[test]
    fn test_invalid_spreadsheet_bytes() {
        let err = read_rows("people.xlsx", b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, EtlError::SpreadsheetError(_)));
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value(&Data::String("a@b.com".into())), Value::from("a@b.com"));
        assert_eq!(cell_value(&Data::Int(7)), Value::from(7));
        assert_eq!(cell_value(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::Float(1.5)), Value::from(1.5));
    }
}
