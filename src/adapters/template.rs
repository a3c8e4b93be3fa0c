use crate::utils::error::{EtlError, Result};

const SAMPLE_ROWS: [(&str, &str); 3] = [
    ("Jane Doe", "jane.doe@example.com"),
    ("John Smith", "john.smith@example.com"),
    ("Alex Lee", "alex.lee@example.org"),
];

/// A `Name,Email` CSV users can fill in and upload.
pub fn sample_template_csv() -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Name", "Email"])?;
    for (name, email) in SAMPLE_ROWS {
        writer.write_record([name, email])?;
    }

    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to finish template: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::reader::read_rows;
    use crate::core::resolver::{resolve, DEFAULT_COLUMN_HINT};

    #[test]
    fn test_template_resolves_cleanly() {
        let bytes = sample_template_csv().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("Name,Email\n"));

        let rows = read_rows("template.csv", &bytes).unwrap();
        let recipients = resolve(&rows, DEFAULT_COLUMN_HINT).unwrap();
        assert_eq!(recipients.len(), SAMPLE_ROWS.len());
    }
}
