use crate::core::{RawRow, RecipientSet};
use crate::domain::model::Address;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{AddressRule, PatternRule};
use serde_json::Value;

pub const DEFAULT_COLUMN_HINT: &str = "email";

/// Filters rows down to distinct, well-formed addresses using the default pattern.
pub fn resolve(rows: &[RawRow], column_hint: &str) -> Result<RecipientSet> {
    resolve_with(rows, column_hint, &PatternRule)
}

/// Same as [`resolve`] with a caller-supplied address rule.
///
/// The column is located from the first row's keys, comparing trimmed,
/// lowercased names. Cells that are missing, non-scalar or fail `rule` are
/// dropped without error; repeats keep their first position.
pub fn resolve_with<R: AddressRule + ?Sized>(
    rows: &[RawRow],
    column_hint: &str,
    rule: &R,
) -> Result<RecipientSet> {
    let column = find_column(rows, column_hint)?;
    tracing::debug!("Using column '{}' for recipient addresses", column);

    let mut invalid = 0usize;
    let recipients: RecipientSet = rows
        .iter()
        .filter_map(|row| {
            let candidate = row.get(column).and_then(cell_text);
            match candidate {
                Some(text) if rule.accepts(text.trim()) => {
                    Some(Address::accepted(text.trim().to_string()))
                }
                _ => {
                    invalid += 1;
                    None
                }
            }
        })
        .collect();

    tracing::debug!(
        "Resolved {} unique recipients from {} rows ({} invalid)",
        recipients.len(),
        rows.len(),
        invalid
    );

    if recipients.is_empty() {
        return Err(EtlError::NoValidRecipientsError { rows: rows.len() });
    }

    Ok(recipients)
}

fn find_column<'a>(rows: &'a [RawRow], column_hint: &str) -> Result<&'a str> {
    let wanted = column_hint.trim().to_lowercase();
    let first = rows.first();

    first
        .into_iter()
        .flat_map(RawRow::columns)
        .find(|name| name.trim().to_lowercase() == wanted)
        .ok_or_else(|| EtlError::ColumnNotFoundError {
            column: column_hint.trim().to_string(),
            available: first
                .map(|row| row.columns().map(str::to_string).collect())
                .unwrap_or_default(),
        })
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn email_rows(values: &[&str]) -> Vec<RawRow> {
        values
            .iter()
            .map(|value| RawRow::new().with("Email", *value))
            .collect()
    }

    fn addresses(set: &RecipientSet) -> Vec<&str> {
        set.iter().map(Address::as_str).collect()
    }

    #[test]
    fn test_drops_invalid_and_duplicate_rows() {
        let rows = email_rows(&["a@b.com", "bad", "a@b.com"]);
        let resolved = resolve(&rows, DEFAULT_COLUMN_HINT).unwrap();
        assert_eq!(addresses(&resolved), vec!["a@b.com"]);
    }

    #[test]
    fn test_missing_column() {
        let rows = vec![RawRow::new().with("Name", "x")];
        let err = resolve(&rows, DEFAULT_COLUMN_HINT).unwrap_err();
        match err {
            EtlError::ColumnNotFoundError { column, available } => {
                assert_eq!(column, "email");
                assert_eq!(available, vec!["Name".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_has_no_column() {
        assert!(matches!(
            resolve(&[], DEFAULT_COLUMN_HINT),
            Err(EtlError::ColumnNotFoundError { .. })
        ));
    }

    #[test]
    fn test_no_valid_recipients() {
        let rows = email_rows(&["bad", "", "still@bad"]);
        assert!(matches!(
            resolve(&rows, DEFAULT_COLUMN_HINT),
            Err(EtlError::NoValidRecipientsError { rows: 3 })
        ));
    }

    #[test]
    fn test_header_match_ignores_case_and_whitespace() {
        let rows = vec![
            RawRow::new().with("Name", "Ann").with("  EMAIL ", "ann@example.com"),
            RawRow::new().with("Name", "Bob").with("  EMAIL ", "bob@example.com"),
        ];
        let resolved = resolve(&rows, " Email").unwrap();
        assert_eq!(addresses(&resolved), vec!["ann@example.com", "bob@example.com"]);
    }

    #[test]
    fn test_first_matching_column_wins() {
        let rows = vec![RawRow::new()
            .with("email", "first@example.com")
            .with("EMAIL", "second@example.com")];
        let resolved = resolve(&rows, "email").unwrap();
        assert_eq!(addresses(&resolved), vec!["first@example.com"]);
    }

    #[test]
    fn test_values_are_trimmed_before_validation_and_dedup() {
        let rows = email_rows(&["  a@b.com", "a@b.com  ", "\tc@d.org\n"]);
        let resolved = resolve(&rows, "email").unwrap();
        assert_eq!(addresses(&resolved), vec!["a@b.com", "c@d.org"]);
    }

    #[test]
    fn test_case_is_preserved_and_not_folded() {
        let rows = email_rows(&["A@B.com", "a@b.com"]);
        let resolved = resolve(&rows, "email").unwrap();
        assert_eq!(addresses(&resolved), vec!["A@B.com", "a@b.com"]);
    }

    #[test]
    fn test_three_repeats_collapse_to_one() {
        let rows = email_rows(&["a@b.com", "x@y.net", "a@b.com", "a@b.com"]);
        let resolved = resolve(&rows, "email").unwrap();
        let count = resolved.iter().filter(|a| a.as_str() == "a@b.com").count();
        assert_eq!(count, 1);
        assert_eq!(addresses(&resolved), vec!["a@b.com", "x@y.net"]);
    }

    #[test]
    fn test_non_string_and_missing_cells_are_invalid() {
        let rows = vec![
            RawRow::new().with("email", json!(42)),
            RawRow::new().with("email", Value::Null),
            RawRow::new().with("email", json!(["a@b.com"])),
            RawRow::new().with("name", "no email key"),
            RawRow::new().with("email", "ok@example.com"),
        ];
        let resolved = resolve(&rows, "email").unwrap();
        assert_eq!(addresses(&resolved), vec!["ok@example.com"]);
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let rows = email_rows(&["z@z.io", "bad", "a@a.io", "z@z.io"]);
        let first = resolve(&rows, "email").unwrap();
        let second = resolve(&rows, "email").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_rule() {
        let rows = email_rows(&["a@example.com", "b@other.com"]);
        let only_example = |candidate: &str| candidate.ends_with("@example.com");
        let resolved = resolve_with(&rows, "email", &only_example).unwrap();
        assert_eq!(addresses(&resolved), vec!["a@example.com"]);
    }

    #[test]
    fn test_custom_column_hint() {
        let rows = vec![RawRow::new().with("Contact", "c@d.com")];
        let resolved = resolve(&rows, "contact").unwrap();
        assert_eq!(addresses(&resolved), vec!["c@d.com"]);
    }
}
