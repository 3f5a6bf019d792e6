// SPDX-License-Identifier: Apache-2.0

//! Column masking.

use crate::engine::types::{Row, Value};

use super::document::PolicyDocument;

/// Replacement for masked values.
pub const MASK_MARKER: &str = "****";

/// Redacts truthy values of every `MASK`ed column of `table`.
///
/// Falsy or absent values are left untouched; masking never adds a column.
pub fn apply_column_mask(mut rows: Vec<Row>, policy: &PolicyDocument, table: &str) -> Vec<Row> {
    let Some(rules) = policy.masks_for(table) else {
        return rows;
    };

    let masked: Vec<&str> = rules
        .iter()
        .filter(|(_, rule)| rule.is_mask())
        .map(|(column, _)| column.as_str())
        .collect();
    if masked.is_empty() {
        return rows;
    }

    for row in &mut rows {
        for column in &masked {
            if let Some(value) = row.get_mut(column) {
                if value.is_truthy() {
                    *value = Value::from(MASK_MARKER);
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_policy() -> PolicyDocument {
        PolicyDocument::default().with_masked_column("t", "email")
    }

    #[test]
    fn masks_truthy_values() {
        let rows = vec![Row::new().with_column("email", "a@x.com")];
        let out = apply_column_mask(rows, &email_policy(), "t");
        assert_eq!(out, vec![Row::new().with_column("email", "****")]);
    }

    #[test]
    fn leaves_null_and_empty_values() {
        let rows = vec![
            Row::new().with_column("email", Value::Null),
            Row::new().with_column("email", ""),
        ];
        let out = apply_column_mask(rows.clone(), &email_policy(), "t");
        assert_eq!(out, rows);
    }

    #[test]
    fn never_introduces_a_column() {
        let rows = vec![Row::new().with_column("id", 7)];
        let out = apply_column_mask(rows, &email_policy(), "t");
        assert!(!out[0].contains("email"));
    }

    #[test]
    fn keeps_column_position() {
        let rows = vec![Row::new()
            .with_column("email", "a@x.com")
            .with_column("id", 1)];
        let out = apply_column_mask(rows, &email_policy(), "t");
        assert_eq!(out[0].columns().collect::<Vec<_>>(), vec!["email", "id"]);
    }
}
