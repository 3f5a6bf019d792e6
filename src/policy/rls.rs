// SPDX-License-Identifier: Apache-2.0

//! Row-level security.

use crate::engine::types::Row;

use super::document::PolicyDocument;

/// Keeps only the rows that satisfy every RLS rule of `table`.
pub fn apply_rls(mut rows: Vec<Row>, policy: &PolicyDocument, table: &str) -> Vec<Row> {
    let Some(rules) = policy.rls_for(table) else {
        return rows;
    };

    rows.retain(|row| {
        rules
            .iter()
            .all(|(column, rule)| rule.permits(row.get(column)))
    });
    rows
}
