// SPDX-License-Identifier: Apache-2.0

//! Column projection.

use crate::engine::types::Row;

/// Keeps only the requested columns, in the requested order.
///
/// `None` passes rows through. Requested columns a row doesn't have are
/// omitted from that row.
pub fn apply_projection(rows: Vec<Row>, projection: Option<&[String]>) -> Vec<Row> {
    let Some(columns) = projection else {
        return rows;
    };

    rows.into_iter()
        .map(|row| {
            let mut projected = Row::with_capacity(columns.len());
            for column in columns {
                if let Some(value) = row.get(column) {
                    projected.insert(column.as_str(), value.clone());
                }
            }
            projected
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn follows_requested_order() {
        let rows = vec![Row::new()
            .with_column("a", 1)
            .with_column("b", 2)
            .with_column("c", 3)];
        let out = apply_projection(rows, Some(cols(&["c", "a"]).as_slice()));

        assert_eq!(out[0].columns().collect::<Vec<_>>(), vec!["c", "a"]);
        assert_eq!(out[0], Row::new().with_column("c", 3).with_column("a", 1));
    }

    #[test]
    fn absent_projection_passes_through() {
        let rows = vec![Row::new().with_column("a", 1)];
        assert_eq!(apply_projection(rows.clone(), None), rows);
    }

    #[test]
    fn missing_columns_are_omitted() {
        let rows = vec![Row::new().with_column("a", 1)];
        let out = apply_projection(rows, Some(cols(&["a", "zzz"]).as_slice()));
        assert_eq!(out[0].len(), 1);
        assert!(!out[0].contains("zzz"));
    }
}
