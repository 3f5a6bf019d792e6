// SPDX-License-Identifier: Apache-2.0

//! In-memory equi-join.

use std::collections::HashMap;

use crate::engine::types::{Row, Value};

/// Hashable form of a join value.
///
/// Integral floats fold into `Int` so `1` and `1.0` land in the same bucket,
/// matching `Value` equality. `Null` is not a key: it never joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

impl JoinKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(JoinKey::Bool(*b)),
            Value::Int(i) => Some(JoinKey::Int(*i)),
            Value::Float(f) if f.is_nan() => None,
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(JoinKey::Int(*f as i64))
                } else {
                    // -0.0 == 0.0 is handled by the integral branch above.
                    Some(JoinKey::Float(f.to_bits()))
                }
            }
            Value::Text(s) => Some(JoinKey::Text(s.clone())),
        }
    }
}

/// Inner-joins `left` with `right` on `left[left_column] == right[right_column]`.
///
/// The right side is indexed by key and, when several right rows share a
/// key, the last one indexed is the only match. Each matching left row emits
/// one merged row: a copy of the left row with the right row's columns laid
/// over it (right wins on name collisions). Rows whose key column is missing
/// or null never match.
pub fn inner_join(left: &[Row], right: &[Row], left_column: &str, right_column: &str) -> Vec<Row> {
    let mut index: HashMap<JoinKey, &Row> = HashMap::with_capacity(right.len());
    for row in right {
        if let Some(key) = row.get(right_column).and_then(JoinKey::from_value) {
            index.insert(key, row);
        }
    }

    left.iter()
        .filter_map(|row| {
            let key = row.get(left_column).and_then(JoinKey::from_value)?;
            let matched = index.get(&key)?;
            let mut merged = row.clone();
            for (column, value) in matched.iter() {
                merged.insert(column, value.clone());
            }
            Some(merged)
        })
        .collect()
}
