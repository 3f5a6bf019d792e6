// SPDX-License-Identifier: Apache-2.0

//! Types for the query planner.

use serde::{Deserialize, Serialize};

/// One side of an equality join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSide {
    pub source: String,
    pub column: String,
}

impl JoinSide {
    pub fn new(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            column: column.into(),
        }
    }
}

/// A single equality join between two distinct sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub left: JoinSide,
    pub right: JoinSide,
}

/// Validated execution plan for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Referenced sources, unique, in order of first appearance in FROM/JOIN
    pub sources: Vec<String>,
    pub join: Option<JoinSpec>,
    /// Requested columns; `None` means every column produced downstream
    pub projection: Option<Vec<String>>,
    /// Canonical rendering of the parsed statement. Not tenant-scoped:
    /// the cache adds the tenant to its key.
    pub fingerprint: String,
}

impl QueryPlan {
    /// The source whose rows are returned when there is no join.
    pub fn primary_source(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }
}

/// A `<source>.<table>` reference from FROM or JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableRelation {
    pub source: String,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRelation {
    /// Whether a column qualifier (`p`, `pull_requests`, `github`, or
    /// `github.pull_requests`) designates this relation.
    pub fn answers_to(&self, qualifier: &[String]) -> bool {
        match qualifier {
            [name] => {
                self.alias
                    .as_deref()
                    .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
                    || self.table.eq_ignore_ascii_case(name)
                    || self.source.eq_ignore_ascii_case(name)
                    || name
                        .split_once('.')
                        .is_some_and(|(source, table)| self.is_named(source, table))
            }
            [source, table] => self.is_named(source, table),
            _ => false,
        }
    }

    fn is_named(&self, source: &str, table: &str) -> bool {
        self.source.eq_ignore_ascii_case(source) && self.table.eq_ignore_ascii_case(table)
    }
}
