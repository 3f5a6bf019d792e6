// SPDX-License-Identifier: Apache-2.0

//! Policy document format.
//!
//! ```json
//! {
//!   "rls":         { "<source.table>": { "<column>": { "in": [ ... ] } } },
//!   "column_mask": { "<source.table>": { "<column>": "MASK" } }
//! }
//! ```
//!
//! A table without an entry is unrestricted and unmasked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::types::Value;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to watch policy file: {0}")]
    Watch(#[from] notify::Error),
}

/// Row-level security rule for one column.
///
/// Only the `in` shape is understood; a rule without it restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RlsRule {
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl RlsRule {
    pub fn allow(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            allowed: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// A missing column never matches: absence is not a member of any set.
    pub fn permits(&self, value: Option<&Value>) -> bool {
        match (&self.allowed, value) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(allowed), Some(value)) => allowed.contains(value),
        }
    }
}

/// Column masking rule. `"MASK"` is the only rule with an effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskRule(String);

impl MaskRule {
    pub fn mask() -> Self {
        Self("MASK".to_string())
    }

    pub fn is_mask(&self) -> bool {
        self.0 == "MASK"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub rls: HashMap<String, HashMap<String, RlsRule>>,
    #[serde(default)]
    pub column_mask: HashMap<String, HashMap<String, MaskRule>>,
}

impl PolicyDocument {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn with_rls_rule(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        rule: RlsRule,
    ) -> Self {
        self.rls
            .entry(table.into())
            .or_default()
            .insert(column.into(), rule);
        self
    }

    pub fn with_masked_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.column_mask
            .entry(table.into())
            .or_default()
            .insert(column.into(), MaskRule::mask());
        self
    }

    pub fn rls_for(&self, table: &str) -> Option<&HashMap<String, RlsRule>> {
        self.rls.get(table)
    }

    pub fn masks_for(&self, table: &str) -> Option<&HashMap<String, MaskRule>> {
        self.column_mask.get(table)
    }
}
