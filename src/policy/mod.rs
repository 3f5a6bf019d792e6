// SPDX-License-Identifier: Apache-2.0

//! Policy Engine
//!
//! Two independent stages applied to every live fetch, in this order:
//! - **Row-level security**: drops rows whose values fall outside a
//!   per-column allow-list
//! - **Column masking**: redacts truthy values of masked columns
//!
//! Both run before rows reach the cache, so cached entries are already
//! policy-cleared and are served without re-running policy. A policy change
//! therefore only affects new fetches, or cached entries once they expire or
//! fall outside a caller's staleness budget.

pub mod document;
pub mod mask;
pub mod rls;
pub mod store;

pub use document::{MaskRule, PolicyDocument, PolicyError, RlsRule};
pub use mask::{apply_column_mask, MASK_MARKER};
pub use rls::apply_rls;
pub use store::PolicyStore;

use crate::engine::types::Row;

/// Runs RLS then masking for one table.
pub fn enforce(rows: Vec<Row>, policy: &PolicyDocument, table: &str) -> Vec<Row> {
    let rows = apply_rls(rows, policy, table);
    apply_column_mask(rows, policy, table)
}
