// SPDX-License-Identifier: Apache-2.0

//! Demo Jira source: issues.

use std::time::Duration;

use crate::engine::types::Row;

use super::StaticConnector;

pub const SOURCE_NAME: &str = "jira";

pub fn connector() -> StaticConnector {
    StaticConnector::new(SOURCE_NAME, &["issues"], issues())
        .with_latency(Duration::from_millis(100))
}

fn issues() -> Vec<Row> {
    vec![
        Row::new().with_column("key", "PROJ-1").with_column("status", "Open"),
        Row::new().with_column("key", "PROJ-2").with_column("status", "Done"),
    ]
}
