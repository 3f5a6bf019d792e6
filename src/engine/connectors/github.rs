// SPDX-License-Identifier: Apache-2.0

//! Demo GitHub source: pull requests.

use std::time::Duration;

use crate::engine::types::Row;

use super::StaticConnector;

pub const SOURCE_NAME: &str = "github";

pub fn connector() -> StaticConnector {
    StaticConnector::new(SOURCE_NAME, &["pull_requests"], pull_requests())
        .with_latency(Duration::from_millis(150))
}

fn pull_requests() -> Vec<Row> {
    vec![
        Row::new()
            .with_column("id", 1)
            .with_column("title", "Fix bug")
            .with_column("issue_key", "PROJ-1")
            .with_column("repo", "repo-1")
            .with_column("author_email", "srikanth@company.com"),
        Row::new()
            .with_column("id", 2)
            .with_column("title", "Refactor code")
            .with_column("issue_key", "PROJ-2")
            .with_column("repo", "repo-3")
            .with_column("author_email", "other@company.com"),
    ]
}
