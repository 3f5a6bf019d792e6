// SPDX-License-Identifier: Apache-2.0

//! Query planner
//!
//! Turns a SQL string into a [`QueryPlan`]: the sources to fetch, an optional
//! equality join between two of them, the projection, and a fingerprint used
//! as the cache key. Only a deliberately small SELECT subset is accepted.

mod parser;
pub mod types;

use std::collections::HashSet;

use tracing::debug;

use crate::engine::error::{GatewayError, GatewayResult};

use parser::{
    collect_relations, equality_operands, parse_single_select, projection_columns, select_block,
    ColumnRef,
};
use types::TableRelation;
pub use types::{JoinSide, JoinSpec, QueryPlan};

/// Plans `sql` against the set of registered source names.
///
/// Deterministic: the same SQL and source set always produce the same plan.
pub fn plan_query(sql: &str, known_sources: &HashSet<String>) -> GatewayResult<QueryPlan> {
    if sql.trim().is_empty() {
        return Err(GatewayError::invalid_query("SQL query is required"));
    }

    let statement = parse_single_select(sql)?;
    let select = select_block(&statement)?;
    let relations = collect_relations(select)?;

    let mut sources: Vec<String> = Vec::with_capacity(relations.tables.len());
    for relation in &relations.tables {
        if !known_sources.contains(&relation.source) {
            return Err(GatewayError::invalid_query(format!(
                "Unsupported data source: {}",
                relation.source
            )));
        }
        if !sources.contains(&relation.source) {
            sources.push(relation.source.clone());
        }
    }

    let join = match relations.join_on {
        Some(on) => Some(join_spec(&relations.tables, on)?),
        None => None,
    };

    let projection = projection_columns(&select.projection)?;

    let plan = QueryPlan {
        sources,
        join,
        projection,
        fingerprint: statement.to_string(),
    };
    debug!(sources = ?plan.sources, joined = plan.join.is_some(), "Planned query");
    Ok(plan)
}

fn join_spec(tables: &[TableRelation], on: &sqlparser::ast::Expr) -> GatewayResult<JoinSpec> {
    let [first, second] = tables else {
        return Err(GatewayError::invalid_query(
            "Multiple joins are not supported",
        ));
    };
    if first.source == second.source {
        return Err(GatewayError::invalid_query(
            "Joining a source with itself is not supported",
        ));
    }

    let (left, right) = equality_operands(on)?;
    let left_source = qualifier_source(&left, tables)?;
    let right_source = qualifier_source(&right, tables)?;

    // Unqualified columns take whichever source the other side left over,
    // or FROM/JOIN position when neither side is qualified.
    let (left_source, right_source) = match (left_source, right_source) {
        (Some(l), Some(r)) => (l, r),
        (Some(l), None) => (l, other_source(l, first, second)),
        (None, Some(r)) => (other_source(r, first, second), r),
        (None, None) => (first.source.as_str(), second.source.as_str()),
    };

    if left_source == right_source {
        return Err(GatewayError::invalid_query(
            "JOIN condition must compare columns from two different sources",
        ));
    }

    Ok(JoinSpec {
        left: JoinSide::new(left_source, left.column),
        right: JoinSide::new(right_source, right.column),
    })
}

fn qualifier_source<'a>(
    column: &ColumnRef,
    tables: &'a [TableRelation],
) -> GatewayResult<Option<&'a str>> {
    if column.qualifier.is_empty() {
        return Ok(None);
    }
    let mut matches = tables.iter().filter(|t| t.answers_to(&column.qualifier));
    match (matches.next(), matches.next()) {
        (Some(t), None) => Ok(Some(t.source.as_str())),
        // Qualifier names both relations (`issues` for github.issues and
        // jira.issues): treat the side as unqualified.
        (Some(_), Some(_)) => Ok(None),
        (None, _) => Err(GatewayError::invalid_query(format!(
            "Unknown table qualifier '{}' in JOIN condition",
            column.qualifier.join(".")
        ))),
    }
}

fn other_source<'a>(source: &str, first: &'a TableRelation, second: &'a TableRelation) -> &'a str {
    if first.source == source {
        &second.source
    } else {
        &first.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> HashSet<String> {
        ["github", "jira"].iter().map(|s| s.to_string()).collect()
    }

    fn plan(sql: &str) -> GatewayResult<QueryPlan> {
        plan_query(sql, &known())
    }

    fn assert_invalid(sql: &str, needle: &str) {
        match plan(sql) {
            Err(GatewayError::InvalidQuery { message }) => {
                assert!(message.contains(needle), "{sql}: {message}");
            }
            other => panic!("{sql}: expected InvalidQuery, got {other:?}"),
        }
    }

    #[test]
    fn single_source_select_star() {
        let plan = plan("SELECT * FROM github.pull_requests").unwrap();
        assert_eq!(plan.sources, vec!["github".to_string()]);
        assert!(plan.join.is_none());
        assert!(plan.projection.is_none());
        assert_eq!(plan.primary_source(), Some("github"));
    }

    #[test]
    fn join_with_aliases_and_projection() {
        let plan = plan(
            "SELECT p.title, i.status FROM github.pull_requests p \
             JOIN jira.issues i ON p.issue_key = i.key",
        )
        .unwrap();

        assert_eq!(plan.sources, vec!["github".to_string(), "jira".to_string()]);
        assert_eq!(
            plan.join,
            Some(JoinSpec {
                left: JoinSide::new("github", "issue_key"),
                right: JoinSide::new("jira", "key"),
            })
        );
        assert_eq!(
            plan.projection,
            Some(vec!["title".to_string(), "status".to_string()])
        );
    }

    #[test]
    fn join_sides_follow_qualifiers_not_position() {
        let plan = plan(
            "SELECT * FROM github.pull_requests p INNER JOIN jira.issues i ON i.key = p.issue_key",
        )
        .unwrap();
        let join = plan.join.unwrap();
        assert_eq!(join.left, JoinSide::new("jira", "key"));
        assert_eq!(join.right, JoinSide::new("github", "issue_key"));
    }

    #[test]
    fn join_qualified_by_table_or_source_name() {
        let plan = plan(
            "SELECT * FROM github.pull_requests JOIN jira.issues \
             ON pull_requests.issue_key = jira.key",
        )
        .unwrap();
        let join = plan.join.unwrap();
        assert_eq!(join.left, JoinSide::new("github", "issue_key"));
        assert_eq!(join.right, JoinSide::new("jira", "key"));
    }

    #[test]
    fn join_qualified_by_quoted_dotted_name() {
        let plan = plan(
            r#"SELECT * FROM "github.pull_requests" JOIN "jira.issues" ON "jira.issues".key = "github.pull_requests".issue_key"#,
        )
        .unwrap();
        let join = plan.join.unwrap();
        assert_eq!(join.left, JoinSide::new("jira", "key"));
        assert_eq!(join.right, JoinSide::new("github", "issue_key"));
    }

    #[test]
    fn ambiguous_qualifiers_fall_back_to_position() {
        let both = plan("SELECT * FROM github.issues JOIN jira.issues ON issues.id = issues.key")
            .unwrap()
            .join
            .unwrap();
        assert_eq!(both.left, JoinSide::new("github", "id"));
        assert_eq!(both.right, JoinSide::new("jira", "key"));

        // One side resolves; the ambiguous side takes the other source.
        let one = plan("SELECT * FROM github.issues JOIN jira.issues ON jira.key = issues.id")
            .unwrap()
            .join
            .unwrap();
        assert_eq!(one.left, JoinSide::new("jira", "key"));
        assert_eq!(one.right, JoinSide::new("github", "id"));
    }

    #[test]
    fn unqualified_join_columns_fall_back_to_position() {
        let plan = plan("SELECT * FROM github.pull_requests JOIN jira.issues ON issue_key = status")
            .unwrap();
        let join = plan.join.unwrap();
        assert_eq!(join.left.source, "github");
        assert_eq!(join.right.source, "jira");
    }

    #[test]
    fn fingerprint_is_deterministic_and_whitespace_insensitive() {
        let a = plan("SELECT * FROM github.pull_requests").unwrap();
        let b = plan("SELECT * FROM github.pull_requests").unwrap();
        let c = plan("  SELECT   *\n FROM github.pull_requests  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint, c.fingerprint);

        let d = plan("SELECT id FROM github.pull_requests").unwrap();
        assert_ne!(a.fingerprint, d.fingerprint);
    }

    #[test]
    fn rejects_empty_sql() {
        assert_invalid("   ", "SQL query is required");
    }

    #[test]
    fn rejects_unknown_source() {
        assert_invalid("SELECT * FROM gitlab.merge_requests", "Unsupported data source: gitlab");
    }

    #[test]
    fn rejects_bad_table_reference() {
        assert_invalid("SELECT * FROM pull_requests", "Expected <source>.<table>");
    }

    #[test]
    fn rejects_non_select() {
        assert_invalid("DELETE FROM github.pull_requests", "Only SELECT");
    }

    #[test]
    fn rejects_outer_joins() {
        for sql in [
            "SELECT * FROM github.pull_requests p LEFT JOIN jira.issues i ON p.issue_key = i.key",
            "SELECT * FROM github.pull_requests p RIGHT JOIN jira.issues i ON p.issue_key = i.key",
            "SELECT * FROM github.pull_requests p FULL OUTER JOIN jira.issues i ON p.issue_key = i.key",
            "SELECT * FROM github.pull_requests p CROSS JOIN jira.issues i",
        ] {
            assert_invalid(sql, "Only inner joins");
        }
    }

    #[test]
    fn rejects_join_without_on() {
        assert_invalid(
            "SELECT * FROM github.pull_requests, jira.issues",
            "JOIN without ON clause",
        );
        assert_invalid(
            "SELECT * FROM github.pull_requests p JOIN jira.issues i USING (id)",
            "JOIN without ON clause",
        );
    }

    #[test]
    fn rejects_non_equality_join() {
        assert_invalid(
            "SELECT * FROM github.pull_requests p JOIN jira.issues i ON p.id > i.id",
            "Only equality joins",
        );
        assert_invalid(
            "SELECT * FROM github.pull_requests p JOIN jira.issues i \
             ON p.issue_key = i.key AND p.id = i.id",
            "Only equality joins",
        );
    }

    #[test]
    fn rejects_multiple_joins() {
        let mut sources = known();
        sources.insert("slack".to_string());
        let err = plan_query(
            "SELECT * FROM github.pull_requests p JOIN jira.issues i ON p.issue_key = i.key \
             JOIN slack.messages m ON m.key = i.key",
            &sources,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Multiple joins"));
    }

    #[test]
    fn rejects_self_join() {
        assert_invalid(
            "SELECT * FROM github.pull_requests a JOIN github.pull_requests b ON a.id = b.id",
            "with itself",
        );
    }

    #[test]
    fn rejects_unknown_qualifier() {
        assert_invalid(
            "SELECT * FROM github.pull_requests p JOIN jira.issues i ON x.issue_key = i.key",
            "Unknown table qualifier 'x'",
        );
    }

    #[test]
    fn rejects_join_condition_within_one_source() {
        assert_invalid(
            "SELECT * FROM github.pull_requests p JOIN jira.issues i ON p.issue_key = p.id",
            "two different sources",
        );
    }

    #[test]
    fn rejects_unsupported_clauses() {
        assert_invalid("SELECT * FROM github.pull_requests WHERE id = 1", "WHERE");
        assert_invalid("SELECT * FROM github.pull_requests ORDER BY id", "ORDER BY");
        assert_invalid("SELECT id FROM github.pull_requests GROUP BY id", "GROUP BY");
        assert_invalid("SELECT * FROM github.pull_requests LIMIT 1", "LIMIT");
    }

    #[test]
    fn rejects_aliased_projection() {
        assert_invalid(
            "SELECT title AS t FROM github.pull_requests",
            "Only simple column projections",
        );
    }

    #[test]
    fn star_anywhere_disables_projection() {
        let plan = plan(
            "SELECT p.title, * FROM github.pull_requests p JOIN jira.issues i ON p.issue_key = i.key",
        )
        .unwrap();
        assert!(plan.projection.is_none());
    }
}
