// SPDX-License-Identifier: Apache-2.0

//! SQL front end for the planner.
//!
//! Parses with sqlparser's generic dialect and walks the AST to pull out the
//! pieces the planner understands. Any construct outside that subset is an
//! `InvalidQuery` rather than being silently ignored.

use sqlparser::ast::{
    BinaryOperator, Expr, GroupByExpr, JoinConstraint, JoinOperator, ObjectName, ObjectNamePart,
    Query, Select, SelectItem, SetExpr, Statement, TableFactor,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::engine::error::{GatewayError, GatewayResult};

use super::types::TableRelation;

/// A column reference: optional qualifier parts plus the column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnRef {
    pub qualifier: Vec<String>,
    pub column: String,
}

/// FROM/JOIN relations in order, with the ON expression of the join (if any).
pub(crate) struct Relations<'a> {
    pub tables: Vec<TableRelation>,
    pub join_on: Option<&'a Expr>,
}

/// Extracts the string value from an `ObjectNamePart`.
fn part_value(part: &ObjectNamePart) -> String {
    match part {
        ObjectNamePart::Identifier(ident) => ident.value.clone(),
        _ => String::new(),
    }
}

/// Converts `ObjectName.0` parts into a `Vec<String>`.
fn name_parts(name: &ObjectName) -> Vec<String> {
    name.0.iter().map(part_value).collect()
}

/// Parses `sql`, requiring exactly one SELECT statement.
pub(crate) fn parse_single_select(sql: &str) -> GatewayResult<Statement> {
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql.trim())
        .map_err(|e| GatewayError::invalid_query(format!("Failed to parse query: {e}")))?;

    if statements.len() != 1 {
        return Err(GatewayError::invalid_query(
            "Queries must be a single statement",
        ));
    }

    let statement = statements.remove(0);
    if !matches!(statement, Statement::Query(_)) {
        return Err(GatewayError::invalid_query("Only SELECT is supported"));
    }
    Ok(statement)
}

/// Returns the SELECT block of a plain single-block query.
pub(crate) fn select_block(statement: &Statement) -> GatewayResult<&Select> {
    let Statement::Query(query) = statement else {
        return Err(GatewayError::invalid_query("Only SELECT is supported"));
    };
    let select = plain_select(query)?;

    if select.distinct.is_some() {
        return Err(GatewayError::invalid_query("DISTINCT is not supported"));
    }
    if select.selection.is_some() {
        return Err(GatewayError::invalid_query("WHERE clauses are not supported"));
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
        _ => return Err(GatewayError::invalid_query("GROUP BY is not supported")),
    }
    if select.having.is_some() {
        return Err(GatewayError::invalid_query("HAVING is not supported"));
    }
    Ok(select)
}

fn plain_select(query: &Query) -> GatewayResult<&Select> {
    if query.with.is_some() {
        return Err(GatewayError::invalid_query("WITH clauses are not supported"));
    }
    if query.order_by.is_some() {
        return Err(GatewayError::invalid_query("ORDER BY is not supported"));
    }
    if query.limit_clause.is_some() || query.fetch.is_some() {
        return Err(GatewayError::invalid_query("LIMIT is not supported"));
    }
    match query.body.as_ref() {
        SetExpr::Select(select) => Ok(&**select),
        SetExpr::Query(_) => Err(GatewayError::invalid_query("Subqueries are not supported")),
        _ => Err(GatewayError::invalid_query(
            "Only simple SELECT queries are supported",
        )),
    }
}

/// Resolves every FROM/JOIN relation, then checks the join shape.
///
/// Table references are validated first so an unresolvable or unsupported
/// table is reported before join-shape problems.
pub(crate) fn collect_relations(select: &Select) -> GatewayResult<Relations<'_>> {
    if select.from.is_empty() {
        return Err(GatewayError::invalid_query("Invalid SQL: missing FROM clause"));
    }

    let mut tables = Vec::new();
    for twj in &select.from {
        tables.push(resolve_table(&twj.relation)?);
        for join in &twj.joins {
            tables.push(resolve_table(&join.relation)?);
        }
    }

    if tables.len() > 2 {
        return Err(GatewayError::invalid_query(
            "Multiple joins are not supported",
        ));
    }
    if select.from.len() > 1 {
        // `FROM a, b` is a join with no condition.
        return Err(GatewayError::invalid_query(
            "JOIN without ON clause is not supported",
        ));
    }

    let join_on = match select.from[0].joins.first() {
        Some(join) => Some(join_condition(&join.join_operator)?),
        None => None,
    };

    Ok(Relations { tables, join_on })
}

fn join_condition(operator: &JoinOperator) -> GatewayResult<&Expr> {
    match operator {
        JoinOperator::Join(constraint) | JoinOperator::Inner(constraint) => match constraint {
            JoinConstraint::On(expr) => Ok(expr),
            _ => Err(GatewayError::invalid_query(
                "JOIN without ON clause is not supported",
            )),
        },
        _ => Err(GatewayError::invalid_query("Only inner joins are supported")),
    }
}

/// Resolves a table factor to `<source>.<table>`.
///
/// Accepts a two-part name (`github.pull_requests`) or a single quoted
/// identifier containing the dot (`"github.pull_requests"`).
fn resolve_table(factor: &TableFactor) -> GatewayResult<TableRelation> {
    let TableFactor::Table { name, alias, .. } = factor else {
        return Err(GatewayError::invalid_query(
            "Only plain table references are supported",
        ));
    };

    let parts = name_parts(name);
    let split = match parts.as_slice() {
        [source, table] => Some((source.clone(), table.clone())),
        [dotted] => dotted
            .split_once('.')
            .map(|(source, table)| (source.to_string(), table.to_string())),
        _ => None,
    };

    match split {
        Some((source, table)) if !source.is_empty() && !table.is_empty() => Ok(TableRelation {
            source: source.to_lowercase(),
            table,
            alias: alias.as_ref().map(|a| a.name.value.clone()),
        }),
        _ => Err(GatewayError::invalid_query(format!(
            "Invalid table reference '{name}'. Expected <source>.<table>"
        ))),
    }
}

/// Splits an `a = b` join condition into its two column references.
pub(crate) fn equality_operands(on: &Expr) -> GatewayResult<(ColumnRef, ColumnRef)> {
    match on {
        Expr::Nested(inner) => equality_operands(inner),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => Ok((column_ref(left)?, column_ref(right)?)),
        _ => Err(GatewayError::invalid_query(
            "Only equality joins are supported",
        )),
    }
}

fn column_ref(expr: &Expr) -> GatewayResult<ColumnRef> {
    match expr {
        Expr::Nested(inner) => column_ref(inner),
        Expr::Identifier(ident) => Ok(ColumnRef {
            qualifier: Vec::new(),
            column: ident.value.clone(),
        }),
        Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
            let (column, qualifier) = idents.split_last().ok_or_else(|| {
                GatewayError::invalid_query("Empty column reference in JOIN condition")
            })?;
            Ok(ColumnRef {
                qualifier: qualifier.iter().map(|i| i.value.clone()).collect(),
                column: column.value.clone(),
            })
        }
        _ => Err(GatewayError::invalid_query(
            "Only equality joins between columns are supported",
        )),
    }
}

/// Extracts the projection list. `None` when the list contains `*`.
pub(crate) fn projection_columns(items: &[SelectItem]) -> GatewayResult<Option<Vec<String>>> {
    let mut columns = Vec::with_capacity(items.len());
    let mut wildcard = false;

    for item in items {
        match item {
            SelectItem::Wildcard(_) => wildcard = true,
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => columns.push(ident.value.clone()),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => {
                match idents.last() {
                    Some(ident) => columns.push(ident.value.clone()),
                    None => {
                        return Err(GatewayError::invalid_query("Empty column reference"));
                    }
                }
            }
            _ => {
                return Err(GatewayError::invalid_query(
                    "Only simple column projections are supported",
                ));
            }
        }
    }

    Ok((!wildcard).then_some(columns))
}
