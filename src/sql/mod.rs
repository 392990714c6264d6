pub mod duckdb;
pub mod mysql;
pub mod oracle;

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::ast::QueryAst;
use crate::catalog::{Catalog, Operator};
use crate::error::{Result, SdqcError};
use crate::intent::{TimeRangeValue, Value};

/// Dispatches to the dialect-specific generator. The AST is
/// the sole input; no component downstream of the Resolver emits SQL text
/// directly.
pub fn generate(dialect: &str, ast: &QueryAst, catalog: &Catalog) -> Result<String> {
    match dialect.to_ascii_uppercase().as_str() {
        "ORACLE" => {
            let sql = oracle::generate(ast)?;
            validate_syntax(&sql)?;
            Ok(sql)
        }
        // read_parquet(...) with hive partitioning isn't valid generic SQL,
        // so the parse-validity check is skipped for this dialect.
        "DUCKDB" => duckdb::generate(ast, catalog),
        "MYSQL" => {
            let sql = mysql::generate(ast)?;
            validate_syntax(&sql)?;
            Ok(sql)
        }
        other => Err(SdqcError::Internal(format!("unsupported dialect {other}"))),
    }
}

/// Confirms the rendered SQL text actually parses before it reaches the
/// executor.
fn validate_syntax(sql: &str) -> Result<()> {
    Parser::parse_sql(&GenericDialect {}, sql)
        .map(|_| ())
        .map_err(|e| SdqcError::Internal(format!("generated SQL failed to parse: {e}")))
}

#[cfg(test)]
mod generate_tests {
    use super::*;
    use crate::ast::SelectExpr;
    use crate::catalog::Aggregation;

    #[test]
    fn well_formed_sql_passes_validation() {
        assert!(validate_syntax("SELECT item_no AS item_no FROM stock_mgmt.items WHERE item_no = '10-0012'").is_ok());
    }

    #[test]
    fn malformed_sql_is_rejected() {
        assert!(validate_syntax("SELECT FROM WHERE").is_err());
    }

    #[test]
    fn oracle_generate_runs_syntax_check() {
        let mut ast = QueryAst::new();
        ast.select.push(SelectExpr { column: "item_no".to_string(), alias: "item_no".to_string(), aggregation: Aggregation::None });
        ast.from_tables.insert("stock_mgmt.items".to_string());
        let sql = oracle::generate(&ast).unwrap();
        assert!(validate_syntax(&sql).is_ok());
    }
}

/// Shared base behavior across dialects: builds SELECT,
/// WHERE, GROUP BY, ORDER BY; dialects override quoting, FROM rendering,
/// and pagination.
pub struct RenderedClauses {
    pub select: String,
    pub where_clause: Option<String>,
    pub group_by: Option<String>,
    pub order_by: Option<String>,
}

pub fn render_select(ast: &QueryAst) -> String {
    ast.select
        .iter()
        .map(|expr| match expr.aggregation.sql_fn() {
            Some(agg_fn) => format!("{}({}) AS {}", agg_fn, expr.column, expr.alias),
            None => format!("{} AS {}", expr.column, expr.alias),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_where(ast: &QueryAst) -> Option<String> {
    if ast.r#where.is_empty() {
        return None;
    }
    Some(
        ast.r#where
            .iter()
            .map(render_predicate)
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}

fn render_predicate(clause: &crate::ast::WhereClause) -> String {
    match clause.operator {
        Operator::Between => {
            if let Value::TimeRange(TimeRangeValue::Explicit { start, end }) = &clause.value {
                format!("{} BETWEEN '{}' AND '{}'", clause.column, quote_escape(start), quote_escape(end))
            } else {
                format!("{} {}", clause.column, clause.operator.sql_symbol())
            }
        }
        Operator::In => {
            if let Value::List { values } = &clause.value {
                let list = values.iter().map(|v| format!("'{}'", quote_escape(v))).collect::<Vec<_>>().join(", ");
                format!("{} IN ({})", clause.column, list)
            } else {
                format!("{} {}", clause.column, clause.operator.sql_symbol())
            }
        }
        Operator::IsNull => format!("{} IS NULL", clause.column),
        _ => match &clause.value {
            Value::Scalar { value } => format!("{} {} '{}'", clause.column, clause.operator.sql_symbol(), quote_escape(value)),
            Value::List { values } => {
                let list = values.iter().map(|v| format!("'{}'", quote_escape(v))).collect::<Vec<_>>().join(", ");
                format!("{} IN ({})", clause.column, list)
            }
            Value::TimeRange(TimeRangeValue::Explicit { start, end }) => {
                format!("{} BETWEEN '{}' AND '{}'", clause.column, quote_escape(start), quote_escape(end))
            }
            Value::TimeRange(TimeRangeValue::Abstract(_)) => {
                format!("{} {}", clause.column, clause.operator.sql_symbol())
            }
        },
    }
}

fn quote_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Joins multiple tables with `CROSS JOIN` rather than a bare comma list.
/// Cross-table queries here have no modeled join key (a Binding maps one
/// concept to one table+column, never a relationship between tables), so
/// this is a cartesian product either way; rendering it with the `JOIN`
/// keyword, rather than a comma, is what lets the pre-execution JOIN
/// guard in `executor::Executor::guard` — which scans rendered SQL text
/// for that keyword — actually see a multi-table query from the real
/// pipeline instead of only from hand-written test SQL.
pub fn render_from<S: AsRef<str>>(tables: &[S]) -> String {
    tables.iter().map(|t| t.as_ref()).collect::<Vec<_>>().join(" CROSS JOIN ")
}

pub fn render_group_by(ast: &QueryAst) -> Option<String> {
    if ast.group_by.is_empty() {
        None
    } else {
        Some(ast.group_by.join(", "))
    }
}

/// Appends a deterministic tie-break referencing the first select
/// expression when `limit` is set but `order_by` is empty.
/// Skipped for aggregation-only queries with no select columns at all.
pub fn render_order_by(ast: &QueryAst) -> Option<String> {
    if !ast.order_by.is_empty() {
        return Some(ast.order_by.join(", "));
    }
    if ast.limit > 0 {
        if let Some(first) = ast.select.first() {
            return Some(first.alias.clone());
        }
    }
    None
}
