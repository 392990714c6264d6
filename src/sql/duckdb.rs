use crate::ast::QueryAst;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::sql::{render_from, render_group_by, render_order_by, render_select, render_where};

/// Hard-coded fallback convention when a Binding carries no `s3_path`.
fn default_path_template(bucket: &str, table: &str) -> String {
    format!("s3://{bucket}/raw/v1/{table}/year=*/month=*/data.parquet")
}

/// Rewrites logical table names to `read_parquet('<path>', hive_partitioning=true)`
/// expressions; pagination uses trailing `LIMIT n OFFSET m`.
pub fn generate(ast: &QueryAst, catalog: &Catalog) -> Result<String> {
    generate_with_bucket(ast, catalog, "erp-datalake")
}

pub fn generate_with_bucket(ast: &QueryAst, catalog: &Catalog, bucket: &str) -> Result<String> {
    let select = render_select(ast);
    let from = render_from(&ast.from_tables.iter().map(|table| table_expr(catalog, table, bucket)).collect::<Vec<_>>());
    let where_clause = render_where(ast);
    let group_by = render_group_by(ast);
    let order_by = render_order_by(ast);

    let mut sql = format!("SELECT {select} FROM {from}");
    if let Some(w) = where_clause {
        sql.push_str(&format!(" WHERE {w}"));
    }
    if let Some(g) = group_by {
        sql.push_str(&format!(" GROUP BY {g}"));
    }
    if let Some(o) = order_by {
        sql.push_str(&format!(" ORDER BY {o}"));
    }
    sql.push_str(&format!(" LIMIT {} OFFSET {}", ast.limit, ast.offset));

    Ok(sql)
}

fn table_expr(catalog: &Catalog, table: &str, bucket: &str) -> String {
    let path = catalog
        .binding_for_table(table, "DUCKDB")
        .and_then(|b| b.s3_path.clone())
        .unwrap_or_else(|| default_path_template(bucket, table));
    format!("read_parquet('{path}', hive_partitioning=true) AS {table}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SelectExpr;
    use crate::catalog::Aggregation;

    fn empty_catalog() -> Catalog {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("concepts.json"), "[]").unwrap();
        std::fs::write(dir.path().join("intents.json"), "[]").unwrap();
        std::fs::write(
            dir.path().join("bindings.json"),
            serde_json::json!([
                { "concept": "ITEM_NO", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "item_no" }
            ])
            .to_string(),
        )
        .unwrap();
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = crate::config::Config::from_env();
        tokio::runtime::Runtime::new().unwrap().block_on(Catalog::load(&cfg)).unwrap()
    }

    #[test]
    fn rewrites_table_to_read_parquet_with_default_path() {
        let catalog = empty_catalog();
        let mut ast = QueryAst::new();
        ast.from_tables.insert("mart_inventory_wide".to_string());
        ast.select.push(SelectExpr { column: "item_no".to_string(), alias: "item_no".to_string(), aggregation: Aggregation::None });
        let sql = generate(&ast, &catalog).unwrap();
        assert!(sql.contains("read_parquet('s3://erp-datalake/raw/v1/mart_inventory_wide/year=*/month=*/data.parquet', hive_partitioning=true) AS mart_inventory_wide"));
    }
}
