use crate::ast::QueryAst;
use crate::error::Result;
use crate::sql::{render_from, render_group_by, render_order_by, render_select, render_where};

/// MySQL backtick-quotes identifiers; pagination uses trailing
/// `LIMIT n OFFSET m`.
pub fn generate(ast: &QueryAst) -> Result<String> {
    let select = render_select(ast);
    let from = render_from(&ast.from_tables.iter().map(|t| format!("`{t}`")).collect::<Vec<_>>());
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
