use crate::ast::QueryAst;
use crate::error::Result;
use crate::sql::{render_from, render_group_by, render_order_by, render_select, render_where};

/// Oracle pagination uses `ROWNUM` injected before `GROUP BY`, combined
/// with any existing `WHERE`.
pub fn generate(ast: &QueryAst) -> Result<String> {
    let select = render_select(ast);
    let from = render_from(&ast.from_tables.iter().cloned().collect::<Vec<_>>());
    let where_clause = render_where(ast);
    let group_by = render_group_by(ast);
    let order_by = render_order_by(ast);

    let mut sql = format!("SELECT {select} FROM {from}");

    let rownum_upper = (ast.offset + ast.limit) as i64;
    let rownum_pred = format!("ROWNUM <= {rownum_upper}");
    match where_clause {
        Some(w) => sql.push_str(&format!(" WHERE {w} AND {rownum_pred}")),
        None => sql.push_str(&format!(" WHERE {rownum_pred}")),
    }

    if let Some(g) = group_by {
        sql.push_str(&format!(" GROUP BY {g}"));
    }
    if let Some(o) = order_by {
        sql.push_str(&format!(" ORDER BY {o}"));
    }

    if ast.offset > 0 {
        sql = format!(
            "SELECT * FROM (SELECT inner_.*, ROWNUM rnum FROM ({sql}) inner_ WHERE ROWNUM <= {rownum_upper}) WHERE rnum > {}",
            ast.offset
        );
    }

    Ok(sql)
}
