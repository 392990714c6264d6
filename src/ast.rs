use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{Aggregation, Operator};
use crate::intent::Value;

/// A single projected column, with an optional aggregation applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectExpr {
    pub column: String,
    pub alias: String,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

/// The Resolver's sole output and the SQL Generator's sole input
///. Never serialized to SQL text by anything but the
/// generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAst {
    pub select: Vec<SelectExpr>,
    pub from_tables: BTreeSet<String>,
    pub r#where: Vec<WhereClause>,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: u32,
    pub offset: u32,
}

impl QueryAst {
    pub fn new() -> Self {
        QueryAst {
            select: Vec::new(),
            from_tables: BTreeSet::new(),
            r#where: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: 100,
            offset: 0,
        }
    }

    pub fn has_aggregation(&self) -> bool {
        self.select.iter().any(|s| s.aggregation.is_aggregated())
    }

    /// Invariant: when any select expression is aggregated, every
    /// non-aggregated select column must appear in `group_by`.
    pub fn enforce_group_by_invariant(&mut self) {
        if !self.has_aggregation() {
            return;
        }
        for expr in &self.select {
            if !expr.aggregation.is_aggregated() && !self.group_by.contains(&expr.column) {
                self.group_by.push(expr.column.clone());
            }
        }
    }
}

impl Default for QueryAst {
    fn default() -> Self {
        Self::new()
    }
}
