use chrono::NaiveDate;

use crate::ast::{QueryAst, SelectExpr, WhereClause};
use crate::catalog::{Binding, Catalog, Intent, Operator};
use crate::error::{Result, SdqcError};
use crate::intent::{AbstractTimeDescriptor, ParsedIntent, TimeGranularity, TimeRangeValue, Value};
use crate::parser::{NlqParser, CONFIDENCE_GATE};
use crate::resolver::MatchedConcept;

/// Configurable alias map applied before loading the Intent definition.
fn resolve_intent_alias(name: &str) -> &str {
    match name {
        "QUERY_STATS" => "QUERY_INVENTORY",
        other => other,
    }
}

pub async fn parse_nlq(parser: &NlqParser, catalog: &Catalog, nlq: &str) -> Result<ParsedIntent> {
    let parsed = parser.parse(nlq, catalog).await?;
    if parsed.confidence < CONFIDENCE_GATE {
        return Err(SdqcError::IntentUnclear(format!(
            "confidence {:.2} below gate {:.2}",
            parsed.confidence, CONFIDENCE_GATE
        )));
    }
    Ok(parsed)
}

pub fn match_concepts<'c>(catalog: &'c Catalog, parsed: &ParsedIntent) -> Result<(&'c Intent, Vec<MatchedConcept>)> {
    let intent_name = resolve_intent_alias(&parsed.intent_name);
    let intent = catalog
        .get_intent(intent_name)
        .ok_or_else(|| SdqcError::IntentUnclear(format!("unknown intent {intent_name}")))?;

    let mut matched = Vec::new();
    for (concept_name, value) in &parsed.params {
        if catalog.get_concept(concept_name).is_some() || concept_name == "TIME_RANGE" {
            matched.push(MatchedConcept {
                concept: concept_name.clone(),
                value: value.clone(),
                source: "parsed",
            });
        }
    }
    Ok((intent, matched))
}

/// Converts an abstract TIME_RANGE descriptor into an explicit
/// `[start, end)` half-open range using the UTC calendar, month+1 with
/// year rollover.
pub fn expand_time_range(descriptor: &AbstractTimeDescriptor) -> (String, String) {
    let (start_year, start_month) = (descriptor.year, descriptor.month.unwrap_or(1));
    let start = NaiveDate::from_ymd_opt(start_year, start_month, 1).expect("valid start date");

    let (end_year, end_month) = match descriptor.granularity {
        TimeGranularity::Month => {
            if start_month == 12 {
                (start_year + 1, 1)
            } else {
                (start_year, start_month + 1)
            }
        }
        TimeGranularity::Year => (start_year + 1, 1),
    };
    let end = NaiveDate::from_ymd_opt(end_year, end_month, 1).expect("valid end date");

    (start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string())
}

/// Looks up the Binding for the active dialect for every Intent-declared
/// dimension/metric and every matched filter; expands TIME_RANGE; drops
/// TIME_RANGE for "simple COUNT" intents.
pub fn resolve_bindings(
    catalog: &Catalog,
    dialect: &str,
    intent: &Intent,
    matched: &[MatchedConcept],
) -> Result<Vec<WhereClause>> {
    let is_simple_count = intent.output.metrics.len() == 1 && intent.output.dimensions.is_empty();

    let mut clauses = Vec::new();
    for concept in matched {
        if concept.concept == "TIME_RANGE" {
            if is_simple_count {
                continue; // a query counting rows with no dimension has nothing to scope by time
            }
            let (start, end) = match &concept.value {
                Value::TimeRange(TimeRangeValue::Abstract(desc)) => expand_time_range(desc),
                Value::TimeRange(TimeRangeValue::Explicit { start, end }) => (start.clone(), end.clone()),
                _ => return Err(SdqcError::BinderError("TIME_RANGE value has wrong shape".to_string())),
            };
            clauses.push(WhereClause {
                column: "TIME_RANGE".to_string(),
                operator: Operator::Between,
                value: Value::TimeRange(TimeRangeValue::Explicit { start, end }),
            });
            continue;
        }

        let binding = get_binding_or_err(catalog, &concept.concept, dialect)?;
        clauses.push(WhereClause {
            column: concept.concept.clone(),
            operator: binding.operator(),
            value: concept.value.clone(),
        });
    }
    Ok(clauses)
}

fn get_binding_or_err<'c>(catalog: &'c Catalog, concept: &str, dialect: &str) -> Result<&'c Binding> {
    catalog
        .get_binding(concept, dialect)
        .ok_or_else(|| SdqcError::BinderError(format!("no binding for concept {concept} in dialect {dialect}")))
}

/// Re-asserts `required_filters ⊆ matched_concepts`. Duplicative with the
/// Pre-Validator by design.
pub fn validate(intent: &Intent, matched: &[MatchedConcept]) -> Result<()> {
    let matched_names: std::collections::HashSet<&str> = matched.iter().map(|m| m.concept.as_str()).collect();
    for required in &intent.input.required_filters {
        if !matched_names.contains(required.as_str()) {
            return Err(SdqcError::MissingRequiredFilter(required.clone()));
        }
    }
    Ok(())
}

/// Assembles the AST. Injects non-aggregated bound columns into
/// `group_by` when any binding carries an aggregation; injects a default
/// `limit = 100` when the parser yielded none.
pub fn build_ast(
    catalog: &Catalog,
    dialect: &str,
    intent: &Intent,
    where_clauses: &[WhereClause],
    parsed: &ParsedIntent,
    default_limit: u32,
) -> Result<QueryAst> {
    let mut ast = QueryAst::new();

    for dimension in &intent.output.dimensions {
        let binding = get_binding_or_err(catalog, dimension, dialect)?;
        ast.from_tables.insert(binding.table.clone());
        ast.select.push(SelectExpr {
            column: binding.column.clone(),
            alias: dimension.clone(),
            aggregation: crate::catalog::Aggregation::None,
        });
    }
    for metric in &intent.output.metrics {
        let binding = get_binding_or_err(catalog, metric, dialect)?;
        ast.from_tables.insert(binding.table.clone());
        ast.select.push(SelectExpr {
            column: binding.column.clone(),
            alias: metric.clone(),
            aggregation: binding.aggregation(),
        });
    }

    for clause in where_clauses {
        if clause.column == "TIME_RANGE" {
            // Already expanded to explicit start/end literals by
            // resolve_bindings; TIME_RANGE carries no required Binding, so
            // this inlines the clause instead of looking one up. A catalog
            // that does define a ("TIME_RANGE", dialect) Binding can still
            // rename the physical column.
            let column = catalog
                .get_binding("TIME_RANGE", dialect)
                .map(|binding| {
                    ast.from_tables.insert(binding.table.clone());
                    binding.column.clone()
                })
                .unwrap_or_else(|| clause.column.clone());
            ast.r#where.push(WhereClause { column, operator: clause.operator, value: clause.value.clone() });
            continue;
        }

        let binding = get_binding_or_err(catalog, &clause.column, dialect)?;
        ast.from_tables.insert(binding.table.clone());
        ast.r#where.push(WhereClause {
            column: binding.column.clone(),
            operator: clause.operator,
            value: clause.value.clone(),
        });
    }

    ast.limit = parsed.limit.unwrap_or(default_limit).max(1);
    ast.offset = parsed.offset.unwrap_or(0);

    ast.enforce_group_by_invariant();

    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_month_range_with_year_rollover() {
        let descriptor = AbstractTimeDescriptor { granularity: TimeGranularity::Month, year: 2025, month: Some(12) };
        let (start, end) = expand_time_range(&descriptor);
        assert_eq!(start, "2025-12-01");
        assert_eq!(end, "2026-01-01");
    }

    #[test]
    fn expands_plain_month_range() {
        let descriptor = AbstractTimeDescriptor { granularity: TimeGranularity::Month, year: 2026, month: Some(1) };
        let (start, end) = expand_time_range(&descriptor);
        assert_eq!(start, "2026-01-01");
        assert_eq!(end, "2026-02-01");
    }

    #[test]
    fn expands_year_range() {
        let descriptor = AbstractTimeDescriptor { granularity: TimeGranularity::Year, year: 2026, month: None };
        let (start, end) = expand_time_range(&descriptor);
        assert_eq!(start, "2026-01-01");
        assert_eq!(end, "2027-01-01");
    }

    fn catalog_with_dimension_and_metric() -> Catalog {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("concepts.json"), "[]").unwrap();
        std::fs::write(dir.path().join("intents.json"), "[]").unwrap();
        std::fs::write(
            dir.path().join("bindings.json"),
            serde_json::json!([
                { "concept": "WAREHOUSE", "dialect": "DUCKDB", "table": "mart_work_order", "column": "warehouse" },
                { "concept": "WORK_ORDER_COUNT", "dialect": "DUCKDB", "table": "mart_work_order", "column": "id", "aggregation": "COUNT" }
            ])
            .to_string(),
        )
        .unwrap();
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = crate::config::Config::from_env();
        tokio::runtime::Runtime::new().unwrap().block_on(Catalog::load(&cfg)).unwrap()
    }

    fn work_order_by_warehouse_intent() -> Intent {
        use crate::catalog::IntentIo;
        Intent {
            name: "QUERY_WORK_ORDER_BY_WAREHOUSE".to_string(),
            description: "work order count by warehouse".to_string(),
            input: IntentIo { filters: Vec::new(), required_filters: Vec::new(), metrics: Vec::new(), dimensions: Vec::new() },
            output: IntentIo {
                filters: Vec::new(),
                required_filters: Vec::new(),
                dimensions: vec!["WAREHOUSE".to_string()],
                metrics: vec!["WORK_ORDER_COUNT".to_string()],
            },
        }
    }

    #[test]
    fn non_simple_count_time_range_clause_survives_without_a_binding() {
        let catalog = catalog_with_dimension_and_metric();
        let intent = work_order_by_warehouse_intent();
        let matched = vec![MatchedConcept {
            concept: "TIME_RANGE".to_string(),
            value: Value::TimeRange(TimeRangeValue::Explicit { start: "2026-01-01".to_string(), end: "2026-02-01".to_string() }),
            source: "parsed",
        }];

        let where_clauses = resolve_bindings(&catalog, "DUCKDB", &intent, &matched).unwrap();
        assert_eq!(where_clauses.len(), 1);

        let parsed = ParsedIntent::unknown();
        let ast = build_ast(&catalog, "DUCKDB", &intent, &where_clauses, &parsed, 100).unwrap();
        assert_eq!(ast.r#where.len(), 1);
        assert_eq!(ast.r#where[0].column, "TIME_RANGE");
        assert_eq!(ast.r#where[0].operator, Operator::Between);
    }
}
