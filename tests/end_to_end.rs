//! End-to-end coverage of the natural-language-to-SQL pipeline.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sdqc::app::App;
use sdqc::catalog::{Catalog, CatalogHandle};
use sdqc::config::Config;
use sdqc::error::{ErrorCode, Result};
use sdqc::executor::{ExecutionEngine, Executor, QueryResult, ResultCache};
use sdqc::master_data::MasterDataStore;
use sdqc::parser::{LlmParser, NlqParser, ParserCache, RuleParser};

struct StubEngine;

#[async_trait]
impl ExecutionEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn execute(&self, _sql: &str) -> Result<QueryResult> {
        Ok(QueryResult {
            data: vec![{
                let mut row = HashMap::new();
                row.insert("item_no".to_string(), serde_json::json!("10-0012"));
                row
            }],
            row_count: 1,
            execution_time_ms: 0,
            columns: vec!["item_no".to_string()],
            engine_name: "stub".to_string(),
        })
    }
}

fn write_json(dir: &std::path::Path, name: &str, value: &serde_json::Value) {
    std::fs::write(dir.join(name), serde_json::to_string(value).unwrap()).unwrap();
}

async fn load_catalog(dir: &std::path::Path) -> Catalog {
    std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.to_str().unwrap());
    std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
    let cfg = Config::from_env();
    Catalog::load(&cfg).await.unwrap()
}

fn build_app(catalog: Catalog, master_data: MasterDataStore) -> App {
    let cfg = Config::from_env();
    let rule = RuleParser::default();
    let llm = LlmParser::new(cfg.llm.clone());
    let cache = ParserCache::default_with_ttl_2h();
    let parser = NlqParser::new(rule, llm, cache);
    let executor = Executor::new(Box::new(StubEngine), ResultCache::default_enabled(), Duration::from_secs(5), 1000);
    App::new(CatalogHandle::new(catalog), master_data, parser, executor, cfg)
}

/// Scenario 1: item-by-number inventory lookup against DuckDB.
#[tokio::test]
async fn inventory_by_item_no_produces_read_parquet_sql() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "concepts.json",
        &serde_json::json!([
            { "name": "ITEM_NO", "kind": "DIMENSION", "data_type": "string", "labels": {} },
            { "name": "INVENTORY_QTY", "kind": "METRIC", "data_type": "number", "labels": {} }
        ]),
    );
    write_json(
        dir.path(),
        "intents.json",
        &serde_json::json!([
            {
                "name": "QUERY_INVENTORY",
                "description": "inventory by item",
                "input": { "filters": ["ITEM_NO"], "required_filters": ["ITEM_NO"] },
                "output": { "metrics": ["INVENTORY_QTY"], "dimensions": ["ITEM_NO"] }
            }
        ]),
    );
    write_json(
        dir.path(),
        "bindings.json",
        &serde_json::json!([
            { "concept": "ITEM_NO", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "item_no" },
            { "concept": "INVENTORY_QTY", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "qty", "aggregation": "SUM" }
        ]),
    );
    let catalog = load_catalog(dir.path()).await;
    let master_data = MasterDataStore::new(vec!["10-0012".to_string()], Vec::new(), Vec::new());
    let app = build_app(catalog, master_data);

    let (resolved, result) = app.resolve_and_execute("查詢料號 10-0012 的庫存", None).await.unwrap();

    assert!(resolved.sql.contains("read_parquet"));
    assert!(resolved.sql.contains("mart_inventory_wide"));
    assert!(resolved.sql.contains("item_no = '10-0012'"));
    assert!(resolved.sql.contains("LIMIT 100"));
    assert!(result.row_count >= 0);
}

/// Scenario 2: simple-COUNT intent drops the TIME_RANGE filter; no BETWEEN clause survives into the emitted SQL.
#[tokio::test]
async fn work_order_count_drops_time_range_filter() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "concepts.json",
        &serde_json::json!([
            { "name": "WORK_ORDER_COUNT", "kind": "METRIC", "data_type": "number", "labels": {} }
        ]),
    );
    write_json(
        dir.path(),
        "intents.json",
        &serde_json::json!([
            {
                "name": "QUERY_WORK_ORDER_COUNT",
                "description": "work order count",
                "input": { "filters": ["TIME_RANGE"] },
                "output": { "metrics": ["WORK_ORDER_COUNT"] }
            }
        ]),
    );
    write_json(
        dir.path(),
        "bindings.json",
        &serde_json::json!([
            { "concept": "WORK_ORDER_COUNT", "dialect": "DUCKDB", "table": "mart_work_order", "column": "id", "aggregation": "COUNT" }
        ]),
    );
    let catalog = load_catalog(dir.path()).await;
    let app = build_app(catalog, MasterDataStore::default());

    let (resolved, _) = app.resolve_and_execute("2026年1月的工單總數", None).await.unwrap();

    assert_eq!(resolved.ast.r#where.len(), 0);
    assert!(!resolved.sql.to_ascii_uppercase().contains("BETWEEN"));
    assert!(resolved.sql.contains("COUNT(id)"));
}

/// Scenario 3: an unrecognized warehouse code yields bounded fuzzy
/// suggestions and no SQL is emitted.
#[tokio::test]
async fn unknown_warehouse_yields_not_found_with_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "concepts.json",
        &serde_json::json!([
            { "name": "ITEM_NO", "kind": "DIMENSION", "data_type": "string", "labels": {} },
            { "name": "WAREHOUSE", "kind": "DIMENSION", "data_type": "string", "labels": {} },
            { "name": "INVENTORY_QTY", "kind": "METRIC", "data_type": "number", "labels": {} }
        ]),
    );
    write_json(
        dir.path(),
        "intents.json",
        &serde_json::json!([
            {
                "name": "QUERY_INVENTORY",
                "description": "inventory",
                "input": { "filters": ["ITEM_NO", "WAREHOUSE"] },
                "output": { "metrics": ["INVENTORY_QTY"], "dimensions": ["ITEM_NO"] }
            }
        ]),
    );
    write_json(
        dir.path(),
        "bindings.json",
        &serde_json::json!([
            { "concept": "ITEM_NO", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "item_no" },
            { "concept": "WAREHOUSE", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "warehouse" },
            { "concept": "INVENTORY_QTY", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "qty", "aggregation": "SUM" }
        ]),
    );
    let catalog = load_catalog(dir.path()).await;
    let master_data =
        MasterDataStore::new(Vec::new(), vec!["W01".to_string(), "W02".to_string(), "W0A".to_string()], Vec::new());
    let app = build_app(catalog, master_data);

    let err = app.resolve_and_execute("倉庫 W0X 庫存", None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::WarehouseNotFound);
    assert!(err.suggestions().len() <= 5);
}

/// Scenario 4: a ParsedIntent whose confidence never clears the gate is
/// rejected as INTENT_UNCLEAR before any SQL is built.
#[tokio::test]
async fn low_confidence_parsed_intent_is_intent_unclear() {
    use sdqc::intent::ParsedIntent;
    use sdqc::validator::PreValidator;

    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "concepts.json", &serde_json::json!([]));
    write_json(dir.path(), "intents.json", &serde_json::json!([]));
    write_json(
        dir.path(),
        "bindings.json",
        &serde_json::json!([{ "concept": "X", "dialect": "DUCKDB", "table": "t", "column": "c" }]),
    );
    let catalog = load_catalog(dir.path()).await;
    let master_data = MasterDataStore::default();
    let validator = PreValidator::new(&catalog, &master_data);

    let parsed = ParsedIntent { confidence: 0.2, ..ParsedIntent::unknown() };
    let err = validator.validate(&parsed).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IntentUnclear);
}

/// Scenario 5: a 3-table JOIN with no WHERE clause is refused before any
/// backend contact.
#[tokio::test]
async fn three_way_join_without_filter_is_join_unguarded() {
    let executor = Executor::new(Box::new(StubEngine), ResultCache::default_enabled(), Duration::from_secs(5), 1000);
    let err = executor
        .run("SELECT * FROM a JOIN b ON a.id = b.id JOIN c ON b.id = c.id")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::JoinUnguarded);
}

/// An Intent spanning three distinct tables with no matched filter renders
/// to real `CROSS JOIN` SQL from the actual dialect generator (not
/// hand-written SQL), proving the JOIN guard is reachable from the real
/// pipeline and not just from raw SQL fed straight to the Executor.
#[tokio::test]
async fn generator_output_for_three_table_intent_trips_the_join_guard() {
    use sdqc::ast::{QueryAst, SelectExpr};
    use sdqc::catalog::Aggregation;

    let mut ast = QueryAst::new();
    ast.from_tables.insert("mart_a".to_string());
    ast.from_tables.insert("mart_b".to_string());
    ast.from_tables.insert("mart_c".to_string());
    ast.select.push(SelectExpr { column: "x".to_string(), alias: "x".to_string(), aggregation: Aggregation::None });

    // The Oracle generator, not hand-written SQL, is what the real
    // pipeline emits for a multi-table intent. It always carries its own
    // ROWNUM-derived WHERE, so it is exercised separately from the
    // JOIN_UNGUARDED path below.
    let oracle_sql = sdqc::sql::oracle::generate(&ast).unwrap();
    assert_eq!(oracle_sql.matches("CROSS JOIN").count(), 2);

    let sql = sdqc::sql::mysql::generate(&ast).unwrap();
    assert_eq!(sql.matches("CROSS JOIN").count(), 2);
    assert!(!sql.to_ascii_uppercase().contains("WHERE"));

    let executor = Executor::new(Box::new(StubEngine), ResultCache::default_enabled(), Duration::from_secs(5), 1000);
    let err = executor.run(&sql).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::JoinUnguarded);
}

/// Scenario 6: two identical NLQs within the parser cache TTL; the second
/// is served from cache without re-running the rule/LLM cascade.
#[tokio::test]
async fn repeated_nlq_within_ttl_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = load_catalog(dir.path()).await;

    let rule = RuleParser::default();
    let cfg = Config::from_env();
    let llm = LlmParser::new(cfg.llm.clone());
    let cache = ParserCache::default_with_ttl_2h();
    let parser = NlqParser::new(rule, llm, cache);

    let first = parser.parse("查詢料號 10-0012 的庫存", &catalog).await.unwrap();
    assert!(!first.token_usage.cache_hit);

    let second = parser.parse("查詢料號 10-0012 的庫存", &catalog).await.unwrap();
    assert!(second.token_usage.cache_hit);
}
