pub mod cache;
pub mod duckdb_engine;
pub mod oracle_engine;
pub mod path_mapping;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{Result, SdqcError};

pub use cache::ResultCache;

/// `{data: [{col -> value}], row_count, execution_time_ms, columns}`.
/// Date/time columns are pre-formatted `YYYY-MM-DD HH:MM:SS` UTC by the
/// backend before reaching this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<HashMap<String, JsonValue>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub columns: Vec<String>,
    pub engine_name: String,
}

/// A connection-owning SQL backend. One handle per executor instance,
/// opened lazily.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, sql: &str) -> Result<QueryResult>;
}

/// Runs SQL with strict resource bounds: a pre-execution JOIN guard, a
/// timeout watchdog, partition-pruning path rewrite, and a result LRU.
pub struct Executor {
    engine: Box<dyn ExecutionEngine>,
    cache: ResultCache,
    timeout: Duration,
    max_results: usize,
}

impl Executor {
    pub fn new(engine: Box<dyn ExecutionEngine>, cache: ResultCache, timeout: Duration, max_results: usize) -> Self {
        Executor { engine, cache, timeout, max_results }
    }

    /// Refuses to run multi-table JOIN queries lacking a guarding filter.
    /// For a JOIN lacking `LIMIT`, callers are expected to have already
    /// injected `LIMIT 1000` via the Resolver/AST invariant; this defends
    /// the contract for SQL arriving from other callers too.
    fn guard(&self, sql: &str) -> Result<String> {
        if path_mapping::join_count(sql) >= 2 && !path_mapping::has_where_clause(sql) {
            return Err(SdqcError::JoinUnguarded);
        }
        if path_mapping::join_count(sql) >= 1 && !sql.to_ascii_uppercase().contains("LIMIT") {
            return Ok(format!("{sql} LIMIT {}", self.max_results.min(1000)));
        }
        Ok(sql.to_string())
    }

    pub async fn run(&self, sql: &str) -> Result<QueryResult> {
        let guarded = self.guard(sql)?;
        let pruned = path_mapping::prune(&guarded);

        if let Some(cached) = self.cache.get(&pruned) {
            info!("executor result cache hit");
            return Ok(cached);
        }

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.engine.execute(&pruned))
            .await
            .map_err(|_| SdqcError::QueryTimeout { seconds: self.timeout.as_secs() })??;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut result = result;
        result.execution_time_ms = elapsed_ms;

        self.cache.put(&pruned, result.clone());
        Ok(result)
    }
}

/// Translates backend-specific error substrings into the closed error-code
/// set, e.g. "ambiguous reference to column name".
pub fn classify_backend_error(message: &str) -> SdqcError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("ambiguous reference") {
        SdqcError::AmbiguousReference(message.to_string())
    } else if lower.contains("no such table") || lower.contains("does not exist") || lower.contains("table not found") {
        SdqcError::SchemaNotFound(message.to_string())
    } else if lower.contains("column") && (lower.contains("not found") || lower.contains("unknown")) {
        SdqcError::ColumnNotFound(message.to_string())
    } else if lower.contains("out of memory") || lower.contains("memory limit") {
        SdqcError::OutOfMemory(message.to_string())
    } else if lower.contains("connection") {
        SdqcError::ConnectionError(message.to_string())
    } else {
        warn!(message, "unclassified backend error, surfacing as QUERY_ERROR");
        SdqcError::QueryError(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEngine {
        result: QueryResult,
    }

    #[async_trait]
    impl ExecutionEngine for StubEngine {
        fn name(&self) -> &'static str {
            "stub"
        }
        async fn execute(&self, _sql: &str) -> Result<QueryResult> {
            Ok(self.result.clone())
        }
    }

    fn stub_result() -> QueryResult {
        QueryResult { data: Vec::new(), row_count: 0, execution_time_ms: 0, columns: Vec::new(), engine_name: "stub".to_string() }
    }

    #[tokio::test]
    async fn three_table_join_without_where_is_unguarded() {
        let engine = Box::new(StubEngine { result: stub_result() });
        let executor = Executor::new(engine, ResultCache::new(10, Duration::from_secs(60), 5000, true), Duration::from_secs(5), 1000);
        let err = executor
            .run("SELECT * FROM a JOIN b ON a.id=b.id JOIN c ON b.id=c.id")
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::JoinUnguarded);
    }

    #[tokio::test]
    async fn single_join_without_limit_gets_one_injected() {
        let engine = Box::new(StubEngine { result: stub_result() });
        let executor = Executor::new(engine, ResultCache::new(10, Duration::from_secs(60), 5000, true), Duration::from_secs(5), 1000);
        let guarded = executor.guard("SELECT * FROM a JOIN b ON a.id=b.id WHERE a.x=1").unwrap();
        assert!(guarded.contains("LIMIT 1000"));
    }

    #[test]
    fn classifies_ambiguous_reference() {
        let e = classify_backend_error("ambiguous reference to column name \"id\"");
        assert_eq!(e.code(), crate::error::ErrorCode::AmbiguousReference);
    }

    #[test]
    fn classifies_missing_table_as_schema_not_found() {
        let e = classify_backend_error("Table with name foo does not exist");
        assert_eq!(e.code(), crate::error::ErrorCode::SchemaNotFound);
    }
}
