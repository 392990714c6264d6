use std::collections::HashMap;

use async_trait::async_trait;
use duckdb::Connection;
use serde_json::Value as JsonValue;

use crate::config::DuckDbS3Config;
use crate::error::{Result, SdqcError};
use crate::executor::{classify_backend_error, ExecutionEngine, QueryResult};

/// DuckDB backend. A fresh connection is opened per call rather than
/// shared across threads, side-stepping DuckDB's single-threaded
/// connection contract and guaranteeing the timeout watchdog never leaves
/// a wedged connection behind.
pub struct DuckDbEngine {
    s3: DuckDbS3Config,
}

impl DuckDbEngine {
    pub fn new(s3: DuckDbS3Config) -> Self {
        DuckDbEngine { s3 }
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;

        conn.execute_batch(&format!(
            "SET memory_limit='{}'; SET threads TO {};",
            self.s3.memory_limit, self.s3.threads
        ))
        .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;

        if let Some(endpoint) = &self.s3.endpoint {
            conn.execute_batch(&format!("SET s3_endpoint='{endpoint}';"))
                .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;
        }
        if let Some(key) = &self.s3.access_key {
            conn.execute_batch(&format!("SET s3_access_key_id='{key}';"))
                .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;
        }
        if let Some(secret) = &self.s3.secret_key {
            conn.execute_batch(&format!("SET s3_secret_access_key='{secret}';"))
                .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;
        }
        conn.execute_batch(&format!(
            "SET s3_region='{}'; SET s3_use_ssl={}; SET s3_url_style='path';",
            self.s3.region, self.s3.use_ssl
        ))
        .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;

        Ok(conn)
    }
}

#[async_trait]
impl ExecutionEngine for DuckDbEngine {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.to_string();
        let s3 = self.s3.clone();

        tokio::task::spawn_blocking(move || {
            let engine = DuckDbEngine { s3 };
            let conn = engine.open_connection()?;
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| classify_backend_error(&e.to_string()))?;

            let column_names: Vec<String> = stmt.column_names();
            let mut rows = stmt.query([]).map_err(|e| classify_backend_error(&e.to_string()))?;

            let mut data = Vec::new();
            while let Some(row) = rows.next().map_err(|e| classify_backend_error(&e.to_string()))? {
                let mut record: HashMap<String, JsonValue> = HashMap::new();
                for (idx, name) in column_names.iter().enumerate() {
                    let value: duckdb::types::Value =
                        row.get(idx).map_err(|e| classify_backend_error(&e.to_string()))?;
                    record.insert(name.clone(), duckdb_value_to_json(value));
                }
                data.push(record);
            }

            let row_count = data.len();
            Ok(QueryResult {
                data,
                row_count,
                execution_time_ms: 0,
                columns: column_names,
                engine_name: "duckdb".to_string(),
            })
        })
        .await
        .map_err(|e| SdqcError::Internal(format!("duckdb worker panicked: {e}")))?
    }
}

/// Formats date/time values `YYYY-MM-DD HH:MM:SS` UTC.
fn duckdb_value_to_json(value: duckdb::types::Value) -> JsonValue {
    use duckdb::types::Value as V;
    match value {
        V::Null => JsonValue::Null,
        V::Boolean(b) => JsonValue::Bool(b),
        V::TinyInt(i) => JsonValue::from(i),
        V::SmallInt(i) => JsonValue::from(i),
        V::Int(i) => JsonValue::from(i),
        V::BigInt(i) => JsonValue::from(i),
        V::HugeInt(i) => JsonValue::from(i.to_string()),
        V::Float(f) => serde_json::Number::from_f64(f as f64).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        V::Double(f) => serde_json::Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        V::Text(s) => JsonValue::String(s),
        V::Timestamp(_, micros) => {
            let secs = micros / 1_000_000;
            let naive = chrono::NaiveDateTime::from_timestamp_opt(secs, 0);
            match naive {
                Some(dt) => JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => JsonValue::Null,
            }
        }
        other => JsonValue::String(format!("{other:?}")),
    }
}
