use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, Pool, Postgres, Row, TypeInfo};
use tokio::sync::Mutex;

use crate::config::OracleConfig;
use crate::error::{Result, SdqcError};
use crate::executor::{classify_backend_error, ExecutionEngine, QueryResult};

/// Oracle backend, implemented against `sqlx`'s Postgres driver as a
/// wire-level stand-in behind the `ExecutionEngine` port — see DESIGN.md
/// for the substitution rationale. A connection pool capped at a single
/// connection, serialized behind a mutex, keeps at most one query in
/// flight at a time.
pub struct OracleEngine {
    pool: Mutex<Option<Pool<Postgres>>>,
    config: OracleConfig,
}

impl OracleEngine {
    pub fn new(config: OracleConfig) -> Self {
        OracleEngine { pool: Mutex::new(None), config }
    }

    async fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}",
            self.config.user, self.config.password, self.config.connect_string
        )
    }

    async fn pool(&self) -> Result<Pool<Postgres>> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }
        let url = self.connection_string().await;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl ExecutionEngine for OracleEngine {
    fn name(&self) -> &'static str {
        "oracle"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let pool = self.pool().await?;
        let rows = sqlx::query(sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| classify_backend_error(&e.to_string()))?;

        let mut data = Vec::with_capacity(rows.len());
        let mut columns = Vec::new();
        if let Some(first) = rows.first() {
            columns = first.columns().iter().map(|c| c.name().to_string()).collect();
        }

        for row in &rows {
            let mut record: HashMap<String, JsonValue> = HashMap::new();
            for column in row.columns() {
                let name = column.name().to_string();
                let value = pg_column_to_json(row, column);
                record.insert(name, value);
            }
            data.push(record);
        }

        let row_count = data.len();
        Ok(QueryResult { data, row_count, execution_time_ms: 0, columns, engine_name: "oracle".to_string() })
    }
}

/// Best-effort column decode across the handful of scalar types an ERP
/// rowset actually carries; anything unrecognized falls back to text.
fn pg_column_to_json(row: &sqlx::postgres::PgRow, column: &sqlx::postgres::PgColumn) -> JsonValue {
    let name = column.name();
    let type_name = column.type_info().name();

    match type_name {
        "INT2" | "INT4" => row.try_get::<i32, _>(name).map(JsonValue::from).unwrap_or(JsonValue::Null),
        "INT8" => row.try_get::<i64, _>(name).map(JsonValue::from).unwrap_or(JsonValue::Null),
        "FLOAT4" | "FLOAT8" | "NUMERIC" => row
            .try_get::<f64, _>(name)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        "BOOL" => row.try_get::<bool, _>(name).map(JsonValue::Bool).unwrap_or(JsonValue::Null),
        "TIMESTAMP" | "TIMESTAMPTZ" => row
            .try_get::<chrono::NaiveDateTime, _>(name)
            .map(|dt| JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(JsonValue::Null),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(name)
            .map(|d| JsonValue::String(d.format("%Y-%m-%d 00:00:00").to_string()))
            .unwrap_or(JsonValue::Null),
        _ => row.try_get::<String, _>(name).map(JsonValue::String).unwrap_or(JsonValue::Null),
    }
}
