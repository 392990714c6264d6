use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{ErrorCode, SdqcError};
use crate::executor::QueryResult;
use crate::intent::TokenUsage;

/// `{page, page_size, total_rows, total_pages}`. `total_rows`
/// equals the returned `row_count` unless a caller opts into a second COUNT
/// query, which this core does not issue on its own.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_rows: usize,
    pub total_pages: u32,
}

impl Pagination {
    pub fn from_limit_offset(limit: u32, offset: u32, row_count: usize) -> Self {
        let page_size = limit.max(1);
        let page = offset / page_size + 1;
        let total_pages = ((row_count as u32) + page_size - 1) / page_size.max(1);
        Pagination { page, page_size, total_rows: row_count, total_pages: total_pages.max(1) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl ErrorPayload {
    /// `exception` (raw upstream text) is only attached in debug mode.
    pub fn from_error(err: &SdqcError, debug: bool, message: String) -> Self {
        ErrorPayload {
            code: err.code(),
            message,
            suggestions: err.suggestions(),
            exception: if debug { Some(err.to_string()) } else { None },
        }
    }
}

/// The batch structured response.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub status: &'static str,
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub data: Vec<HashMap<String, JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_used: Option<String>,
    pub pagination: Pagination,
    pub token_usage: TokenUsage,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl ExecuteResponse {
    pub fn success(
        task_id: String,
        sql: String,
        schema_used: String,
        result: QueryResult,
        limit: u32,
        offset: u32,
        token_usage: TokenUsage,
        duration_ms: u64,
    ) -> Self {
        let pagination = Pagination::from_limit_offset(limit, offset, result.row_count);
        ExecuteResponse {
            status: "success",
            task_id,
            sql: Some(sql),
            data: result.data,
            schema_used: Some(schema_used),
            pagination,
            token_usage,
            duration_ms,
            error: None,
        }
    }

    pub fn failure(task_id: String, err: &SdqcError, debug: bool, locale: &str, duration_ms: u64) -> Self {
        let message = crate::i18n::message_for(err.code(), locale);
        ExecuteResponse {
            status: "error",
            task_id,
            sql: None,
            data: Vec::new(),
            schema_used: None,
            pagination: Pagination { page: 1, page_size: 0, total_rows: 0, total_pages: 0 },
            token_usage: TokenUsage::default(),
            duration_ms,
            error: Some(ErrorPayload::from_error(err, debug, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_computes_total_pages() {
        let p = Pagination::from_limit_offset(10, 0, 25);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn pagination_page_from_offset() {
        let p = Pagination::from_limit_offset(10, 20, 5);
        assert_eq!(p.page, 3);
    }
}
