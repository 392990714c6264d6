use crate::error::ErrorCode;

/// `{message_key, locale}` catalog, `{zh-TW, ja, en}` minimum, default
/// `zh-TW`. Message keys are the error codes themselves and
/// the eight SSE stage names.
pub fn message_for(code: ErrorCode, locale: &str) -> String {
    let key = match code {
        ErrorCode::IntentUnclear => "intent_unclear",
        ErrorCode::SchemaNotFound => "schema_not_found",
        ErrorCode::MissingRequiredFilter => "missing_required_filter",
        ErrorCode::ItemNotFound => "item_not_found",
        ErrorCode::WarehouseNotFound => "warehouse_not_found",
        ErrorCode::WorkstationNotFound => "workstation_not_found",
        ErrorCode::AmbiguousReference => "ambiguous_reference",
        ErrorCode::ColumnNotFound => "column_not_found",
        ErrorCode::BinderError => "binder_error",
        ErrorCode::OutOfMemory => "out_of_memory",
        ErrorCode::QueryTimeout => "query_timeout",
        ErrorCode::ConnectionError => "connection_error",
        ErrorCode::JoinUnguarded => "join_unguarded",
        ErrorCode::QueryError => "query_error",
        ErrorCode::InternalError => "internal_error",
    };
    lookup(key, normalize_locale(locale))
}

/// Stage message for the SSE stream, e.g. `"sql_generated"`.
pub fn stage_message(stage: &str, locale: &str) -> String {
    lookup(stage, normalize_locale(locale))
}

fn normalize_locale(locale: &str) -> &str {
    match locale {
        "ja" => "ja",
        "en" => "en",
        _ => "zh-TW",
    }
}

fn lookup(key: &str, locale: &str) -> String {
    let table: &[(&str, &str, &str, &str)] = &[
        // key, zh-TW, ja, en
        ("intent_unclear", "無法理解查詢意圖", "クエリの意図を理解できません", "Could not understand the query intent"),
        ("schema_not_found", "找不到對應的資料表", "対応するスキーマが見つかりません", "Schema not found"),
        ("missing_required_filter", "缺少必要的篩選條件", "必須のフィルタ条件が不足しています", "Missing a required filter"),
        ("item_not_found", "找不到此料號", "品番が見つかりません", "Item not found"),
        ("warehouse_not_found", "找不到此倉庫代碼", "倉庫コードが見つかりません", "Warehouse not found"),
        ("workstation_not_found", "找不到此工作站代碼", "ワークステーションコードが見つかりません", "Workstation not found"),
        ("ambiguous_reference", "欄位參照不明確", "カラム参照が曖昧です", "Ambiguous column reference"),
        ("column_not_found", "找不到此欄位", "カラムが見つかりません", "Column not found"),
        ("binder_error", "欄位對應設定錯誤", "バインディング設定エラー", "Schema binding error"),
        ("out_of_memory", "查詢超出記憶體限制", "メモリ制限を超えました", "Query exceeded memory limit"),
        ("query_timeout", "查詢逾時", "クエリがタイムアウトしました", "Query timed out"),
        ("connection_error", "連線失敗", "接続エラー", "Connection error"),
        ("join_unguarded", "多表格連結查詢缺少篩選條件", "JOINクエリにフィルタ条件がありません", "Multi-table join is missing a guarding filter"),
        ("query_error", "查詢執行錯誤", "クエリ実行エラー", "Query execution error"),
        ("internal_error", "系統內部錯誤", "内部エラー", "Internal error"),
        ("request_received", "已收到請求", "リクエストを受信しました", "Request received"),
        ("schema_confirmed", "已確認資料表結構", "スキーマを確認しました", "Schema confirmed"),
        ("sql_generated", "已產生 SQL 查詢語句", "SQLを生成しました", "SQL generated"),
        ("query_executing", "正在執行查詢", "クエリを実行中です", "Query executing"),
        ("query_completed", "查詢執行完成", "クエリが完了しました", "Query completed"),
        ("result_validating", "正在驗證結果", "結果を検証中です", "Validating result"),
        ("result_ready", "結果已就緒", "結果の準備ができました", "Result ready"),
        ("final", "完成", "完了", "Done"),
    ];

    let row = table.iter().find(|(k, ..)| *k == key);
    match row {
        Some((_, zh, ja, en)) => match locale {
            "ja" => ja.to_string(),
            "en" => en.to_string(),
            _ => zh.to_string(),
        },
        None => key.to_string(),
    }
}
