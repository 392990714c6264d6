use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tagged union for a parsed parameter value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    Scalar { value: String },
    List { values: Vec<String> },
    TimeRange(TimeRangeValue),
}

/// Either an explicit `[start, end)` pair or an abstract descriptor that the
/// Resolver expands during RESOLVE_BINDINGS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TimeRangeValue {
    Explicit { start: String, end: String },
    Abstract(AbstractTimeDescriptor),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeGranularity {
    Year,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbstractTimeDescriptor {
    #[serde(rename = "type")]
    pub granularity: TimeGranularity,
    pub year: i32,
    #[serde(default)]
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cache_hit: bool,
}

/// The NLQ Parser's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent_name: String,
    pub confidence: f64,
    pub params: HashMap<String, Value>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub token_usage: TokenUsage,
    pub validation_errors: Vec<String>,
}

impl ParsedIntent {
    pub fn unknown() -> Self {
        ParsedIntent {
            intent_name: "UNKNOWN".to_string(),
            confidence: 0.0,
            params: HashMap::new(),
            limit: None,
            offset: None,
            token_usage: TokenUsage::default(),
            validation_errors: Vec::new(),
        }
    }
}
