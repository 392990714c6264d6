use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConceptKind {
    Dimension,
    Metric,
}

impl ConceptKind {
    /// Canonicalizes legacy type tags (`"CODE"`, `"STRING"`, `"NUMBER"`)
    /// into the closed `{DIMENSION, METRIC}` union.
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "METRIC" | "NUMBER" => ConceptKind::Metric,
            _ => ConceptKind::Dimension,
        }
    }
}

impl<'de> Deserialize<'de> for ConceptKind {
    /// Runs every incoming tag, canonical or legacy, through `normalize`
    /// rather than matching only `{DIMENSION, METRIC}` and rejecting the
    /// rest — so a `concepts.json` still carrying `"CODE"`/`"STRING"`/
    /// `"NUMBER"` deserializes instead of failing at the JSON boundary.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(ConceptKind::normalize(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumValue {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub kind: ConceptKind,
    pub data_type: String,
    /// Multilingual human-readable labels keyed by locale (`zh-TW`, `ja`, `en`).
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentIo {
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub required_filters: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input: IntentIo,
    #[serde(default)]
    pub output: IntentIo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    None,
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl Aggregation {
    pub fn normalize(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Aggregation::None;
        }
        match raw.to_ascii_uppercase().as_str() {
            "SUM" => Aggregation::Sum,
            "AVG" => Aggregation::Avg,
            "COUNT" => Aggregation::Count,
            "MIN" => Aggregation::Min,
            "MAX" => Aggregation::Max,
            _ => Aggregation::None,
        }
    }

    pub fn is_aggregated(self) -> bool {
        !matches!(self, Aggregation::None)
    }

    pub fn sql_fn(self) -> Option<&'static str> {
        match self {
            Aggregation::None => None,
            Aggregation::Sum => Some("SUM"),
            Aggregation::Avg => Some("AVG"),
            Aggregation::Count => Some("COUNT"),
            Aggregation::Min => Some("MIN"),
            Aggregation::Max => Some("MAX"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "IS_NULL")]
    IsNull,
}

impl Operator {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim() {
            "" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            "LIKE" => Operator::Like,
            "IN" => Operator::In,
            "BETWEEN" => Operator::Between,
            "IS_NULL" => Operator::IsNull,
            _ => Operator::Eq,
        }
    }

    pub fn sql_symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::Between => "BETWEEN",
            Operator::IsNull => "IS NULL",
        }
    }
}

/// `(concept, dialect) -> physical column` mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub concept: String,
    pub dialect: String,
    pub table: String,
    pub column: String,
    #[serde(default = "default_aggregation_raw")]
    pub aggregation: String,
    #[serde(default)]
    pub operator: String,
    /// Object-storage path template for DuckDB; falls back to the
    /// hard-coded convention in the SQL generator when absent.
    #[serde(default)]
    pub s3_path: Option<String>,
}

fn default_aggregation_raw() -> String {
    String::new()
}

impl Binding {
    pub fn aggregation(&self) -> Aggregation {
        Aggregation::normalize(&self.aggregation)
    }

    pub fn operator(&self) -> Operator {
        Operator::normalize(&self.operator)
    }
}

pub type BindingKey = (String, String); // (concept, dialect)
