use crate::catalog::Catalog;
use crate::error::{Result, SdqcError};
use crate::intent::{ParsedIntent, Value};
use crate::master_data::{self, MasterDataStore};
use crate::parser::CONFIDENCE_GATE;

/// Rejects clearly-wrong queries before any SQL is built.
/// Runs the three checks in order and short-circuits on the first failure.
pub struct PreValidator<'a> {
    catalog: &'a Catalog,
    master_data: &'a MasterDataStore,
    confidence_threshold: f64,
}

impl<'a> PreValidator<'a> {
    pub fn new(catalog: &'a Catalog, master_data: &'a MasterDataStore) -> Self {
        PreValidator { catalog, master_data, confidence_threshold: CONFIDENCE_GATE }
    }

    pub fn validate(&self, parsed: &ParsedIntent) -> Result<()> {
        self.check_confidence(parsed)?;
        let intent = self
            .catalog
            .get_intent(&parsed.intent_name)
            .ok_or_else(|| SdqcError::IntentUnclear(parsed.intent_name.clone()))?;
        self.check_required_filters(parsed, intent)?;
        self.check_master_data(parsed)?;
        Ok(())
    }

    fn check_confidence(&self, parsed: &ParsedIntent) -> Result<()> {
        if parsed.confidence < self.confidence_threshold || parsed.intent_name == "UNKNOWN" {
            let suggestions = self.catalog.intent_names().into_iter().map(String::from).collect();
            return Err(SdqcError::IntentUnclear(format!(
                "confidence {:.2} below gate; suggestions: {:?}",
                parsed.confidence, suggestions
            )));
        }
        Ok(())
    }

    fn check_required_filters(&self, parsed: &ParsedIntent, intent: &crate::catalog::Intent) -> Result<()> {
        for required in &intent.input.required_filters {
            if !parsed.params.contains_key(required) {
                return Err(SdqcError::MissingRequiredFilter(required.clone()));
            }
        }
        Ok(())
    }

    fn check_master_data(&self, parsed: &ParsedIntent) -> Result<()> {
        for (concept, value) in &parsed.params {
            if let Some(kind) = master_data::kind_for_concept(concept) {
                if let Value::Scalar { value } = value {
                    self.master_data.validate(kind, value)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_catalog() -> Catalog {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, v: &serde_json::Value| {
            std::fs::write(dir.path().join(name), serde_json::to_string(v).unwrap()).unwrap();
        };
        write("concepts.json", &serde_json::json!([
            { "name": "ITEM_NO", "kind": "DIMENSION", "data_type": "string", "labels": {} }
        ]));
        write("intents.json", &serde_json::json!([
            { "name": "QUERY_INVENTORY", "description": "x", "input": {"required_filters": ["ITEM_NO"]}, "output": {"dimensions": ["ITEM_NO"]} }
        ]));
        write("bindings.json", &serde_json::json!([
            { "concept": "ITEM_NO", "dialect": "DUCKDB", "table": "t", "column": "item_no" }
        ]));
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = crate::config::Config::from_env();
        tokio::runtime::Runtime::new().unwrap().block_on(Catalog::load(&cfg)).unwrap()
    }

    #[test]
    fn missing_required_filter_is_rejected() {
        let catalog = sample_catalog();
        let md = MasterDataStore::default();
        let validator = PreValidator::new(&catalog, &md);
        let parsed = ParsedIntent {
            intent_name: "QUERY_INVENTORY".to_string(),
            confidence: 0.9,
            params: HashMap::new(),
            limit: None,
            offset: None,
            token_usage: Default::default(),
            validation_errors: Vec::new(),
        };
        let err = validator.validate(&parsed).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::MissingRequiredFilter);
    }

    #[test]
    fn low_confidence_is_intent_unclear() {
        let catalog = sample_catalog();
        let md = MasterDataStore::default();
        let validator = PreValidator::new(&catalog, &md);
        let parsed = ParsedIntent {
            intent_name: "UNKNOWN".to_string(),
            confidence: 0.1,
            params: HashMap::new(),
            limit: None,
            offset: None,
            token_usage: Default::default(),
            validation_errors: Vec::new(),
        };
        let err = validator.validate(&parsed).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::IntentUnclear);
    }
}
