pub mod loader;
pub mod sources;
pub mod types;

pub use loader::{Catalog, CatalogHandle};
pub use types::{Aggregation, Binding, Concept, ConceptKind, Intent, IntentIo, Operator};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Write;

    fn write_json(dir: &std::path::Path, name: &str, value: &serde_json::Value) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        write!(f, "{}", value).unwrap();
    }

    fn seed_metadata(dir: &std::path::Path) {
        write_json(
            dir,
            "concepts.json",
            &serde_json::json!([
                { "name": "ITEM_NO", "kind": "DIMENSION", "data_type": "string", "labels": {"en": "Item No"} },
                { "name": "INVENTORY_QTY", "kind": "METRIC", "data_type": "number", "labels": {"en": "Inventory Qty"} }
            ]),
        );
        write_json(
            dir,
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
            dir,
            "bindings.json",
            &serde_json::json!([
                { "concept": "ITEM_NO", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "item_no" },
                { "concept": "INVENTORY_QTY", "dialect": "DUCKDB", "table": "mart_inventory_wide", "column": "qty", "aggregation": "SUM" }
            ]),
        );
    }

    #[tokio::test]
    async fn loads_and_cross_validates() {
        let dir = tempfile::tempdir().unwrap();
        seed_metadata(dir.path());
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = Config::from_env();
        let catalog = Catalog::load(&cfg).await.unwrap();
        assert!(catalog.get_concept("ITEM_NO").is_some());
        assert!(catalog.get_binding("INVENTORY_QTY", "DUCKDB").unwrap().aggregation().is_aggregated());
    }

    #[tokio::test]
    async fn fails_when_supplementary_schema_omits_bound_column() {
        let dir = tempfile::tempdir().unwrap();
        seed_metadata(dir.path());
        std::fs::write(
            dir.path().join("table_schema.yaml"),
            "mart_inventory_wide:\n  - warehouse\n",
        )
        .unwrap();
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = Config::from_env();
        assert!(Catalog::load(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn passes_when_supplementary_schema_lists_bound_columns() {
        let dir = tempfile::tempdir().unwrap();
        seed_metadata(dir.path());
        std::fs::write(
            dir.path().join("table_schema.yaml"),
            "mart_inventory_wide:\n  - item_no\n  - qty\n",
        )
        .unwrap();
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = Config::from_env();
        let catalog = Catalog::load(&cfg).await.unwrap();
        assert_eq!(catalog.known_columns("mart_inventory_wide"), Some(&["item_no".to_string(), "qty".to_string()][..]));
    }

    #[tokio::test]
    async fn fails_when_bindings_missing_for_referenced_concept() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "concepts.json", &serde_json::json!([
            { "name": "ITEM_NO", "kind": "DIMENSION", "data_type": "string", "labels": {} }
        ]));
        write_json(dir.path(), "intents.json", &serde_json::json!([
            { "name": "QUERY_X", "description": "x", "input": {"filters": ["ITEM_NO"]}, "output": {"dimensions": ["ITEM_NO"]} }
        ]));
        write_json(dir.path(), "bindings.json", &serde_json::json!([
            { "concept": "SOME_OTHER", "dialect": "DUCKDB", "table": "t", "column": "c" }
        ]));
        std::env::set_var("DATA_AGENT_JP_METADATA_PATH", dir.path().to_str().unwrap());
        std::env::set_var("DATA_AGENT_JP_DATASOURCE", "DUCKDB");
        let cfg = Config::from_env();
        assert!(Catalog::load(&cfg).await.is_err());
    }
}
