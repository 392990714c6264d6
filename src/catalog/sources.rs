use async_trait::async_trait;

use crate::catalog::types::{Binding, Concept, Intent};
use crate::config::{Config, GraphStoreConfig, VectorIndexConfig};
use crate::error::Result;

/// A source of Concepts and Intents, tried in priority order by the loader
///. File sources are unconditional; remote sources are
/// optional wrappers consulted first, mirroring the port-trait pattern used
/// for `SnapshotStore`/`ObjectStore` in the semantic-OS layer this crate's
/// catalog design is grounded on.
#[async_trait]
pub trait ConceptIntentSource: Send + Sync {
    async fn load_concepts(&self, system_id: &str) -> Result<Vec<Concept>>;
    async fn load_intents(&self, system_id: &str) -> Result<Vec<Intent>>;
}

#[async_trait]
pub trait BindingSource: Send + Sync {
    async fn load_bindings(&self, system_id: &str, dialect: &str) -> Result<Vec<Binding>>;
}

/// Local-file fallback: JSON for Concepts/Intents/Bindings. Always available.
pub struct FileSource {
    pub root: std::path::PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        FileSource { root: root.into() }
    }

    fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.root.join(name);
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Supplementary table schema, `table_schema.yaml` mapping `{table: [columns]}`.
    /// Unlike concepts/intents/bindings this has no remote source and no
    /// JSON form; absence is not an error, since it only narrows an
    /// already-loaded Bindings set.
    pub fn load_table_schema(&self) -> Result<std::collections::HashMap<String, Vec<String>>> {
        let path = self.root.join("table_schema.yaml");
        if !path.exists() {
            return Ok(std::collections::HashMap::new());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[async_trait]
impl ConceptIntentSource for FileSource {
    async fn load_concepts(&self, _system_id: &str) -> Result<Vec<Concept>> {
        self.read_json("concepts.json")
    }

    async fn load_intents(&self, _system_id: &str) -> Result<Vec<Intent>> {
        self.read_json("intents.json")
    }
}

#[async_trait]
impl BindingSource for FileSource {
    async fn load_bindings(&self, _system_id: &str, dialect: &str) -> Result<Vec<Binding>> {
        let all: Vec<Binding> = self.read_json("bindings.json")?;
        Ok(all
            .into_iter()
            .filter(|b| b.dialect.eq_ignore_ascii_case(dialect))
            .collect())
    }
}

/// Vector index (e.g. Qdrant) source for Concepts/Intents, collections
/// `<prefix>concepts` / `<prefix>intents`.
pub struct VectorIndexSource {
    client: reqwest::Client,
    cfg: VectorIndexConfig,
}

impl VectorIndexSource {
    pub fn new(cfg: VectorIndexConfig) -> Self {
        VectorIndexSource { client: reqwest::Client::new(), cfg }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "http://{}:{}/collections/{}{}/points/scroll",
            self.cfg.host, self.cfg.port, self.cfg.collection_prefix, suffix
        )
    }
}

#[async_trait]
impl ConceptIntentSource for VectorIndexSource {
    async fn load_concepts(&self, _system_id: &str) -> Result<Vec<Concept>> {
        let resp = self
            .client
            .post(self.collection_url("concepts"))
            .json(&serde_json::json!({ "limit": 10_000, "with_payload": true }))
            .send()
            .await
            .map_err(|e| crate::error::SdqcError::ConnectionError(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| crate::error::SdqcError::ConnectionError(e.to_string()))?;
        let points = body["result"]["points"].as_array().cloned().unwrap_or_default();
        let concepts = points
            .into_iter()
            .filter_map(|p| serde_json::from_value(p["payload"].clone()).ok())
            .collect();
        Ok(concepts)
    }

    async fn load_intents(&self, _system_id: &str) -> Result<Vec<Intent>> {
        let resp = self
            .client
            .post(self.collection_url("intents"))
            .json(&serde_json::json!({ "limit": 10_000, "with_payload": true }))
            .send()
            .await
            .map_err(|e| crate::error::SdqcError::ConnectionError(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| crate::error::SdqcError::ConnectionError(e.to_string()))?;
        let points = body["result"]["points"].as_array().cloned().unwrap_or_default();
        let intents = points
            .into_iter()
            .filter_map(|p| serde_json::from_value(p["payload"].clone()).ok())
            .collect();
        Ok(intents)
    }
}

/// Graph store (e.g. ArangoDB) source for Bindings, collection
/// `<prefix>bindings`.
pub struct GraphStoreSource {
    client: reqwest::Client,
    cfg: GraphStoreConfig,
}

impl GraphStoreSource {
    pub fn new(cfg: GraphStoreConfig) -> Self {
        GraphStoreSource { client: reqwest::Client::new(), cfg }
    }
}

#[async_trait]
impl BindingSource for GraphStoreSource {
    async fn load_bindings(&self, _system_id: &str, dialect: &str) -> Result<Vec<Binding>> {
        let url = format!(
            "http://{}:{}/_db/{}/_api/simple/all",
            self.cfg.host, self.cfg.port, self.cfg.database
        );
        let resp = self
            .client
            .put(url)
            .basic_auth(&self.cfg.user, Some(&self.cfg.password))
            .json(&serde_json::json!({ "collection": format!("{}bindings", self.cfg.collection_prefix) }))
            .send()
            .await
            .map_err(|e| crate::error::SdqcError::ConnectionError(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| crate::error::SdqcError::ConnectionError(e.to_string()))?;
        let docs = body["result"].as_array().cloned().unwrap_or_default();
        let bindings: Vec<Binding> = docs
            .into_iter()
            .filter_map(|d| serde_json::from_value::<Binding>(d).ok())
            .filter(|b| b.dialect.eq_ignore_ascii_case(dialect))
            .collect();
        Ok(bindings)
    }
}

pub fn concept_intent_source(cfg: &Config) -> Option<Box<dyn ConceptIntentSource>> {
    cfg.vector_index
        .clone()
        .map(|v| Box::new(VectorIndexSource::new(v)) as Box<dyn ConceptIntentSource>)
}

pub fn binding_source(cfg: &Config) -> Option<Box<dyn BindingSource>> {
    cfg.graph_store
        .clone()
        .map(|g| Box::new(GraphStoreSource::new(g)) as Box<dyn BindingSource>)
}
