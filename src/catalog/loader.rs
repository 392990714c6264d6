use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::catalog::sources::{self, BindingSource, ConceptIntentSource, FileSource};
use crate::catalog::types::{Binding, BindingKey, Concept, Intent};
use crate::config::Config;
use crate::error::{Result, SdqcError};

/// The assembled, validated catalog. Read-mostly, immutable once built;
/// `Catalog::reload` swaps the entire root atomically.
#[derive(Clone)]
pub struct Catalog {
    pub dialect: String,
    concepts: HashMap<String, Concept>,
    intents: HashMap<String, Intent>,
    bindings: HashMap<BindingKey, Binding>,
    table_schema: HashMap<String, Vec<String>>,
}

impl Catalog {
    pub fn get_concept(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    pub fn get_intent(&self, name: &str) -> Option<&Intent> {
        self.intents.get(name)
    }

    pub fn get_binding(&self, concept: &str, dialect: &str) -> Option<&Binding> {
        self.bindings.get(&(concept.to_string(), dialect.to_string()))
    }

    /// Any binding targeting `table` for `dialect`, used by the DuckDB
    /// generator to look up a table's `s3_path` template.
    pub fn binding_for_table(&self, table: &str, dialect: &str) -> Option<&Binding> {
        self.bindings
            .values()
            .find(|b| b.table == table && b.dialect.eq_ignore_ascii_case(dialect))
    }

    /// Known columns for `table` from the supplementary YAML schema, if one
    /// was supplied. `None` means the table wasn't described there, not
    /// that it has no columns.
    pub fn known_columns(&self, table: &str) -> Option<&[String]> {
        self.table_schema.get(table).map(|cols| cols.as_slice())
    }

    pub fn intent_names(&self) -> Vec<&str> {
        self.intents.keys().map(|s| s.as_str()).collect()
    }

    /// Builds the catalog by trying, for each entity kind, each source in
    /// strict priority order and stopping at the first non-empty result.
    /// Fails startup only when no source yields a non-empty Bindings set.
    pub async fn load(cfg: &Config) -> Result<Self> {
        let file_source = FileSource::new(&cfg.metadata_path);
        let dialect = match cfg.dialect {
            crate::config::Dialect::Oracle => "ORACLE",
            crate::config::Dialect::DuckDb => "DUCKDB",
        };

        let (raw_concepts, raw_intents) = Self::load_concepts_intents(cfg, &file_source).await?;
        let raw_bindings = Self::load_bindings(cfg, &file_source, dialect).await?;
        let table_schema = file_source.load_table_schema()?;

        if raw_bindings.is_empty() {
            return Err(SdqcError::Internal(
                "no catalog source yielded a non-empty Bindings set".to_string(),
            ));
        }

        let concepts: HashMap<String, Concept> = raw_concepts
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        let intents: HashMap<String, Intent> =
            raw_intents.into_iter().map(|i| (i.name.clone(), i)).collect();

        let bindings: HashMap<BindingKey, Binding> = raw_bindings
            .into_iter()
            .map(|b| ((b.concept.clone(), b.dialect.clone()), b))
            .collect();

        let catalog = Catalog {
            dialect: dialect.to_string(),
            concepts,
            intents,
            bindings,
            table_schema,
        };

        catalog.validate_cross_references()?;
        info!(
            concepts = catalog.concepts.len(),
            intents = catalog.intents.len(),
            bindings = catalog.bindings.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    async fn load_concepts_intents(
        cfg: &Config,
        file_source: &FileSource,
    ) -> Result<(Vec<Concept>, Vec<Intent>)> {
        if let Some(remote) = sources::concept_intent_source(cfg) {
            match Self::try_remote_concepts_intents(remote.as_ref(), &cfg.system_id).await {
                Some(pair) => return Ok(pair),
                None => warn!("vector index yielded no concepts/intents, falling back to files"),
            }
        }
        let concepts = file_source.load_concepts(&cfg.system_id).await?;
        let intents = file_source.load_intents(&cfg.system_id).await?;
        Ok((concepts, intents))
    }

    async fn try_remote_concepts_intents(
        source: &dyn ConceptIntentSource,
        system_id: &str,
    ) -> Option<(Vec<Concept>, Vec<Intent>)> {
        let concepts = match source.load_concepts(system_id).await {
            Ok(c) if !c.is_empty() => c,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "vector index concept load failed, demoting to fallback");
                return None;
            }
        };
        let intents = match source.load_intents(system_id).await {
            Ok(i) if !i.is_empty() => i,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "vector index intent load failed, demoting to fallback");
                return None;
            }
        };
        Some((concepts, intents))
    }

    async fn load_bindings(
        cfg: &Config,
        file_source: &FileSource,
        dialect: &str,
    ) -> Result<Vec<Binding>> {
        if let Some(remote) = sources::binding_source(cfg) {
            match remote.load_bindings(&cfg.system_id, dialect).await {
                Ok(b) if !b.is_empty() => return Ok(normalize_bindings(b)),
                Ok(_) => warn!("graph store yielded no bindings, falling back to files"),
                Err(e) => warn!(error = %e, "graph store binding load failed, demoting to fallback"),
            }
        }
        let bindings = file_source.load_bindings(&cfg.system_id, dialect).await?;
        Ok(normalize_bindings(bindings))
    }

    /// Every concept name referenced by any intent must have a binding for
    /// the active dialect.
    fn validate_cross_references(&self) -> Result<()> {
        for intent in self.intents.values() {
            let referenced = intent
                .input
                .filters
                .iter()
                .chain(intent.input.required_filters.iter())
                .chain(intent.output.metrics.iter())
                .chain(intent.output.dimensions.iter());
            for concept in referenced {
                if concept == "TIME_RANGE" {
                    continue;
                }
                if self.get_binding(concept, &self.dialect).is_none() {
                    return Err(SdqcError::BinderError(format!(
                        "intent {} references concept {} with no binding for dialect {}",
                        intent.name, concept, self.dialect
                    )));
                }
            }
        }
        self.validate_against_table_schema()
    }

    /// Where the supplementary YAML table schema describes a table, every
    /// binding's column must actually appear in it. Tables the schema is
    /// silent on are left unchecked, since the file is supplementary.
    fn validate_against_table_schema(&self) -> Result<()> {
        for binding in self.bindings.values() {
            if let Some(columns) = self.table_schema.get(&binding.table) {
                if !columns.iter().any(|c| c.eq_ignore_ascii_case(&binding.column)) {
                    return Err(SdqcError::BinderError(format!(
                        "binding {}.{} ({} for {}) is not listed in the supplementary table schema",
                        binding.table, binding.column, binding.concept, binding.dialect
                    )));
                }
            }
        }
        Ok(())
    }
}

fn normalize_bindings(bindings: Vec<Binding>) -> Vec<Binding> {
    bindings
        .into_iter()
        .map(|mut b| {
            if b.aggregation.trim().is_empty() {
                b.aggregation = "NONE".to_string();
            }
            if b.operator.trim().is_empty() {
                b.operator = "=".to_string();
            }
            b
        })
        .collect()
}

/// Shared, hot-swappable handle to the current catalog. `reload()` takes a
/// writer lock and atomically swaps the root pointer.
pub struct CatalogHandle {
    inner: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        CatalogHandle { inner: RwLock::new(Arc::new(catalog)) }
    }

    pub fn current(&self) -> Arc<Catalog> {
        self.inner.read().expect("catalog lock poisoned").clone()
    }

    pub async fn reload(&self, cfg: &Config) -> Result<()> {
        let fresh = Catalog::load(cfg).await?;
        *self.inner.write().expect("catalog lock poisoned") = Arc::new(fresh);
        Ok(())
    }
}
