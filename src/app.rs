use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::catalog::CatalogHandle;
use crate::config::Config;
use crate::error::{Result, SdqcError};
use crate::executor::{Executor, ExecutionEngine, ResultCache};
use crate::master_data::MasterDataStore;
use crate::parser::{LlmParser, NlqParser, ParserCache, RuleParser};
use crate::resolver::{Resolver, ResolvedQuery};
use crate::validator::PreValidator;

/// `ExecuteRequest`. `task_id` is caller-supplied when present;
/// a caller that omits it gets a server-generated v4 UUID so batch and SSE
/// responses always carry a correlation id.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default = "new_task_id")]
    pub task_id: String,
    #[serde(default)]
    pub locale: Option<String>,
    pub task_data: TaskData,
}

fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskData {
    pub nlq: String,
    #[serde(default)]
    pub options: Option<RequestOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOptions {
    pub timeout: Option<u64>,
    pub limit: Option<u32>,
    pub locale: Option<String>,
}

impl ExecuteRequest {
    pub fn locale(&self) -> String {
        self.task_data
            .options
            .as_ref()
            .and_then(|o| o.locale.clone())
            .or_else(|| self.locale.clone())
            .unwrap_or_else(|| "zh-TW".to_string())
    }

    pub fn timeout(&self, default: Duration) -> Duration {
        self.task_data
            .options
            .as_ref()
            .and_then(|o| o.timeout)
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

/// Root dependency-injection struct: explicit constructor arguments
/// instead of global singleton factories. Tests build an `App` with fake
/// backends.
pub struct App {
    pub catalog: CatalogHandle,
    pub master_data: MasterDataStore,
    pub parser: NlqParser,
    pub executor: Executor,
    pub config: Config,
}

impl App {
    pub fn new(
        catalog: CatalogHandle,
        master_data: MasterDataStore,
        parser: NlqParser,
        executor: Executor,
        config: Config,
    ) -> Self {
        App { catalog, master_data, parser, executor, config }
    }

    /// Wires a production `App` from environment-derived `Config` and a
    /// real execution engine. The catalog and master data are loaded
    /// eagerly so startup fails fast.
    pub async fn from_config(config: Config, engine: Box<dyn ExecutionEngine>) -> Result<Self> {
        let catalog = crate::catalog::Catalog::load(&config).await?;
        let catalog = CatalogHandle::new(catalog);

        let master_data = MasterDataStore::load(&config.metadata_path).unwrap_or_default();

        let rule = RuleParser::default();
        let llm = LlmParser::new(config.llm.clone());
        let cache = ParserCache::default_with_ttl_2h();
        let parser = NlqParser::new(rule, llm, cache);

        let executor = Executor::new(
            engine,
            ResultCache::default_enabled(),
            config.default_timeout,
            config.max_results,
        );

        Ok(App { catalog, master_data, parser, executor, config })
    }

    pub(crate) fn dialect_str(&self) -> &'static str {
        match self.config.dialect {
            crate::config::Dialect::Oracle => "ORACLE",
            crate::config::Dialect::DuckDb => "DUCKDB",
        }
    }

    /// Runs the full pipeline: pre-validation, resolution to SQL, guarded
    /// execution. Returns the resolved query (SQL + AST + token usage)
    /// alongside the executed result.
    pub async fn resolve_and_execute(
        &self,
        nlq: &str,
        limit_override: Option<u32>,
    ) -> Result<(ResolvedQuery, crate::executor::QueryResult)> {
        let catalog = self.catalog.current();
        let dialect = self.dialect_str();

        let mut resolver = Resolver::new(&catalog, &self.master_data, &self.parser, dialect);
        if let Some(limit) = limit_override {
            resolver.default_limit = limit;
        }

        let parsed_preview = self.parser.parse(nlq, &catalog).await?;
        let validator = PreValidator::new(&catalog, &self.master_data);
        validator.validate(&parsed_preview)?;

        let resolved = resolver.run(nlq).await?;
        let result = self.executor.run(&resolved.sql).await?;

        Ok((resolved, result))
    }

    /// Runs `resolve_and_execute` under the per-request timeout, returning
    /// `QUERY_TIMEOUT` if the whole pipeline (not just SQL execution)
    /// overruns the caller-supplied bound.
    pub async fn execute_request(&self, req: &ExecuteRequest) -> (Result<(ResolvedQuery, crate::executor::QueryResult)>, Duration) {
        let timeout = req.timeout(self.config.default_timeout);
        let limit = req.task_data.options.as_ref().and_then(|o| o.limit);
        let started = Instant::now();

        let outcome = tokio::time::timeout(timeout, self.resolve_and_execute(&req.task_data.nlq, limit))
            .await
            .unwrap_or_else(|_| Err(SdqcError::QueryTimeout { seconds: timeout.as_secs() }));

        (outcome, started.elapsed())
    }
}
