use std::env;
use std::time::Duration;

/// SQL dialect the executor and generator are configured for. Chosen once
/// at startup; a running process never mixes dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Oracle,
    DuckDb,
}

impl Dialect {
    fn from_env(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ORACLE" => Dialect::Oracle,
            "DUCKDB" => Dialect::DuckDb,
            other => {
                tracing::warn!(value = other, "unrecognized DATA_AGENT_JP_DATASOURCE, defaulting to DUCKDB");
                Dialect::DuckDb
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub connect_string: String, // host:port/service_name
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct DuckDbS3Config {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: String,
    pub use_ssl: bool,
    pub bucket: String,
    pub memory_limit: String,
    pub threads: usize,
}

#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    pub host: String,
    pub port: u16,
    pub collection_prefix: String,
}

#[derive(Debug, Clone)]
pub struct GraphStoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub collection_prefix: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

/// Root configuration, assembled once from the environment at process
/// start and never re-read mid-request.
#[derive(Debug, Clone)]
pub struct Config {
    pub dialect: Dialect,
    pub system_id: String,
    pub metadata_path: std::path::PathBuf,
    pub default_timeout: Duration,
    pub max_results: usize,
    pub oracle: Option<OracleConfig>,
    pub duckdb_s3: Option<DuckDbS3Config>,
    pub vector_index: Option<VectorIndexConfig>,
    pub graph_store: Option<GraphStoreConfig>,
    pub llm: LlmConfig,
    pub default_locale: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl Config {
    /// Required variables panic with a message naming the variable;
    /// everything else falls back to a documented default.
    pub fn from_env() -> Self {
        let dialect = Dialect::from_env(&env_or("DATA_AGENT_JP_DATASOURCE", "DUCKDB"));
        let system_id = env_or("DATA_AGENT_JP_SYSTEM_ID", "default");
        let metadata_path = env_or("DATA_AGENT_JP_METADATA_PATH", "./metadata").into();
        let default_timeout = Duration::from_secs(
            env_or("DATA_AGENT_JP_DEFAULT_TIMEOUT", "30")
                .parse()
                .unwrap_or(30),
        );
        let max_results: usize = env_or("DATA_AGENT_JP_MAX_RESULTS", "1000")
            .parse()
            .unwrap_or(1000);

        let oracle = if dialect == Dialect::Oracle {
            Some(OracleConfig {
                connect_string: env::var("DATA_AGENT_JP_ORACLE_CONNECT_STRING")
                    .expect("DATA_AGENT_JP_ORACLE_CONNECT_STRING required when dialect is ORACLE"),
                user: env::var("DATA_AGENT_JP_ORACLE_USER")
                    .expect("DATA_AGENT_JP_ORACLE_USER required when dialect is ORACLE"),
                password: env::var("DATA_AGENT_JP_ORACLE_PASSWORD")
                    .expect("DATA_AGENT_JP_ORACLE_PASSWORD required when dialect is ORACLE"),
            })
        } else {
            None
        };

        let duckdb_s3 = if dialect == Dialect::DuckDb {
            Some(DuckDbS3Config {
                endpoint: env::var("DATA_AGENT_JP_S3_ENDPOINT").ok(),
                access_key: env::var("DATA_AGENT_JP_S3_ACCESS_KEY").ok(),
                secret_key: env::var("DATA_AGENT_JP_S3_SECRET_KEY").ok(),
                region: env_or("DATA_AGENT_JP_S3_REGION", "us-east-1"),
                use_ssl: env_flag("DATA_AGENT_JP_S3_USE_SSL", true),
                bucket: env_or("DATA_AGENT_JP_S3_BUCKET", "erp-datalake"),
                memory_limit: env_or("DATA_AGENT_JP_DUCKDB_MEMORY_LIMIT", "4GB"),
                threads: env_or("DATA_AGENT_JP_DUCKDB_THREADS", "4").parse().unwrap_or(4),
            })
        } else {
            None
        };

        let vector_index = env::var("DATA_AGENT_JP_QDRANT_HOST").ok().map(|host| VectorIndexConfig {
            host,
            port: env_or("DATA_AGENT_JP_QDRANT_PORT", "6333").parse().unwrap_or(6333),
            collection_prefix: env_or("DATA_AGENT_JP_QDRANT_PREFIX", "sdqc_"),
        });

        let graph_store = env::var("DATA_AGENT_JP_ARANGO_HOST").ok().map(|host| GraphStoreConfig {
            host,
            port: env_or("DATA_AGENT_JP_ARANGO_PORT", "8529").parse().unwrap_or(8529),
            database: env_or("DATA_AGENT_JP_ARANGO_DATABASE", "sdqc"),
            user: env_or("DATA_AGENT_JP_ARANGO_USER", "root"),
            password: env_or("DATA_AGENT_JP_ARANGO_PASSWORD", ""),
            collection_prefix: env_or("DATA_AGENT_JP_ARANGO_PREFIX", "sdqc_"),
        });

        let llm = LlmConfig {
            endpoint: env_or("DATA_AGENT_JP_LLM_ENDPOINT", "http://localhost:11434/api/generate"),
            model: env_or("DATA_AGENT_JP_LLM_MODEL", "llama3"),
            timeout: Duration::from_secs(env_or("DATA_AGENT_JP_LLM_TIMEOUT", "30").parse().unwrap_or(30)),
        };

        Config {
            dialect,
            system_id,
            metadata_path,
            default_timeout,
            max_results,
            oracle,
            duckdb_s3,
            vector_index,
            graph_store,
            llm,
            default_locale: env_or("DATA_AGENT_JP_DEFAULT_LOCALE", "zh-TW"),
        }
    }
}
