//! sdqc-server — standalone HTTP server for the Schema-Driven Query Core.
//!
//! Reads config from env vars, all prefixed `DATA_AGENT_JP_`.
//! `DATA_AGENT_JP_BIND_ADDR` selects the listen address (default
//! `0.0.0.0:8080`).

use std::sync::Arc;

use sdqc::app::App;
use sdqc::config::{Config, Dialect};
use sdqc::executor::duckdb_engine::DuckDbEngine;
use sdqc::executor::oracle_engine::OracleEngine;
use sdqc::executor::ExecutionEngine;
use sdqc::server::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sdqc=debug".into()),
        )
        .init();

    let config = Config::from_env();
    let bind_addr = std::env::var("DATA_AGENT_JP_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let engine: Box<dyn ExecutionEngine> = match config.dialect {
        Dialect::DuckDb => Box::new(DuckDbEngine::new(
            config.duckdb_s3.clone().expect("DuckDB dialect requires duckdb_s3 config"),
        )),
        Dialect::Oracle => Box::new(OracleEngine::new(
            config.oracle.clone().expect("Oracle dialect requires oracle config"),
        )),
    };

    let app = App::from_config(config, engine)
        .await
        .unwrap_or_else(|e| panic!("failed to build application: {e}"));

    let router = build_router(Arc::new(app));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {bind_addr}: {e}"));
    tracing::info!("sdqc-server listening on {bind_addr}");

    axum::serve(listener, router).await.expect("server error");
}
