use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::app::{App, ExecuteRequest};
use crate::error::SdqcError;
use crate::i18n;
use crate::resolver::Resolver;
use crate::response::ExecuteResponse;
use crate::validator::PreValidator;

/// Canonical stage order; a stream is always a prefix of this list, or
/// ends in `error` after some prefix.
const STAGES: &[&str] = &[
    "request_received",
    "schema_confirmed",
    "sql_generated",
    "query_executing",
    "query_completed",
    "result_validating",
    "result_ready",
    "final",
];

#[derive(Debug, Clone, Serialize)]
pub struct StageEvent {
    pub stage: &'static str,
    pub message: String,
    pub data: JsonValue,
}

impl StageEvent {
    fn new(stage: &'static str, locale: &str, data: JsonValue) -> Self {
        StageEvent { stage, message: i18n::stage_message(stage, locale), data }
    }

    fn error(err: &SdqcError, locale: &str, debug: bool) -> Self {
        let message = i18n::message_for(err.code(), locale);
        StageEvent {
            stage: "error",
            message,
            data: serde_json::to_value(crate::response::ErrorPayload::from_error(err, debug, String::new()))
                .unwrap_or(JsonValue::Null),
        }
    }

    fn into_sse_event(self) -> Event {
        Event::default().event("message").data(serde_json::to_string(&self).unwrap_or_default())
    }
}

/// Sends one stage event; returns `Err(())` once the receiver side has
/// been dropped (the client disconnected or the stream was abandoned),
/// so the caller can stop driving the pipeline instead of doing work
/// nobody will see.
async fn emit(tx: &mpsc::Sender<StageEvent>, stage: &'static str, locale: &str, data: JsonValue) -> Result<(), ()> {
    tx.send(StageEvent::new(stage, locale, data)).await.map_err(|_| ())
}

/// Drives the pipeline stage-by-stage, emitting each `StageEvent` as the
/// phase it describes actually completes, not after the whole pipeline
/// has already finished. Runs on a spawned task feeding an mpsc channel;
/// the Sse response streams off the receiving end, so a client that
/// disconnects drops the receiver and the next `emit` call ends the task
/// before any further phase runs.
pub async fn execute_stream(
    app: Arc<App>,
    req: ExecuteRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<StageEvent>(STAGES.len());
    tokio::spawn(run_and_emit(app, req, tx));

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.into_sse_event()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn run_and_emit(app: Arc<App>, req: ExecuteRequest, tx: mpsc::Sender<StageEvent>) {
    let locale = req.locale();

    if emit(&tx, STAGES[0], &locale, JsonValue::Null).await.is_err() {
        return;
    }
    if emit(&tx, STAGES[1], &locale, JsonValue::Null).await.is_err() {
        return;
    }

    let timeout = req.timeout(app.config.default_timeout);
    let started = Instant::now();

    match tokio::time::timeout(timeout, resolve(&app, &req)).await {
        Err(_) => {
            let err = SdqcError::QueryTimeout { seconds: timeout.as_secs() };
            let _ = tx.send(StageEvent::error(&err, &locale, false)).await;
        }
        Ok(Err(err)) => {
            let _ = tx.send(StageEvent::error(&err, &locale, false)).await;
        }
        Ok(Ok(resolved)) => {
            if emit(&tx, "sql_generated", &locale, serde_json::json!({ "sql": resolved.sql })).await.is_err() {
                return;
            }
            if emit(&tx, "query_executing", &locale, JsonValue::Null).await.is_err() {
                return;
            }

            let remaining = timeout.saturating_sub(started.elapsed());
            let outcome = tokio::time::timeout(remaining, app.executor.run(&resolved.sql)).await;
            let result = match outcome {
                Err(_) => {
                    let err = SdqcError::QueryTimeout { seconds: timeout.as_secs() };
                    let _ = tx.send(StageEvent::error(&err, &locale, false)).await;
                    return;
                }
                Ok(Err(err)) => {
                    let _ = tx.send(StageEvent::error(&err, &locale, false)).await;
                    return;
                }
                Ok(Ok(result)) => result,
            };

            if emit(
                &tx,
                "query_completed",
                &locale,
                serde_json::json!({ "row_count": result.row_count, "execution_time_ms": result.execution_time_ms }),
            )
            .await
            .is_err()
            {
                return;
            }
            if emit(&tx, "result_validating", &locale, JsonValue::Null).await.is_err() {
                return;
            }

            let response = ExecuteResponse::success(
                req.task_id.clone(),
                resolved.sql.clone(),
                app.config.system_id.clone(),
                result,
                resolved.ast.limit,
                resolved.ast.offset,
                resolved.token_usage,
                started.elapsed().as_millis() as u64,
            );
            if emit(&tx, "result_ready", &locale, serde_json::to_value(&response).unwrap_or(JsonValue::Null))
                .await
                .is_err()
            {
                return;
            }
            let _ = emit(&tx, "final", &locale, JsonValue::Null).await;
        }
    }
}

/// Parses and resolves to SQL without executing — the `sql_generated`
/// boundary the SSE stream emits at.
async fn resolve(app: &App, req: &ExecuteRequest) -> crate::error::Result<crate::resolver::ResolvedQuery> {
    let catalog = app.catalog.current();
    let dialect = app.dialect_str();
    let limit = req.task_data.options.as_ref().and_then(|o| o.limit);

    let mut resolver = Resolver::new(&catalog, &app.master_data, &app.parser, dialect);
    if let Some(limit) = limit {
        resolver.default_limit = limit;
    }

    let parsed_preview = app.parser.parse(&req.task_data.nlq, &catalog).await?;
    let validator = PreValidator::new(&catalog, &app.master_data);
    validator.validate(&parsed_preview)?;

    resolver.run(&req.task_data.nlq).await
}
