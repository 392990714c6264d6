mod phases;

use serde::Serialize;
use tracing::{info, instrument};

use crate::ast::QueryAst;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::intent::ParsedIntent;
use crate::master_data::MasterDataStore;
use crate::parser::NlqParser;

/// `INIT -> PARSE_NLQ -> MATCH_CONCEPTS -> RESOLVE_BINDINGS -> VALIDATE ->
/// BUILD_AST -> EMIT_SQL -> COMPLETED`, with a parallel terminal `ERROR`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolverState {
    Init,
    ParseNlq,
    MatchConcepts,
    ResolveBindings,
    Validate,
    BuildAst,
    EmitSql,
    Completed,
    Error,
}

/// A concept bound to a value by the parser or by matching.
#[derive(Debug, Clone)]
pub struct MatchedConcept {
    pub concept: String,
    pub value: crate::intent::Value,
    pub source: &'static str,
}

/// Output of the Resolver pipeline: the generated SQL plus the AST and
/// bookkeeping needed by the Response Builder.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub ast: QueryAst,
    pub sql: String,
    pub token_usage: crate::intent::TokenUsage,
    pub state_history: Vec<ResolverState>,
}

/// Drives a ParsedIntent through deterministic phases to SQL. Each phase
/// raising an error records the origin phase and transitions to `ERROR`.
pub struct Resolver<'a> {
    pub catalog: &'a Catalog,
    pub master_data: &'a MasterDataStore,
    pub parser: &'a NlqParser,
    pub dialect: &'a str,
    pub default_limit: u32,
    pub state_history: Vec<ResolverState>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        master_data: &'a MasterDataStore,
        parser: &'a NlqParser,
        dialect: &'a str,
    ) -> Self {
        Resolver {
            catalog,
            master_data,
            parser,
            dialect,
            default_limit: 100,
            state_history: vec![ResolverState::Init],
        }
    }

    fn enter(&mut self, state: ResolverState) {
        self.state_history.push(state);
    }

    #[instrument(skip(self, nlq), fields(nlq_len = nlq.len()))]
    pub async fn run(&mut self, nlq: &str) -> Result<ResolvedQuery> {
        match self.run_inner(nlq).await {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                self.enter(ResolverState::Error);
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, nlq: &str) -> Result<ResolvedQuery> {
        self.enter(ResolverState::ParseNlq);
        let parsed = phases::parse_nlq(self.parser, self.catalog, nlq).await?;

        self.enter(ResolverState::MatchConcepts);
        let (intent, matched) = phases::match_concepts(self.catalog, &parsed)?;

        self.enter(ResolverState::ResolveBindings);
        let where_clauses = phases::resolve_bindings(self.catalog, self.dialect, &intent, &matched)?;

        self.enter(ResolverState::Validate);
        phases::validate(&intent, &matched)?;

        self.enter(ResolverState::BuildAst);
        let ast = phases::build_ast(self.catalog, self.dialect, &intent, &where_clauses, &parsed, self.default_limit)?;

        self.enter(ResolverState::EmitSql);
        let sql = crate::sql::generate(self.dialect, &ast, self.catalog)?;

        self.enter(ResolverState::Completed);
        info!(sql_len = sql.len(), "resolver completed");

        Ok(ResolvedQuery {
            ast,
            sql,
            token_usage: parsed.token_usage,
            state_history: self.state_history.clone(),
        })
    }
}

/// Maps the failing phase to its error-code family when the Response
/// Builder needs to attach the originating stage name.
pub fn phase_name(state: ResolverState) -> &'static str {
    match state {
        ResolverState::Init => "INIT",
        ResolverState::ParseNlq => "PARSE_NLQ",
        ResolverState::MatchConcepts => "MATCH_CONCEPTS",
        ResolverState::ResolveBindings => "RESOLVE_BINDINGS",
        ResolverState::Validate => "VALIDATE",
        ResolverState::BuildAst => "BUILD_AST",
        ResolverState::EmitSql => "EMIT_SQL",
        ResolverState::Completed => "COMPLETED",
        ResolverState::Error => "ERROR",
    }
}
