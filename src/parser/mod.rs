pub mod cache;
pub mod llm;
pub mod pagination;
pub mod rule;

use tracing::info;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::intent::ParsedIntent;

pub use cache::ParserCache;
pub use llm::LlmParser;
pub use rule::RuleParser;

/// Gate threshold below which the Resolver converts the result into a
/// typed `INTENT_UNCLEAR` diagnostic.
pub const CONFIDENCE_GATE: f64 = 0.3;

/// Three-stage cascade: cache -> rule -> LLM. Cache is
/// checked first since it is the cheapest possible hit; rule and LLM are
/// tried in that order on a miss, each able to short-circuit the other.
pub struct NlqParser {
    rule: RuleParser,
    llm: LlmParser,
    cache: ParserCache,
}

impl NlqParser {
    pub fn new(rule: RuleParser, llm: LlmParser, cache: ParserCache) -> Self {
        NlqParser { rule, llm, cache }
    }

    pub async fn parse(&self, nlq: &str, catalog: &Catalog) -> Result<ParsedIntent> {
        if let Some(cached) = self.cache.get(nlq) {
            info!(nlq_len = nlq.len(), "parser cache hit");
            return Ok(cached);
        }

        let pagination = pagination::extract(nlq);

        let mut result = match self.rule.parse(nlq) {
            Some(parsed) => parsed,
            None => self.llm.parse(nlq, catalog).await?,
        };

        // Rule pass already extracts pagination inline; for the LLM path
        // (or a rule match that didn't set it) the independent sweep wins.
        if result.limit.is_none() {
            result.limit = pagination.limit;
        }
        if result.offset.is_none() {
            result.offset = pagination.offset;
        }

        if result.confidence < CONFIDENCE_GATE {
            result.intent_name = "UNKNOWN".to_string();
        } else {
            self.cache.put(nlq, result.clone());
        }

        Ok(result)
    }
}
