use regex::Regex;
use std::collections::HashMap;

use crate::intent::{ParsedIntent, TokenUsage, Value};
use crate::parser::pagination;

/// A single intent-pattern rule: a regex whose match bumps the candidate
/// intent's score.
struct IntentPattern {
    intent_name: &'static str,
    regex: Regex,
    score: f64,
}

/// A parameter-extraction pattern: item number, warehouse code,
/// purchase/work-order document id, `YYYY年` year.
struct ParamPattern {
    concept: &'static str,
    regex: Regex,
}

pub struct RuleParser {
    intent_patterns: Vec<IntentPattern>,
    param_patterns: Vec<ParamPattern>,
    /// Score below which the rule pass is considered a non-match.
    threshold: f64,
}

impl Default for RuleParser {
    fn default() -> Self {
        RuleParser::new(0.5)
    }
}

impl RuleParser {
    pub fn new(threshold: f64) -> Self {
        let intent_patterns = vec![
            IntentPattern {
                intent_name: "QUERY_INVENTORY",
                regex: Regex::new("庫存").unwrap(),
                score: 0.7,
            },
            IntentPattern {
                intent_name: "QUERY_WORK_ORDER_COUNT",
                regex: Regex::new("工單.*總數|工單.*數量|工單.*筆數").unwrap(),
                score: 0.75,
            },
            IntentPattern {
                intent_name: "QUERY_PURCHASE_ORDER",
                regex: Regex::new("採購單|PO").unwrap(),
                score: 0.65,
            },
        ];

        let param_patterns = vec![
            ParamPattern {
                concept: "ITEM_NO",
                regex: Regex::new(r"料號\s*([A-Za-z0-9\-]+)").unwrap(),
            },
            ParamPattern {
                concept: "WAREHOUSE",
                regex: Regex::new(r"倉庫\s*([A-Za-z0-9]+)").unwrap(),
            },
            ParamPattern {
                concept: "WORKSTATION",
                regex: Regex::new(r"工作站\s*([A-Za-z0-9]+)").unwrap(),
            },
            ParamPattern {
                concept: "DOCUMENT_ID",
                regex: Regex::new(r"(?:工單|採購單|PO)\s*(?:號)?\s*([A-Za-z0-9\-]+)").unwrap(),
            },
        ];

        RuleParser { intent_patterns, param_patterns, threshold }
    }

    /// Returns `None` when no intent pattern clears the configured
    /// threshold, signalling the cascade to proceed to the LLM pass.
    pub fn parse(&self, nlq: &str) -> Option<ParsedIntent> {
        let mut best: Option<(&str, f64)> = None;
        for pattern in &self.intent_patterns {
            if pattern.regex.is_match(nlq) {
                match best {
                    Some((_, score)) if score >= pattern.score => {}
                    _ => best = Some((pattern.intent_name, pattern.score)),
                }
            }
        }

        let (intent_name, confidence) = best?;
        if confidence < self.threshold {
            return None;
        }

        let mut params: HashMap<String, Value> = HashMap::new();
        for pattern in &self.param_patterns {
            if let Some(cap) = pattern.regex.captures(nlq) {
                if let Some(m) = cap.get(1) {
                    params.insert(pattern.concept.to_string(), Value::Scalar { value: m.as_str().to_string() });
                }
            }
        }

        lazy_static::lazy_static! {
            static ref YEAR_MONTH_RE: Regex = Regex::new(r"(\d{4})年(?:(\d{1,2})月)?").unwrap();
        }

        if let Some(year_match) = YEAR_MONTH_RE.captures(nlq) {
            let year: i32 = year_match.get(1).unwrap().as_str().parse().unwrap_or(0);
            let month: Option<u32> = year_match.get(2).and_then(|m| m.as_str().parse().ok());
            params.insert(
                "TIME_RANGE".to_string(),
                Value::TimeRange(crate::intent::TimeRangeValue::Abstract(crate::intent::AbstractTimeDescriptor {
                    granularity: if month.is_some() {
                        crate::intent::TimeGranularity::Month
                    } else {
                        crate::intent::TimeGranularity::Year
                    },
                    year,
                    month,
                })),
            );
        }

        let pagination = pagination::extract(nlq);

        Some(ParsedIntent {
            intent_name: intent_name.to_string(),
            confidence,
            params,
            limit: pagination.limit,
            offset: pagination.offset,
            token_usage: TokenUsage::default(),
            validation_errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_inventory_intent_with_item_no() {
        let parser = RuleParser::default();
        let parsed = parser.parse("查詢料號 10-0012 的庫存").unwrap();
        assert_eq!(parsed.intent_name, "QUERY_INVENTORY");
        assert!(parsed.confidence >= 0.5);
        assert_eq!(parsed.params.get("ITEM_NO"), Some(&Value::Scalar { value: "10-0012".to_string() }));
    }

    #[test]
    fn matches_work_order_count_with_time_range() {
        let parser = RuleParser::default();
        let parsed = parser.parse("2026年1月的工單總數").unwrap();
        assert_eq!(parsed.intent_name, "QUERY_WORK_ORDER_COUNT");
        assert!(parsed.params.contains_key("TIME_RANGE"));
    }

    #[test]
    fn empty_nlq_yields_no_match() {
        let parser = RuleParser::default();
        assert!(parser.parse("").is_none());
    }
}
