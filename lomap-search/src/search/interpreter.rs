//! Free-text query interpretation
//!
//! A search box string is handed to an external language model that extracts
//! a keyword, a category and a maximum distance. The model is treated as an
//! untrusted oracle: its category must belong to the catalog, its distance
//! must be a usable number, and any failure degrades to a plain substring
//! search on the raw text. Search never fails from the caller's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::criteria::{FilterCriteria, ALL_CATEGORIES};

/// Reasons the external parser could not produce a structured query
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Query parser not configured")]
    Unavailable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error {0}: {1}")]
    Upstream(u16, String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Structured query as returned by the parsing service
///
/// Mirrors the wire contract `{searchTerm, category, distance | null}`.
/// Models sometimes answer `null` for the text fields; that reads as "".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub search_term: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default)]
    pub distance: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// External natural-language query parser
#[async_trait]
pub trait QueryParser: Send + Sync {
    /// Parser identifier for logs and health output (e.g. "gemini")
    fn name(&self) -> &'static str;

    /// Extract structured criteria from `raw_query`
    ///
    /// `categories` is the catalog's category list; the parser is asked to
    /// pick from it but its answer is re-validated by the caller.
    async fn parse(&self, raw_query: &str, categories: &[String]) -> Result<ParsedQuery, ParseError>;
}

/// Parser used when no API key is configured; every search degrades to
/// keyword matching
pub struct DisabledParser;

#[async_trait]
impl QueryParser for DisabledParser {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn parse(&self, _raw_query: &str, _categories: &[String]) -> Result<ParsedQuery, ParseError> {
        Err(ParseError::Unavailable)
    }
}

/// How a [`FilterCriteria`] was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationSource {
    /// Blank query, no external call made
    EmptyQuery,
    /// Structured answer from the parser, after validation
    Parsed,
    /// Parser failed; raw text used as keyword
    Fallback,
}

/// Criteria plus where they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub criteria: FilterCriteria,
    pub source: InterpretationSource,
}

impl Interpretation {
    /// True when the result is a less precise keyword-only fallback
    pub fn is_degraded(&self) -> bool {
        self.source == InterpretationSource::Fallback
    }
}

/// Turns raw search text into [`FilterCriteria`]
///
/// Clones share the parser, which can be swapped at runtime when an API key
/// is configured.
#[derive(Clone)]
pub struct QueryInterpreter {
    parser: Arc<RwLock<Arc<dyn QueryParser>>>,
}

impl QueryInterpreter {
    pub fn new(parser: Arc<dyn QueryParser>) -> Self {
        Self {
            parser: Arc::new(RwLock::new(parser)),
        }
    }

    pub async fn parser_name(&self) -> &'static str {
        self.parser.read().await.name()
    }

    /// Route subsequent queries to `parser`; in-flight queries finish on the old one
    pub async fn replace_parser(&self, parser: Arc<dyn QueryParser>) {
        let mut current = self.parser.write().await;
        info!(from = current.name(), to = parser.name(), "Query parser replaced");
        *current = parser;
    }

    /// Interpret `raw_query` against the catalog's `categories`
    ///
    /// Makes at most one parser call, with no retry.
    pub async fn interpret(&self, raw_query: &str, categories: &[String]) -> Interpretation {
        if raw_query.trim().is_empty() {
            return Interpretation {
                criteria: FilterCriteria::match_all(),
                source: InterpretationSource::EmptyQuery,
            };
        }

        let parser = Arc::clone(&*self.parser.read().await);

        match parser.parse(raw_query, categories).await {
            Ok(parsed) => {
                debug!(
                    parser = parser.name(),
                    search_term = %parsed.search_term,
                    category = %parsed.category,
                    distance = ?parsed.distance,
                    "Query parsed"
                );
                Interpretation {
                    criteria: validate(parsed, categories),
                    source: InterpretationSource::Parsed,
                }
            }
            Err(e) => {
                warn!(
                    parser = parser.name(),
                    query = %raw_query,
                    "Query parsing failed, falling back to keyword search: {}",
                    e
                );
                Interpretation {
                    criteria: FilterCriteria::keyword_only(raw_query),
                    source: InterpretationSource::Fallback,
                }
            }
        }
    }
}

/// Convert a parser answer into criteria the filter engine can trust
fn validate(parsed: ParsedQuery, categories: &[String]) -> FilterCriteria {
    FilterCriteria {
        keyword: parsed.search_term,
        category: canonical_category(&parsed.category, categories),
        radius_km: parsed.distance.filter(|d| d.is_finite() && *d >= 0.0),
    }
}

/// Catalog spelling of `category` (case-insensitive lookup), or "all" when
/// empty or not in the catalog
fn canonical_category(category: &str, categories: &[String]) -> String {
    let wanted = category.trim().to_lowercase();
    if wanted.is_empty() {
        return ALL_CATEGORIES.to_string();
    }

    match categories.iter().find(|c| c.to_lowercase() == wanted) {
        Some(known) => known.clone(),
        None => {
            debug!(category = %category, "Discarding category not present in catalog");
            ALL_CATEGORIES.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Parser returning a canned answer and counting calls
    struct StubParser {
        answer: Result<ParsedQuery, ()>,
        calls: AtomicUsize,
    }

    impl StubParser {
        fn ok(search_term: &str, category: &str, distance: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(ParsedQuery {
                    search_term: search_term.to_string(),
                    category: category.to_string(),
                    distance,
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err(()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QueryParser for StubParser {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn parse(&self, _raw_query: &str, _categories: &[String]) -> Result<ParsedQuery, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .clone()
                .map_err(|_| ParseError::Malformed("not json".to_string()))
        }
    }

    fn categories() -> Vec<String> {
        vec!["Thủ công".to_string(), "Nông sản".to_string()]
    }

    #[tokio::test]
    async fn test_empty_query_skips_parser() {
        let parser = StubParser::ok("ignored", "Nông sản", Some(3.0));
        let interpreter = QueryInterpreter::new(parser.clone());

        for raw in ["", "   ", "\t\n"] {
            let result = interpreter.interpret(raw, &categories()).await;
            assert_eq!(result.criteria, FilterCriteria::match_all());
            assert_eq!(result.source, InterpretationSource::EmptyQuery);
        }
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parsed_query_becomes_criteria() {
        let parser = StubParser::ok("mật ong", "Nông sản", Some(20.0));
        let interpreter = QueryInterpreter::new(parser.clone());

        let result = interpreter.interpret("mật ong dưới 20km", &categories()).await;

        assert_eq!(result.source, InterpretationSource::Parsed);
        assert_eq!(
            result.criteria,
            FilterCriteria {
                keyword: "mật ong".to_string(),
                category: "Nông sản".to_string(),
                radius_km: Some(20.0),
            }
        );
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_raw_keyword() {
        let parser = StubParser::failing();
        let interpreter = QueryInterpreter::new(parser.clone());

        let raw = "vải thổ cẩm gần đây";
        let result = interpreter.interpret(raw, &categories()).await;

        assert!(result.is_degraded());
        assert_eq!(
            result.criteria,
            FilterCriteria {
                keyword: raw.to_string(),
                category: "all".to_string(),
                radius_km: None,
            }
        );
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1, "no retries");
    }

    #[tokio::test]
    async fn test_disabled_parser_always_falls_back() {
        let interpreter = QueryInterpreter::new(Arc::new(DisabledParser));
        let result = interpreter.interpret("mật ong", &categories()).await;
        assert_eq!(result.source, InterpretationSource::Fallback);
        assert_eq!(result.criteria, FilterCriteria::keyword_only("mật ong"));
    }

    #[tokio::test]
    async fn test_invented_category_is_discarded() {
        let interpreter = QueryInterpreter::new(StubParser::ok("trà", "Đồ uống", None));
        let result = interpreter.interpret("trà ngon", &categories()).await;
        assert_eq!(result.criteria.category, "all");
        assert_eq!(result.criteria.keyword, "trà");
    }

    #[tokio::test]
    async fn test_category_matched_case_insensitively_and_canonicalised() {
        let interpreter = QueryInterpreter::new(StubParser::ok("", "NÔNG SẢN", None));
        let result = interpreter.interpret("đồ nông sản", &categories()).await;
        assert_eq!(result.criteria.category, "Nông sản");
    }

    #[tokio::test]
    async fn test_empty_category_means_all() {
        let interpreter = QueryInterpreter::new(StubParser::ok("mật ong", "", None));
        let result = interpreter.interpret("mật ong", &categories()).await;
        assert_eq!(result.criteria.category, "all");
    }

    #[tokio::test]
    async fn test_unusable_distance_is_unbounded() {
        for distance in [Some(-5.0), Some(f64::INFINITY), Some(f64::NAN), None] {
            let interpreter = QueryInterpreter::new(StubParser::ok("mật ong", "", distance));
            let result = interpreter.interpret("mật ong", &categories()).await;
            assert_eq!(result.criteria.radius_km, None, "distance {:?}", distance);
        }
    }

    #[test]
    fn test_parsed_query_wire_format() {
        let parsed: ParsedQuery =
            serde_json::from_str(r#"{"searchTerm":"mật ong","category":"","distance":null}"#).unwrap();
        assert_eq!(parsed.search_term, "mật ong");
        assert_eq!(parsed.distance, None);

        let partial: ParsedQuery = serde_json::from_str(r#"{"distance": 5}"#).unwrap();
        assert_eq!(partial.search_term, "");
        assert_eq!(partial.distance, Some(5.0));
    }

    #[test]
    fn test_null_text_fields_read_as_empty() {
        let parsed: ParsedQuery =
            serde_json::from_str(r#"{"searchTerm":"mật ong","category":null,"distance":20}"#).unwrap();
        assert_eq!(parsed.search_term, "mật ong");
        assert_eq!(parsed.category, "");
        assert_eq!(parsed.distance, Some(20.0));

        let parsed: ParsedQuery =
            serde_json::from_str(r#"{"searchTerm":null,"category":"Nông sản","distance":null}"#).unwrap();
        assert_eq!(parsed.search_term, "");
        assert_eq!(parsed.category, "Nông sản");
    }

    #[tokio::test]
    async fn test_null_category_keeps_keyword_and_radius() {
        let parsed: ParsedQuery =
            serde_json::from_str(r#"{"searchTerm":"mật ong","category":null,"distance":20}"#).unwrap();
        let parser = Arc::new(StubParser {
            answer: Ok(parsed),
            calls: AtomicUsize::new(0),
        });
        let interpreter = QueryInterpreter::new(parser);

        let result = interpreter.interpret("mật ong dưới 20km", &categories()).await;
        assert_eq!(result.source, InterpretationSource::Parsed);
        assert_eq!(result.criteria.keyword, "mật ong");
        assert_eq!(result.criteria.category, "all");
        assert_eq!(result.criteria.radius_km, Some(20.0));
    }

    #[tokio::test]
    async fn test_replace_parser_affects_clones() {
        let interpreter = QueryInterpreter::new(Arc::new(DisabledParser));
        let shared = interpreter.clone();
        assert_eq!(shared.parser_name().await, "disabled");

        interpreter
            .replace_parser(StubParser::ok("vải", "Thủ công", None))
            .await;
        assert_eq!(shared.parser_name().await, "stub");

        let result = shared.interpret("vải thổ cẩm", &categories()).await;
        assert_eq!(result.source, InterpretationSource::Parsed);
        assert_eq!(result.criteria.category, "Thủ công");
    }
}
