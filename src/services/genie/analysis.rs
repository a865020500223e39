//! Composite analysis - rule-based identification + LLM optimization
//!
//! ```text
//! query_lookup ──► parse records ──► select target ──► statement_lookup
//!                                                           │
//!                 AnalysisReport ◄── optimization prompt ◄──┘
//! ```
//!
//! Calls are strictly sequential and never retried. A failed statement
//! lookup degrades the prompt instead of aborting the analysis.

use chrono::Utc;
use serde_json::Value;

use super::error::{GenieError, GenieResult};
use super::models::{AnalysisReport, AnalysisTarget, HYBRID_METHODOLOGY, QueryRecord, QueryResult};
use super::payload;
use super::prompts;
use super::service::GenieService;

impl GenieService {
    /// Identify a query with the rule-based lookup, then ask for optimization advice
    pub async fn analyze_query_with_llm(
        &self,
        target: &AnalysisTarget,
        hours_back: u32,
    ) -> GenieResult<AnalysisReport> {
        // 1. Rule-based retrieval
        let raw = match self.query_genie_space(&prompts::query_lookup(target, hours_back)).await {
            Ok(raw) => raw,
            Err(GenieError::NotConnected) => return Err(GenieError::NotConnected),
            Err(e) => {
                return Err(GenieError::DetailsUnavailable {
                    details: serde_json::to_value(QueryResult::from_error(&e))
                        .unwrap_or(Value::Null),
                });
            },
        };

        // 2. Structured records
        let parsed = payload::parse_structured(&raw)?;
        let records = payload::query_records(&parsed);
        if records.is_empty() {
            return Err(GenieError::NoQueriesFound);
        }

        // 3. Target record
        let selected = select_record(records, target)?;
        let record: QueryRecord = serde_json::from_value(selected.clone())?;
        let query_id = match (&record.query_id, target) {
            (Some(id), _) => id.clone(),
            (None, AnalysisTarget::QueryId(requested)) => requested.clone(),
            (None, AnalysisTarget::Rank(rank)) => {
                return Err(GenieError::AnalysisFailed(format!(
                    "query ranked {} has no query_id",
                    rank
                )));
            },
        };

        tracing::info!(
            "Rule-based lookup selected query {} (score: {:?}, issue: {:?})",
            query_id,
            record.badness_score,
            record.primary_issue
        );

        // 4. Full SQL text
        let statement_text = match self.query_genie_space(&prompts::statement_lookup(&query_id)).await
        {
            Ok(text) => Some(text.trim().to_string()).filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::warn!("Statement lookup for query {} failed: {}", query_id, e);
                None
            },
        };

        // 5. LLM optimization advice
        let prompt = prompts::optimization(&query_id, &record, statement_text.as_deref());
        let recommendations = QueryResult::from(self.query_genie_space(&prompt).await);

        // 6. Merge
        Ok(AnalysisReport {
            success: true,
            query_id,
            rule_based_analysis: selected,
            statement_text,
            llm_optimization_recommendations: recommendations,
            analysis_timestamp: Utc::now().to_rfc3339(),
            methodology: HYBRID_METHODOLOGY.to_string(),
        })
    }
}

/// Pick the record a target refers to; ranks are 1-based and bounds-checked
fn select_record(mut records: Vec<Value>, target: &AnalysisTarget) -> GenieResult<Value> {
    let available = records.len();
    match target {
        AnalysisTarget::Rank(rank) if *rank == 0 || *rank > available => {
            Err(GenieError::RankOutOfRange { rank: *rank, available })
        },
        AnalysisTarget::Rank(rank) => Ok(records.swap_remove(rank - 1)),
        AnalysisTarget::QueryId(_) => Ok(records.swap_remove(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Value> {
        vec![json!({ "query_id": "a" }), json!({ "query_id": "b" }), json!({ "query_id": "c" })]
    }

    #[test]
    fn test_select_by_rank() {
        assert_eq!(select_record(records(), &AnalysisTarget::Rank(1)).unwrap()["query_id"], "a");
        assert_eq!(select_record(records(), &AnalysisTarget::Rank(3)).unwrap()["query_id"], "c");
    }

    #[test]
    fn test_select_by_id_takes_first() {
        let target = AnalysisTarget::QueryId("zzz".into());
        assert_eq!(select_record(records(), &target).unwrap()["query_id"], "a");
    }

    #[test]
    fn test_rank_bounds() {
        let err = select_record(records(), &AnalysisTarget::Rank(4)).unwrap_err();
        assert!(matches!(err, GenieError::RankOutOfRange { rank: 4, available: 3 }));

        let err = select_record(records(), &AnalysisTarget::Rank(0)).unwrap_err();
        assert!(matches!(err, GenieError::RankOutOfRange { rank: 0, .. }));
    }
}
