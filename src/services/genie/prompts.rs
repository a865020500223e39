//! Prompt builders
//!
//! Pure functions turning typed parameters into the natural-language
//! requests sent to the Genie space.

use super::guidance::guidance_for;
use super::models::{AnalysisTarget, QueryDescriptor, QueryRecord};

const OPTIMIZATION_PROMPT: &str = include_str!("optimization_prompt.md");

/// Default lookback for systemic pattern analysis (one week)
pub const PATTERN_LOOKBACK_HOURS: u32 = 168;

pub const STATEMENT_UNAVAILABLE: &str = "SQL text not available";

const NOT_REPORTED: &str = "not reported";

pub fn worst_queries(d: &QueryDescriptor) -> String {
    format!(
        "Find the {limit} worst performing queries in the last {hours} hours.

Criteria:
- Execution time longer than {min_secs} seconds
- Include query_id, statement_text, execution_duration_ms, user_name, warehouse_id
- Order by execution time (slowest first)
- Include the actual SQL text so we can optimize it

Format the results clearly with each query's performance metrics.",
        limit = d.limit,
        hours = d.hours_back,
        min_secs = d.min_duration_seconds,
    )
}

pub fn expensive_queries(d: &QueryDescriptor) -> String {
    format!(
        "Find the {limit} most expensive queries by DBU consumption in the last {hours} hours.

Include:
- Query ID and SQL statement text
- DBU cost and execution time
- User and warehouse information
- Data volume processed (rows_read, bytes_read)

Order by cost (most expensive first).
Show the actual SQL so we can analyze and optimize it.",
        limit = d.limit,
        hours = d.hours_back,
    )
}

pub fn query_details(query_id: &str) -> String {
    format!(
        "For query_id '{query_id}', provide detailed analysis:

Performance metrics:
- Execution time, queue time, compilation time
- Resource usage (CPU, memory, I/O)
- Data scan statistics

Query structure:
- Tables accessed and JOIN patterns
- WHERE clause complexity
- Aggregation and sorting operations

Optimization opportunities:
- Missing indexes that could help
- Inefficient JOIN orders
- Partition pruning opportunities
- Caching potential

Provide specific, actionable recommendations."
    )
}

pub fn query_patterns(hours_back: u32) -> String {
    format!(
        "Analyze query patterns over the last {hours_back} hours to identify:

Common performance issues:
- Most frequently scanned tables
- Repeated inefficient query patterns
- Users with consistently slow queries

Optimization opportunities:
- Tables that would benefit from indexing
- Common JOINs that could use materialized views
- Partitioning strategies for large tables

Provide a prioritized list of systemic improvements that would impact multiple queries."
    )
}

const RECORD_FORMAT: &str = "Respond with JSON only, in the form \
{\"queries\": [{\"query_id\": ..., \"badness_score\": ..., \"primary_issue\": ..., \
\"execution_duration_ms\": ..., \"statement_text\": ...}]}. \
primary_issue must be one of MEMORY_SPILL_CRITICAL, SLOW_EXECUTION, POOR_CACHE_UTILIZATION, \
DATA_INEFFICIENCY, SHUFFLE_HEAVY, INFRASTRUCTURE_BOTTLENECK.";

/// First-stage retrieval of the composite analysis
pub fn query_lookup(target: &AnalysisTarget, hours_back: u32) -> String {
    match target {
        AnalysisTarget::QueryId(query_id) => format!(
            "Return the performance analysis for query_id '{query_id}': its badness score, \
primary performance issue and execution metrics. {RECORD_FORMAT}"
        ),
        AnalysisTarget::Rank(rank) => format!(
            "Rank the queries executed in the last {hours_back} hours by badness score (worst first) \
and return the top {rank} with their badness score, primary performance issue and execution \
metrics. {RECORD_FORMAT}"
        ),
    }
}

/// Second-stage retrieval of the full SQL text
pub fn statement_lookup(query_id: &str) -> String {
    format!(
        "Return only the complete statement_text for query_id '{query_id}', exactly as executed, \
with no commentary."
    )
}

/// LLM optimization request for one rule-identified query
pub fn optimization(query_id: &str, record: &QueryRecord, statement_text: Option<&str>) -> String {
    let primary_issue = record.primary_issue.as_deref().unwrap_or(NOT_REPORTED);
    let statement = statement_text
        .or(record.statement_text.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(STATEMENT_UNAVAILABLE);

    OPTIMIZATION_PROMPT
        .replace("{query_id}", query_id)
        .replace("{badness_score}", &format_number(record.badness_score))
        .replace("{primary_issue}", primary_issue)
        .replace("{execution_duration_ms}", &format_number(record.execution_duration_ms))
        .replace("{guidance}", guidance_for(primary_issue))
        // last, so SQL text containing placeholders is left alone
        .replace("{statement_text}", statement)
}

fn format_number(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_REPORTED.to_string(), |v| v.to_string())
}
