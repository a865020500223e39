//! Issue guidance lookup
//!
//! Maps the primary-issue label computed by the rule-based lookup to the
//! remediation focus handed to the LLM. Unknown labels get a generic focus.

/// Known primary-issue categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    MemorySpillCritical,
    SlowExecution,
    PoorCacheUtilization,
    DataInefficiency,
    ShuffleHeavy,
    InfrastructureBottleneck,
}

pub const GENERIC_GUIDANCE: &str = "Analyze general optimization opportunities:
- Review the query structure for unnecessary work
- Check filters, joins and aggregations for inefficiencies
- Suggest indexing, clustering or caching improvements where applicable";

impl IssueCategory {
    pub const ALL: [IssueCategory; 6] = [
        Self::MemorySpillCritical,
        Self::SlowExecution,
        Self::PoorCacheUtilization,
        Self::DataInefficiency,
        Self::ShuffleHeavy,
        Self::InfrastructureBottleneck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemorySpillCritical => "MEMORY_SPILL_CRITICAL",
            Self::SlowExecution => "SLOW_EXECUTION",
            Self::PoorCacheUtilization => "POOR_CACHE_UTILIZATION",
            Self::DataInefficiency => "DATA_INEFFICIENCY",
            Self::ShuffleHeavy => "SHUFFLE_HEAVY",
            Self::InfrastructureBottleneck => "INFRASTRUCTURE_BOTTLENECK",
        }
    }

    /// Exact, case-insensitive label match
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(label))
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::MemorySpillCritical => {
                "Focus on memory spill reduction:
- Identify operations spilling to disk (large joins, sorts, aggregations)
- Reduce data volume early with selective filters and column pruning
- Consider broadcast joins for small dimension tables
- Recommend warehouse sizing or partitioning changes that keep work in memory"
            },
            Self::SlowExecution => {
                "Focus on execution time reduction:
- Find the most expensive stages in the query plan
- Look for full table scans that partition pruning or data skipping could avoid
- Check join order and join strategy
- Suggest rewrites that reduce the amount of data processed"
            },
            Self::PoorCacheUtilization => {
                "Focus on cache utilization:
- Identify non-deterministic expressions that prevent result caching
- Recommend consistent query text for repeated workloads
- Suggest materialized views or cached tables for hot data
- Check whether disk cache is enabled and warm for the scanned tables"
            },
            Self::DataInefficiency => {
                "Focus on data access efficiency:
- Compare rows read to rows returned and flag over-scanning
- Recommend selecting only required columns instead of SELECT *
- Suggest Z-ordering or liquid clustering on frequently filtered columns
- Check for small-file problems and recommend OPTIMIZE where useful"
            },
            Self::ShuffleHeavy => {
                "Focus on shuffle reduction:
- Identify joins and aggregations that trigger large shuffles
- Recommend broadcast hints for small tables
- Check for data skew on join and grouping keys
- Suggest pre-aggregation or co-partitioning to limit data movement"
            },
            Self::InfrastructureBottleneck => {
                "Focus on infrastructure constraints:
- Check queueing and warehouse concurrency limits
- Evaluate whether the warehouse size matches the workload
- Recommend scaling policies or workload isolation
- Separate query-level fixes from capacity problems"
            },
        }
    }
}

/// Guidance paragraph for an issue label; never fails
pub fn guidance_for(label: &str) -> &'static str {
    IssueCategory::from_label(label)
        .map(|c| c.guidance())
        .unwrap_or(GENERIC_GUIDANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_label_has_its_own_guidance() {
        let mut seen = std::collections::HashSet::new();
        for category in IssueCategory::ALL {
            let text = guidance_for(category.as_str());
            assert!(!text.is_empty());
            assert_ne!(text, GENERIC_GUIDANCE, "{} fell back", category.as_str());
            assert!(seen.insert(text), "duplicate guidance for {}", category.as_str());
        }
    }

    #[test]
    fn test_unknown_labels_fall_back() {
        for label in ["", "UNKNOWN", "MEMORY_SPILL", "memory spill critical"] {
            assert_eq!(guidance_for(label), GENERIC_GUIDANCE);
        }
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(
            IssueCategory::from_label(" memory_spill_critical "),
            Some(IssueCategory::MemorySpillCritical)
        );
        assert!(guidance_for("shuffle_heavy").contains("shuffle"));
    }

    #[test]
    fn test_from_label_round_trips_every_category() {
        for category in IssueCategory::ALL {
            assert_eq!(IssueCategory::from_label(category.as_str()), Some(category));
            assert_eq!(
                IssueCategory::from_label(&category.as_str().to_lowercase()),
                Some(category)
            );
        }
    }
}
