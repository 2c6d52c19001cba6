use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::output::{non_empty_str, parse_json_object, string_array};

const DEFAULT_CATEGORY: &str = "question";
const DEFAULT_COMMENT: &str = "Thank you for filing this issue!";
const DEFAULT_REASONING: &str = "Analysis based on issue content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Unknown values fall back to `Medium`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            _ => Priority::Medium,
        }
    }
}

/// What the analyzer sees of an issue.
#[derive(Debug, Clone)]
pub struct IssueContext<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub repo_name: &'a str,
}

/// Triage recommendation for one issue. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAnalysis {
    pub suggested_labels: Vec<String>,
    pub priority: Priority,
    pub category: String,
    pub comment: String,
    pub reasoning: String,
}

impl TriageAnalysis {
    /// Parse the analyzer's JSON reply, filling defaults for missing fields.
    ///
    /// Output that is not a JSON object is an error.
    pub fn from_model_output(text: &str) -> Result<Self> {
        let data = parse_json_object(text)?;

        Ok(Self {
            suggested_labels: string_array(&data, "suggestedLabels"),
            priority: non_empty_str(&data, "priority")
                .map(Priority::parse_lenient)
                .unwrap_or_default(),
            category: non_empty_str(&data, "category")
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            comment: non_empty_str(&data, "comment")
                .unwrap_or(DEFAULT_COMMENT)
                .to_string(),
            reasoning: non_empty_str(&data, "reasoning")
                .unwrap_or(DEFAULT_REASONING)
                .to_string(),
        })
    }
}
