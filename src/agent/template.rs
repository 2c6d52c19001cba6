use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::output::{non_empty_str, parse_json_object, string_array};

const DEFAULT_TITLE: &str = "Issue Title";
const DEFAULT_REASONING: &str = "Template generated based on user input";

/// The fixed set of issue categories a template can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    #[default]
    Bug,
    Feature,
    Documentation,
    Performance,
    Security,
    Question,
}

impl IssueType {
    pub const ALL: [IssueType; 6] = [
        IssueType::Bug,
        IssueType::Feature,
        IssueType::Documentation,
        IssueType::Performance,
        IssueType::Security,
        IssueType::Question,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Bug => "bug",
            IssueType::Feature => "feature",
            IssueType::Documentation => "documentation",
            IssueType::Performance => "performance",
            IssueType::Security => "security",
            IssueType::Question => "question",
        }
    }

    /// Markdown body structure used for this type when the model omits one.
    pub fn skeleton(self) -> &'static str {
        match self {
            IssueType::Bug => BUG_SKELETON,
            IssueType::Feature => FEATURE_SKELETON,
            IssueType::Documentation => DOCUMENTATION_SKELETON,
            IssueType::Performance => PERFORMANCE_SKELETON,
            IssueType::Security => SECURITY_SKELETON,
            IssueType::Question => QUESTION_SKELETON,
        }
    }
}

impl FromStr for IssueType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        let lower = value.trim().to_ascii_lowercase();
        IssueType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| AppError::Validation(format!("Unknown issue type: {value}")))
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the template generator.
#[derive(Debug, Clone)]
pub struct TemplateRequest<'a> {
    pub issue_type: IssueType,
    pub description: &'a str,
    pub context: Option<&'a str>,
    pub repo_name: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTemplate {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub reasoning: String,
}

impl IssueTemplate {
    /// Parse the generator's JSON reply; a missing body falls back to the type's skeleton.
    pub fn from_model_output(text: &str, issue_type: IssueType) -> Result<Self> {
        let data = parse_json_object(text)?;

        Ok(Self {
            title: non_empty_str(&data, "title")
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            body: non_empty_str(&data, "body")
                .unwrap_or(issue_type.skeleton())
                .to_string(),
            labels: string_array(&data, "labels"),
            assignees: string_array(&data, "assignees"),
            reasoning: non_empty_str(&data, "reasoning")
                .unwrap_or(DEFAULT_REASONING)
                .to_string(),
        })
    }
}

/// Best-guess issue type for a partially written issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSuggestion {
    pub suggested_type: IssueType,
    pub confidence: u8,
    pub reasoning: String,
}

impl TypeSuggestion {
    pub fn failed() -> Self {
        Self {
            suggested_type: IssueType::Question,
            confidence: 0,
            reasoning: "Analysis failed".to_string(),
        }
    }

    pub fn from_model_output(text: &str) -> Result<Self> {
        let data = parse_json_object(text)?;

        let suggested_type = non_empty_str(&data, "suggestedType")
            .and_then(|t| t.parse().ok())
            .unwrap_or(IssueType::Question);
        let confidence = data
            .get("confidence")
            .and_then(serde_json::Value::as_f64)
            .filter(|c| *c > 0.0)
            .map(|c| c.min(100.0).round() as u8)
            .unwrap_or(50);

        Ok(Self {
            suggested_type,
            confidence,
            reasoning: non_empty_str(&data, "reasoning")
                .unwrap_or("Based on content analysis")
                .to_string(),
        })
    }
}

const BUG_SKELETON: &str = "## Description
[Brief description of the bug]

## Steps to Reproduce
1. [First step]
2. [Second step]
3. [Third step]

## Expected Behavior
[What you expected to happen]

## Actual Behavior
[What actually happened]

## Environment
- OS: [e.g., Windows 10, macOS 13, Ubuntu 22.04]
- Browser: [if applicable]
- Version: [application version]

## Additional Context
[Any other context about the problem]

## Screenshots
[If applicable, add screenshots to help explain the problem]";

const FEATURE_SKELETON: &str = "## Feature Description
[Clear and concise description of the feature]

## Problem Statement
[What problem does this feature solve?]

## Proposed Solution
[Describe how you envision this feature working]

## Alternative Solutions
[Have you considered any alternative approaches?]

## Use Cases
[Describe specific scenarios where this feature would be valuable]

## Additional Context
[Any other context, mockups, or examples]";

const DOCUMENTATION_SKELETON: &str = "## Documentation Issue
[What documentation needs to be added or improved?]

## Current State
[What is currently documented, if anything?]

## Proposed Changes
[What should be documented or changed?]

## Target Audience
[Who is this documentation for? Beginners, advanced users, etc.]

## Related Resources
[Links to related documentation or discussions]";

const PERFORMANCE_SKELETON: &str = "## Performance Issue Description
[Brief description of the performance problem]

## Current Performance
[Describe current performance metrics]

## Expected Performance
[What performance level is expected?]

## Steps to Reproduce
1. [First step]
2. [Second step]
3. [Third step]

## Environment
- OS: [operating system]
- Hardware: [relevant specs]
- Version: [application version]

## Profiling Data
[If available, include profiling results or metrics]

## Additional Context
[Any other relevant information]";

const SECURITY_SKELETON: &str = "## Security Concern

**PLEASE REVIEW CAREFULLY BEFORE POSTING**
If this is a critical vulnerability, consider reporting it privately through GitHub Security Advisories.

## Issue Type
[Vulnerability, Security Enhancement, etc.]

## Description
[Describe the security concern]

## Potential Impact
[What could happen if this is exploited?]

## Steps to Reproduce (if applicable)
1. [First step]
2. [Second step]
3. [Third step]

## Proposed Solution
[How could this be mitigated?]

## Additional Context
[Any other relevant security information]";

const QUESTION_SKELETON: &str = "## Question
[Your question here]

## Context
[Provide context about what you're trying to do]

## What I've Tried
[Describe any attempts you've made to solve this]

## Environment (if relevant)
[Version, OS, browser, etc.]

## Additional Information
[Any other relevant details]";
