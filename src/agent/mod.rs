pub mod claude;
pub mod output;
pub mod prompt;
pub mod template;
pub mod triage;

use async_trait::async_trait;

use crate::error::Result;
use crate::platform::types::Repository;

use claude::ClaudeClient;
use template::{IssueTemplate, TemplateRequest, TypeSuggestion};
use triage::{IssueContext, TriageAnalysis};

const CHAT_FALLBACK: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// The language-model collaborator behind triage, templates and chat.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Recommend labels, priority, category and a reply for an issue.
    async fn analyze_issue(&self, issue: &IssueContext<'_>) -> Result<TriageAnalysis>;

    /// Expand a short description into a full issue.
    async fn generate_template(&self, request: &TemplateRequest<'_>) -> Result<IssueTemplate>;

    /// Guess the type of a partially written issue. Never fails.
    async fn suggest_issue_type(&self, title: &str, partial_body: &str) -> TypeSuggestion;

    /// Free-form answer about a repository. Never fails.
    async fn chat(&self, repository: &Repository, question: &str) -> String;
}

pub struct ClaudeAssistant {
    client: ClaudeClient,
}

impl ClaudeAssistant {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Assistant for ClaudeAssistant {
    async fn analyze_issue(&self, issue: &IssueContext<'_>) -> Result<TriageAnalysis> {
        tracing::info!(repo = issue.repo_name, title = issue.title, "Analyzing issue");

        let text = self
            .client
            .complete(prompt::JSON_SYSTEM_PROMPT, &prompt::triage_prompt(issue))
            .await?;

        TriageAnalysis::from_model_output(&text)
    }

    async fn generate_template(&self, request: &TemplateRequest<'_>) -> Result<IssueTemplate> {
        tracing::info!(
            issue_type = %request.issue_type,
            repo = ?request.repo_name,
            "Generating issue template"
        );

        let text = self
            .client
            .complete(prompt::JSON_SYSTEM_PROMPT, &prompt::template_prompt(request))
            .await?;

        IssueTemplate::from_model_output(&text, request.issue_type)
    }

    async fn suggest_issue_type(&self, title: &str, partial_body: &str) -> TypeSuggestion {
        let result = self
            .client
            .complete(
                prompt::JSON_SYSTEM_PROMPT,
                &prompt::type_suggestion_prompt(title, partial_body),
            )
            .await
            .and_then(|text| TypeSuggestion::from_model_output(&text));

        match result {
            Ok(suggestion) => suggestion,
            Err(e) => {
                tracing::warn!(error = %e, "Issue type suggestion failed");
                TypeSuggestion::failed()
            }
        }
    }

    async fn chat(&self, repository: &Repository, question: &str) -> String {
        match self
            .client
            .complete(
                prompt::CHAT_SYSTEM_PROMPT,
                &prompt::chat_prompt(repository, question),
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(repo = %repository.full_name, error = %e, "Repository chat failed");
                CHAT_FALLBACK.to_string()
            }
        }
    }
}
