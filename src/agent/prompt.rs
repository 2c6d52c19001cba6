use crate::platform::types::Repository;

use super::template::TemplateRequest;
use super::triage::IssueContext;

pub const JSON_SYSTEM_PROMPT: &str = "You are Steward, an assistant that helps maintainers run GitHub repositories. \
Reply with a single JSON object and nothing else: no prose, no Markdown.";

pub const CHAT_SYSTEM_PROMPT: &str = "You are Steward, an assistant that helps maintainers run GitHub repositories. \
Be specific, concise, friendly and professional.";

pub fn triage_prompt(issue: &IssueContext<'_>) -> String {
    let body = if issue.body.trim().is_empty() {
        "No description provided"
    } else {
        issue.body
    };

    format!(
        r#"Triage the following GitHub issue.

Repository: {repo}
Issue title: {title}
Issue body:
{body}

Decide:
1. suggestedLabels: 3 to 5 relevant labels (bug, feature, documentation, enhancement, good-first-issue, ...).
2. priority: one of low, medium, high, critical.
3. category: one of bug, feature-request, documentation, question, enhancement, maintenance.
4. comment: a reply to post on the issue that thanks the author, restates the issue in one or two sentences, and proposes next steps or asks clarifying questions.
5. reasoning: two or three sentences explaining these decisions.

Return a JSON object with the properties suggestedLabels (array of strings), priority, category, comment and reasoning (strings)."#,
        repo = issue.repo_name,
        title = issue.title,
    )
}

pub fn template_prompt(request: &TemplateRequest<'_>) -> String {
    let context = request
        .context
        .map(|c| format!("Additional context: {c}\n"))
        .unwrap_or_default();
    let repo = request
        .repo_name
        .map(|r| format!("Repository: {r}\n"))
        .unwrap_or_default();

    format!(
        r#"Write a complete GitHub issue from a short description so maintainers can act on it.

Issue type: {issue_type}
Description: {description}
{context}{repo}
Use this body structure:
{skeleton}

Rules:
- The title must be concise and specific to this problem or request, never generic.
- Fill every section with content derived from the description; write "[To be filled]" where information is missing.
- Suggest 3 to 5 labels (bug, enhancement, documentation, good-first-issue, priority:high, ...).
- Suggest assignees only when the description implies an owner; otherwise use an empty array.

Return a JSON object with the properties title (string), body (string), labels (array of strings), assignees (array of strings) and reasoning (string)."#,
        issue_type = request.issue_type,
        description = request.description,
        skeleton = request.issue_type.skeleton(),
    )
}

pub fn type_suggestion_prompt(title: &str, partial_body: &str) -> String {
    format!(
        r#"Classify this partially written GitHub issue.

Title: {title}
Body so far:
{partial_body}

Return a JSON object with suggestedType (one of bug, feature, documentation, performance, security, question), confidence (number from 0 to 100) and reasoning (one sentence)."#
    )
}

pub fn chat_prompt(repository: &Repository, question: &str) -> String {
    format!(
        r#"You are helping manage the repository "{full_name}". It currently has:
- {open_issues} open issues
- {open_prs} open pull requests
- {deployments} active deployment(s)

Question: {question}

Answer about repository management, issue triage, deployments or workflows. If the question asks for an action, describe what you would do and ask for confirmation."#,
        full_name = repository.full_name,
        open_issues = repository.open_issues,
        open_prs = repository.open_prs,
        deployments = repository.active_deployments,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::template::IssueType;

    #[test]
    fn test_triage_prompt_marks_missing_body() {
        let prompt = triage_prompt(&IssueContext {
            title: "Crash on start",
            body: "",
            repo_name: "octo/widgets",
        });
        assert!(prompt.contains("No description provided"));
        assert!(prompt.contains("octo/widgets"));
    }

    #[test]
    fn test_template_prompt_omits_absent_context() {
        let prompt = template_prompt(&TemplateRequest {
            issue_type: IssueType::Feature,
            description: "Dark mode",
            context: None,
            repo_name: None,
        });
        assert!(!prompt.contains("Additional context"));
        assert!(!prompt.contains("Repository:"));
        assert!(prompt.contains("## Feature Description"));
    }
}
