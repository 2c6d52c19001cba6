//! Local follow-up actions on generated templates. None of these touch work-item state.

use crate::agent::template::IssueTemplate;
use crate::error::Result;
use crate::platform::types::RepoRef;

/// Plain text for the clipboard: title, body and labels.
pub fn clipboard_text(template: &IssueTemplate) -> String {
    let mut text = format!("{}\n\n{}", template.title, template.body);
    if !template.labels.is_empty() {
        text.push_str(&format!("\n\nLabels: {}", template.labels.join(", ")));
    }
    text
}

/// Every template as one Markdown document, numbered in order.
pub fn markdown_export<'a>(templates: impl IntoIterator<Item = &'a IssueTemplate>) -> String {
    templates
        .into_iter()
        .enumerate()
        .map(|(index, template)| {
            let assignees = if template.assignees.is_empty() {
                String::new()
            } else {
                let mentions: Vec<String> =
                    template.assignees.iter().map(|a| format!("@{a}")).collect();
                format!("**Assignees**: {}", mentions.join(", "))
            };

            format!(
                "## Issue {number}: {title}\n\n{body}\n\n**Labels**: {labels}\n{assignees}\n\n---\n",
                number = index + 1,
                title = template.title,
                body = template.body,
                labels = template.labels.join(", "),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prefilled "new issue" URL on github.com for the given repository.
pub fn new_issue_url(repo: &str, template: &IssueTemplate) -> Result<String> {
    let repo: RepoRef = repo.parse()?;

    Ok(format!(
        "https://github.com/{owner}/{name}/issues/new?title={title}&body={body}&labels={labels}",
        owner = repo.owner,
        name = repo.name,
        title = urlencoding::encode(&template.title),
        body = urlencoding::encode(&template.body),
        labels = urlencoding::encode(&template.labels.join(",")),
    ))
}
