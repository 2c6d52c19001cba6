use serde::{Deserialize, Serialize};

use crate::agent::template::IssueType;
use crate::batch::BatchInput;

/// One row of the template work list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInput {
    pub issue_type: IssueType,
    pub description: String,
}

impl TemplateInput {
    pub fn new(issue_type: IssueType, description: impl Into<String>) -> Self {
        Self {
            issue_type,
            description: description.into(),
        }
    }
}

impl BatchInput for TemplateInput {
    fn is_blank(&self) -> bool {
        self.description.trim().is_empty()
    }
}

/// Parse quick-entry text: one issue per non-empty line, with an optional
/// leading `[type]` tag. Untagged lines and unknown tags are bugs.
pub fn parse_quick_input(text: &str) -> Vec<TemplateInput> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> TemplateInput {
    split_tag(line)
        .and_then(|(tag, rest)| {
            tag.parse::<IssueType>()
                .ok()
                .map(|issue_type| TemplateInput::new(issue_type, rest))
        })
        .unwrap_or_else(|| TemplateInput::new(IssueType::Bug, line))
}

/// `[word] rest` -> `(word, rest)`; the tag must be word characters and
/// the rest non-empty.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('[')?;
    let (tag, rest) = inner.split_once(']')?;
    let rest = rest.trim();

    let is_word = !tag.is_empty() && tag.chars().all(|c| c.is_alphanumeric() || c == '_');
    (is_word && !rest.is_empty()).then_some((tag, rest))
}

/// True when at least one row has a non-blank description.
pub fn has_any_description(inputs: &[TemplateInput]) -> bool {
    inputs.iter().any(|input| !input.is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_select_types_and_untagged_defaults_to_bug() {
        let inputs = parse_quick_input("[bug] Login fails\nAdd dark mode\n[security] token leak");

        assert_eq!(
            inputs,
            vec![
                TemplateInput::new(IssueType::Bug, "Login fails"),
                TemplateInput::new(IssueType::Bug, "Add dark mode"),
                TemplateInput::new(IssueType::Security, "token leak"),
            ]
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let inputs = parse_quick_input("\n  \n[feature] Export CSV\n\n");
        assert_eq!(inputs, vec![TemplateInput::new(IssueType::Feature, "Export CSV")]);
    }

    #[test]
    fn test_unknown_tag_keeps_whole_line() {
        let inputs = parse_quick_input("[chore] bump deps");
        assert_eq!(
            inputs,
            vec![TemplateInput::new(IssueType::Bug, "[chore] bump deps")]
        );
    }

    #[test]
    fn test_tag_is_case_insensitive() {
        let inputs = parse_quick_input("[Performance] search is slow");
        assert_eq!(inputs[0].issue_type, IssueType::Performance);
        assert_eq!(inputs[0].description, "search is slow");
    }

    #[test]
    fn test_tag_without_text_is_a_plain_description() {
        let inputs = parse_quick_input("[question]");
        assert_eq!(
            inputs,
            vec![TemplateInput::new(IssueType::Bug, "[question]")]
        );
    }

    #[test]
    fn test_has_any_description() {
        assert!(!has_any_description(&[TemplateInput::new(IssueType::Bug, "  ")]));
        assert!(has_any_description(&[
            TemplateInput::new(IssueType::Bug, ""),
            TemplateInput::new(IssueType::Bug, "x"),
        ]));
    }
}
