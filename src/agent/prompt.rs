use crate::tracker::IssueDetails;

const CLOSING_INSTRUCTION: &str =
    "Please implement this feature following best practices and include appropriate tests.";

/// Build the agent prompt for an issue. Paragraphs are separated by a blank
/// line; the description paragraph is omitted when the issue has none.
pub fn build_prompt(issue: &IssueDetails) -> String {
    let mut parts = vec![format!("Implement feature: {}", issue.title)];
    if !issue.description.trim().is_empty() {
        parts.push(format!("Description: {}", issue.description));
    }
    parts.push(CLOSING_INSTRUCTION.to_string());
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(title: &str, description: &str) -> IssueDetails {
        IssueDetails {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_with_description() {
        let prompt = build_prompt(&issue("Add dark mode", "Toggle in settings"));
        assert_eq!(
            prompt,
            "Implement feature: Add dark mode\n\n\
             Description: Toggle in settings\n\n\
             Please implement this feature following best practices and include appropriate tests."
        );
    }

    #[test]
    fn test_prompt_without_description() {
        let prompt = build_prompt(&issue("Add dark mode", ""));
        assert!(!prompt.contains("Description:"));
        assert_eq!(prompt.matches("\n\n").count(), 1);
    }
}
