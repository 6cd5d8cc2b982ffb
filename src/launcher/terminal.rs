//! macOS Terminal launcher.
//!
//! Opens a Terminal tab via `osascript`, `cd`s into the worktree, starts the
//! configured command and titles the tab `<ISSUE-ID>: <title>`.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::Launcher;
use crate::agent::run_to_completion;
use crate::errors::AgentError;
use crate::tracker::IssueDetails;

#[derive(Debug, Clone)]
pub struct TerminalLauncher {
    command: String,
}

impl TerminalLauncher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Launcher for TerminalLauncher {
    fn name(&self) -> &'static str {
        "terminal"
    }

    async fn launch(
        &self,
        issue_id: &str,
        issue: &IssueDetails,
        worktree: &Path,
    ) -> Result<(), AgentError> {
        let script = generate_apple_script(worktree, issue_id, &issue.title, &self.command);
        let mut cmd = Command::new("osascript");
        cmd.arg("-e").arg(script);
        run_to_completion(cmd, "osascript").await
    }
}

/// AppleScript that opens the tab, runs `command` in `worktree` and sets the
/// tab title.
pub fn generate_apple_script(worktree: &Path, issue_id: &str, title: &str, command: &str) -> String {
    let path = escape_apple_script(&escape_single_quoted(&worktree.display().to_string()));
    let command = escape_apple_script(command);
    let tab_title = escape_apple_script(&format!("{}: {}", issue_id, title));
    format!(
        "tell application \"Terminal\"\n    \
         do script \"cd '{}' && {}\"\n    \
         set custom title of tab 1 of front window to \"{}\"\n\
         end tell",
        path, command, tab_title
    )
}

/// Escape a string for use inside a single-quoted shell word.
pub fn escape_single_quoted(s: &str) -> String {
    s.replace('\'', "'\\''")
}

/// Escape a string for an AppleScript string literal. Backslashes go first
/// so the quote escapes are not doubled.
pub fn escape_apple_script(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_apple_script() {
        let script = generate_apple_script(
            Path::new("/Users/dev/worktrees/DEL-163"),
            "DEL-163",
            "Fix login",
            "codex",
        );
        assert_eq!(
            script,
            "tell application \"Terminal\"\n    \
             do script \"cd '/Users/dev/worktrees/DEL-163' && codex\"\n    \
             set custom title of tab 1 of front window to \"DEL-163: Fix login\"\n\
             end tell"
        );
    }

    #[test]
    fn test_single_quote_in_path_stays_inside_the_shell_word() {
        let script = generate_apple_script(
            Path::new("/Users/o'neil/worktrees/DEL-9"),
            "DEL-9",
            "Fix",
            "codex",
        );
        // AppleScript turns `\\` back into `\`, so the shell sees 'o'\''neil'.
        assert!(
            script.contains(r"cd '/Users/o'\\''neil/worktrees/DEL-9' && codex"),
            "got: {script}"
        );
        assert_eq!(escape_single_quoted("a'b"), r"a'\''b");
    }

    #[test]
    fn test_title_with_quotes_is_escaped() {
        let script = generate_apple_script(
            Path::new("/w/ENG-1"),
            "ENG-1",
            r#"Support "quoted" names"#,
            "codex",
        );
        assert!(script.contains(r#"to "ENG-1: Support \"quoted\" names""#));
    }

    #[test]
    fn test_escape_backslash_before_quote() {
        assert_eq!(escape_apple_script(r#"a\b"#), r#"a\\b"#);
        assert_eq!(escape_apple_script(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_apple_script(r#"\""#), r#"\\\""#);
        assert_eq!(escape_apple_script("plain"), "plain");
    }
}
