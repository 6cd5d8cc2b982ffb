//! Deterministic mapping from issue identifiers to branch and directory names.

/// Name used when sanitization leaves nothing behind.
pub const FALLBACK_BRANCH_NAME: &str = "issue";

/// Convert an arbitrary issue identifier into a valid git branch name.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `-`, leading and trailing
/// `-` are trimmed, and an empty result falls back to [`FALLBACK_BRANCH_NAME`].
/// Total and idempotent.
pub fn sanitize_branch_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_BRANCH_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
