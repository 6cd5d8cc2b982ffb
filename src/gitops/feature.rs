use std::path::{Path, PathBuf};

/// Name of the context file dropped into every fresh worktree.
pub const FEATURE_FILE_NAME: &str = "_feature.md";

/// Render the issue title and description as a small markdown document.
pub fn render_feature_markdown(title: &str, description: &str) -> String {
    format!("# {}\n\n{}\n", title, description)
}

/// Write `_feature.md` into `worktree` so whoever picks up the worktree sees
/// the issue context immediately. Overwrites an existing file.
pub async fn write_feature_file(
    worktree: &Path,
    title: &str,
    description: &str,
) -> std::io::Result<PathBuf> {
    let path = worktree.join(FEATURE_FILE_NAME);
    tokio::fs::write(&path, render_feature_markdown(title, description)).await?;
    Ok(path)
}
