//! Candidate files for a run, as reported by git or given explicitly

use crate::cli::CliError;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Where the candidate files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changeset {
    /// Files staged for commit (added, copied, modified or renamed)
    Staged,
    /// Every file tracked by git
    AllFiles,
    /// Paths given on the command line
    Explicit(Vec<String>),
}

impl Changeset {
    /// Pick the source from the `run` flags.
    #[must_use]
    pub fn from_flags(all_files: bool, files: Vec<String>) -> Self {
        if !files.is_empty() {
            Self::Explicit(files)
        } else if all_files {
            Self::AllFiles
        } else {
            Self::Staged
        }
    }

    /// Collect candidate paths relative to `root`.
    pub async fn collect(&self, root: &Path) -> Result<Vec<String>, CliError> {
        let files = match self {
            Self::Explicit(files) => return Ok(files.clone()),
            Self::Staged => {
                git(
                    root,
                    &[
                        "diff",
                        "--cached",
                        "--name-only",
                        "--relative",
                        "--diff-filter=ACMR",
                        "-z",
                    ],
                )
                .await?
            }
            Self::AllFiles => git(root, &["ls-files", "-z"]).await?,
        };
        debug!(changeset = ?self, count = files.len(), "Collected changeset");
        Ok(files)
    }
}

async fn git(root: &Path, args: &[&str]) -> Result<Vec<String>, CliError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .await
        .map_err(|e| {
            CliError::config_with_help(
                format!("failed to run git: {e}"),
                "Install git, or pass the files to check with --files",
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CliError::config_with_help(
            format!("git {} failed: {}", args.join(" "), stderr.trim()),
            "Run inside a git repository, or pass the files to check with --files",
        ));
    }
    Ok(split_nul(&output.stdout))
}

/// Split NUL-separated `git -z` output.
fn split_nul(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_nul() {
        assert_eq!(
            split_nul(b"a.py\0dir/with space.md\0"),
            ["a.py", "dir/with space.md"]
        );
        assert!(split_nul(b"").is_empty());
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(Changeset::from_flags(false, vec![]), Changeset::Staged);
        assert_eq!(Changeset::from_flags(true, vec![]), Changeset::AllFiles);
        assert_eq!(
            Changeset::from_flags(false, vec!["a".to_string()]),
            Changeset::Explicit(vec!["a".to_string()])
        );
    }

    #[tokio::test]
    async fn test_explicit_files_skip_git() {
        let tmp = TempDir::new().unwrap();
        let files = Changeset::Explicit(vec!["x.rs".to_string()])
            .collect(tmp.path())
            .await
            .unwrap();
        assert_eq!(files, ["x.rs"]);
    }

    #[tokio::test]
    async fn test_outside_repository_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        // Only meaningful when git is installed and the temp dir is not inside a repo
        if let Err(err) = Changeset::Staged.collect(tmp.path()).await {
            assert!(matches!(err, CliError::Config { .. }));
        }
    }
}
