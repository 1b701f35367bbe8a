use chrono::{DateTime, Utc};
use std::fmt;

/// Placeholder used when a ticket or pull request carries no description.
pub const NO_DESCRIPTION: &str = "No description provided";

/// A Jira ticket, mapped from the first issue of a search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    /// Issue key (e.g., "PROJ-1")
    pub key: String,
    pub summary: String,
    /// Never empty: an empty upstream description becomes [`NO_DESCRIPTION`].
    pub description: String,
    /// Workflow status name (e.g., "In Progress")
    pub status: String,
}

/// Pull request metadata fetched from the GitHub API.
/// Owns its file list; both are dropped together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    /// PR number (e.g., 42)
    pub number: u64,
    pub title: String,
    pub state: PrState,
    /// Empty when the author left no description
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Author's GitHub login
    pub author: String,
    /// Changed files in upstream order
    pub files: Vec<FileChange>,
}

/// A single file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    /// Absent for binary files and diffs GitHub declines to inline
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrState {
    Open,
    Closed,
    Other(String),
}

impl From<String> for PrState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "open" => PrState::Open,
            "closed" => PrState::Closed,
            _ => PrState::Other(raw),
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    Other(String),
}

impl From<String> for FileStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "added" => FileStatus::Added,
            "modified" => FileStatus::Modified,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            "copied" => FileStatus::Copied,
            "changed" => FileStatus::Changed,
            "unchanged" => FileStatus::Unchanged,
            _ => FileStatus::Other(raw),
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Removed => "removed",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::Changed => "changed",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Other(raw) => raw.as_str(),
        };
        write!(f, "{}", label)
    }
}

/// Identifies one pull request: `repo` is either a bare repository name,
/// resolved against the configured owner, or `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestQuery {
    pub repo: String,
    pub number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_state_from_wire() {
        assert_eq!(PrState::from("open".to_string()), PrState::Open);
        assert_eq!(PrState::from("closed".to_string()), PrState::Closed);
        let odd = PrState::from("draft".to_string());
        assert_eq!(odd, PrState::Other("draft".to_string()));
        assert_eq!(odd.to_string(), "draft");
    }

    #[test]
    fn test_file_status_display_matches_wire() {
        for raw in ["added", "modified", "removed", "renamed", "copied", "changed", "unchanged"] {
            assert_eq!(FileStatus::from(raw.to_string()).to_string(), raw);
        }
        assert_eq!(
            FileStatus::from("mystery".to_string()),
            FileStatus::Other("mystery".to_string())
        );
    }
}
