use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const GREEN: &str = "0e8a16";
pub const ORANGE: &str = "fbca04";
pub const RED: &str = "b60205";

/// Which of the two issue listings to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueFilter {
    /// Open issues in the organization created by the acting user.
    Created,
    /// Open pull requests anywhere in the organization the acting user
    /// is involved in, excluding the ones they authored.
    Involves,
}

impl IssueFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueFilter::Created => "created",
            IssueFilter::Involves => "involves",
        }
    }
}

/// A reference to an account as embedded in issue and review payloads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserRef {
    pub login: String,
    pub url: String,
}

/// A full user profile, fetched from [`UserRef::url`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    /// `Name (@login)` when the profile carries a display name, else `@login`.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => format!("{name} (@{})", self.login),
            None => format!("@{}", self.login),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repository {
    pub name: String,
}

/// Marker sub-object present only on issues that are pull requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestLink {
    pub url: String,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
}

impl Label {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Parses the 6-digit hex colour into RGB components.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub repository_url: String,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub pull_request: Option<PullRequestLink>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub user: UserRef,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn is_authored_by(&self, login: &str) -> bool {
        self.user.login == login
    }
}

/// Envelope returned by the issue search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub total_count: u64,
    pub items: Vec<Issue>,
}

/// The subset of a pull request's detail needed to reach its statuses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestDetail {
    pub statuses_url: String,
}

/// Commit status states reported by CI systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiState {
    Success,
    Pending,
    Failure,
    Error,
}

impl CiState {
    pub fn label(&self) -> Label {
        match self {
            CiState::Success => Label::new("CI PASSING", GREEN),
            CiState::Pending => Label::new("CI PENDING", ORANGE),
            CiState::Failure => Label::new("CI FAILED", RED),
            CiState::Error => Label::new("CI ERROR", RED),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusEntry {
    pub state: CiState,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    /// Null when the reviewer's account has been deleted.
    #[serde(default)]
    pub user: Option<UserRef>,
    pub state: ReviewState,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn is_authored_by(&self, login: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.login == login)
    }
}

/// Review verdict derived from the non-self reviews of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    PeerReviewed,
    UndergoingReview,
    AwaitingReview,
}

impl ReviewStatus {
    pub fn label(&self) -> Label {
        match self {
            ReviewStatus::PeerReviewed => Label::new("PEER REVIEWED", GREEN),
            ReviewStatus::UndergoingReview => Label::new("UNDERGOING REVIEW", ORANGE),
            ReviewStatus::AwaitingReview => Label::new("AWAITING REVIEW", RED),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewStatus::PeerReviewed)
    }
}

/// An issue whose repository has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedIssue {
    pub issue: Issue,
    pub repository: Repository,
}

impl TrackedIssue {
    pub fn repo_name(&self) -> &str {
        &self.repository.name
    }
}

/// A pull request carrying everything the presenter needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedPullRequest {
    pub number: u64,
    pub title: String,
    pub repo_name: String,
    pub html_url: String,
    /// Populated only when the pull request was authored by someone else.
    pub author: Option<User>,
    pub labels: Vec<Label>,
    pub ci_state: Option<CiState>,
    pub review_status: ReviewStatus,
}

impl AnnotatedPullRequest {
    pub fn is_ready_to_merge(&self) -> bool {
        self.ci_state == Some(CiState::Success) && self.review_status.is_approved()
    }
}
