//! Prradar: a terminal radar for your open pull requests.
//!
//! Lists the open pull requests a user authored or is involved in across a
//! GitHub organization, tags each with its latest CI verdict and review
//! state, and highlights the ones that are ready to merge.

pub mod cli;
pub mod display;
pub mod enrich;
pub mod github;
pub mod report;
pub mod search;
pub mod types;

pub use cli::{ColorChoice, Config, Credentials, parse_args};
pub use display::{Channel, Rendering};
pub use github::{Forge, GitHub, setup_github_client};
pub use report::{Reporter, Summary, run_report};
pub use types::{
    AnnotatedPullRequest, CiState, Issue, IssueFilter, Label, PullRequestDetail, PullRequestLink,
    Repository, Review, ReviewState, ReviewStatus, StatusEntry, TrackedIssue, User, UserRef,
};
