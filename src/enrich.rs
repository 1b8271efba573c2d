//! Turns raw issues into annotated pull requests.
//!
//! Each pull request moves through repository resolution, CI labelling,
//! review labelling and author lookup in that order. Every step talks to the
//! forge and any failure aborts the caller.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    github::Forge,
    types::{
        AnnotatedPullRequest, CiState, Issue, Label, Review, ReviewState, ReviewStatus,
        StatusEntry, TrackedIssue,
    },
};

/// Pairs an issue with its repository, fetching it when the payload did
/// not embed one.
pub async fn resolve_repository<F>(forge: &F, issue: Issue) -> Result<TrackedIssue>
where
    F: Forge + Sync,
{
    let repository = match &issue.repository {
        Some(repository) => repository.clone(),
        None => forge
            .repository(&issue.repository_url)
            .await
            .with_context(|| format!("Failed to fetch repository {}", issue.repository_url))?,
    };
    Ok(TrackedIssue { issue, repository })
}

/// Keeps the pull requests from `issues` and resolves their repositories,
/// preserving fetch order.
pub async fn track_pull_requests<F>(forge: &F, issues: Vec<Issue>) -> Result<Vec<TrackedIssue>>
where
    F: Forge + Sync,
{
    let mut tracked = Vec::new();
    for issue in issues.into_iter().filter(Issue::is_pull_request) {
        tracked.push(resolve_repository(forge, issue).await?);
    }
    Ok(tracked)
}

/// True when `later` is known to be older than `earlier`. Entries missing a
/// timestamp never compare.
fn strictly_older(earlier: Option<DateTime<Utc>>, later: Option<DateTime<Utc>>) -> bool {
    matches!((earlier, later), (Some(e), Some(l)) if l < e)
}

/// Picks the most recently updated status.
///
/// The statuses endpoint lists newest first. A later entry only replaces
/// the current pick when both carry timestamps and it is strictly newer, so
/// missing or equal timestamps keep the entry listed earlier.
pub fn latest_status(statuses: &[StatusEntry]) -> Option<&StatusEntry> {
    if statuses
        .windows(2)
        .any(|pair| strictly_older(pair[1].updated_at, pair[0].updated_at))
    {
        warn!("Status list is not newest-first; selecting by timestamp");
    }
    statuses.iter().reduce(|best, status| {
        if strictly_older(status.updated_at, best.updated_at) {
            status
        } else {
            best
        }
    })
}

/// Picks the most recently submitted review.
///
/// The reviews endpoint lists oldest first. A later review replaces the
/// current pick unless both carry timestamps and it is strictly older, so
/// missing or equal timestamps let the review listed later win.
pub fn latest_review<'a>(reviews: &[&'a Review]) -> Option<&'a Review> {
    if reviews
        .windows(2)
        .any(|pair| strictly_older(pair[0].submitted_at, pair[1].submitted_at))
    {
        warn!("Review list is not oldest-first; selecting by timestamp");
    }
    reviews.iter().copied().reduce(|best, review| {
        if strictly_older(best.submitted_at, review.submitted_at) {
            best
        } else {
            review
        }
    })
}

/// Derives the review verdict from reviews left by anyone but `acting_user`.
pub fn assess_reviews(reviews: &[Review], acting_user: &str) -> ReviewStatus {
    let others: Vec<&Review> = reviews
        .iter()
        .filter(|review| !review.is_authored_by(acting_user))
        .collect();

    match latest_review(&others) {
        Some(review) if review.state == ReviewState::Approved => ReviewStatus::PeerReviewed,
        Some(_) => ReviewStatus::UndergoingReview,
        None => ReviewStatus::AwaitingReview,
    }
}

/// Labels added for a pull request's CI and review verdicts, in display
/// order.
pub fn derived_labels(ci_state: Option<CiState>, review_status: ReviewStatus) -> Vec<Label> {
    ci_state
        .map(|state| state.label())
        .into_iter()
        .chain(std::iter::once(review_status.label()))
        .collect()
}

/// Fetches the latest CI state of the pull request at `pull_request_url`.
pub async fn resolve_ci_state<F>(forge: &F, pull_request_url: &str) -> Result<Option<CiState>>
where
    F: Forge + Sync,
{
    let detail = forge
        .pull_request(pull_request_url)
        .await
        .with_context(|| format!("Failed to fetch pull request {}", pull_request_url))?;
    let statuses = forge
        .statuses(&detail.statuses_url)
        .await
        .with_context(|| format!("Failed to fetch statuses {}", detail.statuses_url))?;

    Ok(latest_status(&statuses).map(|status| status.state))
}

pub async fn resolve_review_status<F>(
    forge: &F,
    pull_request_url: &str,
    acting_user: &str,
) -> Result<ReviewStatus>
where
    F: Forge + Sync,
{
    let reviews = forge
        .reviews(pull_request_url)
        .await
        .with_context(|| format!("Failed to fetch reviews for {}", pull_request_url))?;
    Ok(assess_reviews(&reviews, acting_user))
}

/// Runs the CI, review and author lookups for one tracked pull request.
pub async fn annotate<F>(
    forge: &F,
    tracked: TrackedIssue,
    acting_user: &str,
) -> Result<AnnotatedPullRequest>
where
    F: Forge + Sync,
{
    let TrackedIssue { issue, repository } = tracked;
    let link = issue
        .pull_request
        .with_context(|| format!("Issue #{} is not a pull request", issue.number))?;

    let ci_state = resolve_ci_state(forge, &link.url).await?;
    let review_status = resolve_review_status(forge, &link.url, acting_user).await?;

    let author = if issue.user.login != acting_user {
        let user = forge
            .user(&issue.user.url)
            .await
            .with_context(|| format!("Failed to fetch user {}", issue.user.url))?;
        Some(user)
    } else {
        None
    };

    debug!(
        "{}#{}: ci={:?} review={:?}",
        repository.name, issue.number, ci_state, review_status
    );

    let mut labels = issue.labels;
    labels.extend(derived_labels(ci_state, review_status));

    Ok(AnnotatedPullRequest {
        number: issue.number,
        title: issue.title,
        repo_name: repository.name,
        html_url: link.html_url,
        author,
        labels,
        ci_state,
        review_status,
    })
}
