use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::{
    cli::Config,
    types::{Issue, PullRequestDetail, Repository, Review, SearchResults, StatusEntry, User},
};

/// Read access to the hosting platform.
///
/// Every method maps onto exactly one REST request. URL-taking methods
/// accept the absolute URLs the API embeds in its own payloads.
#[async_trait]
pub trait Forge {
    /// `GET /orgs/{org}/issues?filter=created&state=open&sort=updated`
    async fn org_issues(&self, org: &str, per_page: u8) -> Result<Vec<Issue>>;

    /// `GET /search/issues?q={query}&sort=updated`
    async fn search_issues(&self, query: &str, per_page: u8) -> Result<Vec<Issue>>;

    async fn repository(&self, repository_url: &str) -> Result<Repository>;

    async fn pull_request(&self, pull_request_url: &str) -> Result<PullRequestDetail>;

    async fn statuses(&self, statuses_url: &str) -> Result<Vec<StatusEntry>>;

    /// Fetches `{pull_request_url}/reviews`.
    async fn reviews(&self, pull_request_url: &str) -> Result<Vec<Review>>;

    async fn user(&self, user_url: &str) -> Result<User>;
}

/// Creates a client that authenticates every request with the configured
/// login and password (or token) over basic auth.
pub fn setup_github_client(config: &Config) -> Result<Octocrab> {
    let base_uri = config.api_url.as_str().trim_end_matches('/').to_string();
    Octocrab::builder()
        .basic_auth(
            config.credentials.user.clone(),
            config.credentials.password.clone(),
        )
        .base_uri(base_uri)
        .context("Invalid GitHub API base URL")?
        .build()
        .context("Failed to create GitHub client")
}

/// Appends `/reviews` to a pull request API URL.
pub fn reviews_url(pull_request_url: &str) -> Result<String> {
    let mut url = Url::parse(pull_request_url)
        .with_context(|| format!("Failed to parse pull request URL: '{}'", pull_request_url))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Cannot append to URL: '{}'", pull_request_url))?
        .pop_if_empty()
        .push("reviews");
    Ok(url.into())
}

/// Turns an absolute URL taken from an API payload into a route relative to
/// `api_url`, so the client attaches credentials to it.
///
/// URLs on another origin, or outside the API base path, are rejected rather
/// than fetched anonymously.
pub fn api_route(api_url: &Url, target: &str) -> Result<String> {
    let url = Url::parse(target).with_context(|| format!("Failed to parse API URL: '{}'", target))?;
    if url.origin() != api_url.origin() {
        anyhow::bail!("URL '{}' is not served by the GitHub API at {}", target, api_url);
    }

    let base_path = api_url.path().trim_end_matches('/');
    let path = url
        .path()
        .strip_prefix(base_path)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .with_context(|| format!("URL '{}' is outside the GitHub API base {}", target, api_url))?;

    let mut route = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };
    if let Some(query) = url.query() {
        route.push('?');
        route.push_str(query);
    }
    Ok(route)
}

#[derive(Serialize)]
struct OrgIssuesParams {
    filter: &'static str,
    state: &'static str,
    sort: &'static str,
    per_page: u8,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    sort: &'static str,
    per_page: u8,
}

/// [`Forge`] backed by the GitHub REST API.
pub struct GitHub {
    client: Octocrab,
    api_url: Url,
}

impl GitHub {
    /// `api_url` must be the base the client was built with.
    pub fn new(client: Octocrab, api_url: Url) -> Self {
        Self { client, api_url }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(setup_github_client(config)?, config.api_url.clone()))
    }

    /// Fetches an absolute URL found in an earlier response.
    async fn follow<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let route = api_route(&self.api_url, url)?;
        self.get_json(&route, None::<&()>).await
    }

    async fn get_json<T, P>(&self, route: &str, params: Option<&P>) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized + Sync,
    {
        debug!("GET {}", route);
        self.client
            .get(route, params)
            .await
            .with_context(|| format!("GitHub request failed: GET {}", route))
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn org_issues(&self, org: &str, per_page: u8) -> Result<Vec<Issue>> {
        let params = OrgIssuesParams {
            filter: "created",
            state: "open",
            sort: "updated",
            per_page,
        };
        self.get_json(&format!("/orgs/{org}/issues"), Some(&params))
            .await
    }

    async fn search_issues(&self, query: &str, per_page: u8) -> Result<Vec<Issue>> {
        let params = SearchParams {
            q: query,
            sort: "updated",
            per_page,
        };
        let results: SearchResults = self.get_json("/search/issues", Some(&params)).await?;
        debug!(
            "Search '{}' matched {} issues ({} returned)",
            query,
            results.total_count,
            results.items.len()
        );
        Ok(results.items)
    }

    async fn repository(&self, repository_url: &str) -> Result<Repository> {
        self.follow(repository_url).await
    }

    async fn pull_request(&self, pull_request_url: &str) -> Result<PullRequestDetail> {
        self.follow(pull_request_url).await
    }

    async fn statuses(&self, statuses_url: &str) -> Result<Vec<StatusEntry>> {
        self.follow(statuses_url).await
    }

    async fn reviews(&self, pull_request_url: &str) -> Result<Vec<Review>> {
        let url = reviews_url(pull_request_url)?;
        self.follow(&url).await
    }

    async fn user(&self, user_url: &str) -> Result<User> {
        self.follow(user_url).await
    }
}
