use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    cli::Config,
    github::Forge,
    types::{Issue, IssueFilter},
};

/// Accumulates GitHub search qualifiers into a query string.
#[derive(Debug, Default)]
pub struct SearchQueryBuilder {
    terms: Vec<String>,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn involves(&mut self, login: &str) -> &mut Self {
        self.terms.push(format!("involves:{}", login));
        self
    }

    pub fn pr_type(&mut self) -> &mut Self {
        self.terms.push("type:pr".to_string());
        self
    }

    pub fn open(&mut self) -> &mut Self {
        self.terms.push("is:open".to_string());
        self
    }

    /// Restricts results to repositories owned by `owner` (user or org).
    pub fn owner(&mut self, owner: &str) -> &mut Self {
        self.terms.push(format!("user:{}", owner));
        self
    }

    pub fn build(&self) -> String {
        self.terms.join(" ")
    }
}

/// Query for open pull requests in `org` that `user` is involved in.
pub fn involves_query(user: &str, org: &str) -> String {
    SearchQueryBuilder::new()
        .involves(user)
        .pr_type()
        .open()
        .owner(org)
        .build()
}

/// Runs one of the two issue listings for the configured user and org.
///
/// The `involves` search also matches pull requests the user opened, which
/// the `created` listing already covers, so those are dropped here.
pub async fn fetch_issues<F>(forge: &F, filter: IssueFilter, config: &Config) -> Result<Vec<Issue>>
where
    F: Forge + Sync,
{
    let issues = match filter {
        IssueFilter::Created => forge
            .org_issues(&config.org, config.limit)
            .await
            .with_context(|| format!("Failed to list issues for organization '{}'", config.org))?,
        IssueFilter::Involves => {
            let query = involves_query(config.user(), &config.org);
            forge
                .search_issues(&query, config.limit)
                .await
                .with_context(|| format!("Failed to search issues with '{}'", query))?
                .into_iter()
                .filter(|issue| !issue.is_authored_by(config.user()))
                .collect()
        }
    };

    debug!("Fetched {} '{}' issues", issues.len(), filter.as_str());
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves_query() {
        assert_eq!(
            involves_query("alice", "acme"),
            "involves:alice type:pr is:open user:acme"
        );
    }

    #[test]
    fn test_builder_keeps_term_order() {
        let query = SearchQueryBuilder::new().open().pr_type().build();
        assert_eq!(query, "is:open type:pr");
    }

    #[test]
    fn test_empty_builder() {
        assert_eq!(SearchQueryBuilder::new().build(), "");
    }
}
