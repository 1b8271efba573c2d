use std::io::Write;

use anyhow::Result;
use tracing::debug;

use crate::{
    cli::Config,
    display::{
        Rendering, clear_screen, group_by_repository, write_banner, write_pull_request,
        write_repository_header,
    },
    enrich::{annotate, track_pull_requests},
    github::Forge,
    search::fetch_issues,
    types::{Issue, IssueFilter},
};

pub const MY_PULL_REQUESTS: &str = ">>> MY PULL REQUESTS:";
pub const INVOLVED_PULL_REQUESTS: &str = ">>> PULL REQUESTS I AM INVOLVED:";
pub const NO_PULL_REQUESTS: &str = "No PRs at this time!";

/// Whether the report should go on after a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Counts of pull requests written by a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub ready: usize,
    pub pending: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.ready + self.pending
    }
}

/// Writes pull request listings to a pair of streams.
///
/// `out` receives banners and pull requests that still need work; `err`
/// receives repository headers and pull requests that are ready to merge.
pub struct Reporter<'a, F, O, E> {
    forge: &'a F,
    config: &'a Config,
    rendering: Rendering,
    out: O,
    err: E,
    summary: Summary,
}

impl<'a, F, O, E> Reporter<'a, F, O, E>
where
    F: Forge + Sync,
    O: Write,
    E: Write,
{
    pub fn new(forge: &'a F, config: &'a Config, rendering: Rendering, out: O, err: E) -> Self {
        Self {
            forge,
            config,
            rendering,
            out,
            err,
            summary: Summary::default(),
        }
    }

    /// Presents the pull requests among `issues`, grouped by repository.
    ///
    /// Each pull request is fully annotated and written before the next one
    /// is fetched.
    pub async fn present_issues(&mut self, issues: Vec<Issue>) -> Result<Flow> {
        let tracked = track_pull_requests(self.forge, issues).await?;

        if tracked.is_empty() {
            writeln!(self.out, "{NO_PULL_REQUESTS}")?;
            if self.config.exit_when_empty {
                debug!("No pull requests; stopping early");
                return Ok(Flow::Stop);
            }
            return Ok(Flow::Continue);
        }

        for (repo_name, members) in group_by_repository(tracked, |t| t.repo_name()) {
            write_repository_header(&repo_name, &self.rendering, &mut self.err)?;

            for tracked in members {
                let pr = annotate(self.forge, tracked, self.config.user()).await?;
                if pr.is_ready_to_merge() {
                    self.summary.ready += 1;
                } else {
                    self.summary.pending += 1;
                }
                write_pull_request(&pr, &self.rendering, &mut self.out, &mut self.err)?;
            }
        }

        Ok(Flow::Continue)
    }

    async fn run_section(&mut self, filter: IssueFilter, banner: &str) -> Result<Flow> {
        write_banner(banner, &self.rendering, &mut self.out)?;
        let issues = fetch_issues(self.forge, filter, self.config).await?;
        self.present_issues(issues).await
    }

    /// Prints the authored section followed by the involved section.
    pub async fn run(&mut self) -> Result<Summary> {
        clear_screen(&self.rendering, &mut self.err)?;

        let sections = [
            (IssueFilter::Created, MY_PULL_REQUESTS),
            (IssueFilter::Involves, INVOLVED_PULL_REQUESTS),
        ];

        for (filter, banner) in sections {
            if self.run_section(filter, banner).await? == Flow::Stop {
                self.flush()?;
                return Ok(self.summary);
            }
        }

        writeln!(self.out)?;
        self.flush()?;
        Ok(self.summary)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        self.err.flush()?;
        Ok(())
    }
}

/// Runs the full report against `forge`, writing to `out` and `err`.
pub async fn run_report<F, O, E>(
    forge: &F,
    config: &Config,
    rendering: Rendering,
    out: O,
    err: E,
) -> Result<Summary>
where
    F: Forge + Sync,
    O: Write,
    E: Write,
{
    Reporter::new(forge, config, rendering, out, err).run().await
}
