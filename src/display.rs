use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use colored::Colorize;

use crate::{
    cli::{ColorChoice, Config},
    types::{AnnotatedPullRequest, Label},
};

const CLEAR_SCREEN: &str = "\x1bc";

/// Terminal capabilities used while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rendering {
    pub color: bool,
    pub hyperlinks: bool,
    pub clear_screen: bool,
}

impl Rendering {
    /// Plain text, suitable for pipes and tests.
    pub const fn plain() -> Self {
        Self {
            color: false,
            hyperlinks: false,
            clear_screen: false,
        }
    }

    /// Resolves the colour choice against the attached terminals.
    pub fn detect(config: &Config) -> Self {
        let interactive = io::stdout().is_terminal() && io::stderr().is_terminal();
        let styled = match config.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => interactive,
        };
        // Keep colored's own environment checks from diverging from the
        // hyperlink decision.
        colored::control::set_override(styled);

        Self {
            color: styled,
            hyperlinks: styled,
            clear_screen: config.clear_screen && io::stderr().is_terminal(),
        }
    }
}

/// Destination of a rendered pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    /// Ready-to-merge pull requests are highlighted on stderr.
    Stderr,
}

pub fn channel_for(pr: &AnnotatedPullRequest) -> Channel {
    if pr.is_ready_to_merge() {
        Channel::Stderr
    } else {
        Channel::Stdout
    }
}

/// Partitions `items` by `key`, keeping groups in first-seen order and
/// items within a group in their original order.
pub fn group_by_repository<T, K>(items: Vec<T>, key: K) -> Vec<(String, Vec<T>)>
where
    K: Fn(&T) -> &str,
{
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for item in items {
        let name = key(&item);
        match groups.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, members)) => members.push(item),
            None => groups.push((name.to_string(), vec![item])),
        }
    }
    groups
}

/// Wraps `text` in an OSC 8 escape so terminals render it as a link.
pub fn hyperlink(url: &str, text: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b]8;;{url}\x1b\\{text}\x1b]8;;\x1b\\")
    } else {
        text.to_string()
    }
}

fn format_label(label: &Label, rendering: &Rendering) -> String {
    if !rendering.color {
        return label.name.clone();
    }
    let styled = label.name.black().bold();
    match label.rgb() {
        Some((r, g, b)) => styled.on_truecolor(r, g, b).to_string(),
        None => styled.to_string(),
    }
}

pub fn format_labels(labels: &[Label], rendering: &Rendering) -> String {
    labels
        .iter()
        .map(|label| format_label(label, rendering))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a pull request as the block written to its channel, including
/// the trailing blank line.
pub fn format_pull_request(pr: &AnnotatedPullRequest, rendering: &Rendering) -> String {
    let mut text = pr.title.clone();

    if !pr.labels.is_empty() {
        text.push_str(&format!(" ({})", format_labels(&pr.labels, rendering)));
    }

    text.push('\n');
    text.push_str(&hyperlink(&pr.html_url, &pr.html_url, rendering.hyperlinks));
    text.push('\n');

    if let Some(author) = &pr.author {
        text.push_str(&format!("Author: {}", author.display_name()));
    }

    text.push_str("\n\n");
    text
}

pub fn format_repository_header(repo_name: &str, rendering: &Rendering) -> String {
    let name = repo_name.to_uppercase();
    if rendering.color {
        name.bold().to_string()
    } else {
        name
    }
}

pub fn format_banner(text: &str, rendering: &Rendering) -> String {
    if rendering.color {
        text.cyan().bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn write_banner<W: Write>(text: &str, rendering: &Rendering, out: &mut W) -> Result<()> {
    writeln!(out, "{}\n", format_banner(text, rendering))?;
    Ok(())
}

pub fn write_repository_header<W: Write>(
    repo_name: &str,
    rendering: &Rendering,
    err: &mut W,
) -> Result<()> {
    write!(err, "{}\n\n", format_repository_header(repo_name, rendering))?;
    Ok(())
}

/// Writes `pr` to `out` or, when it is ready to merge, to `err`.
pub fn write_pull_request<O: Write, E: Write>(
    pr: &AnnotatedPullRequest,
    rendering: &Rendering,
    out: &mut O,
    err: &mut E,
) -> Result<Channel> {
    let text = format_pull_request(pr, rendering);
    let channel = channel_for(pr);
    match channel {
        Channel::Stdout => out.write_all(text.as_bytes())?,
        Channel::Stderr => err.write_all(text.as_bytes())?,
    }
    Ok(channel)
}

pub fn clear_screen<W: Write>(rendering: &Rendering, err: &mut W) -> Result<()> {
    if rendering.clear_screen {
        err.write_all(CLEAR_SCREEN.as_bytes())?;
        err.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cli::parse_args,
        types::{CiState, ReviewStatus, User, GREEN, RED},
    };

    fn pr(number: u64, repo: &str) -> AnnotatedPullRequest {
        AnnotatedPullRequest {
            number,
            title: format!("Change #{number}"),
            repo_name: repo.to_string(),
            html_url: format!("https://github.com/acme/{repo}/pull/{number}"),
            author: None,
            labels: vec![
                Label::new("CI PASSING", GREEN),
                Label::new("AWAITING REVIEW", RED),
            ],
            ci_state: Some(CiState::Success),
            review_status: ReviewStatus::AwaitingReview,
        }
    }

    #[test]
    fn test_grouping_preserves_order() {
        let prs = vec![
            pr(1, "api"),
            pr(2, "web"),
            pr(3, "api"),
            pr(4, "cli"),
            pr(5, "web"),
        ];

        let groups = group_by_repository(prs, |p| p.repo_name.as_str());

        let shape: Vec<(&str, Vec<u64>)> = groups
            .iter()
            .map(|(name, members)| (name.as_str(), members.iter().map(|p| p.number).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![("api", vec![1, 3]), ("web", vec![2, 5]), ("cli", vec![4])]
        );
    }

    #[test]
    fn test_grouping_empty() {
        let groups = group_by_repository(Vec::<AnnotatedPullRequest>::new(), |p| {
            p.repo_name.as_str()
        });
        assert!(groups.is_empty());
    }

    #[test]
    fn test_format_plain() {
        let text = format_pull_request(&pr(7, "api"), &Rendering::plain());
        assert_eq!(
            text,
            "Change #7 (CI PASSING, AWAITING REVIEW)\nhttps://github.com/acme/api/pull/7\n\n\n"
        );
    }

    #[test]
    fn test_format_author_with_name() {
        let mut item = pr(7, "api");
        item.author = Some(User {
            login: "bob".to_string(),
            name: Some("Bob Builder".to_string()),
        });
        let text = format_pull_request(&item, &Rendering::plain());
        assert!(text.ends_with("Author: Bob Builder (@bob)\n\n"));
    }

    #[test]
    fn test_format_author_without_name() {
        let mut item = pr(7, "api");
        item.author = Some(User {
            login: "bob".to_string(),
            name: None,
        });
        let text = format_pull_request(&item, &Rendering::plain());
        assert!(text.contains("Author: @bob"));
    }

    #[test]
    fn test_no_author_line_for_own_pr() {
        let text = format_pull_request(&pr(7, "api"), &Rendering::plain());
        assert!(!text.contains("Author:"));
    }

    fn config_with_color(choice: &str) -> Config {
        parse_args([
            "prradar", "--org", "acme", "--user", "alice", "--password", "pw", "--color", choice,
        ])
        .unwrap()
    }

    #[test]
    fn test_detect_drives_colored_output() {
        let rendering = Rendering::detect(&config_with_color("always"));
        assert!(rendering.color && rendering.hyperlinks);
        assert_ne!("x".bold().to_string(), "x");

        let rendering = Rendering::detect(&config_with_color("never"));
        assert!(!rendering.color && !rendering.hyperlinks);
        assert_eq!("x".bold().to_string(), "x");

        // Test runs never have both streams on a terminal.
        let rendering = Rendering::detect(&config_with_color("auto"));
        assert_eq!(rendering.color, rendering.hyperlinks);
        assert_eq!("x".bold().to_string() != "x", rendering.color);
    }

    #[test]
    fn test_hyperlink() {
        assert_eq!(
            hyperlink("https://x", "x", true),
            "\x1b]8;;https://x\x1b\\x\x1b]8;;\x1b\\"
        );
        assert_eq!(hyperlink("https://x", "x", false), "x");
    }

    #[test]
    fn test_channel_selection() {
        let mut item = pr(1, "api");
        assert_eq!(channel_for(&item), Channel::Stdout);

        item.review_status = ReviewStatus::PeerReviewed;
        assert_eq!(channel_for(&item), Channel::Stderr);

        item.ci_state = Some(CiState::Pending);
        assert_eq!(channel_for(&item), Channel::Stdout);

        item.ci_state = None;
        assert_eq!(channel_for(&item), Channel::Stdout);
    }

    #[test]
    fn test_write_pull_request_routes_output() {
        let mut item = pr(1, "api");
        item.review_status = ReviewStatus::PeerReviewed;
        let mut out = Vec::new();
        let mut err = Vec::new();

        let channel = write_pull_request(&item, &Rendering::plain(), &mut out, &mut err).unwrap();

        assert_eq!(channel, Channel::Stderr);
        assert!(out.is_empty());
        assert!(String::from_utf8(err).unwrap().starts_with("Change #1"));
    }

    #[test]
    fn test_repository_header() {
        let mut err = Vec::new();
        write_repository_header("widgets", &Rendering::plain(), &mut err).unwrap();
        assert_eq!(String::from_utf8(err).unwrap(), "WIDGETS\n\n");
    }

    #[test]
    fn test_banner() {
        let mut out = Vec::new();
        write_banner(">>> MY PULL REQUESTS:", &Rendering::plain(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">>> MY PULL REQUESTS:\n\n");
    }

    #[test]
    fn test_clear_screen_only_when_enabled() {
        let mut err = Vec::new();
        clear_screen(&Rendering::plain(), &mut err).unwrap();
        assert!(err.is_empty());

        let rendering = Rendering {
            clear_screen: true,
            ..Rendering::plain()
        };
        clear_screen(&rendering, &mut err).unwrap();
        assert_eq!(err, b"\x1bc");
    }
}
