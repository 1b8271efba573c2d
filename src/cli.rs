use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use url::Url;

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub caps `per_page` at 100 for both the issues and search endpoints.
const MAX_PER_PAGE: u8 = 100;

/// When to emit colours and terminal hyperlinks.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Login used for every API request.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub org: String,
    pub credentials: Credentials,
    pub api_url: Url,
    pub limit: u8,
    pub exit_when_empty: bool,
    pub clear_screen: bool,
    pub color: ColorChoice,
}

impl Config {
    /// The login whose pull requests are listed.
    pub fn user(&self) -> &str {
        &self.credentials.user
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "prradar",
    about = "List the open pull requests you authored or are involved in across a GitHub organization, with CI and review status"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// GitHub organization to search
    #[arg(long, env = "GITHUB_ORG", value_name = "ORG")]
    pub org: String,

    /// GitHub login of the acting user
    #[arg(long, env = "GITHUB_USER", value_name = "LOGIN")]
    pub user: String,

    /// Password or personal access token for the acting user
    #[arg(long, env = "GITHUB_PASSWORD", hide_env_values = true, value_name = "SECRET")]
    pub password: String,

    /// Base URL of the GitHub REST API
    #[arg(long = "api-url", env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, value_name = "URL")]
    pub api_url: String,

    /// Number of issues to request per query (max 100)
    #[arg(short = 'L', long, default_value_t = 30, value_name = "NUM")]
    pub limit: u16,

    /// Stop as soon as a section has no pull requests
    #[arg(long = "exit-when-empty", env = "PRRADAR_EXIT_WHEN_EMPTY")]
    pub exit_when_empty: bool,

    /// Don't clear the terminal before printing
    #[arg(long = "no-clear")]
    pub no_clear: bool,

    /// Colorize output and emit hyperlinks
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, value_name = "WHEN")]
    pub color: ColorChoice,
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.org.trim().is_empty() {
            anyhow::bail!("Organization must not be empty");
        }
        if self.user.trim().is_empty() {
            anyhow::bail!("User must not be empty");
        }
        if self.limit == 0 {
            anyhow::bail!("--limit must be at least 1");
        }
        Ok(())
    }
}

fn parse_api_url(api_url: &str) -> Result<Url> {
    let url =
        Url::parse(api_url).with_context(|| format!("Invalid API URL: '{}'", api_url))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("API URL must use http or https, got: '{}'", api_url);
    }
    Ok(url)
}

fn create_config(cli: CliArgs) -> Result<Config> {
    cli.validate()?;

    let api_url = parse_api_url(&cli.api_url)?;
    let limit = u8::try_from(cli.limit.min(u16::from(MAX_PER_PAGE))).unwrap_or(MAX_PER_PAGE);

    Ok(Config {
        org: cli.org.trim().to_string(),
        credentials: Credentials {
            user: cli.user.trim().to_string(),
            password: cli.password,
        },
        api_url,
        limit,
        exit_when_empty: cli.exit_when_empty,
        clear_screen: !cli.no_clear,
        color: cli.color,
    })
}

/// Parses command-line arguments (falling back to the environment for the
/// organization, user and password) into a run configuration.
pub fn parse_args<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    create_config(cli)
}
