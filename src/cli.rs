//! Command-line interface parsing for flagtip
//!
//! Parses the arguments with clap and turns them into a `StartupConfig`:
//! which resolver to talk to, which feed to show and where the cache lives.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Both a location table and a resolver URL were given
    #[error("--locations and --resolver-url are mutually exclusive; pick one resolver")]
    ConflictingResolvers,

    /// The resolver URL is not http(s)
    #[error("Invalid resolver URL: '{0}'. Expected an http:// or https:// endpoint")]
    InvalidResolverUrl(String),

    /// A file argument does not exist
    #[error("File not found: {0}")]
    MissingFile(PathBuf),
}

/// flagtip - Country-flag tooltips for usernames on a feed
#[derive(Parser, Debug)]
#[command(name = "flagtip")]
#[command(about = "Hover usernames in a feed to see the country they are based in")]
#[command(version)]
pub struct Cli {
    /// JSON feed to display instead of the built-in sample
    #[arg(long, value_name = "FILE")]
    pub feed: Option<PathBuf>,

    /// JSON object mapping usernames to locations, used as the resolver
    #[arg(long, value_name = "FILE")]
    pub locations: Option<PathBuf>,

    /// HTTP endpoint that answers fetchLocation requests
    #[arg(long, value_name = "URL", env = "FLAGTIP_RESOLVER_URL")]
    pub resolver_url: Option<String>,

    /// Directory holding the persisted cache (defaults to the XDG cache dir)
    #[arg(long, value_name = "DIR", env = "FLAGTIP_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show how many profiles are cached and the most recent ones
    Stats,
}

/// Where location lookups are answered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResolverSource {
    /// Built-in sample table
    #[default]
    Sample,
    /// Table loaded from a JSON file
    Table(PathBuf),
    /// Remote sidecar over HTTP
    Http(String),
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupConfig {
    pub resolver: ResolverSource,
    pub feed: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    /// Print cache stats and exit instead of starting the TUI
    pub show_stats: bool,
}

/// Checks that a resolver URL is plausibly an HTTP endpoint
pub fn parse_resolver_url(url: &str) -> Result<String, CliError> {
    let trimmed = url.trim();
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if has_host {
        Ok(trimmed.to_string())
    } else {
        Err(CliError::InvalidResolverUrl(url.to_string()))
    }
}

fn existing_file(path: &PathBuf) -> Result<PathBuf, CliError> {
    if path.is_file() {
        Ok(path.clone())
    } else {
        Err(CliError::MissingFile(path.clone()))
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with the selected resolver and paths
    /// * `Err(CliError)` for conflicting resolvers, a bad URL or a missing file
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let resolver = match (&cli.locations, &cli.resolver_url) {
            (Some(_), Some(_)) => return Err(CliError::ConflictingResolvers),
            (Some(path), None) => ResolverSource::Table(existing_file(path)?),
            (None, Some(url)) => ResolverSource::Http(parse_resolver_url(url)?),
            (None, None) => ResolverSource::Sample,
        };

        let feed = cli.feed.as_ref().map(existing_file).transpose()?;

        Ok(StartupConfig {
            resolver,
            feed,
            cache_dir: cli.cache_dir.clone(),
            show_stats: cli.command == Some(Command::Stats),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_resolver_url() {
        assert_eq!(
            parse_resolver_url("http://localhost:8080/resolve").unwrap(),
            "http://localhost:8080/resolve"
        );
        assert!(parse_resolver_url(" https://example.com ").is_ok());
        assert!(parse_resolver_url("ftp://example.com").is_err());
        assert!(parse_resolver_url("https://").is_err());
    }

    #[test]
    fn test_invalid_url_message() {
        let err = parse_resolver_url("localhost").unwrap_err();
        assert!(err.to_string().contains("Invalid resolver URL"));
        assert!(err.to_string().contains("localhost"));
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["flagtip"]);
        assert!(cli.feed.is_none());
        assert!(cli.locations.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_stats() {
        let cli = Cli::parse_from(["flagtip", "--cache-dir", "/tmp/ft", "stats"]);
        assert_eq!(cli.command, Some(Command::Stats));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/ft")));
    }

    #[test]
    fn test_startup_config_default_uses_sample() {
        let cli = Cli::parse_from(["flagtip"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.resolver, ResolverSource::Sample);
        assert!(!config.show_stats);
    }

    #[test]
    fn test_startup_config_with_table() {
        let table = NamedTempFile::new().unwrap();
        let path = table.path().to_str().unwrap();
        let cli = Cli::parse_from(["flagtip", "--locations", path, "--feed", path]);

        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.resolver, ResolverSource::Table(table.path().to_path_buf()));
        assert_eq!(config.feed, Some(table.path().to_path_buf()));
    }

    #[test]
    fn test_startup_config_with_url() {
        let cli = Cli::parse_from(["flagtip", "--resolver-url", "http://127.0.0.1:9000"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.resolver,
            ResolverSource::Http("http://127.0.0.1:9000".to_string())
        );
    }

    #[test]
    fn test_startup_config_conflicting_resolvers() {
        let table = NamedTempFile::new().unwrap();
        let cli = Cli::parse_from([
            "flagtip",
            "--locations",
            table.path().to_str().unwrap(),
            "--resolver-url",
            "http://127.0.0.1:9000",
        ]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::ConflictingResolvers)
        ));
    }

    #[test]
    fn test_startup_config_missing_feed() {
        let cli = Cli::parse_from(["flagtip", "--feed", "/definitely/not/here.json"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::MissingFile(_))
        ));
    }
}
