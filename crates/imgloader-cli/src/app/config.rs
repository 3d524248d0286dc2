use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use core::time::Duration;
use imgloader::ContextConfig;
use std::path::PathBuf;

/// User agent sent with every image fetch. Some image hosts reject requests
/// without one.
pub const DEFAULT_USER_AGENT: &str = concat!("imgloader/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration for the `imgloader` binary.
///
/// Every option can also be set through the environment variable named next
/// to it, or a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "imgloader",
    version,
    about = "Prefetch images into a disk cache and resolve their dimensions"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Directory the image cache persists fetched images in.
    ///
    /// Defaults to `imgloader` under the platform cache directory.
    ///
    /// Environment variable: `IMGLOADER_CACHE_DIR`
    #[arg(long, global = true, env = "IMGLOADER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Seconds in-flight requests get to settle on shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, global = true, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Seconds a single image fetch may take.
    ///
    /// Environment variable: `HTTP_TIMEOUT`
    #[arg(long, global = true, env = "HTTP_TIMEOUT", default_value_t = 30)]
    pub http_timeout: u64,

    /// User agent for image fetches.
    ///
    /// Environment variable: `USER_AGENT`
    #[arg(long, global = true, env = "USER_AGENT", default_value_t = String::from(DEFAULT_USER_AGENT))]
    pub user_agent: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch and persist images; prints `true` per URI once cached.
    Prefetch {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Resolve image dimensions; prints `{width, height}` per URI.
    Size {
        #[arg(required = true)]
        uris: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub directory: PathBuf,
    pub http_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,
    pub context: ContextConfig,
    pub cache: CacheConfig,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.http_timeout == 0 {
            bail!("HTTP_TIMEOUT must be greater than 0");
        }

        let directory = match args.cache_dir {
            Some(directory) => directory,
            None => dirs::cache_dir()
                .map(|dir| dir.join("imgloader"))
                .ok_or_else(|| {
                    anyhow!("No platform cache directory found; set IMGLOADER_CACHE_DIR")
                })?,
        };

        Ok(Self {
            command: args.command,
            context: ContextConfig {
                shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
                ..ContextConfig::default()
            },
            cache: CacheConfig {
                directory,
                http_timeout: Duration::from_secs(args.http_timeout),
                user_agent: args.user_agent,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Config> {
        let args = CliArgs::try_parse_from(args)?;
        Config::try_from(args)
    }

    #[test]
    fn parses_subcommand_and_options() {
        let config = parse(&[
            "imgloader",
            "size",
            "https://example.com/a.png",
            "/tmp/b.png",
            "--cache-dir",
            "/tmp/imgloader-cache",
            "--shutdown-timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(
            config.command,
            Command::Size {
                uris: vec!["https://example.com/a.png".into(), "/tmp/b.png".into()]
            }
        );
        assert_eq!(config.cache.directory, PathBuf::from("/tmp/imgloader-cache"));
        assert_eq!(config.context.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.context.thread_name, ContextConfig::default().thread_name);
    }

    #[test]
    fn requires_at_least_one_uri() {
        assert!(CliArgs::try_parse_from(["imgloader", "prefetch"]).is_err());
    }

    #[test]
    fn rejects_zero_http_timeout() {
        let err = parse(&[
            "imgloader",
            "prefetch",
            "https://example.com/a.png",
            "--cache-dir",
            "/tmp/imgloader-cache",
            "--http-timeout",
            "0",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("HTTP_TIMEOUT"));
    }
}
