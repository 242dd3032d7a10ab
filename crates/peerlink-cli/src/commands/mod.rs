//! CLI command definitions and handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use peerlink_core::config::Config;

pub mod config;
pub mod serve;

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults; a file that exists but does not
/// parse or validate is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map_or_else(Config::config_path, Path::to_path_buf);
    Config::load_from(&path).with_context(|| format!("loading {}", path.display()))
}

/// PeerLink - one-shot peer-to-peer file sharing
#[derive(Parser)]
#[command(name = "peerlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "PEERLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve(ServeArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for uploaded and relayed files
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.scratch_dir {
            config.storage.scratch_dir = Some(dir.clone());
        }
    }
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from([
            "peerlink",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--scratch-dir",
            "/var/tmp/pl",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.storage.scratch_dir, Some(PathBuf::from("/var/tmp/pl")));
    }

    #[test]
    fn test_serve_without_overrides_keeps_config() {
        let cli = Cli::parse_from(["peerlink", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.server.port, peerlink_core::DEFAULT_HTTP_PORT);
        assert!(config.storage.scratch_dir.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["peerlink", "config", "show", "--config", "/tmp/x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(
            cli.command,
            Command::Config(ConfigArgs {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_load_config_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.server.port, peerlink_core::DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[share]\ncode_range = [60000, 50000]\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
