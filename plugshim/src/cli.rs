//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::CONFIG_ENV;

/// Emulate WeMo-style smart plugs that run your own on/off actions
#[derive(Parser, Debug)]
#[command(name = "plugshim")]
#[command(version)]
#[command(about = "Emulated smart plugs for voice assistant hubs")]
pub struct Args {
    /// Path to config.json (default: ./config.json, ~/.plugshim/config.json,
    /// /etc/plugshim/config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging with source locations
    #[arg(short, long)]
    pub verbose: bool,

    /// Seconds a hub gets to send its request
    #[arg(long, default_value = "5")]
    pub read_timeout: u64,
}

impl Args {
    /// Parse the command line, then apply environment overrides.
    pub fn from_env() -> Self {
        let mut args = Args::parse();
        if args.config.is_none() {
            args.config = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        }
        args
    }

    pub fn read_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.read_timeout == 0 {
            anyhow::bail!("--read-timeout must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["plugshim"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.verbose);
        assert_eq!(args.read_timeout_duration(), Duration::from_secs(5));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_flags() {
        let args =
            Args::try_parse_from(["plugshim", "-c", "/tmp/c.json", "-v", "--read-timeout", "0"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(args.verbose);
        assert!(args.validate().is_err());
    }
}
