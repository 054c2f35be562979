use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{expand_config_path, DEFAULT_CONFIG_PATH};
use crate::logging::Verbosity;
use crate::subcommand::Subcommand;
use crate::tunnel::Readiness;
use crate::tunnel_args::DEFAULT_TUNNEL_BINARY;

pub const MAX_READY_TIMEOUT_SECS: u64 = 3600;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("CFDTUNNEL_GIT_COMMIT"),
    "\ntarget: ",
    env!("CFDTUNNEL_BUILD_TARGET"),
);

#[derive(Parser, Debug)]
#[command(
    name = "cfdtunnel",
    version,
    long_version = LONG_VERSION,
    about = "Start a cloudflared tunnel on the fly, run a command through it, then stop it",
    override_usage = "cfdtunnel --profile <PROFILE> [OPTIONS] [--] <COMMAND> [ARGS]..."
)]
pub struct Cli {
    /// Which cfdtunnel profile to use
    #[arg(long)]
    pub profile: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Path to the profile config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Tunnel client binary
    #[arg(long, default_value = DEFAULT_TUNNEL_BINARY)]
    pub tunnel_binary: String,

    /// Seconds to wait for the tunnel's local port to accept connections
    #[arg(
        long,
        default_value_t = 15,
        value_parser = clap::value_parser!(u64).range(1..=MAX_READY_TIMEOUT_SECS)
    )]
    pub ready_timeout: u64,

    /// Command to run while the tunnel is up, followed by its arguments
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Everything one invocation needs, fixed before any process is started.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: String,
    pub subcommand: Subcommand,
    pub config_path: PathBuf,
    pub tunnel_binary: String,
    pub readiness: Readiness,
    pub verbosity: Verbosity,
}

impl Cli {
    pub fn into_settings(self) -> Settings {
        // clap guarantees at least one value
        let (program, args) = match self.command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (String::new(), Vec::new()),
        };

        Settings {
            profile: self.profile,
            subcommand: Subcommand::new(program, args),
            config_path: expand_config_path(&self.config),
            tunnel_binary: self.tunnel_binary,
            readiness: Readiness::with_timeout(Duration::from_secs(self.ready_timeout)),
            verbosity: if self.debug {
                Verbosity::Debug
            } else {
                Verbosity::Normal
            },
        }
    }
}
