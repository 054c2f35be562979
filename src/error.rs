use std::{io, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    #[error(
        "profile '{profile}' not found in {} (available: {})",
        path.display(),
        available.join(", ")
    )]
    ProfileNotFound {
        profile: String,
        path: PathBuf,
        available: Vec<String>,
    },

    #[error("profile '{profile}' has no host")]
    MissingHost { profile: String },

    #[error("profile '{profile}' has an invalid port '{port}'")]
    InvalidPort { profile: String, port: String },

    #[error("local port {port} is already in use: {source}")]
    PortInUse {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("could not start {program}: {source}")]
    TunnelStart {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited before becoming ready ({status})")]
    TunnelExited { program: String, status: ExitStatus },

    #[error("tunnel did not accept connections on 127.0.0.1:{port} within {timeout:?}")]
    TunnelNotReady { port: u16, timeout: Duration },

    #[error("command not found: {command}")]
    SubcommandNotFound { command: String },

    #[error("failed to run {command}: {source}")]
    Subcommand {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to kill tunnel process (pid {pid}): {source}")]
    Termination {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const TUNNEL_ERROR: u8 = 3;
    pub const TERMINATION_ERROR: u8 = 4;
    // Same code a shell uses for an unknown command.
    pub const COMMAND_NOT_FOUND: u8 = 127;
}

impl Error {
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ConfigRead { .. }
            | Error::ConfigParse { .. }
            | Error::ProfileNotFound { .. }
            | Error::MissingHost { .. }
            | Error::InvalidPort { .. } => exit_code::CONFIG_ERROR,
            Error::PortInUse { .. }
            | Error::TunnelStart { .. }
            | Error::TunnelExited { .. }
            | Error::TunnelNotReady { .. } => exit_code::TUNNEL_ERROR,
            Error::Termination { .. } => exit_code::TERMINATION_ERROR,
            Error::SubcommandNotFound { .. } => exit_code::COMMAND_NOT_FOUND,
            Error::Subcommand { .. } | Error::Logging(_) => exit_code::GENERAL_ERROR,
        }
    }
}
