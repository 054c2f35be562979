//! Log output goes to stderr so it never mixes with the subcommand's stdout.
//!
//! Level priority: `RUST_LOG` > `--debug` > default `warn`.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    Debug,
}

impl Verbosity {
    pub fn directive(self) -> &'static str {
        match self {
            Verbosity::Normal => "warn",
            Verbosity::Debug => "debug",
        }
    }
}

pub fn init(verbosity: Verbosity) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging initialized");
    Ok(())
}
