pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod logging;
pub mod subcommand;
pub mod supervisor;
pub mod tunnel;
pub mod tunnel_args;

use tracing::debug;

pub use cli::{Cli, Settings};
pub use config::{Config, TunnelProfile};
pub use error::{Error, Result};
pub use supervisor::{RunReport, Supervisor};

pub async fn run(settings: &Settings) -> Result<RunReport> {
    let config = config::load_config(&settings.config_path)?;
    debug!(
        path = %config.path().display(),
        profiles = ?config.profile_names(),
        "config loaded"
    );
    let supervisor = Supervisor::new(settings.tunnel_binary.clone(), settings.readiness);
    supervisor
        .run(&config, &settings.profile, &settings.subcommand)
        .await
}
