use std::process::ExitStatus;

use tracing::{debug, error, info, warn};

use crate::config::{Config, TunnelProfile};
use crate::environment::ChildEnv;
use crate::error::{Error, Result};
use crate::subcommand::Subcommand;
use crate::tunnel::{ensure_port_free, Readiness, TunnelProcess};
use crate::tunnel_args::build_invocation;

/// What happened during one run that did not abort it.
#[derive(Debug)]
pub struct RunReport {
    pub tunnel_pid: u32,
    /// `None` when the subcommand could not be run or waited on.
    pub subcommand_status: Option<ExitStatus>,
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    tunnel_binary: String,
    readiness: Readiness,
}

// for logging
fn format_profile(profile: &TunnelProfile) -> String {
    format!(
        "profile '{}': {} -> 127.0.0.1:{}",
        profile.name, profile.host, profile.port
    )
}

impl Supervisor {
    pub fn new(tunnel_binary: impl Into<String>, readiness: Readiness) -> Self {
        Supervisor {
            tunnel_binary: tunnel_binary.into(),
            readiness,
        }
    }

    /// Resolve the profile, bring the tunnel up, run the subcommand with the
    /// profile's environment, and tear the tunnel down.
    ///
    /// Once the tunnel is up it is always terminated before returning, whatever
    /// the subcommand did. A missing subcommand is returned as an error only
    /// after that teardown; any other subcommand failure is just logged.
    pub async fn run(
        &self,
        config: &Config,
        profile_name: &str,
        subcommand: &Subcommand,
    ) -> Result<RunReport> {
        let profile = config.profile(profile_name)?;
        let invocation = build_invocation(&profile, &self.tunnel_binary)?;
        info!("starting tunnel for {}", format_profile(&profile));

        ensure_port_free(invocation.local_port).await?;
        let tunnel = TunnelProcess::launch(&invocation, self.readiness).await?;
        let tunnel_pid = tunnel.pid();

        let env = ChildEnv::inherit().overlay(&profile.env_vars);
        let outcome = subcommand.run(&env).await;

        tunnel.terminate().await?;

        match outcome {
            Ok(status) => {
                if status.success() {
                    debug!(command = %subcommand.program, "subcommand finished");
                } else {
                    warn!(
                        command = %subcommand.program,
                        %status,
                        "subcommand exited with failure"
                    );
                }
                Ok(RunReport {
                    tunnel_pid,
                    subcommand_status: Some(status),
                })
            }
            Err(e @ Error::SubcommandNotFound { .. }) => Err(e),
            Err(e) => {
                error!("{e}");
                Ok(RunReport {
                    tunnel_pid,
                    subcommand_status: None,
                })
            }
        }
    }
}
