use std::process::Stdio;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tunnel_args::{Invocation, LOCAL_BIND};

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness {
            timeout: DEFAULT_READY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Readiness {
    pub fn with_timeout(timeout: Duration) -> Self {
        Readiness {
            timeout,
            ..Readiness::default()
        }
    }
}

/// Fails with [`Error::PortInUse`] when something already listens on the
/// local endpoint, so a second tunnel on the same port is never spawned.
pub async fn ensure_port_free(port: u16) -> Result<()> {
    match TcpListener::bind((LOCAL_BIND, port)).await {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(source) => Err(Error::PortInUse { port, source }),
    }
}

/// A running tunnel client. Spawned with `kill_on_drop`, so the process is
/// killed even if the handle is dropped without [`TunnelProcess::terminate`].
#[derive(Debug)]
pub struct TunnelProcess {
    child: Child,
    pid: u32,
    program: String,
    port: u16,
}

impl TunnelProcess {
    /// Spawn the tunnel client and wait until its local endpoint accepts
    /// connections. On any readiness failure the child is terminated before
    /// the error is returned.
    pub async fn launch(inv: &Invocation, readiness: Readiness) -> Result<Self> {
        debug!(program = %inv.program, args = ?inv.args, "starting tunnel");

        let child = Command::new(&inv.program)
            .args(&inv.args)
            // Tunnel chatter must not interleave with the subcommand's output.
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::TunnelStart {
                program: inv.program.clone(),
                source,
            })?;

        // `id` is only `None` once the child has been reaped.
        let pid = child.id().unwrap_or_default();
        let mut tunnel = TunnelProcess {
            child,
            pid,
            program: inv.program.clone(),
            port: inv.local_port,
        };
        debug!(pid, "tunnel process spawned");

        if let Err(e) = tunnel.wait_until_ready(readiness).await {
            if let Err(kill_err) = tunnel.terminate().await {
                warn!("cleanup after failed start also failed: {kill_err}");
            }
            return Err(e);
        }

        info!(pid, port = tunnel.port, "tunnel ready");
        Ok(tunnel)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn wait_until_ready(&mut self, readiness: Readiness) -> Result<()> {
        // A timeout too large to represent means "no deadline".
        let deadline = Instant::now().checked_add(readiness.timeout);

        loop {
            // Poll for process exit so a crashed client fails fast.
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    return Err(Error::TunnelExited {
                        program: self.program.clone(),
                        status,
                    })
                }
                Ok(None) => {}
                Err(e) => warn!(pid = self.pid, "could not poll tunnel status: {e}"),
            }

            match TcpStream::connect((LOCAL_BIND, self.port)).await {
                Ok(_) => return Ok(()),
                Err(e) => debug!(port = self.port, "tunnel not ready yet: {e}"),
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::TunnelNotReady {
                    port: self.port,
                    timeout: readiness.timeout,
                });
            }
            sleep(readiness.poll_interval).await;
        }
    }

    /// Kill and reap the tunnel. A process that already exited counts as
    /// terminated; a failed kill is [`Error::Termination`].
    pub async fn terminate(mut self) -> Result<()> {
        debug!(pid = self.pid, "killing tunnel process");

        if let Ok(Some(status)) = self.child.try_wait() {
            warn!(pid = self.pid, %status, "tunnel process had already exited");
            return Ok(());
        }

        self.child.kill().await.map_err(|source| Error::Termination {
            pid: self.pid,
            source,
        })?;
        info!(pid = self.pid, "tunnel stopped");
        Ok(())
    }
}
