use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, info};

use crate::environment::ChildEnv;
use crate::error::{Error, Result};

/// The user's program and its arguments, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subcommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Subcommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Subcommand {
            program: program.into(),
            args,
        }
    }

    /// Split `[program, args...]`; `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Subcommand::new(program.clone(), args.to_vec()))
    }

    fn command(&self, env: &ChildEnv) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);
        cmd
    }

    /// Run to completion with the terminal attached. Ctrl-C reaches the child
    /// straight from the terminal; here it only means "keep waiting", so the
    /// caller still gets to tear the tunnel down afterwards.
    pub async fn run(&self, env: &ChildEnv) -> Result<ExitStatus> {
        debug!(command = %self.program, args = ?self.args, "running subcommand");

        let mut child = self.command(env).spawn().map_err(|e| self.spawn_error(e))?;

        let status = tokio::select! {
            status = child.wait() => status,
            _ = tokio::signal::ctrl_c() => {
                info!(
                    command = %self.program,
                    "interrupted; waiting for subcommand to exit"
                );
                child.wait().await
            }
        };
        status.map_err(|source| Error::Subcommand {
            command: self.program.clone(),
            source,
        })
    }

    fn spawn_error(&self, source: io::Error) -> Error {
        if source.kind() == io::ErrorKind::NotFound {
            Error::SubcommandNotFound {
                command: self.program.clone(),
            }
        } else {
            Error::Subcommand {
                command: self.program.clone(),
                source,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_argv_splits_program_and_args() {
        let argv = vec!["kubectl".to_string(), "get".into(), "pods".into()];
        let sub = Subcommand::from_argv(&argv).unwrap();
        assert_eq!(sub.program, "kubectl");
        assert_eq!(sub.args, vec!["get", "pods"]);
    }

    #[test]
    fn from_argv_rejects_empty() {
        assert!(Subcommand::from_argv(&[]).is_none());
    }

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let sub = Subcommand::new("lsssss-does-not-exist", vec![]);
        let err = sub.run(&ChildEnv::inherit()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::SubcommandNotFound { ref command } if command == "lsssss-does-not-exist"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lists_existing_file_successfully() {
        let sub = Subcommand::new("ls", vec!["Cargo.toml".into()]);
        let status = sub.run(&ChildEnv::inherit()).await.unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_status_not_a_failure() {
        let sub = Subcommand::new("sh", vec!["-c".into(), "exit 3".into()]);
        let status = sub.run(&ChildEnv::inherit()).await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn child_sees_overlay_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("env.txt");
        let script = format!("printf '%s' \"$MY_ENV_VAR\" > '{}'", out.display());
        let sub = Subcommand::new("sh", vec!["-c".into(), script]);
        let env = ChildEnv::inherit().overlay(&["MY_ENV_VAR=value"]);

        let status = sub.run(&env).await.unwrap();
        assert!(status.success());
        assert_eq!(std::fs::read_to_string(out).unwrap(), "value");
        // The orchestrator's own environment is left alone.
        assert!(std::env::var_os("MY_ENV_VAR").is_none());
    }
}
