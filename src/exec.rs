//! Running the NAT script inside a container
//!
//! The [`ExecClient`] trait is the seam to whatever actually executes commands
//! in a container. [`DockerExecClient`] implements it on top of the Docker
//! exec API; tests substitute a scripted client.

use crate::{
    ports::{ConfigurationAttempt, TargetContainer},
    Error, Result,
};
use async_trait::async_trait;
use bollard::{
    container::LogOutput,
    exec::{CreateExecOptions, StartExecOptions, StartExecResults},
    Docker,
};
use futures::{stream::BoxStream, StreamExt};

/// Combined stdout/stderr of a started exec, chunk by chunk
pub type OutputStream = BoxStream<'static, anyhow::Result<Vec<u8>>>;

/// Client able to run a command in a container and stream back its output
///
/// Implementations are shared across concurrently configured containers.
#[async_trait]
pub trait ExecClient: Send + Sync {
    /// Create an exec for `cmd` in the container with stdout and stderr
    /// attached and a TTY allocated; returns the exec id
    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> anyhow::Result<String>;

    /// Start a previously created exec and return its output
    async fn start_exec(&self, exec_id: &str) -> anyhow::Result<OutputStream>;
}

/// [`ExecClient`] backed by the Docker daemon
#[derive(Debug, Clone)]
pub struct DockerExecClient {
    docker: Docker,
}

impl DockerExecClient {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect to the local Docker daemon and check it responds
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Other(anyhow::anyhow!("Failed to connect to Docker: {}", e)))?;

        docker
            .ping()
            .await
            .map_err(|e| Error::Other(anyhow::anyhow!("Docker ping failed: {}", e)))?;

        Ok(Self::new(docker))
    }

    pub fn docker(&self) -> &Docker {
        &self.docker
    }
}

#[async_trait]
impl ExecClient for DockerExecClient {
    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> anyhow::Result<String> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(cmd),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        Ok(exec.id)
    }

    async fn start_exec(&self, exec_id: &str) -> anyhow::Result<OutputStream> {
        let started = self
            .docker
            .start_exec(
                exec_id,
                Some(StartExecOptions {
                    tty: true,
                    ..Default::default()
                }),
            )
            .await?;

        match started {
            StartExecResults::Attached { output, .. } => Ok(output
                .filter_map(|frame| async move {
                    match frame {
                        Ok(LogOutput::StdOut { message })
                        | Ok(LogOutput::StdErr { message })
                        | Ok(LogOutput::Console { message }) => Some(Ok(message.to_vec())),
                        Ok(LogOutput::StdIn { .. }) => None,
                        Err(e) => Some(Err(e.into())),
                    }
                })
                .boxed()),
            StartExecResults::Detached => Ok(futures::stream::empty().boxed()),
        }
    }
}

/// Run `command` through `sh -c` in the target container
///
/// Failing to create the exec is returned as [`Error::ExecCreate`]. Failing to
/// start it or to read its output is only logged, and the attempt comes back
/// with `output: None` so the caller can try again.
pub async fn execute(
    client: &dyn ExecClient,
    target: &TargetContainer,
    command: &str,
) -> Result<ConfigurationAttempt> {
    let cmd = vec!["sh".to_string(), "-c".to_string(), command.to_string()];
    let exec_id = client
        .create_exec(&target.container_id, cmd)
        .await
        .map_err(|source| Error::ExecCreate {
            container: target.container_id.clone(),
            source,
        })?;

    let output = match read_output(client, &exec_id).await {
        Ok(log) => {
            tracing::info!("Install iptables log ({}): {}", target.container_id, log);
            Some(log)
        }
        Err(e) => {
            tracing::error!(
                "Could not read exec output from {}: {}. Retrying.",
                target.container_id,
                e
            );
            None
        }
    };

    Ok(ConfigurationAttempt {
        command: command.to_string(),
        exec_id,
        output,
    })
}

async fn read_output(client: &dyn ExecClient, exec_id: &str) -> anyhow::Result<String> {
    // The stream is dropped, and the attach connection closed, on every return path
    let mut stream = client.start_exec(exec_id).await?;
    let mut raw = Vec::new();
    while let Some(chunk) = stream.next().await {
        raw.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
