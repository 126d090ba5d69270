//! bollard による Docker Engine 実装

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::{ContainerError, Result};
use crate::runtime::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ContainerState, ExecOutput, RestartPolicy,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{Config, CreateContainerOptions, LogOutput, LogsOptions};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::{
    ContainerStateStatusEnum, CreateImageInfo, HostConfig, NetworkCreateRequest, PortBinding,
    RestartPolicy as DockerRestartPolicy, RestartPolicyNameEnum,
};
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use wpfleet_core::NetworkRef;

/// Docker Engine に接続するランタイム
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// ローカルのDockerに接続し、疎通を確認する
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;
        docker
            .ping()
            .await
            .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;
        debug!("Docker接続を確立しました");
        Ok(Self { docker })
    }

    /// イメージをpull
    async fn pull_image(&self, image: &str) -> Result<()> {
        let (image_name, tag) = split_image_tag(image);
        info!("イメージをダウンロード中: {}", image);

        let options = bollard::image::CreateImageOptions {
            from_image: image_name,
            tag,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(CreateImageInfo {
                    status: Some(status),
                    ..
                }) => debug!("{}: {}", image, status),
                Ok(_) => {}
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    return Err(ContainerError::ImageNotFound {
                        image: image.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("イメージのダウンロード完了: {}", image);
        Ok(())
    }

    fn container_config(spec: &ContainerSpec) -> Config<String> {
        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut port_bindings = HashMap::new();
        let mut exposed_ports = HashMap::new();
        if let Some(port) = spec.publish_port {
            let container_port = format!("{}/tcp", port);
            exposed_ports.insert(container_port.clone(), HashMap::new());
            // host_port 未指定でランタイムに割り当てさせる
            port_bindings.insert(
                container_port,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: None,
                }]),
            );
        }

        let restart_policy = DockerRestartPolicy {
            name: Some(match spec.restart_policy {
                RestartPolicy::No => RestartPolicyNameEnum::NO,
                RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
                RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
            }),
            maximum_retry_count: None,
        };

        let mut labels = HashMap::new();
        labels.insert("wpfleet.managed".to_string(), "true".to_string());

        Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            exposed_ports: Some(exposed_ports),
            labels: Some(labels),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                network_mode: Some(spec.network.clone()),
                restart_policy: Some(restart_policy),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        match self
            .docker
            .create_container(Some(options.clone()), Self::container_config(spec))
            .await
        {
            Ok(response) => Ok(response.id),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                // イメージが見つからない場合はpullして1回だけ再試行
                self.pull_image(&spec.image).await?;
                let response = self
                    .docker
                    .create_container(Some(options), Self::container_config(spec))
                    .await?;
                Ok(response.id)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn not_found(&self, name: &str) -> ContainerError {
        ContainerError::ContainerNotFound {
            container: name.to_string(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_network(&self, name: &str, driver: &str) -> Result<NetworkRef> {
        let request = NetworkCreateRequest {
            name: name.to_string(),
            driver: Some(driver.to_string()),
            ..Default::default()
        };
        self.docker.create_network(request).await?;
        info!("ネットワーク作成: {}", name);

        self.inspect_network(name).await
    }

    async fn inspect_network(&self, name: &str) -> Result<NetworkRef> {
        match self
            .docker
            .inspect_network(
                name,
                None::<bollard::query_parameters::InspectNetworkOptions>,
            )
            .await
        {
            Ok(network) => Ok(NetworkRef {
                name: name.to_string(),
                id: network.id.unwrap_or_default(),
            }),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(ContainerError::NetworkNotFound {
                network: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        match self.docker.remove_network(name).await {
            Ok(()) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(ContainerError::NetworkNotFound {
                network: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerInfo> {
        let id = self.create_container(spec).await?;
        debug!("コンテナ作成: {} ({})", spec.name, id);

        if let Err(e) = self
            .docker
            .start_container(&id, None::<bollard::query_parameters::StartContainerOptions>)
            .await
        {
            // 起動できなかったコンテナは残さない
            let force = bollard::query_parameters::RemoveContainerOptionsBuilder::default()
                .force(true)
                .build();
            if let Err(remove_err) = self.docker.remove_container(&id, Some(force)).await {
                warn!(
                    "起動に失敗したコンテナの削除に失敗しました: {} ({})",
                    spec.name, remove_err
                );
            }
            return Err(e.into());
        }
        info!("コンテナ起動: {}", spec.name);

        let container = self.inspect_container(&spec.name).await?;
        if let Some(port) = spec.publish_port
            && container.host_port.is_none()
        {
            return Err(ContainerError::PortNotPublished {
                container: spec.name.clone(),
                port,
            });
        }
        Ok(container)
    }

    async fn inspect_container(&self, name: &str) -> Result<ContainerInfo> {
        let response = match self
            .docker
            .inspect_container(
                name,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
        {
            Ok(response) => response,
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => return Err(self.not_found(name)),
            Err(e) => return Err(e.into()),
        };

        let state = response
            .state
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .map(container_state)
            .unwrap_or(ContainerState::Unknown);

        let host_port = response
            .network_settings
            .as_ref()
            .and_then(|settings| settings.ports.as_ref())
            .and_then(|ports| {
                ports
                    .values()
                    .flatten()
                    .flatten()
                    .find_map(|binding| binding.host_port.as_deref()?.parse::<u16>().ok())
            });

        Ok(ContainerInfo {
            name: name.to_string(),
            id: response.id.unwrap_or_default(),
            state,
            host_port,
        })
    }

    async fn exec(&self, container: &str, command: &[String]) -> Result<ExecOutput> {
        let options = CreateExecOptions {
            cmd: Some(command.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = match self.docker.create_exec(container, options).await {
            Ok(exec) => exec,
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => return Err(self.not_found(container)),
            Err(e) => return Err(e.into()),
        };

        let mut output = String::new();
        if let StartExecResults::Attached {
            output: mut stream, ..
        } = self
            .docker
            .start_exec(&exec.id, None::<StartExecOptions>)
            .await?
        {
            while let Some(chunk) = stream.next().await {
                append_log(&mut output, chunk?);
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        let exit_code = inspect.exit_code.unwrap_or(-1);
        debug!(
            "exec {} [{}] -> {}",
            container,
            command.join(" "),
            exit_code
        );

        Ok(ExecOutput { exit_code, output })
    }

    async fn restart_container(&self, name: &str) -> Result<()> {
        match self
            .docker
            .restart_container(
                name,
                None::<bollard::query_parameters::RestartContainerOptions>,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(self.not_found(name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut output = String::new();
        let mut stream = self.docker.logs(name, Some(options));
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(log) => append_log(&mut output, log),
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => return Err(self.not_found(name)),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(output)
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        match self
            .docker
            .stop_container(name, None::<bollard::query_parameters::StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            // 既に停止済み
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(self.not_found(name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        match self
            .docker
            .remove_container(
                name,
                None::<bollard::query_parameters::RemoveContainerOptions>,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(self.not_found(name)),
            Err(e) => Err(e.into()),
        }
    }
}

fn container_state(status: &ContainerStateStatusEnum) -> ContainerState {
    match status {
        ContainerStateStatusEnum::RUNNING => ContainerState::Running,
        ContainerStateStatusEnum::CREATED
        | ContainerStateStatusEnum::EXITED
        | ContainerStateStatusEnum::DEAD
        | ContainerStateStatusEnum::REMOVING => ContainerState::Stopped,
        ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
        _ => ContainerState::Unknown,
    }
}

fn append_log(buffer: &mut String, log: LogOutput) {
    match log {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::Console { message } => {
            buffer.push_str(&String::from_utf8_lossy(&message));
        }
        LogOutput::StdIn { .. } => {}
    }
}

/// イメージ名とタグを分離
/// 例: "mysql:8.0" -> ("mysql", "8.0")
///     "wordpress" -> ("wordpress", "latest")
///     "localhost:5000/wp" -> ("localhost:5000/wp", "latest")
pub fn split_image_tag(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}
