use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wpfleet_core::NetworkRef;

/// コンテナランタイムのトレイト
///
/// すべての呼び出しは完了するまでブロックし、ステップ間で重ならない。
/// 存在しないリソースは `ContainerNotFound` / `NetworkNotFound` で報告する。
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// ネットワークを作成
    async fn create_network(&self, name: &str, driver: &str) -> Result<NetworkRef>;

    /// ネットワークを取得
    async fn inspect_network(&self, name: &str) -> Result<NetworkRef>;

    /// ネットワークを削除
    async fn remove_network(&self, name: &str) -> Result<()>;

    /// コンテナを作成して起動
    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerInfo>;

    /// コンテナを取得
    async fn inspect_container(&self, name: &str) -> Result<ContainerInfo>;

    /// 起動中のコンテナ内でコマンドを実行
    ///
    /// 非ゼロ終了はエラーではなく [`ExecOutput::exit_code`] で返す。
    async fn exec(&self, container: &str, command: &[String]) -> Result<ExecOutput>;

    async fn restart_container(&self, name: &str) -> Result<()>;

    /// 末尾 `tail` 行のログ（stdout + stderr）
    async fn logs(&self, name: &str, tail: usize) -> Result<String>;

    /// コンテナを停止（停止済みなら何もしない）
    async fn stop_container(&self, name: &str) -> Result<()>;

    async fn remove_container(&self, name: &str) -> Result<()>;
}

/// 再起動ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    Always,
    UnlessStopped,
}

/// `run_container` に渡すコンテナ定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub env: Vec<(String, String)>,
    pub network: String,
    /// ホスト側ポートをランタイムに割り当てさせて公開するコンテナポート（TCP）
    pub publish_port: Option<u16>,
    pub restart_policy: RestartPolicy,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>, name: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            env: Vec::new(),
            network: network.into(),
            publish_port: None,
            restart_policy: RestartPolicy::UnlessStopped,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn publish(mut self, container_port: u16) -> Self {
        self.publish_port = Some(container_port);
        self
    }
}

/// コンテナの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub id: String,
    pub state: ContainerState,
    /// 公開ポートに割り当てられたホスト側ポート
    pub host_port: Option<u16>,
}

/// コンテナの状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Restarting,
    Unknown,
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerState::Running => write!(f, "running"),
            ContainerState::Stopped => write!(f, "stopped"),
            ContainerState::Paused => write!(f, "paused"),
            ContainerState::Restarting => write!(f, "restarting"),
            ContainerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// `exec` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// `sh -c` で実行するコマンドを組み立てる
pub fn shell(script: impl Into<String>) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_spec_builder() {
        let spec = ContainerSpec::new("wordpress:latest", "wordpress_a_1", "network_a_1")
            .env("WORDPRESS_DB_HOST", "mysql_a_1")
            .publish(80);

        assert_eq!(spec.publish_port, Some(80));
        assert_eq!(spec.restart_policy, RestartPolicy::UnlessStopped);
        assert_eq!(
            spec.env,
            vec![("WORDPRESS_DB_HOST".to_string(), "mysql_a_1".to_string())]
        );
    }

    #[test]
    fn test_shell() {
        assert_eq!(shell("echo hi"), vec!["sh", "-c", "echo hi"]);
    }
}
