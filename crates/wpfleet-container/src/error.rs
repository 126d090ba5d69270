use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(
        "Dockerに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • docker ps コマンドが正常に動作するか確認してください"
    )]
    DockerConnectionFailed(String),

    #[error("コンテナ '{container}' が見つかりません")]
    ContainerNotFound { container: String },

    #[error("ネットワーク '{network}' が見つかりません")]
    NetworkNotFound { network: String },

    #[error(
        "イメージ '{image}' が見つかりません\n\nヒント:\n  • イメージ名とタグを確認してください\n  • docker pull {image} でイメージをダウンロードしてください"
    )]
    ImageNotFound { image: String },

    #[error("コンテナ '{container}' のポート {port}/tcp がホストに公開されていません")]
    PortNotPublished { container: String, port: u16 },

    #[error("コンテナ '{container}' でのコマンド実行に失敗しました（終了コード {exit_code}）: {command}\n{output}")]
    ExecFailed {
        container: String,
        command: String,
        exit_code: i64,
        output: String,
    },

    #[error("Docker APIエラー: {0}")]
    DockerApiError(String),

    #[error(
        "サービス '{service}' の準備完了を待機中にタイムアウトしました（{max_retries}回リトライ）"
    )]
    ServiceWaitTimeout { service: String, max_retries: u32 },
}

impl ContainerError {
    /// 対象リソースが存在しないことを示すエラーか
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContainerError::ContainerNotFound { .. } | ContainerError::NetworkNotFound { .. }
        )
    }
}

impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        // 404/409 は呼び出し側でリソース種別に応じて変換する
        let err_str = err.to_string();
        if err_str.contains("Connection refused") || err_str.contains("No such file or directory")
        {
            ContainerError::DockerConnectionFailed(err_str)
        } else {
            ContainerError::DockerApiError(err_str)
        }
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
