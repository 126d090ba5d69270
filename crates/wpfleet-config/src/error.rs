use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error("ホームディレクトリが見つかりません。WPFLEET_REGISTRY_PATH で登録ファイルの場所を指定してください")]
    HomeDirNotFound,

    #[error("設定ファイルが見つかりません: {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error(
        "Cloudflare の認証情報が設定されていません: {field}\n\
        環境変数 {env} または設定ファイルの cloudflare.{field} で指定してください"
    )]
    MissingCredential {
        field: &'static str,
        env: &'static str,
    },

    #[error("設定値が不正です: {0}")]
    InvalidValue(String),

    #[error("設定ファイルの解析に失敗しました: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
