use thiserror::Error;

/// 入力検証エラー（副作用の発生前に検出される）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("必須項目 '{0}' が指定されていません")]
    MissingField(&'static str),

    #[error(
        "テナントID '{0}' は使用できません\n\nヒント:\n  • 英数字・'-'・'_' のみ使用できます（先頭は英数字）\n  • 最大 {max} 文字です",
        max = crate::naming::MAX_TENANT_ID_LEN
    )]
    InvalidTenantId(String),

    #[error("ドメイン '{0}' は不正です（例: example.com）")]
    InvalidDomain(String),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
