//! インストールのデータモデル

use crate::error::{Result, ValidationError};
use crate::naming::validate_tenant_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// プロビジョニング要求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub tenant_id: String,
    pub domain: String,
    pub contact_email: String,
}

impl ProvisionRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        domain: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            domain: domain.into(),
            contact_email: contact_email.into(),
        }
    }

    /// 副作用を起こす前に入力を検証する
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.is_empty() {
            return Err(ValidationError::MissingField("tenant_id"));
        }
        if self.domain.is_empty() {
            return Err(ValidationError::MissingField("domain"));
        }
        if self.contact_email.trim().is_empty() {
            return Err(ValidationError::MissingField("contact_email"));
        }

        validate_tenant_id(&self.tenant_id)?;
        validate_domain(&self.domain)?;
        Ok(())
    }
}

/// DNS ラベルの最大長
pub const MAX_LABEL_LEN: usize = 63;

/// ドメイン名の形式チェック
///
/// `.` 区切りで2ラベル以上。各ラベルは1〜63文字の ASCII 英数字とハイフンで、
/// 先頭・末尾はハイフン不可。ドメインは DNS 名と wp-config.php の両方に埋め込まれる。
pub fn validate_domain(domain: &str) -> Result<()> {
    let labels: Vec<&str> = domain.split('.').collect();
    let well_formed = labels.len() >= 2 && labels.iter().all(|label| valid_label(label));

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidDomain(domain.to_string()))
    }
}

fn valid_label(label: &str) -> bool {
    (1..=MAX_LABEL_LEN).contains(&label.len())
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// コンテナへの参照（名前 + ランタイムが割り当てたID）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRef {
    pub name: String,
    pub id: String,
}

/// ネットワークへの参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    pub name: String,
    pub id: String,
}

/// プロバイダ側リソース（トンネル・ゾーン）への参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    /// プロバイダが割り当てたID
    pub id: String,
    /// 人間向けの名前
    pub name: String,
}

/// 1テナントぶんのプロビジョニング済みリソースの記録
///
/// レジストリには全ステップが成功した後にのみ書き込まれる。
/// 稼働状態は保存せず、必要なときにランタイムとプロバイダへ問い合わせる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub tenant_id: String,
    pub domain: String,
    pub contact_email: String,
    /// プロビジョニング開始時刻（秒精度）。全リソース名のサフィックスになる
    pub creation_instant: DateTime<Utc>,
    pub app_container: ContainerRef,
    pub db_container: ContainerRef,
    pub network: NetworkRef,
    /// アプリコンテナに割り当てられたホスト側ポート
    pub published_port: u16,
    /// DB パスワード（平文で保存される）
    pub db_credential: String,
    pub tunnel: ProviderRef,
    pub zone: ProviderRef,
    /// レジストラ側で委任設定するためのネームサーバ
    pub nameservers: Vec<String>,
}

impl Installation {
    pub fn site_url(&self) -> String {
        format!("https://{}", self.domain)
    }

    pub fn admin_url(&self) -> String {
        format!("https://{}/wp-admin", self.domain)
    }
}
