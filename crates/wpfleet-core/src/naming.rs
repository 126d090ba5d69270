//! リソース命名規則
//!
//! `{role}_{tenant}_{YYYYmmdd_HHMMSS}` の形式で、ネットワーク・DBコンテナ・
//! アプリコンテナ・トンネルの名前を導出する。タイムスタンプ部分は固定長なので、
//! テナントIDに `_` が含まれていても (tenant, instant) の組は一意に復元できる。
//! 失敗した試行と再試行のリソースが衝突しないことは、この規則だけで保証される。

use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// テナントIDの最大長
pub const MAX_TENANT_ID_LEN: usize = 48;

/// 作成時刻のフォーマット（固定長）
pub const INSTANT_FORMAT: &str = "%Y%m%d_%H%M%S";

const NETWORK_PREFIX: &str = "network";
const DB_PREFIX: &str = "mysql";
const APP_PREFIX: &str = "wordpress";
const TUNNEL_PREFIX: &str = "tunnel";

/// テナントIDが Docker と Cloudflare の双方で使える文字だけで構成されているか検証
pub fn validate_tenant_id(tenant_id: &str) -> Result<()> {
    let mut chars = tenant_id.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphanumeric()
                && tenant_id.len() <= MAX_TENANT_ID_LEN
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidTenantId(tenant_id.to_string()))
    }
}

/// 1回のプロビジョニング試行で使う全リソース名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNames {
    pub network: String,
    pub db_container: String,
    pub app_container: String,
    pub tunnel: String,
}

impl ResourceNames {
    /// (テナントID, 作成時刻) から名前を導出する
    pub fn derive(tenant_id: &str, instant: DateTime<Utc>) -> Self {
        let suffix = format!("{}_{}", tenant_id, instant.format(INSTANT_FORMAT));
        Self {
            network: format!("{}_{}", NETWORK_PREFIX, suffix),
            db_container: format!("{}_{}", DB_PREFIX, suffix),
            app_container: format!("{}_{}", APP_PREFIX, suffix),
            tunnel: format!("{}_{}", TUNNEL_PREFIX, suffix),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [
            &self.network,
            &self.db_container,
            &self.app_container,
            &self.tunnel,
        ]
    }
}

impl std::fmt::Display for ResourceNames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "network={}, db={}, app={}, tunnel={}",
            self.network, self.db_container, self.app_container, self.tunnel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn instant(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_derive_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let names = ResourceNames::derive("alice", at);

        assert_eq!(names.network, "network_alice_20240309_070501");
        assert_eq!(names.db_container, "mysql_alice_20240309_070501");
        assert_eq!(names.app_container, "wordpress_alice_20240309_070501");
        assert_eq!(names.tunnel, "tunnel_alice_20240309_070501");
    }

    #[test]
    fn test_derive_is_deterministic() {
        assert_eq!(
            ResourceNames::derive("bob", instant(5)),
            ResourceNames::derive("bob", instant(5))
        );
    }

    #[test]
    fn test_distinct_pairs_are_disjoint() {
        // アンダースコアを含むIDや前方一致するIDも混ぜる
        let tenants = ["a", "a_b", "a_b_20231114", "ab", "b-1"];
        let instants = [instant(0), instant(1), instant(86_400)];

        let mut seen = HashSet::new();
        for tenant in tenants {
            for at in instants {
                let names = ResourceNames::derive(tenant, at);
                for name in names.all() {
                    assert!(seen.insert(name.to_string()), "collision: {}", name);
                }
            }
        }
        assert_eq!(seen.len(), tenants.len() * instants.len() * 4);
    }

    #[test]
    fn test_validate_tenant_id() {
        assert!(validate_tenant_id("alice").is_ok());
        assert!(validate_tenant_id("john_doe-2").is_ok());

        assert!(validate_tenant_id("").is_err());
        assert!(validate_tenant_id("_alice").is_err());
        assert!(validate_tenant_id("alice.site").is_err());
        assert!(validate_tenant_id("ålice").is_err());
        assert!(validate_tenant_id(&"a".repeat(MAX_TENANT_ID_LEN + 1)).is_err());
    }
}
