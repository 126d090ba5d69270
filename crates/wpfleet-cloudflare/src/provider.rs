//! Networking provider trait definition

use crate::error::Result;
use crate::tunnel::TunnelCredentials;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cloud networking provider abstraction
///
/// Implemented by [`crate::CloudflareClient`] and by in-memory stubs in tests.
#[async_trait]
pub trait NetworkingProvider: Send + Sync {
    /// Check that the configured API token is valid
    async fn verify_credentials(&self) -> Result<TokenStatus>;

    /// Create a named tunnel with a locally generated secret
    async fn create_tunnel(&self, name: &str, secret: &str) -> Result<CreatedTunnel>;

    /// Get a tunnel; deleted tunnels are reported as not found
    async fn get_tunnel(&self, id: &str) -> Result<Tunnel>;

    async fn delete_tunnel(&self, id: &str) -> Result<()>;

    /// Find a live tunnel by its exact name
    async fn find_tunnel(&self, name: &str) -> Result<Option<Tunnel>>;

    /// Find the zone with exactly this name
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>>;

    async fn create_zone(&self, name: &str) -> Result<Zone>;

    async fn delete_zone(&self, id: &str) -> Result<()>;

    /// Find a DNS record by fully-qualified name
    async fn find_dns_record(&self, zone_id: &str, name: &str) -> Result<Option<DnsRecord>>;

    async fn create_dns_record(&self, zone_id: &str, record: &DnsRecordSpec) -> Result<DnsRecord>;

    async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecordSpec,
    ) -> Result<DnsRecord>;

    /// Ensure a DNS record exists with the given content (create or update)
    async fn ensure_dns_record(&self, zone_id: &str, record: &DnsRecordSpec) -> Result<DnsRecord> {
        if let Some(existing) = self.find_dns_record(zone_id, &record.name).await? {
            tracing::info!(
                "Updating DNS record {} from {} to {}",
                existing.name,
                existing.content,
                record.content
            );
            return self.update_dns_record(zone_id, &existing.id, record).await;
        }

        tracing::info!("Creating DNS record: {} -> {}", record.name, record.content);
        self.create_dns_record(zone_id, record).await
    }
}

/// Result of the token verification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    pub id: String,
    pub status: String,
}

impl TokenStatus {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Tunnel as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

/// A freshly created tunnel together with the credentials its agent needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTunnel {
    pub tunnel: Tunnel,
    pub credentials: TunnelCredentials,
}

/// DNS zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_servers: Vec<String>,
}

/// DNS record information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
}

/// Desired DNS record, used for both create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordSpec {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub proxied: bool,
    /// 1 = automatic
    pub ttl: u32,
}

impl DnsRecordSpec {
    /// Proxied CNAME with automatic TTL
    pub fn proxied_cname(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            record_type: "CNAME".to_string(),
            name: name.into(),
            content: target.into(),
            proxied: true,
            ttl: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxied_cname_body() {
        let spec = DnsRecordSpec::proxied_cname("www.example.com", "abc.cfargotunnel.com");
        let body = serde_json::to_value(&spec).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "type": "CNAME",
                "name": "www.example.com",
                "content": "abc.cfargotunnel.com",
                "proxied": true,
                "ttl": 1
            })
        );
    }

    #[test]
    fn test_zone_without_nameservers() {
        let zone: Zone = serde_json::from_str(r#"{"id": "z1", "name": "example.com"}"#).unwrap();
        assert!(zone.name_servers.is_empty());
    }
}
