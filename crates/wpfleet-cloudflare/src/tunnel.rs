//! Tunnel agent documents
//!
//! The agent running inside the application container needs two files:
//! the credentials JSON and an ingress configuration mapping public
//! hostnames to a local service.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// DNS target every tunnel is reachable at
pub fn tunnel_target(tunnel_id: &str) -> String {
    format!("{}.cfargotunnel.com", tunnel_id)
}

/// Contents of the agent's credentials file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelCredentials {
    #[serde(rename = "AccountTag")]
    pub account_tag: String,
    #[serde(rename = "TunnelID")]
    pub tunnel_id: String,
    #[serde(rename = "TunnelSecret")]
    pub tunnel_secret: String,
}

impl TunnelCredentials {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Agent configuration file (`config.yml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressConfig {
    pub tunnel: String,
    #[serde(rename = "credentials-file")]
    pub credentials_file: String,
    pub ingress: Vec<IngressRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
}

impl IngressConfig {
    /// Route every hostname to `service`, everything else to a 404
    pub fn for_hostnames(
        tunnel_id: &str,
        credentials_file: &str,
        hostnames: &[String],
        service: &str,
    ) -> Self {
        let mut ingress: Vec<IngressRule> = hostnames
            .iter()
            .map(|hostname| IngressRule {
                hostname: Some(hostname.clone()),
                service: service.to_string(),
            })
            .collect();

        // The agent requires a catch-all as the last rule
        ingress.push(IngressRule {
            hostname: None,
            service: "http_status:404".to_string(),
        });

        Self {
            tunnel: tunnel_id.to_string(),
            credentials_file: credentials_file.to_string(),
            ingress,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_target() {
        assert_eq!(tunnel_target("abc-123"), "abc-123.cfargotunnel.com");
    }

    #[test]
    fn test_credentials_field_names() {
        let credentials = TunnelCredentials {
            account_tag: "acct".to_string(),
            tunnel_id: "t-1".to_string(),
            tunnel_secret: "c2VjcmV0".to_string(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&credentials.to_json().unwrap()).unwrap();

        assert_eq!(value["AccountTag"], "acct");
        assert_eq!(value["TunnelID"], "t-1");
        assert_eq!(value["TunnelSecret"], "c2VjcmV0");
    }

    #[test]
    fn test_ingress_config_yaml() {
        let hostnames = vec!["example.com".to_string(), "www.example.com".to_string()];
        let config = IngressConfig::for_hostnames(
            "t-1",
            "/etc/cloudflared/t-1.json",
            &hostnames,
            "http://localhost:80",
        );

        assert_eq!(config.ingress.len(), 3);
        assert_eq!(config.ingress[2].hostname, None);

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("tunnel: t-1"));
        assert!(yaml.contains("credentials-file: /etc/cloudflared/t-1.json"));
        assert!(yaml.contains("hostname: www.example.com"));
        assert!(yaml.contains("service: http_status:404"));

        let parsed: IngressConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
