//! Cloudflare API v4 client
//!
//! Direct API implementation using Bearer token authentication.

use crate::error::{CloudflareError, Result};
use crate::provider::{
    CreatedTunnel, DnsRecord, DnsRecordSpec, NetworkingProvider, TokenStatus, Tunnel, Zone,
};
use crate::tunnel::TunnelCredentials;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Cloudflare client
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_token: String,
    pub account_id: String,
    pub api_base: String,
}

impl CloudflareConfig {
    pub fn new(api_token: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            account_id: account_id.into(),
            api_base: CLOUDFLARE_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Cloudflare API client
pub struct CloudflareClient {
    client: reqwest::Client,
    api_token: String,
    account_id: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Unwrap a response envelope into its `result`
///
/// A `success: false` envelope becomes [`CloudflareError::ApiError`] carrying
/// every provider message. `status` is the HTTP status the envelope came with.
pub fn unwrap_envelope(status: u16, body: Value) -> Result<Value> {
    let response: ApiResponse = serde_json::from_value(body).map_err(|e| {
        CloudflareError::UnexpectedResponse(format!("HTTP {}: not an API envelope ({})", status, e))
    })?;

    if !response.success {
        let message = if response.errors.is_empty() {
            "Unknown error".to_string()
        } else {
            response
                .errors
                .iter()
                .map(|e| format!("[{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ")
        };
        return Err(CloudflareError::ApiError { status, message });
    }

    Ok(response.result)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

impl CloudflareClient {
    pub fn new(config: CloudflareConfig) -> Result<Self> {
        if config.api_token.is_empty() {
            return Err(CloudflareError::InvalidConfig(
                "api_token is empty".to_string(),
            ));
        }
        if config.account_id.is_empty() {
            return Err(CloudflareError::InvalidConfig(
                "account_id is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_token: config.api_token,
            account_id: config.account_id,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Send one authenticated request and unwrap its envelope
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        debug!("Cloudflare API: {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let body: Value = serde_json::from_str(&text).map_err(|_| {
            CloudflareError::UnexpectedResponse(format!("HTTP {}: {}", status, text.trim()))
        })?;

        unwrap_envelope(status, body)
    }
}

#[async_trait]
impl NetworkingProvider for CloudflareClient {
    async fn verify_credentials(&self) -> Result<TokenStatus> {
        let result = self
            .request(Method::GET, "user/tokens/verify", None, &[])
            .await?;
        decode(result)
    }

    async fn create_tunnel(&self, name: &str, secret: &str) -> Result<CreatedTunnel> {
        let path = format!("accounts/{}/cfd_tunnel", self.account_id);
        let body = json!({
            "name": name,
            "tunnel_secret": secret,
            "config_src": "local",
        });

        let result = self.request(Method::POST, &path, Some(body), &[]).await?;
        let tunnel: Tunnel = decode(result.clone())?;

        // Prefer the provider's own credentials document when it sends one
        let credentials = match result.get("credentials_file") {
            Some(file) if !file.is_null() => decode(file.clone())?,
            _ => TunnelCredentials {
                account_tag: self.account_id.clone(),
                tunnel_id: tunnel.id.clone(),
                tunnel_secret: secret.to_string(),
            },
        };

        Ok(CreatedTunnel {
            tunnel,
            credentials,
        })
    }

    async fn get_tunnel(&self, id: &str) -> Result<Tunnel> {
        let path = format!("accounts/{}/cfd_tunnel/{}", self.account_id, id);
        let tunnel: Tunnel = decode(self.request(Method::GET, &path, None, &[]).await?)?;

        if tunnel.deleted_at.is_some() {
            return Err(CloudflareError::NotFound(format!("tunnel {}", id)));
        }
        Ok(tunnel)
    }

    async fn delete_tunnel(&self, id: &str) -> Result<()> {
        let path = format!("accounts/{}/cfd_tunnel/{}", self.account_id, id);
        self.request(Method::DELETE, &path, None, &[]).await?;
        Ok(())
    }

    async fn find_tunnel(&self, name: &str) -> Result<Option<Tunnel>> {
        let path = format!("accounts/{}/cfd_tunnel", self.account_id);
        let tunnels: Vec<Tunnel> = decode(
            self.request(
                Method::GET,
                &path,
                None,
                &[("name", name), ("is_deleted", "false")],
            )
            .await?,
        )?;
        Ok(tunnels
            .into_iter()
            .find(|tunnel| tunnel.name == name && tunnel.deleted_at.is_none()))
    }

    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        let zones: Vec<Zone> = decode(
            self.request(Method::GET, "zones", None, &[("name", name)])
                .await?,
        )?;
        Ok(zones.into_iter().find(|zone| zone.name == name))
    }

    async fn create_zone(&self, name: &str) -> Result<Zone> {
        let body = json!({
            "name": name,
            "account": { "id": self.account_id },
            "jump_start": true,
        });
        decode(self.request(Method::POST, "zones", Some(body), &[]).await?)
    }

    async fn delete_zone(&self, id: &str) -> Result<()> {
        let path = format!("zones/{}", id);
        self.request(Method::DELETE, &path, None, &[]).await?;
        Ok(())
    }

    async fn find_dns_record(&self, zone_id: &str, name: &str) -> Result<Option<DnsRecord>> {
        let path = format!("zones/{}/dns_records", zone_id);
        let records: Vec<DnsRecord> =
            decode(self.request(Method::GET, &path, None, &[("name", name)]).await?)?;
        Ok(records.into_iter().next())
    }

    async fn create_dns_record(&self, zone_id: &str, record: &DnsRecordSpec) -> Result<DnsRecord> {
        let path = format!("zones/{}/dns_records", zone_id);
        let body = serde_json::to_value(record)?;
        decode(self.request(Method::POST, &path, Some(body), &[]).await?)
    }

    async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecordSpec,
    ) -> Result<DnsRecord> {
        let path = format!("zones/{}/dns_records/{}", zone_id, record_id);
        let body = serde_json::to_value(record)?;
        decode(self.request(Method::PUT, &path, Some(body), &[]).await?)
    }
}
