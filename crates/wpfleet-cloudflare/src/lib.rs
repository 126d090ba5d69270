//! Cloudflare client for wpfleet
//!
//! Covers the slice of the Cloudflare v4 API that public ingress needs:
//! named tunnels, zones and DNS records. Every response is wrapped in the
//! provider's envelope (`success` / `errors` / `result`); [`unwrap_envelope`]
//! turns that into a plain result-or-error.
//!
//! # Example
//!
//! ```ignore
//! use wpfleet_cloudflare::{CloudflareClient, CloudflareConfig, NetworkingProvider};
//!
//! let client = CloudflareClient::new(CloudflareConfig::new("token", "account-id"))?;
//! client.verify_credentials().await?;
//!
//! let zone = match client.find_zone("example.com").await? {
//!     Some(zone) => zone,
//!     None => client.create_zone("example.com").await?,
//! };
//! ```

pub mod client;
pub mod error;
pub mod provider;
pub mod tunnel;

pub use client::{CloudflareClient, CloudflareConfig, unwrap_envelope};
pub use error::{CloudflareError, Result};
pub use provider::{
    CreatedTunnel, DnsRecord, DnsRecordSpec, NetworkingProvider, TokenStatus, Tunnel, Zone,
};
pub use tunnel::{IngressConfig, IngressRule, TunnelCredentials, tunnel_target};
