//! In-memory backends with fault injection

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wpfleet_cloudflare::{
    CloudflareError, CreatedTunnel, DnsRecord, DnsRecordSpec, NetworkingProvider, TokenStatus,
    Tunnel, TunnelCredentials, Zone,
};
use wpfleet_config::DeploySettings;
use wpfleet_container::{
    ContainerError, ContainerInfo, ContainerRuntime, ContainerSpec, ContainerState, ExecOutput,
};
use wpfleet_core::{Installation, NetworkRef, WaitConfig};
use wpfleet_deploy::Deployer;
use wpfleet_registry::{FileRegistry, InstallationStore, RegistryError};

/// What an armed fault does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Return an error (or a non-zero exit for `exec`)
    Fail,
    /// Never complete
    Hang,
}

/// Faults keyed by call-label prefix, e.g. `run_container:mysql_` or `exec:sh -c wget`
#[derive(Default)]
pub struct Faults {
    rules: Mutex<Vec<(String, Fault)>>,
}

impl Faults {
    pub fn arm(&self, prefix: &str, fault: Fault) {
        self.rules
            .lock()
            .unwrap()
            .push((prefix.to_string(), fault));
    }

    pub fn clear(&self) {
        self.rules.lock().unwrap().clear();
    }

    fn check(&self, label: &str) -> Option<Fault> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| label.starts_with(prefix.as_str()))
            .map(|(_, fault)| *fault)
    }
}

async fn hang() {
    std::future::pending::<()>().await
}

struct StubContainer {
    info: ContainerInfo,
    network: String,
}

#[derive(Default)]
struct RuntimeState {
    networks: HashMap<String, NetworkRef>,
    containers: HashMap<String, StubContainer>,
    specs: Vec<ContainerSpec>,
    calls: Vec<String>,
    next_port: u16,
    next_id: u32,
}

/// Container runtime kept entirely in memory
pub struct StubRuntime {
    state: Mutex<RuntimeState>,
    faults: Arc<Faults>,
}

impl StubRuntime {
    pub fn new(faults: Arc<Faults>) -> Self {
        Self {
            state: Mutex::new(RuntimeState {
                next_port: 49153,
                ..Default::default()
            }),
            faults,
        }
    }

    /// Every call so far, as `operation:argument`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.state.lock().unwrap().specs.clone()
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .containers
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn network_names(&self) -> Vec<String> {
        self.state.lock().unwrap().networks.keys().cloned().collect()
    }

    /// Simulate a container removed behind our back
    pub fn remove_externally(&self, name: &str) {
        self.state.lock().unwrap().containers.remove(name);
    }

    /// Record the call and report any armed fault
    async fn enter(&self, label: String) -> Result<bool, ContainerError> {
        self.state.lock().unwrap().calls.push(label.clone());
        match self.faults.check(&label) {
            Some(Fault::Hang) => {
                hang().await;
                Ok(true)
            }
            Some(Fault::Fail) => Ok(true),
            None => Ok(false),
        }
    }

    fn injected(label: &str) -> ContainerError {
        ContainerError::DockerApiError(format!("injected fault: {}", label))
    }
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn create_network(&self, name: &str, _driver: &str) -> wpfleet_container::Result<NetworkRef> {
        let label = format!("create_network:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }

        let mut state = self.state.lock().unwrap();
        if state.networks.contains_key(name) {
            return Err(ContainerError::DockerApiError(format!(
                "network {} already exists",
                name
            )));
        }
        state.next_id += 1;
        let network = NetworkRef {
            name: name.to_string(),
            id: format!("net-{}", state.next_id),
        };
        state.networks.insert(name.to_string(), network.clone());
        Ok(network)
    }

    async fn inspect_network(&self, name: &str) -> wpfleet_container::Result<NetworkRef> {
        let label = format!("inspect_network:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }
        self.state
            .lock()
            .unwrap()
            .networks
            .get(name)
            .cloned()
            .ok_or(ContainerError::NetworkNotFound {
                network: name.to_string(),
            })
    }

    async fn remove_network(&self, name: &str) -> wpfleet_container::Result<()> {
        let label = format!("remove_network:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }

        let mut state = self.state.lock().unwrap();
        if state.containers.values().any(|c| c.network == name) {
            return Err(ContainerError::DockerApiError(format!(
                "network {} has active endpoints",
                name
            )));
        }
        state
            .networks
            .remove(name)
            .map(|_| ())
            .ok_or(ContainerError::NetworkNotFound {
                network: name.to_string(),
            })
    }

    async fn run_container(&self, spec: &ContainerSpec) -> wpfleet_container::Result<ContainerInfo> {
        let label = format!("run_container:{}", spec.name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }

        let mut state = self.state.lock().unwrap();
        if !state.networks.contains_key(&spec.network) {
            return Err(ContainerError::NetworkNotFound {
                network: spec.network.clone(),
            });
        }
        if state.containers.contains_key(&spec.name) {
            return Err(ContainerError::DockerApiError(format!(
                "container {} already exists",
                spec.name
            )));
        }

        let host_port = spec.publish_port.map(|_| {
            state.next_port += 1;
            state.next_port
        });
        state.next_id += 1;
        let info = ContainerInfo {
            name: spec.name.clone(),
            id: format!("ctr-{}", state.next_id),
            state: ContainerState::Running,
            host_port,
        };
        state.specs.push(spec.clone());
        state.containers.insert(
            spec.name.clone(),
            StubContainer {
                info: info.clone(),
                network: spec.network.clone(),
            },
        );
        Ok(info)
    }

    async fn inspect_container(&self, name: &str) -> wpfleet_container::Result<ContainerInfo> {
        let label = format!("inspect_container:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .map(|c| c.info.clone())
            .ok_or(ContainerError::ContainerNotFound {
                container: name.to_string(),
            })
    }

    async fn exec(&self, container: &str, command: &[String]) -> wpfleet_container::Result<ExecOutput> {
        let label = format!("exec:{}", command.join(" "));
        let failed = self.enter(label).await?;

        let state = self.state.lock().unwrap();
        match state.containers.get(container) {
            Some(c) if c.info.state == ContainerState::Running => Ok(ExecOutput {
                exit_code: if failed { 1 } else { 0 },
                output: if failed {
                    "injected failure".to_string()
                } else {
                    String::new()
                },
            }),
            Some(_) => Err(ContainerError::DockerApiError(format!(
                "container {} is not running",
                container
            ))),
            None => Err(ContainerError::ContainerNotFound {
                container: container.to_string(),
            }),
        }
    }

    async fn restart_container(&self, name: &str) -> wpfleet_container::Result<()> {
        let label = format!("restart_container:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(c) => {
                c.info.state = ContainerState::Running;
                Ok(())
            }
            None => Err(ContainerError::ContainerNotFound {
                container: name.to_string(),
            }),
        }
    }

    async fn logs(&self, name: &str, tail: usize) -> wpfleet_container::Result<String> {
        let label = format!("logs:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }
        if self.state.lock().unwrap().containers.contains_key(name) {
            Ok(format!("{} (last {} lines)\n", name, tail))
        } else {
            Err(ContainerError::ContainerNotFound {
                container: name.to_string(),
            })
        }
    }

    async fn stop_container(&self, name: &str) -> wpfleet_container::Result<()> {
        let label = format!("stop_container:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(c) => {
                c.info.state = ContainerState::Stopped;
                Ok(())
            }
            None => Err(ContainerError::ContainerNotFound {
                container: name.to_string(),
            }),
        }
    }

    async fn remove_container(&self, name: &str) -> wpfleet_container::Result<()> {
        let label = format!("remove_container:{}", name);
        if self.enter(label.clone()).await? {
            return Err(Self::injected(&label));
        }
        self.state
            .lock()
            .unwrap()
            .containers
            .remove(name)
            .map(|_| ())
            .ok_or(ContainerError::ContainerNotFound {
                container: name.to_string(),
            })
    }
}

#[derive(Default)]
struct ProviderState {
    tunnels: HashMap<String, Tunnel>,
    zones: HashMap<String, Zone>,
    records: HashMap<(String, String), DnsRecord>,
    calls: Vec<String>,
    next_id: u32,
}

/// Networking provider kept entirely in memory
pub struct StubProvider {
    state: Mutex<ProviderState>,
    faults: Arc<Faults>,
}

pub const ACCOUNT_ID: &str = "acct-test";

impl StubProvider {
    pub fn new(faults: Arc<Faults>) -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
            faults,
        }
    }

    /// Pre-existing zone, as if created outside wpfleet
    pub fn seed_zone(&self, name: &str) -> Zone {
        let zone = Zone {
            id: format!("existing-{}", name),
            name: name.to_string(),
            name_servers: vec!["ada.ns.example".to_string(), "bob.ns.example".to_string()],
        };
        self.state
            .lock()
            .unwrap()
            .zones
            .insert(zone.id.clone(), zone.clone());
        zone
    }

    pub fn seed_record(&self, zone_id: &str, name: &str, content: &str) -> DnsRecord {
        let record = DnsRecord {
            id: format!("existing-record-{}", name),
            name: name.to_string(),
            record_type: "A".to_string(),
            content: content.to_string(),
            proxied: false,
        };
        self.state
            .lock()
            .unwrap()
            .records
            .insert((zone_id.to_string(), name.to_string()), record.clone());
        record
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn tunnel_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().tunnels.keys().cloned().collect()
    }

    pub fn zone_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .zones
            .values()
            .map(|z| z.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn record(&self, zone_id: &str, name: &str) -> Option<DnsRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&(zone_id.to_string(), name.to_string()))
            .cloned()
    }

    pub fn delete_tunnel_externally(&self, id: &str) {
        self.state.lock().unwrap().tunnels.remove(id);
    }

    async fn enter(&self, label: String) -> wpfleet_cloudflare::Result<()> {
        self.state.lock().unwrap().calls.push(label.clone());
        match self.faults.check(&label) {
            Some(Fault::Hang) => {
                hang().await;
                Ok(())
            }
            Some(Fault::Fail) => Err(CloudflareError::ApiError {
                status: 500,
                message: format!("injected fault: {}", label),
            }),
            None => Ok(()),
        }
    }

    fn next_id(state: &mut ProviderState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{}-{}", prefix, state.next_id)
    }
}

#[async_trait]
impl NetworkingProvider for StubProvider {
    async fn verify_credentials(&self) -> wpfleet_cloudflare::Result<TokenStatus> {
        self.enter("verify_credentials".to_string()).await?;
        Ok(TokenStatus {
            id: "token-1".to_string(),
            status: "active".to_string(),
        })
    }

    async fn create_tunnel(&self, name: &str, secret: &str) -> wpfleet_cloudflare::Result<CreatedTunnel> {
        self.enter(format!("create_tunnel:{}", name)).await?;
        let tunnel = {
            let mut state = self.state.lock().unwrap();
            let tunnel = Tunnel {
                id: Self::next_id(&mut state, "tunnel"),
                name: name.to_string(),
                deleted_at: None,
            };
            state.tunnels.insert(tunnel.id.clone(), tunnel.clone());
            tunnel
        };
        // Created on the provider side, but the response never arrives
        if let Some(Fault::Hang) = self.faults.check(&format!("created_tunnel:{}", name)) {
            hang().await;
        }
        Ok(CreatedTunnel {
            credentials: TunnelCredentials {
                account_tag: ACCOUNT_ID.to_string(),
                tunnel_id: tunnel.id.clone(),
                tunnel_secret: secret.to_string(),
            },
            tunnel,
        })
    }

    async fn get_tunnel(&self, id: &str) -> wpfleet_cloudflare::Result<Tunnel> {
        self.enter(format!("get_tunnel:{}", id)).await?;
        self.state
            .lock()
            .unwrap()
            .tunnels
            .get(id)
            .cloned()
            .ok_or_else(|| CloudflareError::NotFound(format!("tunnel {}", id)))
    }

    async fn delete_tunnel(&self, id: &str) -> wpfleet_cloudflare::Result<()> {
        self.enter(format!("delete_tunnel:{}", id)).await?;
        self.state
            .lock()
            .unwrap()
            .tunnels
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CloudflareError::NotFound(format!("tunnel {}", id)))
    }

    async fn find_tunnel(&self, name: &str) -> wpfleet_cloudflare::Result<Option<Tunnel>> {
        self.enter(format!("find_tunnel:{}", name)).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .tunnels
            .values()
            .find(|tunnel| tunnel.name == name)
            .cloned())
    }

    async fn find_zone(&self, name: &str) -> wpfleet_cloudflare::Result<Option<Zone>> {
        self.enter(format!("find_zone:{}", name)).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .zones
            .values()
            .find(|z| z.name == name)
            .cloned())
    }

    async fn create_zone(&self, name: &str) -> wpfleet_cloudflare::Result<Zone> {
        self.enter(format!("create_zone:{}", name)).await?;
        let mut state = self.state.lock().unwrap();
        let zone = Zone {
            id: Self::next_id(&mut state, "zone"),
            name: name.to_string(),
            name_servers: vec!["kim.ns.example".to_string(), "lee.ns.example".to_string()],
        };
        state.zones.insert(zone.id.clone(), zone.clone());
        Ok(zone)
    }

    async fn delete_zone(&self, id: &str) -> wpfleet_cloudflare::Result<()> {
        self.enter(format!("delete_zone:{}", id)).await?;
        let mut state = self.state.lock().unwrap();
        if state.zones.remove(id).is_none() {
            return Err(CloudflareError::NotFound(format!("zone {}", id)));
        }
        state.records.retain(|(zone_id, _), _| zone_id != id);
        Ok(())
    }

    async fn find_dns_record(
        &self,
        zone_id: &str,
        name: &str,
    ) -> wpfleet_cloudflare::Result<Option<DnsRecord>> {
        self.enter(format!("find_dns_record:{}", name)).await?;
        Ok(self.record(zone_id, name))
    }

    async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &DnsRecordSpec,
    ) -> wpfleet_cloudflare::Result<DnsRecord> {
        self.enter(format!("create_dns_record:{}", record.name)).await?;
        let mut state = self.state.lock().unwrap();
        if !state.zones.contains_key(zone_id) {
            return Err(CloudflareError::NotFound(format!("zone {}", zone_id)));
        }
        let created = DnsRecord {
            id: Self::next_id(&mut state, "record"),
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            content: record.content.clone(),
            proxied: record.proxied,
        };
        state
            .records
            .insert((zone_id.to_string(), record.name.clone()), created.clone());
        Ok(created)
    }

    async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecordSpec,
    ) -> wpfleet_cloudflare::Result<DnsRecord> {
        self.enter(format!("update_dns_record:{}", record.name)).await?;
        let updated = DnsRecord {
            id: record_id.to_string(),
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            content: record.content.clone(),
            proxied: record.proxied,
        };
        self.state
            .lock()
            .unwrap()
            .records
            .insert((zone_id.to_string(), record.name.clone()), updated.clone());
        Ok(updated)
    }
}

/// Registry whose writes can be switched off
#[derive(Default)]
pub struct FlakyRegistry {
    records: Mutex<BTreeMap<String, Installation>>,
    pub fail_puts: AtomicBool,
}

#[async_trait]
impl InstallationStore for FlakyRegistry {
    async fn put(&self, installation: &Installation) -> wpfleet_registry::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(RegistryError::Io(std::io::Error::other("disk full")));
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&installation.tenant_id) {
            return Err(RegistryError::AlreadyExists(installation.tenant_id.clone()));
        }
        records.insert(installation.tenant_id.clone(), installation.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: &str) -> wpfleet_registry::Result<Installation> {
        self.records
            .lock()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(tenant_id.to_string()))
    }

    async fn list(&self) -> wpfleet_registry::Result<Vec<Installation>> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn remove(&self, tenant_id: &str) -> wpfleet_registry::Result<Installation> {
        self.records
            .lock()
            .unwrap()
            .remove(tenant_id)
            .ok_or_else(|| RegistryError::NotFound(tenant_id.to_string()))
    }
}

/// Settings tuned for fast tests
pub fn fast_settings() -> DeploySettings {
    DeploySettings {
        step_timeout_secs: 5,
        readiness: WaitConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            multiplier: 2.0,
        },
        ..DeploySettings::default()
    }
}

pub fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Deployer wired to stubs and a registry file in a temp dir
pub struct Harness {
    pub faults: Arc<Faults>,
    pub runtime: Arc<StubRuntime>,
    pub provider: Arc<StubProvider>,
    pub registry: Arc<FileRegistry>,
    pub deployer: Deployer,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(fast_settings())
    }

    pub fn with_settings(settings: DeploySettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let faults = Arc::new(Faults::default());
        let runtime = Arc::new(StubRuntime::new(faults.clone()));
        let provider = Arc::new(StubProvider::new(faults.clone()));
        let registry = Arc::new(FileRegistry::new(dir.path().join("installations.json")));
        let deployer = Deployer::new(
            runtime.clone(),
            provider.clone(),
            registry.clone(),
            settings,
        );

        Self {
            faults,
            runtime,
            provider,
            registry,
            deployer,
            _dir: dir,
        }
    }
}
