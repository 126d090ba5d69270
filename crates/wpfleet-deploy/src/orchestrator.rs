//! Provisioning pipeline
//!
//! Brings one tenant's site from nothing to publicly reachable:
//!
//! 1. isolated network
//! 2. database container (blocks until `mysqladmin ping` succeeds)
//! 3. application container, port 80 published to a runtime-assigned host port
//! 4. tunnel agent installed inside the application container
//! 5. provider tunnel
//! 6. DNS zone (reused when it already exists)
//! 7. proxied CNAMEs for the apex and `www.`
//! 8. agent credentials + ingress config written, agent started
//! 9. installation registered
//!
//! Steps run strictly one after another, each under the configured step
//! timeout. A failure anywhere in 1-8 unwinds the [`RollbackLedger`] and is
//! returned as [`DeployError::Provisioning`]. A failure in 9 leaves every
//! resource in place and is returned as [`DeployError::Unregistered`].

use crate::agent::{self, LOCAL_SERVICE};
use crate::error::{DeployError, Result, StepError};
use crate::ledger::{Compensation, RollbackLedger};
use crate::secret::{generate_db_password, generate_tunnel_secret};
use crate::step::Step;
use chrono::{DateTime, SubsecRound, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use wpfleet_cloudflare::{
    CreatedTunnel, DnsRecordSpec, IngressConfig, NetworkingProvider, Zone, tunnel_target,
};
use wpfleet_config::DeploySettings;
use wpfleet_container::{ContainerError, ContainerRuntime, ContainerSpec, wait_until_ready};
use wpfleet_core::{
    ContainerRef, Installation, NetworkRef, ProviderRef, ProvisionRequest, ResourceNames,
};
use wpfleet_registry::InstallationStore;

const NETWORK_DRIVER: &str = "bridge";
const APP_PORT: u16 = 80;
const DB_NAME: &str = "wordpress";
const DB_USER: &str = "wordpress";

/// Orchestrates provisioning and lifecycle operations over the three backends
pub struct Deployer {
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) provider: Arc<dyn NetworkingProvider>,
    pub(crate) registry: Arc<dyn InstallationStore>,
    pub(crate) settings: DeploySettings,
}

struct StepFailure {
    step: Step,
    source: StepError,
}

impl Deployer {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        provider: Arc<dyn NetworkingProvider>,
        registry: Arc<dyn InstallationStore>,
        settings: DeploySettings,
    ) -> Self {
        Self {
            runtime,
            provider,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// Provision a new installation, stamped with the current time
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<Installation> {
        self.provision_at(request, Utc::now().trunc_subsecs(0)).await
    }

    /// Provision a new installation with an explicit creation instant
    pub async fn provision_at(
        &self,
        request: &ProvisionRequest,
        instant: DateTime<Utc>,
    ) -> Result<Installation> {
        request.validate()?;

        if self.registry.contains(&request.tenant_id).await? {
            return Err(DeployError::Conflict(request.tenant_id.clone()));
        }

        let names = ResourceNames::derive(&request.tenant_id, instant);
        info!("Provisioning '{}' ({})", request.tenant_id, names);

        let mut ledger = RollbackLedger::new();
        let installation = match self
            .run_pipeline(request, instant, &names, &mut ledger)
            .await
        {
            Ok(installation) => installation,
            Err(StepFailure { step, source }) => {
                error!("Step {} failed for '{}': {}", step, request.tenant_id, source);
                warn!("Rolling back {} recorded action(s)", ledger.len());

                let rollback = ledger
                    .unwind(self.runtime.as_ref(), self.provider.as_ref())
                    .await;
                if !rollback.is_clean() {
                    warn!(
                        "Rollback left {} resource(s) behind for '{}'",
                        rollback.failed.len(),
                        request.tenant_id
                    );
                }

                return Err(DeployError::Provisioning {
                    tenant_id: request.tenant_id.clone(),
                    step,
                    resources: names,
                    source,
                    rollback,
                });
            }
        };

        info!("[{}]", Step::Register);
        if let Err(source) = self.registry.put(&installation).await {
            error!(
                "'{}' is live but was not registered: {}",
                request.tenant_id, source
            );
            return Err(DeployError::Unregistered {
                tenant_id: request.tenant_id.clone(),
                installation: Box::new(installation),
                source,
            });
        }

        info!("Provisioned '{}': {}", installation.tenant_id, installation.site_url());
        Ok(installation)
    }

    /// Retry only the registry write for an installation that is already live
    pub async fn recover_registration(&self, installation: &Installation) -> Result<()> {
        if self.registry.contains(&installation.tenant_id).await? {
            return Err(DeployError::Conflict(installation.tenant_id.clone()));
        }
        self.registry.put(installation).await?;
        info!("Registered '{}'", installation.tenant_id);
        Ok(())
    }

    async fn run_step<T, F>(&self, step: Step, work: F) -> std::result::Result<T, StepFailure>
    where
        F: Future<Output = std::result::Result<T, StepError>>,
    {
        info!("[{}]", step);
        let limit = self.settings.step_timeout();

        match tokio::time::timeout(limit, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(StepFailure { step, source }),
            Err(_) => Err(StepFailure {
                step,
                source: StepError::Timeout(limit),
            }),
        }
    }

    async fn run_pipeline(
        &self,
        request: &ProvisionRequest,
        instant: DateTime<Utc>,
        names: &ResourceNames,
        ledger: &mut RollbackLedger,
    ) -> std::result::Result<Installation, StepFailure> {
        let db_password = generate_db_password();

        // Names are fixed up front, so compensations can be recorded before
        // the runtime call; removing something that never appeared is a no-op.
        ledger.push(Compensation::RemoveNetwork {
            name: names.network.clone(),
        });
        let network = self
            .run_step(Step::Network, self.create_network(names))
            .await?;

        ledger.push(Compensation::RemoveContainer {
            name: names.db_container.clone(),
        });
        let db_container = self
            .run_step(Step::Database, self.start_database(names, &db_password))
            .await?;

        ledger.push(Compensation::RemoveContainer {
            name: names.app_container.clone(),
        });
        let (app_container, published_port) = self
            .run_step(
                Step::Application,
                self.start_application(names, &request.domain, &db_password),
            )
            .await?;

        self.run_step(Step::TunnelAgent, self.install_tunnel_agent(names))
            .await?;

        // The provider assigns the id, so the compensation goes by name
        ledger.push(Compensation::DeleteTunnelNamed {
            name: names.tunnel.clone(),
        });
        let tunnel = self
            .run_step(Step::Tunnel, self.create_tunnel(names))
            .await?;

        let zone = self
            .run_step(Step::Zone, self.resolve_zone(&request.domain, ledger))
            .await?;

        self.run_step(
            Step::DnsRecords,
            self.upsert_dns_records(&zone, &request.domain, &tunnel.tunnel.id),
        )
        .await?;

        self.run_step(
            Step::TunnelConfig,
            self.start_tunnel_agent(names, &request.domain, &tunnel),
        )
        .await?;

        Ok(Installation {
            tenant_id: request.tenant_id.clone(),
            domain: request.domain.clone(),
            contact_email: request.contact_email.clone(),
            creation_instant: instant,
            app_container,
            db_container,
            network,
            published_port,
            db_credential: db_password,
            tunnel: ProviderRef {
                id: tunnel.tunnel.id,
                name: tunnel.tunnel.name,
            },
            zone: ProviderRef {
                id: zone.id,
                name: zone.name,
            },
            nameservers: zone.name_servers,
        })
    }

    async fn create_network(
        &self,
        names: &ResourceNames,
    ) -> std::result::Result<NetworkRef, StepError> {
        let network = self
            .runtime
            .create_network(&names.network, NETWORK_DRIVER)
            .await?;
        info!("Network ready: {}", network.name);
        Ok(network)
    }

    async fn start_database(
        &self,
        names: &ResourceNames,
        password: &str,
    ) -> std::result::Result<ContainerRef, StepError> {
        let spec = ContainerSpec::new(&self.settings.db_image, &names.db_container, &names.network)
            .env("MYSQL_ROOT_PASSWORD", password)
            .env("MYSQL_DATABASE", DB_NAME)
            .env("MYSQL_USER", DB_USER)
            .env("MYSQL_PASSWORD", password);

        let info = self.runtime.run_container(&spec).await?;
        info!("Database container started: {}", info.name);

        wait_until_ready(
            self.runtime.as_ref(),
            &info.name,
            &agent::mysql_probe(password),
            &self.settings.readiness,
        )
        .await?;
        info!("Database is accepting connections");

        Ok(ContainerRef {
            name: info.name,
            id: info.id,
        })
    }

    async fn start_application(
        &self,
        names: &ResourceNames,
        domain: &str,
        db_password: &str,
    ) -> std::result::Result<(ContainerRef, u16), StepError> {
        let site_url = format!("https://{}", domain);
        let config_extra = format!(
            "define('WP_HOME', '{url}');\ndefine('WP_SITEURL', '{url}');",
            url = site_url
        );

        let spec =
            ContainerSpec::new(&self.settings.app_image, &names.app_container, &names.network)
                .env("WORDPRESS_DB_HOST", &names.db_container)
                .env("WORDPRESS_DB_USER", DB_USER)
                .env("WORDPRESS_DB_PASSWORD", db_password)
                .env("WORDPRESS_DB_NAME", DB_NAME)
                .env("WORDPRESS_CONFIG_EXTRA", config_extra)
                .publish(APP_PORT);

        let info = self.runtime.run_container(&spec).await?;
        let port = info.host_port.ok_or_else(|| ContainerError::PortNotPublished {
            container: info.name.clone(),
            port: APP_PORT,
        })?;
        info!("Application container started: {} (host port {})", info.name, port);

        Ok((
            ContainerRef {
                name: info.name,
                id: info.id,
            },
            port,
        ))
    }

    async fn install_tunnel_agent(
        &self,
        names: &ResourceNames,
    ) -> std::result::Result<(), StepError> {
        for command in agent::install_commands(&self.settings.tunnel_agent_url) {
            self.exec_checked(&names.app_container, &command).await?;
        }
        info!("Tunnel agent installed in {}", names.app_container);
        Ok(())
    }

    async fn create_tunnel(
        &self,
        names: &ResourceNames,
    ) -> std::result::Result<CreatedTunnel, StepError> {
        let secret = generate_tunnel_secret();
        let created = self.provider.create_tunnel(&names.tunnel, &secret).await?;
        info!("Tunnel created: {} ({})", created.tunnel.name, created.tunnel.id);
        Ok(created)
    }

    async fn resolve_zone(
        &self,
        domain: &str,
        ledger: &mut RollbackLedger,
    ) -> std::result::Result<Zone, StepError> {
        if let Some(zone) = self.provider.find_zone(domain).await? {
            // Pre-existing zones are never rolled back
            info!("Reusing existing zone {} ({})", zone.name, zone.id);
            return Ok(zone);
        }

        let zone = self.provider.create_zone(domain).await?;
        ledger.push(Compensation::DeleteZone {
            id: zone.id.clone(),
            name: zone.name.clone(),
        });
        info!("Zone created: {} ({})", zone.name, zone.id);
        Ok(zone)
    }

    async fn upsert_dns_records(
        &self,
        zone: &Zone,
        domain: &str,
        tunnel_id: &str,
    ) -> std::result::Result<(), StepError> {
        let target = tunnel_target(tunnel_id);
        for hostname in agent::hostnames(domain) {
            let record = DnsRecordSpec::proxied_cname(hostname, target.clone());
            self.provider.ensure_dns_record(&zone.id, &record).await?;
        }
        Ok(())
    }

    async fn start_tunnel_agent(
        &self,
        names: &ResourceNames,
        domain: &str,
        tunnel: &CreatedTunnel,
    ) -> std::result::Result<(), StepError> {
        let tunnel_id = &tunnel.tunnel.id;
        let credentials_path = agent::credentials_path(tunnel_id);
        let ingress = IngressConfig::for_hostnames(
            tunnel_id,
            &credentials_path,
            &agent::hostnames(domain),
            LOCAL_SERVICE,
        );

        let container = &names.app_container;
        self.exec_checked(
            container,
            &agent::write_file_command(&credentials_path, &tunnel.credentials.to_json()?),
        )
        .await?;
        self.exec_checked(
            container,
            &agent::write_file_command(agent::AGENT_CONFIG_PATH, &ingress.to_yaml()?),
        )
        .await?;
        self.exec_checked(container, &agent::start_command()).await?;

        info!("Tunnel agent started in {}", container);
        Ok(())
    }

    /// `exec`, treating a non-zero exit as a failure
    async fn exec_checked(
        &self,
        container: &str,
        command: &[String],
    ) -> std::result::Result<(), ContainerError> {
        let output = self.runtime.exec(container, command).await?;
        if !output.success() {
            return Err(ContainerError::ExecFailed {
                container: container.to_string(),
                command: command.join(" "),
                exit_code: output.exit_code,
                output: output.output,
            });
        }
        Ok(())
    }
}
