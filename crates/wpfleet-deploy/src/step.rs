use serde::{Deserialize, Serialize};

/// Provisioning pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Network,
    Database,
    Application,
    TunnelAgent,
    Tunnel,
    Zone,
    DnsRecords,
    TunnelConfig,
    Register,
}

impl Step {
    pub const PIPELINE: [Step; 9] = [
        Step::Network,
        Step::Database,
        Step::Application,
        Step::TunnelAgent,
        Step::Tunnel,
        Step::Zone,
        Step::DnsRecords,
        Step::TunnelConfig,
        Step::Register,
    ];

    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        Self::PIPELINE
            .iter()
            .position(|s| *s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::Network => "create network",
            Step::Database => "start database",
            Step::Application => "start application",
            Step::TunnelAgent => "install tunnel agent",
            Step::Tunnel => "create tunnel",
            Step::Zone => "resolve zone",
            Step::DnsRecords => "upsert DNS records",
            Step::TunnelConfig => "configure and start tunnel agent",
            Step::Register => "register installation",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} {}",
            self.number(),
            Self::PIPELINE.len(),
            self.description()
        )
    }
}
