use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: Option<String>,
    pub server_key: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconciliationConfig {
    /// Shared secret the external scheduler presents as a bearer token.
    pub trigger_secret: String,
    /// Enrollments expiring within this many days get a renewal invoice.
    pub renewal_window_days: i64,
    /// An unpaid invoice younger than this suppresses a new renewal.
    pub renewal_gate_days: i64,
    /// Length of the billing period on a renewal invoice.
    pub billing_period_days: i64,
    /// How long an expired enrollment keeps its section slot reserved.
    pub grace_period_days: i64,
    /// How long a renewal invoice/payment stays payable.
    pub due_hours: i64,
    /// Fixed business-timezone offset used for "today" reminder windows.
    pub utc_offset_hours: i32,
    /// Run-lease time-to-live; a crashed run stops blocking after this.
    pub lease_ttl_minutes: i64,
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            server_key: None,
            enabled: false,
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            trigger_secret: "change-me-in-production".to_string(),
            renewal_window_days: 3,
            renewal_gate_days: 7,
            billing_period_days: 30,
            grace_period_days: 7,
            due_hours: 24,
            utc_offset_hours: 7,
            lease_ttl_minutes: 30,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("gateway.enabled", false)?
            .set_default("reconciliation.renewal_window_days", 3)?
            .set_default("reconciliation.renewal_gate_days", 7)?
            .set_default("reconciliation.billing_period_days", 30)?
            .set_default("reconciliation.grace_period_days", 7)?
            .set_default("reconciliation.due_hours", 24)?
            .set_default("reconciliation.utc_offset_hours", 7)?
            .set_default("reconciliation.lease_ttl_minutes", 30)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with TUTORIA__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("TUTORIA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://tutoria.db".to_string(),
                max_connections: 10,
            },
            gateway: GatewayConfig::default(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}
