use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::allocator::AllocatorConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub allocator: AllocatorSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            allocator: AllocatorSettings::from_env(),
        }
    }
}

/// Configuration for the log output.
///
/// Read separately from [`AppConfig`] because the subscriber has to exist
/// before the rest of the configuration can report problems.
#[derive(Clone, Debug)]
pub struct LogConfig {
    filter: String,
}

impl LogConfig {
    const DEFAULT_FILTER: &'static str = "info";
    const FILTER_VAR: &'static str = "SPLIT_IT_NOW_LOG";

    pub fn from_env() -> Self {
        let filter = env_string(Self::FILTER_VAR)
            .or_else(|| env_string("RUST_LOG"))
            .unwrap_or_else(|| Self::DEFAULT_FILTER.to_string());
        Self { filter }
    }

    /// Filter directive for `tracing_subscriber::EnvFilter`.
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        Self::from_values(
            env_string("SPLIT_IT_NOW_API_HOST"),
            env_string("SPLIT_IT_NOW_API_PORT"),
        )
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse SPLIT_IT_NOW_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "SPLIT_IT_NOW_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse SPLIT_IT_NOW_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the partition allocator.
#[derive(Clone, Debug, Default)]
pub struct AllocatorSettings {
    allocator: AllocatorConfig,
}

impl AllocatorSettings {
    const EPSILON_VAR: &'static str = "SPLIT_IT_NOW_ALLOCATOR_EPSILON";
    const CONSERVATION_VAR: &'static str = "SPLIT_IT_NOW_CONSERVATION_TOLERANCE";
    const REBALANCE_VAR: &'static str = "SPLIT_IT_NOW_REBALANCE";

    fn from_env() -> Self {
        let general_epsilon = parse_f64_setting(
            Self::EPSILON_VAR,
            env_string(Self::EPSILON_VAR),
            AllocatorConfig::DEFAULT_GENERAL_EPSILON,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted capacity tolerance may change which side items land on",
        );

        let conservation_tolerance = parse_f64_setting(
            Self::CONSERVATION_VAR,
            env_string(Self::CONSERVATION_VAR),
            AllocatorConfig::DEFAULT_CONSERVATION_TOLERANCE,
            |value| value > 0.0 && value < 1.0,
            "must be between 0 and 1",
            "Adjusted conservation tolerance may hide allocation defects",
        );

        let rebalance = env_string(Self::REBALANCE_VAR)
            .and_then(|raw| parse_bool(&raw, Self::REBALANCE_VAR))
            .unwrap_or(AllocatorConfig::DEFAULT_REBALANCE);

        let allocator = AllocatorConfig::builder()
            .general_epsilon(general_epsilon)
            .conservation_tolerance(conservation_tolerance)
            .rebalance(rebalance)
            .build();

        Self { allocator }
    }

    /// Returns the configured AllocatorConfig.
    pub fn allocator_config(&self) -> AllocatorConfig {
        self.allocator
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_f64_setting(
    var_name: &str,
    raw: Option<String>,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<f64>() {
        Ok(value) if !validator(value) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Ok(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                info!("{} ({} = {}).", notice, var_name, value);
            }
            value
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}
