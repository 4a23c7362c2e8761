//! Service configuration, loaded from environment variables.
//!
//! The entire configuration lives in environment variables carrying the
//! `brewbee_` prefix, matched case-insensitively. Variables sharing the prefix
//! but not matching a known option are ignored, so the service can coexist
//! with orchestration tooling that injects extra `BREWBEE_*` values.
//!
//! The snapshot is loaded once at startup, validated, wrapped in an `Arc` and
//! passed explicitly to every component that needs it. It is never mutated
//! afterwards.

use std::{fmt, time::Duration};

use validator::{Validate, ValidationError};

pub mod logger;

/// Environment variable prefix, matched case-insensitively.
pub const ENV_PREFIX: &str = "brewbee_";

/// Simple macros for printing timestamped messages before the tracing
/// subscriber is initialized. These are used during early configuration
/// loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::macros::format_description!(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ))
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::macros::format_description!(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ))
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::macros::format_description!(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ))
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An option carried a value that could not be parsed.
    #[error("Invalid value for option '{option}': {reason}")]
    ParseError { option: String, reason: String },

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Scheme used to reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrokerProtocol {
    /// Plain TCP (`mqtt://`).
    #[default]
    Plain,
    /// TLS (`mqtts://`).
    Secure,
}

impl BrokerProtocol {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "plain" | "mqtt" => Some(BrokerProtocol::Plain),
            "secure" | "mqtts" => Some(BrokerProtocol::Secure),
            _ => None,
        }
    }
}

impl fmt::Display for BrokerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerProtocol::Plain => write!(f, "mqtt"),
            BrokerProtocol::Secure => write!(f, "mqtts"),
        }
    }
}

/// Immutable service configuration snapshot.
///
/// Loaded once per process via [`ServiceConfig::from_env`] and shared by
/// reference from then on.
#[derive(Debug, Clone, Validate)]
pub struct ServiceConfig {
    /// Service name; used as message key, topic segment and MQTT client id.
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    /// Enables debug-level logging.
    pub debug: bool,

    /// Scheme used to reach the broker.
    pub broker_protocol: BrokerProtocol,

    /// Broker hostname.
    #[validate(length(min = 1, message = "Broker host must not be empty"))]
    pub broker_host: String,

    /// Broker port.
    #[validate(range(min = 1, message = "Broker port must be non-zero"))]
    pub broker_port: u16,

    /// Topic namespace all published topics live under.
    #[validate(length(min = 1, message = "Topic prefix must not be empty"))]
    pub topic_prefix: String,

    /// Pause between publish iterations.
    #[validate(custom(function = validate_interval))]
    pub publish_interval: Duration,

    /// URL of the controller backend this service fronts.
    pub backend_url: String,

    /// Runs against a simulated controller instead of real hardware.
    pub simulation: bool,
}

fn validate_interval(interval: &Duration) -> Result<(), ValidationError> {
    if interval.is_zero() {
        let mut err = ValidationError::new("invalid_interval");
        err.message = Some("Publish interval must be positive".into());
        return Err(err);
    }
    Ok(())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            name: "brewbee".to_string(),
            debug: false,
            broker_protocol: BrokerProtocol::Plain,
            broker_host: "eventbus".to_string(),
            broker_port: 1883,
            topic_prefix: "brewcast".to_string(),
            publish_interval: Duration::from_secs(5),
            backend_url: "http://brewbee".to_string(),
            simulation: false,
        }
    }
}

impl ServiceConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a recognized option fails to parse or the
    /// resulting snapshot fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Loads the configuration from an explicit variable set.
    ///
    /// Split out from [`from_env`](Self::from_env) so tests can feed
    /// synthetic environments without touching process-global state.
    pub fn from_vars(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let mut config = ServiceConfig::default();

        for (key, value) in vars {
            let lowered = key.to_ascii_lowercase();
            let Some(option) = lowered.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            match option {
                "name" => config.name = value,
                "debug" => config.debug = parse_bool(option, &value)?,
                "broker_protocol" => {
                    config.broker_protocol =
                        BrokerProtocol::parse(&value).ok_or_else(|| ConfigError::ParseError {
                            option: option.to_string(),
                            reason: format!(
                                "expected 'plain'/'mqtt' or 'secure'/'mqtts', got '{value}'"
                            ),
                        })?
                }
                "broker_host" => config.broker_host = value,
                "broker_port" => {
                    config.broker_port = value.parse().map_err(|e| ConfigError::ParseError {
                        option: option.to_string(),
                        reason: format!("{e}"),
                    })?
                }
                "topic_prefix" => config.topic_prefix = value,
                "publish_interval" => config.publish_interval = parse_seconds(option, &value)?,
                "backend_url" => config.backend_url = value,
                "simulation" => config.simulation = parse_bool(option, &value)?,
                // Unrecognized options sharing the prefix are ignored, not
                // rejected.
                other => {
                    tracing::debug!("Ignoring unrecognized option '{}{}'", ENV_PREFIX, other);
                }
            }
        }

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    /// Maps the broker-related fields onto the broker crate's configuration.
    pub fn broker_config(&self) -> brewbee_mqtt::Config {
        brewbee_mqtt::Config {
            protocol: match self.broker_protocol {
                BrokerProtocol::Plain => brewbee_mqtt::Protocol::Plain,
                BrokerProtocol::Secure => brewbee_mqtt::Protocol::Secure,
            },
            host: self.broker_host.clone(),
            port: self.broker_port,
            client_id: self.name.clone(),
            ..Default::default()
        }
    }
}

fn parse_bool(option: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::ParseError {
            option: option.to_string(),
            reason: format!("expected a boolean, got '{value}'"),
        }),
    }
}

fn parse_seconds(option: &str, value: &str) -> Result<Duration, ConfigError> {
    let seconds: f64 = value.parse().map_err(|e| ConfigError::ParseError {
        option: option.to_string(),
        reason: format!("{e}"),
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::ParseError {
            option: option.to_string(),
            reason: format!("expected a non-negative number of seconds, got '{value}'"),
        });
    }
    Ok(Duration::from_secs_f64(seconds))
}
