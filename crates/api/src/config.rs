//! Runtime configuration, read from the environment once at startup.

use std::net::SocketAddr;
use std::time::Duration;

use asyncreply_auth::issuer::{DEFAULT_CLOCK_SKEW_SECS, DEFAULT_VALIDITY_SECS};
use asyncreply_auth::{DelegationPolicy, SigningKey};
use asyncreply_infra::backoff::{DEFAULT_DELAY_CEILING, DEFAULT_INITIAL_DELAY};
use asyncreply_infra::queue::in_memory::DEFAULT_CAPACITY;
use asyncreply_infra::operations::coordinator::DEFAULT_RETRY_AFTER;
use asyncreply_infra::{BackoffError, BackoffSchedule};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

impl ConfigError {
    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Listen address for the HTTP server.
    pub bind_addr: SocketAddr,
    /// Public base URL of this service; status URLs hang off it.
    pub base_url: String,
    /// Base URL that redeems delegated tokens.
    pub store_url: String,
    pub signing_key: SigningKey,
    pub delegation: DelegationPolicy,
    /// `Retry-After` sent with pending responses.
    pub retry_after: Duration,
    pub backoff: BackoffSchedule,
    /// Use the Redis Streams queue instead of the in-memory one.
    pub use_persistent_queue: bool,
    pub redis_url: Option<String>,
    /// Allow the in-memory queue and store, drained by an in-process worker.
    pub dev_mode: bool,
    /// Bound of the in-memory queue.
    pub queue_capacity: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("base_url", &self.base_url)
            .field("store_url", &self.store_url)
            .field("signing_key", &"[REDACTED]")
            .field("delegation", &self.delegation)
            .field("retry_after", &self.retry_after)
            .field("backoff", &self.backoff)
            .field("use_persistent_queue", &self.use_persistent_queue)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("dev_mode", &self.dev_mode)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl AppConfig {
    /// Defaults for everything except the two required settings.
    ///
    /// The object store is served from `base_url` unless overridden.
    pub fn new(base_url: impl Into<String>, signing_key: SigningKey) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store_url: base_url.clone(),
            base_url,
            signing_key,
            delegation: DelegationPolicy::default(),
            retry_after: DEFAULT_RETRY_AFTER,
            backoff: BackoffSchedule::default(),
            use_persistent_queue: false,
            redis_url: None,
            dev_mode: false,
            queue_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_delegation(mut self, delegation: DelegationPolicy) -> Self {
        self.delegation = delegation;
        self
    }

    /// Load configuration from `ASYNCREPLY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let base_url = env
            .string("ASYNCREPLY_BASE_URL")
            .ok_or(ConfigError::Missing("ASYNCREPLY_BASE_URL"))?;
        let signing_key = env
            .string("ASYNCREPLY_SIGNING_KEY")
            .ok_or(ConfigError::Missing("ASYNCREPLY_SIGNING_KEY"))?;
        let signing_key = SigningKey::new(signing_key.into_bytes())
            .map_err(|e| ConfigError::invalid("ASYNCREPLY_SIGNING_KEY", e.to_string()))?;

        let mut config = Self::new(base_url, signing_key);

        let bind_addr = env
            .string("ASYNCREPLY_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        config.bind_addr = bind_addr
            .parse()
            .map_err(|e| ConfigError::invalid("ASYNCREPLY_BIND_ADDR", format!("{e}")))?;

        if let Some(store_url) = env.string("ASYNCREPLY_STORE_URL") {
            config.store_url = store_url.trim_end_matches('/').to_string();
        }

        let validity = env
            .u64("ASYNCREPLY_TOKEN_VALIDITY_SECS")?
            .map_or(Ok(DEFAULT_VALIDITY_SECS), |v| secs_i64("ASYNCREPLY_TOKEN_VALIDITY_SECS", v))?;
        let skew = env
            .u64("ASYNCREPLY_TOKEN_SKEW_SECS")?
            .map_or(Ok(DEFAULT_CLOCK_SKEW_SECS), |v| secs_i64("ASYNCREPLY_TOKEN_SKEW_SECS", v))?;
        if validity == 0 {
            return Err(ConfigError::invalid(
                "ASYNCREPLY_TOKEN_VALIDITY_SECS",
                "must be greater than zero",
            ));
        }
        config.delegation = DelegationPolicy {
            validity: chrono::Duration::seconds(validity),
            clock_skew: chrono::Duration::seconds(skew),
        };

        if let Some(secs) = env.u64("ASYNCREPLY_RETRY_AFTER_SECS")? {
            config.retry_after = Duration::from_secs(secs);
        }

        let initial = env
            .u64("ASYNCREPLY_BACKOFF_INITIAL_MS")?
            .map_or(DEFAULT_INITIAL_DELAY, Duration::from_millis);
        let ceiling = env
            .u64("ASYNCREPLY_BACKOFF_CEILING_MS")?
            .map_or(DEFAULT_DELAY_CEILING, Duration::from_millis);
        config.backoff = BackoffSchedule::new(initial, ceiling).map_err(|e| {
            let name = match e {
                BackoffError::ZeroInitialDelay => "ASYNCREPLY_BACKOFF_INITIAL_MS",
                BackoffError::CeilingBelowInitial { .. } => "ASYNCREPLY_BACKOFF_CEILING_MS",
            };
            ConfigError::invalid(name, e.to_string())
        })?;

        config.use_persistent_queue = env.bool("USE_PERSISTENT_QUEUE")?.unwrap_or(false);
        config.redis_url = env.string("REDIS_URL");
        config.dev_mode = env.bool("ASYNCREPLY_DEV_MODE")?.unwrap_or(false);
        if let Some(capacity) = env.u64("ASYNCREPLY_QUEUE_CAPACITY")? {
            if capacity == 0 {
                return Err(ConfigError::invalid(
                    "ASYNCREPLY_QUEUE_CAPACITY",
                    "must be greater than zero",
                ));
            }
            config.queue_capacity = usize::try_from(capacity)
                .map_err(|_| ConfigError::invalid("ASYNCREPLY_QUEUE_CAPACITY", "out of range"))?;
        }

        Ok(config)
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn u64(&self, name: &'static str) -> Result<Option<u64>, ConfigError> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(name, format!("must be a u64: {e}")))
    }

    fn bool(&self, name: &'static str) -> Result<Option<bool>, ConfigError> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::invalid(name, "must be a boolean (true/false/1/0)")),
        }
    }
}

fn secs_i64(name: &'static str, secs: u64) -> Result<i64, ConfigError> {
    i64::try_from(secs).map_err(|_| ConfigError::invalid(name, "out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("ASYNCREPLY_BASE_URL", "https://work.example.com/"),
        ("ASYNCREPLY_SIGNING_KEY", "s3cret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.base_url, "https://work.example.com");
        assert_eq!(config.store_url, "https://work.example.com");
        assert_eq!(config.delegation, DelegationPolicy::default());
        assert_eq!(config.retry_after, Duration::from_secs(5));
        assert_eq!(config.backoff, BackoffSchedule::default());
        assert!(!config.use_persistent_queue);
        assert!(!config.dev_mode);
        assert_eq!(config.queue_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn missing_required_vars_are_reported() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ASYNCREPLY_BASE_URL"));

        let err = AppConfig::from_lookup(lookup(&[REQUIRED[0]])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ASYNCREPLY_SIGNING_KEY"));

        let err = AppConfig::from_lookup(lookup(&[
            REQUIRED[0],
            ("ASYNCREPLY_SIGNING_KEY", "   "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("ASYNCREPLY_SIGNING_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("ASYNCREPLY_BIND_ADDR", "127.0.0.1:9000"),
            ("ASYNCREPLY_STORE_URL", "https://blobs.example.com"),
            ("ASYNCREPLY_TOKEN_VALIDITY_SECS", "60"),
            ("ASYNCREPLY_TOKEN_SKEW_SECS", "0"),
            ("ASYNCREPLY_RETRY_AFTER_SECS", "2"),
            ("ASYNCREPLY_BACKOFF_INITIAL_MS", "10"),
            ("ASYNCREPLY_BACKOFF_CEILING_MS", "80"),
            ("USE_PERSISTENT_QUEUE", "true"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("ASYNCREPLY_DEV_MODE", "1"),
            ("ASYNCREPLY_QUEUE_CAPACITY", "16"),
        ]);
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.store_url, "https://blobs.example.com");
        assert_eq!(config.delegation.validity, chrono::Duration::seconds(60));
        assert_eq!(config.delegation.clock_skew, chrono::Duration::zero());
        assert_eq!(config.retry_after, Duration::from_secs(2));
        assert_eq!(config.backoff.initial(), Duration::from_millis(10));
        assert_eq!(config.backoff.ceiling(), Duration::from_millis(80));
        assert!(config.use_persistent_queue);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert!(config.dev_mode);
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ASYNCREPLY_TOKEN_VALIDITY_SECS", "ten"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "ASYNCREPLY_TOKEN_VALIDITY_SECS", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("ASYNCREPLY_TOKEN_VALIDITY_SECS", "0"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());


        let mut vars = REQUIRED.to_vec();
        vars.push(("USE_PERSISTENT_QUEUE", "maybe"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("ASYNCREPLY_QUEUE_CAPACITY", "0"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn backoff_errors_name_the_offending_variable() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("ASYNCREPLY_BACKOFF_INITIAL_MS", "500"),
            ("ASYNCREPLY_BACKOFF_CEILING_MS", "100"),
        ]);
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "ASYNCREPLY_BACKOFF_CEILING_MS", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("ASYNCREPLY_BACKOFF_INITIAL_MS", "0"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "ASYNCREPLY_BACKOFF_INITIAL_MS", .. })
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("REDIS_URL", "redis://:hunter2@localhost"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("hunter2"));
    }
}
