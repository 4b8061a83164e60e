//! Typed configuration, built once at startup.
//!
//! Environment variables (`ROUTEPLANE_*`) provide values with development
//! defaults; an optional YAML file referenced by `ROUTEPLANE_CONFIG` can
//! override the service-level settings. Request paths never re-read the
//! environment. Adapters with no URL configured fall back to their
//! in-memory backends, which keeps local development dependency-free.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RouteplaneConfig {
    /// HTTP bind address for the API.
    pub bind_addr: SocketAddr,
    /// Metrics HTTP bind address.
    pub metrics_bind: SocketAddr,
    /// Deployment environment label (development, staging, production).
    pub environment: String,
    /// TTL for cached URLs.
    pub positive_cache_ttl: Duration,
    /// TTL for cached negative sentinels. Short so a freshly created route
    /// is masked by an earlier miss only briefly.
    pub negative_cache_ttl: Duration,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
    pub postgres: Option<PostgresConfig>,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    pub mongo: Option<MongoConfig>,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub group_prefix: String,
    pub request_timeout_ms: u64,
    pub publish_retries: u32,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Deserialize)]
struct ConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    environment: Option<String>,
    positive_cache_ttl_seconds: Option<u64>,
    negative_cache_ttl_seconds: Option<u64>,
    drain_timeout_seconds: Option<u64>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(name)
        .unwrap_or_else(|| default.to_string())
        .parse()
        .with_context(|| format!("parse {name}"))
}

impl RouteplaneConfig {
    pub fn from_env() -> Result<Self> {
        let postgres = env_var("ROUTEPLANE_POSTGRES_URL")
            .or_else(|| env_var("DATABASE_URL"))
            .map(|url| -> Result<PostgresConfig> {
                Ok(PostgresConfig {
                    url,
                    max_connections: parse_env("ROUTEPLANE_POSTGRES_MAX_CONNECTIONS", "10")?,
                    acquire_timeout_ms: parse_env("ROUTEPLANE_POSTGRES_ACQUIRE_TIMEOUT_MS", "5000")?,
                })
            })
            .transpose()?;

        let redis = env_var("ROUTEPLANE_REDIS_URL").map(|url| RedisConfig { url });

        let kafka = env_var("ROUTEPLANE_KAFKA_BROKERS")
            .map(|brokers| -> Result<KafkaConfig> {
                Ok(KafkaConfig {
                    brokers,
                    topic: env_var("ROUTEPLANE_KAFKA_TOPIC")
                        .unwrap_or_else(|| "route-events".to_string()),
                    group_prefix: env_var("ROUTEPLANE_KAFKA_GROUP_PREFIX")
                        .unwrap_or_else(|| "routeplane".to_string()),
                    request_timeout_ms: parse_env("ROUTEPLANE_KAFKA_REQUEST_TIMEOUT_MS", "10000")?,
                    publish_retries: parse_env("ROUTEPLANE_KAFKA_RETRIES", "3")?,
                })
            })
            .transpose()?;

        let mongo = env_var("ROUTEPLANE_MONGODB_URI").map(|uri| MongoConfig {
            uri,
            database: env_var("ROUTEPLANE_MONGODB_DB").unwrap_or_else(|| "audit_db".to_string()),
            collection: env_var("ROUTEPLANE_MONGODB_COLLECTION")
                .unwrap_or_else(|| "route_events".to_string()),
        });

        Ok(Self {
            bind_addr: parse_env("ROUTEPLANE_BIND", "0.0.0.0:8000")?,
            metrics_bind: parse_env("ROUTEPLANE_METRICS_BIND", "0.0.0.0:9090")?,
            environment: env_var("ROUTEPLANE_ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
            positive_cache_ttl: Duration::from_secs(parse_env(
                "ROUTEPLANE_CACHE_POSITIVE_TTL",
                "60",
            )?),
            negative_cache_ttl: Duration::from_secs(parse_env(
                "ROUTEPLANE_CACHE_NEGATIVE_TTL",
                "10",
            )?),
            drain_timeout: Duration::from_secs(parse_env("ROUTEPLANE_DRAIN_TIMEOUT", "30")?),
            postgres,
            redis,
            kafka,
            mongo,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = env_var("ROUTEPLANE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read ROUTEPLANE_CONFIG: {path}"))?;
            let overrides: ConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse routeplane config yaml")?;
            if let Some(value) = overrides.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = overrides.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = overrides.environment {
                config.environment = value;
            }
            if let Some(value) = overrides.positive_cache_ttl_seconds {
                config.positive_cache_ttl = Duration::from_secs(value);
            }
            if let Some(value) = overrides.negative_cache_ttl_seconds {
                config.negative_cache_ttl = Duration::from_secs(value);
            }
            if let Some(value) = overrides.drain_timeout_seconds {
                config.drain_timeout = Duration::from_secs(value);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    fn clear_routeplane_env() {
        for (key, _) in env::vars() {
            if key.starts_with("ROUTEPLANE_") || key == "DATABASE_URL" {
                unsafe {
                    env::remove_var(key);
                }
            }
        }
    }

    #[serial]
    #[test]
    fn from_env_uses_defaults() {
        clear_routeplane_env();
        let config = RouteplaneConfig::from_env().expect("from_env");
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8000");
        assert_eq!(config.metrics_bind.to_string(), "0.0.0.0:9090");
        assert_eq!(config.environment, "development");
        assert_eq!(config.positive_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.negative_cache_ttl, Duration::from_secs(10));
        assert!(config.postgres.is_none());
        assert!(config.kafka.is_none());
    }

    #[serial]
    #[test]
    fn from_env_respects_env_vars() {
        clear_routeplane_env();
        unsafe {
            env::set_var("ROUTEPLANE_BIND", "127.0.0.1:9000");
            env::set_var("ROUTEPLANE_KAFKA_BROKERS", "broker-1:9092,broker-2:9092");
            env::set_var("ROUTEPLANE_CACHE_NEGATIVE_TTL", "5");
            env::set_var("DATABASE_URL", "postgres://app@db/routes");
        }

        let config = RouteplaneConfig::from_env().expect("from_env");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.negative_cache_ttl, Duration::from_secs(5));
        let kafka = config.kafka.expect("kafka");
        assert_eq!(kafka.brokers, "broker-1:9092,broker-2:9092");
        assert_eq!(kafka.topic, "route-events");
        assert_eq!(kafka.group_prefix, "routeplane");
        let postgres = config.postgres.expect("postgres");
        assert_eq!(postgres.url, "postgres://app@db/routes");
        assert_eq!(postgres.max_connections, 10);

        clear_routeplane_env();
    }

    #[serial]
    #[test]
    fn from_env_rejects_invalid_socket_addr() {
        clear_routeplane_env();
        unsafe {
            env::set_var("ROUTEPLANE_BIND", "not-a-valid-address");
        }
        assert!(RouteplaneConfig::from_env().is_err());
        clear_routeplane_env();
    }

    #[serial]
    #[test]
    fn yaml_overrides_apply() {
        clear_routeplane_env();
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("config.yml");
        std::fs::write(
            &path,
            r#"
bind_addr: "127.0.0.1:7000"
environment: "staging"
positive_cache_ttl_seconds: 120
"#,
        )
        .unwrap();
        unsafe {
            env::set_var("ROUTEPLANE_CONFIG", path.to_str().unwrap());
        }

        let config = RouteplaneConfig::from_env_or_yaml().expect("from_env_or_yaml");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:7000");
        assert_eq!(config.environment, "staging");
        assert_eq!(config.positive_cache_ttl, Duration::from_secs(120));
        // Untouched fields keep their defaults.
        assert_eq!(config.negative_cache_ttl, Duration::from_secs(10));

        clear_routeplane_env();
    }

    #[serial]
    #[test]
    fn missing_yaml_file_fails() {
        clear_routeplane_env();
        let tmpdir = TempDir::new().unwrap();
        let nonexistent = tmpdir.path().join("nope.yml");
        unsafe {
            env::set_var("ROUTEPLANE_CONFIG", nonexistent.to_str().unwrap());
        }
        assert!(RouteplaneConfig::from_env_or_yaml().is_err());
        clear_routeplane_env();
    }
}
