//! Route identifier: the logical key shared by every external interface.
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The 4-tuple identifying a route. Its canonical `:`-joined form doubles as
/// the event partition key and the cache key suffix, so per-route event
/// ordering and cache addressing agree by construction.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub tenant: String,
    pub service: String,
    pub env: String,
    pub version: String,
}

impl RouteKey {
    pub fn new(
        tenant: impl Into<String>,
        service: impl Into<String>,
        env: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            service: service.into(),
            env: env.into(),
            version: version.into(),
        }
    }

    /// Canonical string form, `tenant:service:env:version`.
    pub fn canonical(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.tenant, self.service, self.env, self.version
        )
    }

    /// Cache key for this route, `route:<canonical>`.
    pub fn cache_key(&self) -> String {
        format!("route:{}", self.canonical())
    }

    /// All four components must be non-empty.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("tenant", &self.tenant),
            ("service", &self.service),
            ("env", &self.env),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_and_cache_key_formats() {
        let key = RouteKey::new("team-a", "payments", "prod", "v2");
        assert_eq!(key.canonical(), "team-a:payments:prod:v2");
        assert_eq!(key.cache_key(), "route:team-a:payments:prod:v2");
        assert_eq!(key.to_string(), key.canonical());
    }

    #[test]
    fn validate_rejects_empty_components() {
        let key = RouteKey::new("team-a", "", "prod", "v2");
        let err = key.validate().unwrap_err();
        assert!(err.contains("service"));

        let key = RouteKey::new("team-a", "payments", "  ", "v2");
        assert!(key.validate().is_err());

        assert!(RouteKey::new("t", "s", "e", "v").validate().is_ok());
    }
}
