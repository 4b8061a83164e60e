//! Postgres-backed implementation of the record store.
//!
//! # Data model
//! Four authoritative tables (`tenants`, `services`, `environments`,
//! `endpoints`) with natural-key unique constraints; see `migrations/`.
//! Parent rows are created on demand inside the same transaction as the
//! endpoint mutation, so a write either lands completely or not at all.
//!
//! # Concurrency
//! Concurrent writers on one identifier serialize on the
//! `(environment_id, version)` unique constraint; activate/deactivate take a
//! row lock before toggling so the previous-state snapshot in the emitted
//! event is accurate.
//!
//! # Resilience
//! Every call goes through an `AdapterGuard` (bulkhead → breaker → retry).
//! Reads use the read bulkhead, mutations the write bulkhead; both share the
//! database breaker and retry budget. Pool limits and the acquire timeout
//! are explicit because hanging on an unhealthy database is unacceptable on
//! the hot resolution path.
use super::{CreateOutcome, RouteStore, StoreError, StoreResult, ToggleOutcome};
use crate::config::PostgresConfig;
use crate::model::{EndpointState, RouteKey};
use async_trait::async_trait;
use routeplane_resilience::{AdapterGuard, GuardError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;

const SQL_RESOLVE_ACTIVE: &str = r#"
SELECT e.url
FROM tenants t
JOIN services s ON s.tenant_id = t.id
JOIN environments env ON env.service_id = s.id
JOIN endpoints e ON e.environment_id = env.id
WHERE t.name = $1
  AND s.name = $2
  AND env.name = $3
  AND e.version = $4
  AND e.is_active = true
LIMIT 1
"#;

const SQL_LOCK_ENDPOINT: &str = r#"
SELECT e.id, e.url, e.is_active
FROM tenants t
JOIN services s ON s.tenant_id = t.id
JOIN environments env ON env.service_id = s.id
JOIN endpoints e ON e.environment_id = env.id
WHERE t.name = $1
  AND s.name = $2
  AND env.name = $3
  AND e.version = $4
FOR UPDATE OF e
"#;

#[derive(Debug, FromRow)]
struct DbEndpoint {
    id: i64,
    url: String,
    is_active: bool,
}

pub struct PostgresRouteStore {
    pool: PgPool,
    read_guard: AdapterGuard,
    write_guard: AdapterGuard,
}

impl PostgresRouteStore {
    /// Connect, run migrations, and wrap the pool in the resilience guards.
    /// Migrations run before serving so handlers can assume the schema.
    pub async fn connect(
        config: &PostgresConfig,
        read_guard: AdapterGuard,
        write_guard: AdapterGuard,
    ) -> anyhow::Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            read_guard,
            write_guard,
        })
    }

    async fn get_or_insert_tenant(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO tenants (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING id",
        )
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(id) = inserted {
            return Ok(id);
        }
        sqlx::query_scalar("SELECT id FROM tenants WHERE name = $1")
            .bind(name)
            .fetch_one(&mut **tx)
            .await
    }

    async fn get_or_insert_service(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: i64,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO services (tenant_id, name) VALUES ($1, $2) \
             ON CONFLICT (tenant_id, name) DO NOTHING RETURNING id",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(id) = inserted {
            return Ok(id);
        }
        sqlx::query_scalar("SELECT id FROM services WHERE tenant_id = $1 AND name = $2")
            .bind(tenant_id)
            .bind(name)
            .fetch_one(&mut **tx)
            .await
    }

    async fn get_or_insert_environment(
        tx: &mut Transaction<'_, Postgres>,
        service_id: i64,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO environments (service_id, name) VALUES ($1, $2) \
             ON CONFLICT (service_id, name) DO NOTHING RETURNING id",
        )
        .bind(service_id)
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some(id) = inserted {
            return Ok(id);
        }
        sqlx::query_scalar("SELECT id FROM environments WHERE service_id = $1 AND name = $2")
            .bind(service_id)
            .bind(name)
            .fetch_one(&mut **tx)
            .await
    }

    async fn create_in_tx(&self, key: &RouteKey, url: &str) -> StoreResult<CreateOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let tenant_id = Self::get_or_insert_tenant(&mut tx, &key.tenant)
            .await
            .map_err(map_sqlx)?;
        let service_id = Self::get_or_insert_service(&mut tx, tenant_id, &key.service)
            .await
            .map_err(map_sqlx)?;
        let environment_id = Self::get_or_insert_environment(&mut tx, service_id, &key.env)
            .await
            .map_err(map_sqlx)?;

        let inserted: Option<String> = sqlx::query_scalar(
            "INSERT INTO endpoints (environment_id, version, url, is_active) \
             VALUES ($1, $2, $3, true) \
             ON CONFLICT (environment_id, version) DO NOTHING RETURNING url",
        )
        .bind(environment_id)
        .bind(&key.version)
        .bind(url)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let outcome = match inserted {
            Some(url) => CreateOutcome::Created { url },
            None => {
                // Row exists; decide whether this is an idempotent replay.
                let existing = sqlx::query_as::<_, DbEndpoint>(
                    "SELECT id, url, is_active FROM endpoints \
                     WHERE environment_id = $1 AND version = $2",
                )
                .bind(environment_id)
                .bind(&key.version)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx)?;
                if existing.url != url {
                    return Err(StoreError::Conflict(format!(
                        "endpoint {key} exists with a different url"
                    )));
                }
                if !existing.is_active {
                    return Err(StoreError::Conflict(format!(
                        "endpoint {key} exists but is inactive"
                    )));
                }
                CreateOutcome::AlreadyExists { url: existing.url }
            }
        };

        tx.commit().await.map_err(map_sqlx)?;
        Ok(outcome)
    }

    async fn toggle_in_tx(&self, key: &RouteKey, target_active: bool) -> StoreResult<ToggleOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let endpoint = sqlx::query_as::<_, DbEndpoint>(SQL_LOCK_ENDPOINT)
            .bind(&key.tenant)
            .bind(&key.service)
            .bind(&key.env)
            .bind(&key.version)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .ok_or_else(|| StoreError::NotFound(key.canonical()))?;

        if endpoint.is_active == target_active {
            tx.commit().await.map_err(map_sqlx)?;
            return Ok(ToggleOutcome::NoOp { url: endpoint.url });
        }

        sqlx::query("UPDATE endpoints SET is_active = $1, updated_at = now() WHERE id = $2")
            .bind(target_active)
            .bind(endpoint.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        tx.commit().await.map_err(map_sqlx)?;

        Ok(ToggleOutcome::Applied {
            url: endpoint.url,
            previous_state: if target_active {
                EndpointState::Inactive
            } else {
                EndpointState::Active
            },
        })
    }
}

#[async_trait]
impl RouteStore for PostgresRouteStore {
    async fn resolve_active_url(&self, key: &RouteKey) -> StoreResult<Option<String>> {
        let result = self
            .read_guard
            .execute(|| async {
                sqlx::query_scalar::<_, String>(SQL_RESOLVE_ACTIVE)
                    .bind(&key.tenant)
                    .bind(&key.service)
                    .bind(&key.env)
                    .bind(&key.version)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx)
            })
            .await;
        flatten_guard(result)
    }

    async fn create_endpoint(&self, key: &RouteKey, url: &str) -> StoreResult<CreateOutcome> {
        let result = self
            .write_guard
            .execute(|| self.create_in_tx(key, url))
            .await;
        flatten_guard(result)
    }

    async fn activate_endpoint(&self, key: &RouteKey) -> StoreResult<ToggleOutcome> {
        let result = self
            .write_guard
            .execute(|| self.toggle_in_tx(key, true))
            .await;
        flatten_guard(result)
    }

    async fn deactivate_endpoint(&self, key: &RouteKey) -> StoreResult<ToggleOutcome> {
        let result = self
            .write_guard
            .execute(|| self.toggle_in_tx(key, false))
            .await;
        flatten_guard(result)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn flatten_guard<T>(result: Result<T, GuardError<StoreError>>) -> StoreResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(GuardError::Rejected(rejection)) => Err(StoreError::Shed(rejection)),
        Err(GuardError::Inner(err)) => Err(err),
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    match err {
        timeout @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            StoreError::Unavailable(timeout.to_string())
        }
        other => StoreError::Unexpected(other.into()),
    }
}
