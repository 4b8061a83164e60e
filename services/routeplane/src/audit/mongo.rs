//! MongoDB-backed audit store.
//!
//! Indexes are created at connect time: a unique index on `event_id` (the
//! dedup key), the compound route+time index serving per-route history, and
//! time and action+time indexes serving window queries. A duplicate-key
//! write error is the expected shape of an at-least-once redelivery and maps
//! to `AppendOutcome::Duplicate`.
use super::{AppendOutcome, AuditError, AuditResult, AuditStore};
use crate::config::MongoConfig;
use crate::model::{AuditDocument, AuditQuery};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use routeplane_resilience::{AdapterGuard, GuardError};

const DUPLICATE_KEY_CODE: i32 = 11000;

pub struct MongoAuditStore {
    client: Client,
    collection: Collection<AuditDocument>,
    guard: AdapterGuard,
}

impl MongoAuditStore {
    pub async fn connect(config: &MongoConfig, guard: AdapterGuard) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(&config.uri).await?;
        let collection = client
            .database(&config.database)
            .collection::<AuditDocument>(&config.collection);
        Self::ensure_indexes(&collection).await?;
        Ok(Self {
            client,
            collection,
            guard,
        })
    }

    async fn ensure_indexes(collection: &Collection<AuditDocument>) -> anyhow::Result<()> {
        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "event_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! {
                        "route.tenant": 1,
                        "route.service": 1,
                        "route.env": 1,
                        "route.version": 1,
                        "occurred_at": -1,
                    })
                    .build(),
            )
            .await?;
        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "occurred_at": -1 })
                    .build(),
            )
            .await?;
        collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "action": 1, "occurred_at": -1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    fn filter_for(query: &AuditQuery) -> Document {
        let mut filter = doc! {};
        if let Some(tenant) = &query.tenant {
            filter.insert("route.tenant", tenant);
        }
        if let Some(service) = &query.service {
            filter.insert("route.service", service);
        }
        if let Some(env) = &query.env {
            filter.insert("route.env", env);
        }
        if let Some(version) = &query.version {
            filter.insert("route.version", version);
        }
        if let Some(action) = query.action {
            filter.insert("action", action.as_str());
        }
        // Timestamps are persisted as RFC3339 strings; UTC keeps the range
        // comparison consistent with how chrono serializes them.
        let mut window = doc! {};
        if let Some(since) = query.since {
            window.insert("$gte", since.to_rfc3339());
        }
        if let Some(until) = query.until {
            window.insert("$lte", until.to_rfc3339());
        }
        if !window.is_empty() {
            filter.insert("occurred_at", window);
        }
        filter
    }
}

#[async_trait]
impl AuditStore for MongoAuditStore {
    async fn append(&self, document: AuditDocument) -> AuditResult<AppendOutcome> {
        let result = self
            .guard
            .execute(|| {
                let collection = self.collection.clone();
                let document = document.clone();
                async move {
                    match collection.insert_one(&document).await {
                        Ok(_) => Ok(AppendOutcome::Recorded),
                        Err(err) if is_duplicate_key(&err) => Ok(AppendOutcome::Duplicate),
                        Err(err) => Err(map_mongo(err)),
                    }
                }
            })
            .await;
        flatten_guard(result)
    }

    async fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditDocument>> {
        let filter = Self::filter_for(query);
        let limit = query.effective_limit();
        let result = self
            .guard
            .execute(|| {
                let collection = self.collection.clone();
                let filter = filter.clone();
                async move {
                    let cursor = collection
                        .find(filter)
                        .sort(doc! { "occurred_at": -1 })
                        .limit(limit)
                        .await
                        .map_err(map_mongo)?;
                    cursor.try_collect().await.map_err(map_mongo)
                }
            })
            .await;
        flatten_guard(result)
    }

    async fn health_check(&self) -> AuditResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(map_mongo)
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn flatten_guard<T>(result: Result<T, GuardError<AuditError>>) -> AuditResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(GuardError::Rejected(rejection)) => Err(AuditError::Shed(rejection)),
        Err(GuardError::Inner(err)) => Err(err),
    }
}

fn map_mongo(err: mongodb::error::Error) -> AuditError {
    AuditError::Unavailable(err.to_string())
}
