//! SQLite adapter for Stayline storage.
//!
//! This adapter is the durable source-of-truth backend for single-node
//! deployments. Audit entries carry the same hash chain as the in-memory
//! adapter, so histories written by either backend verify the same way.

use crate::model::{AuditEntry, NewAuditEntry, RegistryEntry};
use crate::traits::{ApprovalRegistry, AuditStore, QueryWindow};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Acquire, Row};
use stayline_types::{
    ApprovalDecision, ApprovalRequest, AuditEntryId, DecisionOrigin, DecisionOutcome, OperationId,
    OperationKind, RecordId, RequestId, RunId,
};

/// SQLite-backed storage adapter.
#[derive(Clone)]
pub struct SqliteStaylineStore {
    pool: SqlitePool,
}

impl SqliteStaylineStore {
    /// Connect to SQLite and initialize the required schema.
    ///
    /// The pool is held to a single connection; SQLite serializes writers
    /// anyway and the audit sequence must be read-then-inserted atomically.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        Self::connect_with_options(database_url, 1, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect sqlite: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS stayline_audit_entries (
                entry_id TEXT PRIMARY KEY,
                sequence INTEGER NOT NULL UNIQUE,
                occurred_at TEXT NOT NULL,
                actor TEXT NOT NULL,
                operation_kind TEXT NOT NULL,
                operation_id TEXT NOT NULL,
                run_id TEXT,
                affected_record_ids TEXT NOT NULL,
                summary TEXT NOT NULL,
                before_summary TEXT NOT NULL,
                after_summary TEXT NOT NULL,
                previous_hash TEXT,
                hash TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS stayline_approval_requests (
                request_id TEXT PRIMARY KEY,
                request TEXT NOT NULL,
                published_at TEXT NOT NULL,
                outcome TEXT,
                origin TEXT,
                decided_at TEXT
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for SqliteStaylineStore {
    async fn append(&self, entry: NewAuditEntry) -> StoreResult<AuditEntry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let conn = tx
            .acquire()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let last = sqlx::query(
            "SELECT sequence, hash FROM stayline_audit_entries ORDER BY sequence DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let (sequence, previous_hash) = if let Some(row) = last {
            let seq: i64 = row
                .try_get("sequence")
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let prev: String = row
                .try_get("hash")
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            (seq + 1, Some(prev))
        } else {
            (1_i64, None)
        };

        let hash = entry.chain_hash(previous_hash.as_deref(), sequence as u64)?;
        let entry_id = AuditEntryId::generate();
        let affected = serde_json::to_string(&entry.affected_record_ids)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let before = serde_json::to_string(&entry.before_summary)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let after = serde_json::to_string(&entry.after_summary)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO stayline_audit_entries
                (entry_id, sequence, occurred_at, actor, operation_kind, operation_id, run_id, affected_record_ids, summary, before_summary, after_summary, previous_hash, hash)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry_id.0.clone())
        .bind(sequence)
        .bind(entry.occurred_at)
        .bind(entry.actor.clone())
        .bind(entry.operation_kind.to_string())
        .bind(entry.operation_id.0.clone())
        .bind(entry.run_id.as_ref().map(|id| id.0.clone()))
        .bind(affected)
        .bind(entry.summary.clone())
        .bind(before)
        .bind(after)
        .bind(previous_hash.clone())
        .bind(hash.clone())
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(AuditEntry {
            entry_id,
            sequence: sequence as u64,
            occurred_at: entry.occurred_at,
            actor: entry.actor,
            operation_kind: entry.operation_kind,
            operation_id: entry.operation_id,
            run_id: entry.run_id,
            affected_record_ids: entry.affected_record_ids,
            summary: entry.summary,
            before_summary: entry.before_summary,
            after_summary: entry.after_summary,
            previous_hash,
            hash,
        })
    }

    async fn entries(&self, window: QueryWindow) -> StoreResult<Vec<AuditEntry>> {
        let rows = if window.limit == 0 {
            sqlx::query(
                r#"
                SELECT entry_id, sequence, occurred_at, actor, operation_kind, operation_id, run_id, affected_record_ids, summary, before_summary, after_summary, previous_hash, hash
                  FROM stayline_audit_entries
                 ORDER BY sequence DESC
                 LIMIT -1 OFFSET $1
                "#,
            )
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        } else {
            sqlx::query(
                r#"
                SELECT entry_id, sequence, occurred_at, actor, operation_kind, operation_id, run_id, affected_record_ids, summary, before_summary, after_summary, previous_hash, hash
                  FROM stayline_audit_entries
                 ORDER BY sequence DESC
                 LIMIT $1 OFFSET $2
                "#,
            )
            .bind(to_i64(window.limit)?)
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        };

        rows.into_iter().map(audit_row_to_entry).collect()
    }

    async fn entries_for_run(&self, run_id: &RunId) -> StoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT entry_id, sequence, occurred_at, actor, operation_kind, operation_id, run_id, affected_record_ids, summary, before_summary, after_summary, previous_hash, hash
              FROM stayline_audit_entries
             WHERE run_id = $1
             ORDER BY sequence ASC
            "#,
        )
        .bind(run_id.0.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter().map(audit_row_to_entry).collect()
    }

    async fn latest_hash(&self) -> StoreResult<Option<String>> {
        let row =
            sqlx::query("SELECT hash FROM stayline_audit_entries ORDER BY sequence DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row
            .map(|r| r.try_get::<String, _>("hash"))
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))?)
    }
}

#[async_trait]
impl ApprovalRegistry for SqliteStaylineStore {
    async fn publish(
        &self,
        request: ApprovalRequest,
        published_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let request_json = serde_json::to_string(&request)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO stayline_approval_requests
                (request_id, request, published_at, outcome, origin, decided_at)
            VALUES ($1, $2, $3, NULL, NULL, NULL)
            "#,
        )
        .bind(request.id.0.clone())
        .bind(request_json)
        .bind(published_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        Ok(())
    }

    async fn record_decision(
        &self,
        decision: &ApprovalDecision,
        origin: DecisionOrigin,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<RegistryEntry> {
        let result = sqlx::query(
            r#"
            UPDATE stayline_approval_requests
               SET outcome = $1,
                   origin = $2,
                   decided_at = $3
             WHERE request_id = $4
               AND outcome IS NULL
            "#,
        )
        .bind(outcome_to_str(decision.outcome))
        .bind(origin_to_str(origin))
        .bind(decided_at)
        .bind(decision.request_id.0.clone())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            let exists = self.entry(&decision.request_id).await?.is_some();
            if exists {
                return Err(StoreError::Conflict(format!(
                    "approval request {} already decided",
                    decision.request_id
                )));
            }
            return Err(StoreError::NotFound(format!(
                "approval request {} not found",
                decision.request_id
            )));
        }

        self.entry(&decision.request_id).await?.ok_or_else(|| {
            StoreError::NotFound(format!(
                "approval request {} not found",
                decision.request_id
            ))
        })
    }

    async fn pending(&self, window: QueryWindow) -> StoreResult<Vec<RegistryEntry>> {
        let rows = if window.limit == 0 {
            sqlx::query(
                r#"
                SELECT request_id, request, published_at, outcome, origin, decided_at
                  FROM stayline_approval_requests
                 WHERE outcome IS NULL
                 ORDER BY published_at DESC
                 LIMIT -1 OFFSET $1
                "#,
            )
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        } else {
            sqlx::query(
                r#"
                SELECT request_id, request, published_at, outcome, origin, decided_at
                  FROM stayline_approval_requests
                 WHERE outcome IS NULL
                 ORDER BY published_at DESC
                 LIMIT $1 OFFSET $2
                "#,
            )
            .bind(to_i64(window.limit)?)
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        };

        rows.into_iter().map(registry_row_to_entry).collect()
    }

    async fn entry(&self, request_id: &RequestId) -> StoreResult<Option<RegistryEntry>> {
        let row = sqlx::query(
            r#"
            SELECT request_id, request, published_at, outcome, origin, decided_at
              FROM stayline_approval_requests
             WHERE request_id = $1
            "#,
        )
        .bind(request_id.0.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(registry_row_to_entry).transpose()
    }
}

fn audit_row_to_entry(row: sqlx::sqlite::SqliteRow) -> StoreResult<AuditEntry> {
    let kind_raw: String = row
        .try_get("operation_kind")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let operation_kind: OperationKind = kind_raw
        .parse()
        .map_err(|e: stayline_types::ParseOperationKindError| {
            StoreError::Serialization(e.to_string())
        })?;

    let affected_json: String = row
        .try_get("affected_record_ids")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let affected_record_ids: Vec<RecordId> = serde_json::from_str(&affected_json)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let before_json: String = row
        .try_get("before_summary")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let after_json: String = row
        .try_get("after_summary")
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    let run_id: Option<String> = row
        .try_get("run_id")
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(AuditEntry {
        entry_id: AuditEntryId::new(
            row.try_get::<String, _>("entry_id")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
        ),
        sequence: row
            .try_get::<i64, _>("sequence")
            .map_err(|e| StoreError::Backend(e.to_string()))? as u64,
        occurred_at: row
            .try_get("occurred_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        actor: row
            .try_get("actor")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        operation_kind,
        operation_id: OperationId::new(
            row.try_get::<String, _>("operation_id")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
        ),
        run_id: run_id.map(RunId::new),
        affected_record_ids,
        summary: row
            .try_get("summary")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        before_summary: serde_json::from_str(&before_json)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        after_summary: serde_json::from_str(&after_json)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        previous_hash: row
            .try_get("previous_hash")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        hash: row
            .try_get("hash")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn registry_row_to_entry(row: sqlx::sqlite::SqliteRow) -> StoreResult<RegistryEntry> {
    let request_json: String = row
        .try_get("request")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let request: ApprovalRequest = serde_json::from_str(&request_json)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let outcome_raw: Option<String> = row
        .try_get("outcome")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let origin_raw: Option<String> = row
        .try_get("origin")
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(RegistryEntry {
        request,
        published_at: row
            .try_get("published_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        outcome: outcome_raw.as_deref().map(parse_outcome).transpose()?,
        origin: origin_raw.as_deref().map(parse_origin).transpose()?,
        decided_at: row
            .try_get("decided_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn outcome_to_str(outcome: DecisionOutcome) -> &'static str {
    match outcome {
        DecisionOutcome::Approved => "approved",
        DecisionOutcome::Rejected => "rejected",
    }
}

fn parse_outcome(raw: &str) -> StoreResult<DecisionOutcome> {
    match raw {
        "approved" => Ok(DecisionOutcome::Approved),
        "rejected" => Ok(DecisionOutcome::Rejected),
        _ => Err(StoreError::Serialization(format!(
            "unknown decision outcome `{raw}`"
        ))),
    }
}

fn origin_to_str(origin: DecisionOrigin) -> &'static str {
    match origin {
        DecisionOrigin::External => "external",
        DecisionOrigin::AutoPolicy => "auto_policy",
    }
}

fn parse_origin(raw: &str) -> StoreResult<DecisionOrigin> {
    match raw {
        "external" => Ok(DecisionOrigin::External),
        "auto_policy" => Ok(DecisionOrigin::AutoPolicy),
        _ => Err(StoreError::Serialization(format!(
            "unknown decision origin `{raw}`"
        ))),
    }
}

fn map_sqlx_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.code().as_deref(), Some("1555") | Some("2067")) {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

fn to_i64(value: usize) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidInput("window value too large".to_string()))
}
