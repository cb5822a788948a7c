//! Postgres-backed herd store.
//!
//! Animals and reports are one row each, keyed by `(owner_id, <name>)`, with
//! their collections held as JSONB documents.
//!
//! ## Atomicity
//!
//! - Appending an observation is a single `INSERT ... ON CONFLICT DO UPDATE`
//!   that concatenates onto the stored array.
//! - Every other mutation runs in a transaction that locks the affected rows
//!   with `SELECT ... FOR UPDATE` before applying the domain change.
//! - Creating a report races on the primary key with `ON CONFLICT DO NOTHING`;
//!   the loser falls through to the locked merge path.
//! - A report merge first takes `FOR SHARE` on the animal row, which blocks a
//!   concurrent cascade `DELETE` until the merge commits (and makes the merge
//!   see the deletion if the cascade won).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (other) | any | `Backend` |
//! | Decode / ColumnDecode | N/A | `Serialization` |
//! | Other | N/A | `Backend` |

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use herdbook_core::{AnimalId, DomainError, OwnerId, ReportName};
use herdbook_livestock::{
    AnimalRecord, AnimalReportEntry, CascadeOutcome, ReportRecord, WeightObservation,
    detach_animal_from_reports,
};

use super::{AnimalStore, HerdStore, ReportStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS herd_animals (
    owner_id UUID NOT NULL,
    animal_id TEXT NOT NULL,
    observations JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (owner_id, animal_id)
);

CREATE TABLE IF NOT EXISTS herd_reports (
    owner_id UUID NOT NULL,
    report_name TEXT NOT NULL,
    date_generated TIMESTAMPTZ NOT NULL,
    target_animals JSONB NOT NULL,
    results JSONB NOT NULL,
    revision BIGINT NOT NULL DEFAULT 1,
    ai_generated_summary TEXT NOT NULL DEFAULT '',
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (owner_id, report_name)
);
"#;

const REPORT_COLUMNS: &str = "owner_id, report_name, date_generated, target_animals, results, \
    revision, ai_generated_summary";

/// Postgres-backed owner-isolated store.
///
/// Every query carries `owner_id` in its key or `WHERE` clause.
pub struct PostgresHerdStore {
    pool: Arc<PgPool>,
}

impl PostgresHerdStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &str) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn lock_report(
        tx: &mut Transaction<'static, Postgres>,
        owner_id: OwnerId,
        report_name: &ReportName,
        operation: &str,
    ) -> Result<Option<ReportRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM herd_reports \
             WHERE owner_id = $1 AND report_name = $2 FOR UPDATE"
        ))
        .bind(owner_id.as_uuid())
        .bind(report_name.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        row.as_ref().map(report_from_row).transpose()
    }

    async fn write_report(
        tx: &mut Transaction<'static, Postgres>,
        report: &ReportRecord,
        operation: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE herd_reports
            SET date_generated = $3,
                target_animals = $4,
                results = $5,
                revision = $6,
                ai_generated_summary = $7,
                updated_at = NOW()
            WHERE owner_id = $1 AND report_name = $2
            "#,
        )
        .bind(report.owner_id.as_uuid())
        .bind(report.report_name.as_str())
        .bind(report.date_generated)
        .bind(Json(&report.target_animals))
        .bind(Json(&report.results))
        .bind(revision_to_db(report.revision)?)
        .bind(&report.ai_generated_summary)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }

    async fn commit(tx: Transaction<'static, Postgres>, operation: &str) -> Result<(), StoreError> {
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl AnimalStore for PostgresHerdStore {
    #[instrument(skip(self), fields(owner_id = %owner_id, animal_id = %animal_id), err)]
    async fn get_animal(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<Option<AnimalRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT owner_id, animal_id, observations
            FROM herd_animals
            WHERE owner_id = $1 AND animal_id = $2
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_animal", e))?;

        row.as_ref().map(animal_from_row).transpose()
    }

    #[instrument(
        skip(self),
        fields(owner_id = %owner_id, animal_count = tracing::field::Empty),
        err
    )]
    async fn list_animals(&self, owner_id: OwnerId) -> Result<Vec<AnimalRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT owner_id, animal_id, observations
            FROM herd_animals
            WHERE owner_id = $1
            ORDER BY animal_id ASC
            "#,
        )
        .bind(owner_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_animals", e))?;

        let animals = rows.iter().map(animal_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("animal_count", animals.len());
        Ok(animals)
    }

    #[instrument(
        skip(self, observation),
        fields(owner_id = %owner_id, animal_id = %animal_id, date = %observation.date),
        err
    )]
    async fn append_observation(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
        observation: WeightObservation,
    ) -> Result<AnimalRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO herd_animals (owner_id, animal_id, observations)
            VALUES ($1, $2, jsonb_build_array($3::jsonb))
            ON CONFLICT (owner_id, animal_id)
            DO UPDATE SET
                observations = herd_animals.observations || EXCLUDED.observations,
                updated_at = NOW()
            RETURNING owner_id, animal_id, observations
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .bind(Json(&observation))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_observation", e))?;

        animal_from_row(&row)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, animal_id = %animal_id), err)]
    async fn remove_observations_at(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
        date: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut tx = self.begin("remove_observations_at").await?;

        let row = sqlx::query(
            r#"
            SELECT owner_id, animal_id, observations
            FROM herd_animals
            WHERE owner_id = $1 AND animal_id = $2
            FOR UPDATE
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("remove_observations_at", e))?;

        let mut record = match row {
            Some(row) => animal_from_row(&row)?,
            None => return Err(DomainError::not_found(format!("animal '{animal_id}'")).into()),
        };
        let removed = record.remove_observations_at(date)?;

        sqlx::query(
            r#"
            UPDATE herd_animals
            SET observations = $3, updated_at = NOW()
            WHERE owner_id = $1 AND animal_id = $2
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .bind(Json(&record.weight_observations))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("remove_observations_at", e))?;

        Self::commit(tx, "remove_observations_at").await?;
        Ok(removed)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, animal_id = %animal_id), err)]
    async fn exists(&self, owner_id: OwnerId, animal_id: &AnimalId) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM herd_animals WHERE owner_id = $1 AND animal_id = $2
            ) AS present
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("exists", e))?;

        row.try_get("present")
            .map_err(|e| map_sqlx_error("exists", e))
    }
}

#[async_trait]
impl ReportStore for PostgresHerdStore {
    #[instrument(skip(self), fields(owner_id = %owner_id, report_name = %report_name), err)]
    async fn get_report(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
    ) -> Result<Option<ReportRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM herd_reports WHERE owner_id = $1 AND report_name = $2"
        ))
        .bind(owner_id.as_uuid())
        .bind(report_name.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_report", e))?;

        row.as_ref().map(report_from_row).transpose()
    }

    #[instrument(skip(self), fields(owner_id = %owner_id), err)]
    async fn list_reports(&self, owner_id: OwnerId) -> Result<Vec<ReportRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM herd_reports WHERE owner_id = $1 ORDER BY report_name ASC"
        ))
        .bind(owner_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reports", e))?;

        rows.iter().map(report_from_row).collect()
    }

    #[instrument(
        skip(self, entry),
        fields(owner_id = %owner_id, report_name = %report_name, animal_id = %entry.animal_id),
        err
    )]
    async fn merge_report_entry(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
        entry: AnimalReportEntry,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportRecord, StoreError> {
        let mut tx = self.begin("merge_report_entry").await?;

        let animal = sqlx::query(
            "SELECT 1 FROM herd_animals WHERE owner_id = $1 AND animal_id = $2 FOR SHARE",
        )
        .bind(owner_id.as_uuid())
        .bind(entry.animal_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("merge_report_entry", e))?;

        if animal.is_none() {
            return Err(DomainError::not_found(format!("animal '{}'", entry.animal_id)).into());
        }

        let created = ReportRecord::new(owner_id, report_name.clone(), entry.clone(), generated_at);
        let inserted = sqlx::query(
            r#"
            INSERT INTO herd_reports (
                owner_id, report_name, date_generated, target_animals, results, revision,
                ai_generated_summary
            )
            VALUES ($1, $2, $3, $4, $5, $6, '')
            ON CONFLICT (owner_id, report_name) DO NOTHING
            RETURNING report_name
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(report_name.as_str())
        .bind(generated_at)
        .bind(Json(&created.target_animals))
        .bind(Json(&created.results))
        .bind(revision_to_db(created.revision)?)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("merge_report_entry", e))?;

        if inserted.is_some() {
            Self::commit(tx, "merge_report_entry").await?;
            return Ok(created);
        }

        let mut report = Self::lock_report(&mut tx, owner_id, report_name, "merge_report_entry")
            .await?
            .ok_or_else(|| {
                StoreError::Backend(format!("report '{report_name}' vanished during merge"))
            })?;
        report.merge_entry(entry, generated_at);
        Self::write_report(&mut tx, &report, "merge_report_entry").await?;
        Self::commit(tx, "merge_report_entry").await?;
        Ok(report)
    }

    #[instrument(
        skip(self),
        fields(owner_id = %owner_id, old_name = %old_name, new_name = %new_name),
        err
    )]
    async fn rename_report(
        &self,
        owner_id: OwnerId,
        old_name: &ReportName,
        new_name: &ReportName,
    ) -> Result<ReportRecord, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE herd_reports SET report_name = $3, updated_at = NOW() \
             WHERE owner_id = $1 AND report_name = $2 \
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(owner_id.as_uuid())
        .bind(old_name.as_str())
        .bind(new_name.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("rename_report", e))?;

        match row {
            Some(row) => report_from_row(&row),
            None => Err(DomainError::not_found(format!("report '{old_name}'")).into()),
        }
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, report_name = %report_name), err)]
    async fn delete_report(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("DELETE FROM herd_reports WHERE owner_id = $1 AND report_name = $2")
                .bind(owner_id.as_uuid())
                .bind(report_name.as_str())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete_report", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("report '{report_name}'")).into());
        }
        Ok(())
    }

    #[instrument(
        skip(self, summary),
        fields(owner_id = %owner_id, report_name = %report_name),
        err
    )]
    async fn store_summary(
        &self,
        owner_id: OwnerId,
        report_name: &ReportName,
        revision: u64,
        summary: &str,
    ) -> Result<ReportRecord, StoreError> {
        let mut tx = self.begin("store_summary").await?;

        let mut report = Self::lock_report(&mut tx, owner_id, report_name, "store_summary")
            .await?
            .ok_or_else(|| DomainError::not_found(format!("report '{report_name}'")))?;
        report.store_summary(revision, summary)?;

        Self::write_report(&mut tx, &report, "store_summary").await?;
        Self::commit(tx, "store_summary").await?;
        Ok(report)
    }
}

#[async_trait]
impl HerdStore for PostgresHerdStore {
    #[instrument(skip(self), fields(owner_id = %owner_id, animal_id = %animal_id), err)]
    async fn delete_animal_cascade(
        &self,
        owner_id: OwnerId,
        animal_id: &AnimalId,
    ) -> Result<CascadeOutcome, StoreError> {
        let mut tx = self.begin("delete_animal_cascade").await?;

        let deleted = sqlx::query(
            "DELETE FROM herd_animals WHERE owner_id = $1 AND animal_id = $2 RETURNING animal_id",
        )
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_animal_cascade", e))?;

        if deleted.is_none() {
            return Err(DomainError::not_found(format!("animal '{animal_id}'")).into());
        }

        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM herd_reports \
             WHERE owner_id = $1 AND target_animals ? $2 FOR UPDATE"
        ))
        .bind(owner_id.as_uuid())
        .bind(animal_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_animal_cascade", e))?;

        let mut reports = rows.iter().map(report_from_row).collect::<Result<Vec<_>, _>>()?;
        let outcome = detach_animal_from_reports(owner_id, animal_id, reports.iter_mut());

        for report in &reports {
            if outcome.deleted_reports.contains(&report.report_name) {
                sqlx::query("DELETE FROM herd_reports WHERE owner_id = $1 AND report_name = $2")
                    .bind(owner_id.as_uuid())
                    .bind(report.report_name.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete_animal_cascade", e))?;
            } else if outcome.updated_reports.contains(&report.report_name) {
                Self::write_report(&mut tx, report, "delete_animal_cascade").await?;
            }
        }

        Self::commit(tx, "delete_animal_cascade").await?;
        Ok(outcome)
    }
}

fn animal_from_row(row: &PgRow) -> Result<AnimalRecord, StoreError> {
    let owner_id: uuid::Uuid = row.try_get("owner_id").map_err(decode_error)?;
    let animal_id: String = row.try_get("animal_id").map_err(decode_error)?;
    let Json(weight_observations): Json<Vec<WeightObservation>> =
        row.try_get("observations").map_err(decode_error)?;

    Ok(AnimalRecord {
        owner_id: OwnerId::from_uuid(owner_id),
        animal_id: AnimalId::parse(animal_id)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        weight_observations,
    })
}

fn report_from_row(row: &PgRow) -> Result<ReportRecord, StoreError> {
    let owner_id: uuid::Uuid = row.try_get("owner_id").map_err(decode_error)?;
    let report_name: String = row.try_get("report_name").map_err(decode_error)?;
    let Json(target_animals): Json<BTreeSet<AnimalId>> =
        row.try_get("target_animals").map_err(decode_error)?;
    let Json(results): Json<Vec<AnimalReportEntry>> =
        row.try_get("results").map_err(decode_error)?;

    Ok(ReportRecord {
        owner_id: OwnerId::from_uuid(owner_id),
        report_name: ReportName::parse(report_name)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        date_generated: row.try_get("date_generated").map_err(decode_error)?,
        target_animals,
        results,
        revision: revision_from_db(row.try_get("revision").map_err(decode_error)?)?,
        ai_generated_summary: row.try_get("ai_generated_summary").map_err(decode_error)?,
    })
}

fn revision_to_db(revision: u64) -> Result<i64, StoreError> {
    i64::try_from(revision)
        .map_err(|_| StoreError::Serialization(format!("revision {revision} exceeds BIGINT")))
}

fn revision_from_db(revision: i64) -> Result<u64, StoreError> {
    u64::try_from(revision)
        .map_err(|_| StoreError::Serialization(format!("negative revision {revision}")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Serialization(err.to_string())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: a rename onto a name another request just took.
                Some("23505") => DomainError::conflict(msg).into(),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::Decode(e) | sqlx::Error::ColumnDecode { source: e, .. } => {
            StoreError::Serialization(format!("{operation}: {e}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}
