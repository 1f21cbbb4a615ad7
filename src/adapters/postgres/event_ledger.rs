//! PostgreSQL implementation of the event ledger.
//!
//! The processed_events table is the dedup source of truth. Claims rely
//! on the primary key (INSERT .. ON CONFLICT DO NOTHING), completion runs
//! in one transaction with the reconciliation mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{BillingEvent, Reconciliation};
use crate::domain::foundation::Timestamp;
use crate::ports::{BeginOutcome, EventLedger, LedgerError, ProcessedEventRecord};

/// In-flight records older than this are assumed abandoned by a crashed
/// worker and may be reclaimed by a redelivery.
const STALE_IN_FLIGHT_SECS: i64 = 120;

pub struct PostgresEventLedger {
    pool: PgPool,
}

impl PostgresEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedEventRow {
    event_id: String,
    event_type: String,
    payload: serde_json::Value,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<ProcessedEventRow> for ProcessedEventRecord {
    fn from(row: ProcessedEventRow) -> Self {
        Self {
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            received_at: Timestamp::from_datetime(row.received_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
        }
    }
}

fn store_err(context: &str, e: sqlx::Error) -> LedgerError {
    LedgerError::StoreUnavailable(format!("{}: {}", context, e))
}

#[async_trait]
impl EventLedger for PostgresEventLedger {
    async fn try_begin(&self, event: &BillingEvent) -> Result<BeginOutcome, LedgerError> {
        let record = ProcessedEventRecord::received(event);

        let inserted = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type, payload, received_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("failed to claim event", e))?;

        if inserted.rows_affected() == 1 {
            return Ok(BeginOutcome::Accepted(record));
        }

        // The event id already exists: processed, in flight, or abandoned.
        let existing: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT processed_at FROM processed_events WHERE event_id = $1")
                .bind(&event.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_err("failed to inspect event", e))?;

        match existing {
            Some((Some(_),)) => Ok(BeginOutcome::AlreadyProcessed),
            Some((None,)) => {
                // Reclaim abandoned claims; the WHERE guard keeps this
                // race-safe when several redeliveries attempt it at once.
                let reclaimed = sqlx::query(
                    r#"
                    UPDATE processed_events
                    SET received_at = NOW()
                    WHERE event_id = $1
                      AND processed_at IS NULL
                      AND received_at < NOW() - INTERVAL '1 second' * $2
                    "#,
                )
                .bind(&event.id)
                .bind(STALE_IN_FLIGHT_SECS)
                .execute(&self.pool)
                .await
                .map_err(|e| store_err("failed to reclaim event", e))?;

                if reclaimed.rows_affected() == 1 {
                    Ok(BeginOutcome::Accepted(ProcessedEventRecord::received(event)))
                } else {
                    Ok(BeginOutcome::AlreadyInFlight)
                }
            }
            // Row vanished between the insert and the select; treat as a
            // concurrent claim and let the caller retry.
            None => Ok(BeginOutcome::AlreadyInFlight),
        }
    }

    async fn complete(
        &self,
        event_id: &str,
        reconciliation: &Reconciliation,
    ) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_err("failed to begin transaction", e))?;

        // Claim the processed marker first. Zero rows means another
        // delivery already completed the event; the mutation must not be
        // applied a second time.
        let claimed = sqlx::query(
            r#"
            UPDATE processed_events
            SET processed_at = NOW()
            WHERE event_id = $1 AND processed_at IS NULL
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_err("failed to mark event processed", e))?;

        if claimed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| store_err("failed to roll back", e))?;
            return Ok(());
        }

        match reconciliation {
            Reconciliation::UpsertSubscription(snapshot) => {
                // Timestamp-gated upsert: a snapshot older than the row's
                // updated_at leaves the row untouched.
                sqlx::query(
                    r#"
                    INSERT INTO subscriptions
                        (id, account_id, provider_subscription_id, status,
                         collection_method, current_period_end, updated_at)
                    VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6)
                    ON CONFLICT (account_id, provider_subscription_id) DO UPDATE
                    SET status = EXCLUDED.status,
                        collection_method = EXCLUDED.collection_method,
                        current_period_end = EXCLUDED.current_period_end,
                        updated_at = EXCLUDED.updated_at
                    WHERE subscriptions.updated_at <= EXCLUDED.updated_at
                    "#,
                )
                .bind(snapshot.account_id.as_str())
                .bind(&snapshot.provider_subscription_id)
                .bind(snapshot.status.as_str())
                .bind(snapshot.collection_method.as_str())
                .bind(snapshot.current_period_end.map(|t| *t.as_datetime()))
                .bind(snapshot.snapshot_at.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| store_err("failed to upsert subscription", e))?;
            }
            Reconciliation::TopUpCredits(top_up) => {
                sqlx::query(
                    r#"
                    INSERT INTO credit_balances (account_id, credits, updated_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (account_id) DO UPDATE
                    SET credits = credit_balances.credits + EXCLUDED.credits,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(top_up.account_id.as_str())
                .bind(top_up.amount)
                .bind(top_up.granted_at.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| store_err("failed to top up credits", e))?;
            }
            Reconciliation::Skip => {}
        }

        tx.commit()
            .await
            .map_err(|e| store_err("failed to commit", e))?;
        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEventRecord>, LedgerError> {
        let row: Option<ProcessedEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, payload, received_at, processed_at
            FROM processed_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_err("failed to load event", e))?;

        Ok(row.map(ProcessedEventRecord::from))
    }
}
