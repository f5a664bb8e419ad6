//! Postgres Backend
//!
//! Stores events in a `transactions` table whose `BIGSERIAL` primary key
//! provides the sequence.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::PostgresParams;
use crate::error::{KvError, Result};

use super::{Event, EventType, LogBackend, ReplaySink};

const TABLE: &str = "transactions";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS transactions (
        sequence   BIGSERIAL PRIMARY KEY,
        event_type SMALLINT NOT NULL,
        key        TEXT NOT NULL,
        value      TEXT
    )
"#;

/// Relational transaction log
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect, then verify (or create) the `transactions` table
    pub async fn connect(params: &PostgresParams) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.db_name);

        tracing::info!(
            host = %params.host,
            db = %params.db_name,
            "Connecting to Postgres transaction log"
        );

        let pool = PgPoolOptions::new()
            .max_connections(params.max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool, verifying (or creating) the table
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let backend = Self { pool };

        if !backend.table_exists().await? {
            tracing::info!(table = TABLE, "Creating transaction log table");
            backend.create_table().await?;
        }

        Ok(backend)
    }

    async fn table_exists(&self) -> Result<bool> {
        let (name,): (Option<String>,) =
            sqlx::query_as("SELECT to_regclass('public.transactions')::text")
                .fetch_one(&self.pool)
                .await?;

        Ok(name.is_some())
    }

    async fn create_table(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LogBackend for PostgresBackend {
    async fn append(&mut self, event: &Event) -> Result<u64> {
        let (sequence,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO transactions (event_type, key, value)
            VALUES ($1, $2, $3)
            RETURNING sequence
            "#,
        )
        .bind(i16::from(event.event_type.as_u8()))
        .bind(&event.key)
        .bind(&event.value)
        .fetch_one(&self.pool)
        .await?;

        Ok(sequence as u64)
    }

    async fn replay(&mut self, sink: &mut ReplaySink) -> Result<()> {
        let mut rows = sqlx::query_as::<_, (i64, i16, String, Option<String>)>(
            r#"
            SELECT sequence, event_type, key, value
            FROM transactions
            ORDER BY sequence ASC
            "#,
        )
        .fetch(&self.pool);

        while let Some((sequence, raw_type, key, value)) = rows.try_next().await? {
            let event = row_to_event(sequence, raw_type, key, value)?;

            if !sink.push(event).await? {
                break;
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// Decode one `transactions` row
fn row_to_event(sequence: i64, raw_type: i16, key: String, value: Option<String>) -> Result<Event> {
    let event_type = u8::try_from(raw_type).map_err(|_| KvError::Corrupt {
        line: sequence as u64,
        reason: format!("event_type {} out of range", raw_type),
    })?;

    Ok(Event {
        sequence: sequence as u64,
        event_type: EventType::try_from(event_type)?,
        key,
        value: value.unwrap_or_default(),
    })
}
