//! Application user records keyed by identity id.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use rusqlite::{ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;

use crate::core::config::StorageConfig;
use crate::core::errors::{TradenomixError, TradenomixResult};
use crate::core::ids::IdentityId;

/// Boxed future type for record store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Current time at the millisecond precision records are stored with.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Application-level user record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identity provider subject id.
    pub id: IdentityId,
    /// Email address.
    pub email: String,
    /// Unique username.
    pub username: String,
    /// Provider that authenticated the identity.
    pub provider: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// When the identity last authenticated.
    pub last_login: DateTime<Utc>,
}

impl UserRecord {
    /// Fresh record with all timestamps set to `now`.
    #[must_use]
    pub fn new(
        id: IdentityId,
        email: impl Into<String>,
        username: impl Into<String>,
        provider: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            username: username.into(),
            provider: provider.into(),
            created_at: now,
            updated_at: now,
            last_login: now,
        }
    }
}

/// Outcome of an atomic insert-if-absent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted,
    /// A record with the same id already exists; nothing was written.
    AlreadyExists,
    /// Another identity holds the username; nothing was written.
    UsernameTaken,
}

/// User record store trait.
pub trait UserRecordStore: Send + Sync {
    /// Get a record by identity id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn find_by_id<'a>(
        &'a self,
        id: &'a IdentityId,
    ) -> StoreFuture<'a, TradenomixResult<Option<UserRecord>>>;

    /// Get a record by username.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> StoreFuture<'a, TradenomixResult<Option<UserRecord>>>;

    /// Insert `record` unless its id or username is already present, as one
    /// atomic operation.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn insert_if_absent<'a>(
        &'a self,
        record: &'a UserRecord,
    ) -> StoreFuture<'a, TradenomixResult<InsertOutcome>>;

    /// Set `last_login` and `updated_at` to `now`. Returns the updated record, or
    /// `None` if no record has this id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn touch_login<'a>(
        &'a self,
        id: &'a IdentityId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, TradenomixResult<Option<UserRecord>>>;

    /// Number of stored records.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn count(&self) -> StoreFuture<'_, TradenomixResult<u64>>;
}

type RawRecord = (String, String, String, String, i64, i64, i64);

const COLUMNS: &str = "id, email, username, provider, created_at, updated_at, last_login";

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn timestamp(millis: i64) -> TradenomixResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| TradenomixError::InvalidRecord(format!("invalid timestamp {millis}")))
}

fn decode(raw: RawRecord) -> TradenomixResult<UserRecord> {
    let (id, email, username, provider, created_at, updated_at, last_login) = raw;
    Ok(UserRecord {
        id: IdentityId::new(id)?,
        email,
        username,
        provider,
        created_at: timestamp(created_at)?,
        updated_at: timestamp(updated_at)?,
        last_login: timestamp(last_login)?,
    })
}

fn valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `SQLite` implementation of the user record store.
///
/// `id` is the primary key and `username` carries a `UNIQUE` constraint, so
/// concurrent reconciliations of one identity cannot produce two records.
pub struct SqliteUserRecordStore {
    conn: Connection,
    table: String,
}

impl SqliteUserRecordStore {
    /// Open the database at the configured path and create the table if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> TradenomixResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn, &config.users_table).await
    }

    /// Use an existing connection (e.g. `Connection::open_in_memory`).
    ///
    /// # Errors
    /// Returns an error if the table name is unsafe or schema creation fails.
    pub async fn with_connection(conn: Connection, table: &str) -> TradenomixResult<Self> {
        if !valid_table_name(table) {
            return Err(TradenomixError::InvalidConfig(format!(
                "invalid users table name: {table}"
            )));
        }
        let table = table.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL,
                    username TEXT NOT NULL UNIQUE,
                    provider TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    last_login INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl UserRecordStore for SqliteUserRecordStore {
    fn find_by_id<'a>(
        &'a self,
        id: &'a IdentityId,
    ) -> StoreFuture<'a, TradenomixResult<Option<UserRecord>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let id_str = id.to_string();
            let raw = self
                .conn
                .call(move |conn| {
                    let raw = conn
                        .query_row(
                            &format!("SELECT {COLUMNS} FROM {table} WHERE id = ?1"),
                            rusqlite::params![id_str],
                            read_raw,
                        )
                        .optional()?;
                    Ok(raw)
                })
                .await?;
            raw.map(decode).transpose()
        })
    }

    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> StoreFuture<'a, TradenomixResult<Option<UserRecord>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let username = username.to_string();
            let raw = self
                .conn
                .call(move |conn| {
                    let raw = conn
                        .query_row(
                            &format!("SELECT {COLUMNS} FROM {table} WHERE username = ?1"),
                            rusqlite::params![username],
                            read_raw,
                        )
                        .optional()?;
                    Ok(raw)
                })
                .await?;
            raw.map(decode).transpose()
        })
    }

    fn insert_if_absent<'a>(
        &'a self,
        record: &'a UserRecord,
    ) -> StoreFuture<'a, TradenomixResult<InsertOutcome>> {
        Box::pin(async move {
            let table = self.table.clone();
            let record = record.clone();
            let outcome = self
                .conn
                .call(move |conn| {
                    let result = conn.execute(
                        &format!(
                            "INSERT INTO {table} ({COLUMNS})
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                             ON CONFLICT(id) DO NOTHING"
                        ),
                        rusqlite::params![
                            record.id,
                            record.email,
                            record.username,
                            record.provider,
                            record.created_at.timestamp_millis(),
                            record.updated_at.timestamp_millis(),
                            record.last_login.timestamp_millis()
                        ],
                    );
                    match result {
                        Ok(0) => Ok(InsertOutcome::AlreadyExists),
                        Ok(_) => Ok(InsertOutcome::Inserted),
                        Err(rusqlite::Error::SqliteFailure(err, _))
                            if err.code == ErrorCode::ConstraintViolation =>
                        {
                            Ok(InsertOutcome::UsernameTaken)
                        }
                        Err(err) => Err(err.into()),
                    }
                })
                .await?;
            Ok(outcome)
        })
    }

    fn touch_login<'a>(
        &'a self,
        id: &'a IdentityId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, TradenomixResult<Option<UserRecord>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let id_str = id.to_string();
            let now_ms = now.timestamp_millis();
            let raw = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    let updated = tx.execute(
                        &format!(
                            "UPDATE {table} SET last_login = ?1, updated_at = ?1 WHERE id = ?2"
                        ),
                        rusqlite::params![now_ms, id_str],
                    )?;
                    let raw = if updated == 0 {
                        None
                    } else {
                        tx.query_row(
                            &format!("SELECT {COLUMNS} FROM {table} WHERE id = ?1"),
                            rusqlite::params![id_str],
                            read_raw,
                        )
                        .optional()?
                    };
                    tx.commit()?;
                    Ok(raw)
                })
                .await?;
            raw.map(decode).transpose()
        })
    }

    fn count(&self) -> StoreFuture<'_, TradenomixResult<u64>> {
        Box::pin(async move {
            let table = self.table.clone();
            let count = self
                .conn
                .call(move |conn| {
                    let count: i64 =
                        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                            row.get(0)
                        })?;
                    Ok(count)
                })
                .await?;
            u64::try_from(count)
                .map_err(|_| TradenomixError::InvalidRecord("invalid record count".to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteUserRecordStore {
        let conn = Connection::open_in_memory().await.unwrap();
        SqliteUserRecordStore::with_connection(conn, "users")
            .await
            .unwrap()
    }

    fn record(id: &str, username: &str) -> UserRecord {
        UserRecord::new(
            IdentityId::new(id).unwrap(),
            format!("{id}@desk.io"),
            username,
            "email",
            now_millis(),
        )
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_keyed_by_id() {
        let store = store().await;
        let first = record("u1", "trader1");

        assert_eq!(
            store.insert_if_absent(&first).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_if_absent(&first).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.count().await.unwrap(), 1);

        let found = store.find_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(found, first);
    }

    #[tokio::test]
    async fn test_username_is_unique_across_identities() {
        let store = store().await;
        store.insert_if_absent(&record("u1", "trader1")).await.unwrap();

        let outcome = store
            .insert_if_absent(&record("u2", "trader1"))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::UsernameTaken);
        assert_eq!(store.count().await.unwrap(), 1);

        let holder = store.find_by_username("trader1").await.unwrap().unwrap();
        assert_eq!(holder.id.as_str(), "u1");
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_login_updates_only_timestamps() {
        let store = store().await;
        let original = record("u1", "trader1");
        store.insert_if_absent(&original).await.unwrap();

        let later = original.created_at + chrono::Duration::seconds(30);
        let touched = store
            .touch_login(&original.id, later)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(touched.created_at, original.created_at);
        assert_eq!(touched.updated_at, later);
        assert_eq!(touched.last_login, later);
        assert_eq!(touched.username, original.username);

        let missing = IdentityId::new("ghost").unwrap();
        assert!(store.touch_login(&missing, later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_table_name() {
        let conn = Connection::open_in_memory().await.unwrap();
        let result = SqliteUserRecordStore::with_connection(conn, "users; DROP TABLE x").await;
        assert!(matches!(result, Err(TradenomixError::InvalidConfig(_))));
    }
}
