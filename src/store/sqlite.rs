// ABOUTME: SQLite reference implementation of the RemoteStore capability
// ABOUTME: Schema migration, request CRUD, conditional updates, and change-event emission
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CoachLink

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Coach, CoachClientAssignment, CoachRequest, NewCoachRequest, Profile, RequestResolution,
    RequestStatus,
};
use crate::store::events::{
    ChangeBroadcaster, ChangeEvent, ChangeKind, ChangeStream, SubscriptionFilter,
};
use crate::store::RemoteStore;

/// SQLite-backed [`RemoteStore`].
///
/// Reference backend used by the test suite and by embedding apps in
/// development. Change events are emitted on the in-process broadcaster
/// after each successful mutation, mirroring what the hosted store delivers
/// over its realtime channel.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    events: ChangeBroadcaster,
}

impl SqliteStore {
    /// Wrap an existing pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            events: ChangeBroadcaster::new(),
        }
    }

    /// Connect to `database_url` and wrap the pool
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to SQLite: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the request-lifecycle schema.
    ///
    /// The partial unique index on pending pairs backs the unique-violation
    /// mapping on insert; the pre-insert check in the core remains the
    /// first line of defense.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                avatar_url TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create profiles table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS coaches (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                avatar_url TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create coaches table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS coach_requests (
                id TEXT PRIMARY KEY,
                client_user_id TEXT NOT NULL,
                coach_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                message TEXT,
                requested_at TEXT NOT NULL,
                responded_at TEXT,
                responded_by TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create coach_requests table: {e}")))?;

        sqlx::query(
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_coach_requests_pending_pair
            ON coach_requests (client_user_id, coach_id)
            WHERE status = 'pending'
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pending-pair index: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS coach_client_assignments (
                id TEXT PRIMARY KEY,
                coach_id TEXT NOT NULL,
                client_user_id TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                assigned_at TEXT NOT NULL,
                UNIQUE (coach_id, client_user_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create assignments table: {e}")))?;

        Ok(())
    }

    async fn query_requests_where(
        &self,
        column: &str,
        value: Uuid,
    ) -> AppResult<Vec<CoachRequest>> {
        // column is one of two fixed identifiers, never caller input
        let query = format!(
            r"
            SELECT id, client_user_id, coach_id, status, message,
                   requested_at, responded_at, responded_by
            FROM coach_requests
            WHERE {column} = $1
            ORDER BY requested_at DESC
            "
        );

        let rows = sqlx::query(&query)
            .bind(value.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query requests: {e}")))?;

        rows.iter().map(row_to_request).collect()
    }

    /// Fetch the row once more to carry party ids into a change event
    async fn event_for(&self, id: Uuid, kind: ChangeKind) -> Option<ChangeEvent> {
        match self.query_request_by_id(id).await {
            Ok(Some(row)) => Some(ChangeEvent {
                kind,
                request_id: row.id,
                client_user_id: row.client_user_id,
                coach_id: row.coach_id,
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn query_requests_for_client(
        &self,
        client_user_id: Uuid,
    ) -> AppResult<Vec<CoachRequest>> {
        self.query_requests_where("client_user_id", client_user_id)
            .await
    }

    async fn query_requests_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<CoachRequest>> {
        self.query_requests_where("coach_id", coach_id).await
    }

    async fn query_requests_for_pair(
        &self,
        client_user_id: Uuid,
        coach_id: Uuid,
    ) -> AppResult<Vec<CoachRequest>> {
        let rows = sqlx::query(
            r"
            SELECT id, client_user_id, coach_id, status, message,
                   requested_at, responded_at, responded_by
            FROM coach_requests
            WHERE client_user_id = $1 AND coach_id = $2
            ORDER BY requested_at DESC
            ",
        )
        .bind(client_user_id.to_string())
        .bind(coach_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query requests for pair: {e}")))?;

        rows.iter().map(row_to_request).collect()
    }

    async fn query_request_by_id(&self, id: Uuid) -> AppResult<Option<CoachRequest>> {
        let row = sqlx::query(
            r"
            SELECT id, client_user_id, coach_id, status, message,
                   requested_at, responded_at, responded_by
            FROM coach_requests
            WHERE id = $1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query request: {e}")))?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn insert_request(&self, new: &NewCoachRequest) -> AppResult<CoachRequest> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        sqlx::query(
            r"
            INSERT INTO coach_requests (
                id, client_user_id, coach_id, status, message,
                requested_at, responded_at, responded_by
            ) VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL)
            ",
        )
        .bind(id.to_string())
        .bind(new.client_user_id.to_string())
        .bind(new.coach_id.to_string())
        .bind(RequestStatus::Pending.as_str())
        .bind(new.message.as_deref())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(de)
                if matches!(de.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                AppError::unique_violation(format!(
                    "Pending request already exists for pair: {e}"
                ))
            }
            _ => AppError::database(format!("Failed to insert request: {e}")),
        })?;

        let created = CoachRequest {
            id,
            client_user_id: new.client_user_id,
            coach_id: new.coach_id,
            status: RequestStatus::Pending,
            message: new.message.clone(),
            requested_at: now,
            responded_at: None,
            responded_by: None,
        };

        self.events.publish(ChangeEvent {
            kind: ChangeKind::Insert,
            request_id: created.id,
            client_user_id: created.client_user_id,
            coach_id: created.coach_id,
        });

        Ok(created)
    }

    async fn update_request_conditional(
        &self,
        id: Uuid,
        expected: RequestStatus,
        resolution: &RequestResolution,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE coach_requests
            SET status = $1, responded_at = $2, responded_by = $3
            WHERE id = $4 AND status = $5
            ",
        )
        .bind(resolution.status.as_str())
        .bind(resolution.responded_at.to_rfc3339())
        .bind(resolution.responded_by.to_string())
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update request: {e}")))?;

        let affected = result.rows_affected();
        if affected > 0 {
            if let Some(event) = self.event_for(id, ChangeKind::Update).await {
                self.events.publish(event);
            }
        } else {
            debug!(%id, expected = %expected, "conditional update matched no rows");
        }

        Ok(affected)
    }

    async fn delete_requests(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = (1..=ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");

        // Capture party ids before the rows disappear so delete events can
        // still be scoped to their viewers
        let select = format!(
            "SELECT id, client_user_id, coach_id FROM coach_requests WHERE id IN ({placeholders})"
        );
        let mut select_query = sqlx::query(&select);
        for id in ids {
            select_query = select_query.bind(id.to_string());
        }
        let doomed = select_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query requests to delete: {e}")))?;

        let delete = format!("DELETE FROM coach_requests WHERE id IN ({placeholders})");
        let mut delete_query = sqlx::query(&delete);
        for id in ids {
            delete_query = delete_query.bind(id.to_string());
        }
        let result = delete_query
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete requests: {e}")))?;

        for row in &doomed {
            if let Ok(event) = delete_event_from_row(row) {
                self.events.publish(event);
            }
        }

        Ok(result.rows_affected())
    }

    async fn insert_assignment(&self, coach_id: Uuid, client_user_id: Uuid) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO coach_client_assignments (id, coach_id, client_user_id, active, assigned_at)
            VALUES ($1, $2, $3, 1, $4)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(coach_id.to_string())
        .bind(client_user_id.to_string())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(de)
                if matches!(de.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                AppError::unique_violation(format!("Assignment already exists for pair: {e}"))
            }
            _ => AppError::database(format!("Failed to insert assignment: {e}")),
        })?;

        Ok(())
    }

    async fn query_assignment(
        &self,
        coach_id: Uuid,
        client_user_id: Uuid,
    ) -> AppResult<Option<CoachClientAssignment>> {
        let row = sqlx::query(
            r"
            SELECT coach_id, client_user_id, active, assigned_at
            FROM coach_client_assignments
            WHERE coach_id = $1 AND client_user_id = $2
            ",
        )
        .bind(coach_id.to_string())
        .bind(client_user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query assignment: {e}")))?;

        row.as_ref().map(row_to_assignment).transpose()
    }

    async fn query_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query(
            r"
            SELECT user_id, display_name, avatar_url FROM profiles WHERE user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query profile: {e}")))?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn query_coach(&self, coach_id: Uuid) -> AppResult<Option<Coach>> {
        let row = sqlx::query(
            r"
            SELECT id, full_name, avatar_url FROM coaches WHERE id = $1
            ",
        )
        .bind(coach_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query coach: {e}")))?;

        row.as_ref().map(row_to_coach).transpose()
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> ChangeStream {
        self.events.subscribe(filter)
    }
}

fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::internal(format!("Invalid UUID: {e}")))
}

fn parse_datetime(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::internal(format!("Invalid datetime: {e}")))
}

fn row_to_request(row: &SqliteRow) -> AppResult<CoachRequest> {
    let id_str: String = row.get("id");
    let client_user_id_str: String = row.get("client_user_id");
    let coach_id_str: String = row.get("coach_id");
    let status_str: String = row.get("status");
    let message: Option<String> = row.get("message");
    let requested_at_str: String = row.get("requested_at");
    let responded_at_str: Option<String> = row.get("responded_at");
    let responded_by_str: Option<String> = row.get("responded_by");

    Ok(CoachRequest {
        id: parse_uuid(&id_str)?,
        client_user_id: parse_uuid(&client_user_id_str)?,
        coach_id: parse_uuid(&coach_id_str)?,
        status: RequestStatus::parse(&status_str),
        message,
        requested_at: parse_datetime(&requested_at_str)?,
        responded_at: responded_at_str.as_deref().map(parse_datetime).transpose()?,
        responded_by: responded_by_str.as_deref().map(parse_uuid).transpose()?,
    })
}

fn row_to_profile(row: &SqliteRow) -> AppResult<Profile> {
    let user_id_str: String = row.get("user_id");

    Ok(Profile {
        user_id: parse_uuid(&user_id_str)?,
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
    })
}

fn row_to_coach(row: &SqliteRow) -> AppResult<Coach> {
    let id_str: String = row.get("id");

    Ok(Coach {
        id: parse_uuid(&id_str)?,
        full_name: row.get("full_name"),
        avatar_url: row.get("avatar_url"),
    })
}

fn row_to_assignment(row: &SqliteRow) -> AppResult<CoachClientAssignment> {
    let coach_id_str: String = row.get("coach_id");
    let client_user_id_str: String = row.get("client_user_id");
    let assigned_at_str: String = row.get("assigned_at");

    Ok(CoachClientAssignment {
        coach_id: parse_uuid(&coach_id_str)?,
        client_user_id: parse_uuid(&client_user_id_str)?,
        active: row.get("active"),
        assigned_at: parse_datetime(&assigned_at_str)?,
    })
}

fn delete_event_from_row(row: &SqliteRow) -> AppResult<ChangeEvent> {
    let id_str: String = row.get("id");
    let client_user_id_str: String = row.get("client_user_id");
    let coach_id_str: String = row.get("coach_id");

    Ok(ChangeEvent {
        kind: ChangeKind::Delete,
        request_id: parse_uuid(&id_str)?,
        client_user_id: parse_uuid(&client_user_id_str)?,
        coach_id: parse_uuid(&coach_id_str)?,
    })
}
