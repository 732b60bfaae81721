//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folktales_core::catalog::CatalogFilter;
use folktales_core::domain::{
    CompletedStory, Favorite, Folktale, MusicTrack, NewTrack, ReadingProgress, StoryNote, User,
    UserCredentials,
};
use folktales_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
    display_name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            display_name: self.display_name,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            display_name: self.display_name,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct FolktaleRecord {
    id: Uuid,
    title: String,
    text: String,
    region: Option<String>,
    source: Option<String>,
}
impl FolktaleRecord {
    fn to_domain(self) -> Folktale {
        Folktale {
            id: self.id,
            title: self.title,
            text: self.text,
            region: self.region,
            source: self.source,
        }
    }
}

#[derive(FromRow)]
struct FavoriteRecord {
    id: Uuid,
    user_id: Uuid,
    folktale_id: Uuid,
    created_at: DateTime<Utc>,
    title: String,
    text: String,
    region: Option<String>,
    source: Option<String>,
}
impl FavoriteRecord {
    fn to_domain(self) -> Favorite {
        Favorite {
            id: self.id,
            user_id: self.user_id,
            folktale_id: self.folktale_id,
            created_at: self.created_at,
            folktale: Some(Folktale {
                id: self.folktale_id,
                title: self.title,
                text: self.text,
                region: self.region,
                source: self.source,
            }),
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    id: Uuid,
    user_id: Uuid,
    folktale_id: Uuid,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
}
impl ProgressRecord {
    fn to_domain(self) -> ReadingProgress {
        ReadingProgress {
            id: self.id,
            user_id: self.user_id,
            folktale_id: self.folktale_id,
            completed: self.completed,
            completed_at: self.completed_at,
        }
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    user_id: Uuid,
    folktale_id: Uuid,
    notes: Option<String>,
    key_takeaways: Option<String>,
    updated_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> StoryNote {
        StoryNote {
            id: self.id,
            user_id: self.user_id,
            folktale_id: self.folktale_id,
            notes: self.notes,
            key_takeaways: self.key_takeaways,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TrackRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    artist: Option<String>,
    file_path: String,
    file_size: i64,
    duration_secs: Option<i64>,
    created_at: DateTime<Utc>,
}
impl TrackRecord {
    fn to_domain(self) -> MusicTrack {
        MusicTrack {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            artist: self.artist,
            file_path: self.file_path,
            file_size: self.file_size,
            duration_secs: self.duration_secs,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CompletedStoryRecord {
    folktale_id: Uuid,
    title: String,
    region: Option<String>,
    completed_at: DateTime<Utc>,
}
impl CompletedStoryRecord {
    fn to_domain(self) -> CompletedStory {
        CompletedStory {
            folktale_id: self.folktale_id,
            title: self.title,
            region: self.region,
            completed_at: self.completed_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, display_name, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING user_id, email, display_name",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(display_name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, display_name, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, display_name FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_folktales(&self, filter: &CatalogFilter) -> PortResult<Vec<Folktale>> {
        // Inactive axes bind as NULL, which the corresponding guard short-circuits.
        let records = sqlx::query_as::<_, FolktaleRecord>(
            "SELECT id, title, text, region, source FROM folktales \
             WHERE ($1::text IS NULL OR title ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR region = $2) \
               AND ($3::text IS NULL OR source = $3) \
             ORDER BY title ASC",
        )
        .bind(filter.active_term())
        .bind(filter.active_region())
        .bind(filter.active_source())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_folktale_by_id(&self, folktale_id: Uuid) -> PortResult<Folktale> {
        let record = sqlx::query_as::<_, FolktaleRecord>(
            "SELECT id, title, text, region, source FROM folktales WHERE id = $1",
        )
        .bind(folktale_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Folktale {} not found", folktale_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn list_regions(&self) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT region FROM folktales WHERE region IS NOT NULL ORDER BY region ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn list_sources(&self) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT source FROM folktales WHERE source IS NOT NULL ORDER BY source ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn count_folktales(&self) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM folktales")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn list_favorites(&self, user_id: Uuid) -> PortResult<Vec<Favorite>> {
        let records = sqlx::query_as::<_, FavoriteRecord>(
            "SELECT f.id, f.user_id, f.folktale_id, f.created_at, \
                    t.title, t.text, t.region, t.source \
             FROM favorites f \
             JOIN folktales t ON t.id = f.folktale_id \
             WHERE f.user_id = $1 \
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn favorite_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT folktale_id FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn insert_favorite(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO favorites (id, user_id, folktale_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, folktale_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(folktale_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_favorite(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND folktale_id = $2")
            .bind(user_id)
            .bind(folktale_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
    ) -> PortResult<Option<ReadingProgress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT id, user_id, folktale_id, completed, completed_at \
             FROM reading_progress WHERE user_id = $1 AND folktale_id = $2",
        )
        .bind(user_id)
        .bind(folktale_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn upsert_progress(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<ReadingProgress> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "INSERT INTO reading_progress (id, user_id, folktale_id, completed, completed_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, folktale_id) DO UPDATE \
             SET completed = EXCLUDED.completed, completed_at = EXCLUDED.completed_at \
             RETURNING id, user_id, folktale_id, completed, completed_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(folktale_id)
        .bind(completed)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn count_completed(&self, user_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reading_progress WHERE user_id = $1 AND completed",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn recently_completed(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<CompletedStory>> {
        let records = sqlx::query_as::<_, CompletedStoryRecord>(
            "SELECT p.folktale_id, t.title, t.region, p.completed_at \
             FROM reading_progress p \
             JOIN folktales t ON t.id = p.folktale_id \
             WHERE p.user_id = $1 AND p.completed AND p.completed_at IS NOT NULL \
             ORDER BY p.completed_at DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_note(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<Option<StoryNote>> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "SELECT id, user_id, folktale_id, notes, key_takeaways, updated_at \
             FROM user_notes WHERE user_id = $1 AND folktale_id = $2",
        )
        .bind(user_id)
        .bind(folktale_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn upsert_note(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
        notes: Option<&str>,
        key_takeaways: Option<&str>,
    ) -> PortResult<StoryNote> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "INSERT INTO user_notes (id, user_id, folktale_id, notes, key_takeaways, updated_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             ON CONFLICT (user_id, folktale_id) DO UPDATE \
             SET notes = EXCLUDED.notes, key_takeaways = EXCLUDED.key_takeaways, updated_at = now() \
             RETURNING id, user_id, folktale_id, notes, key_takeaways, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(folktale_id)
        .bind(notes)
        .bind(key_takeaways)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_tracks(&self, user_id: Uuid) -> PortResult<Vec<MusicTrack>> {
        let records = sqlx::query_as::<_, TrackRecord>(
            "SELECT id, user_id, title, artist, file_path, file_size, duration_secs, created_at \
             FROM user_music WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_track_by_id(&self, track_id: Uuid) -> PortResult<MusicTrack> {
        let record = sqlx::query_as::<_, TrackRecord>(
            "SELECT id, user_id, title, artist, file_path, file_size, duration_secs, created_at \
             FROM user_music WHERE id = $1",
        )
        .bind(track_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Track {} not found", track_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn insert_track(&self, track: NewTrack) -> PortResult<MusicTrack> {
        let record = sqlx::query_as::<_, TrackRecord>(
            "INSERT INTO user_music (id, user_id, title, artist, file_path, file_size, duration_secs) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, title, artist, file_path, file_size, duration_secs, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(track.user_id)
        .bind(track.title)
        .bind(track.artist)
        .bind(track.file_path)
        .bind(track.file_size)
        .bind(track.duration_secs)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_track(&self, track_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM user_music WHERE id = $1")
            .bind(track_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
