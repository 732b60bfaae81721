//! crates/folktales_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the hosted services behind them - the relational
//! gateway that owns every persisted entity and the object storage that holds
//! uploaded audio.

use crate::catalog::CatalogFilter;
use crate::domain::{
    CompletedStory, Favorite, Folktale, MusicTrack, NewTrack, ReadingProgress, StoryNote, User,
    UserCredentials,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, storage).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote data gateway: table-style CRUD over every persisted entity.
///
/// Lookups for records that may legitimately not exist yet (progress, notes)
/// return `Ok(None)` rather than `Err(NotFound)` - absence is a valid state.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Identity & Auth Sessions ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Catalog (read-only from the client) ---
    async fn list_folktales(&self, filter: &CatalogFilter) -> PortResult<Vec<Folktale>>;

    async fn get_folktale_by_id(&self, folktale_id: Uuid) -> PortResult<Folktale>;

    async fn list_regions(&self) -> PortResult<Vec<String>>;

    async fn list_sources(&self) -> PortResult<Vec<String>>;

    async fn count_folktales(&self) -> PortResult<i64>;

    // --- Favorites ---
    async fn list_favorites(&self, user_id: Uuid) -> PortResult<Vec<Favorite>>;

    async fn favorite_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    /// Inserts a favorite mark. Returns `false` when it already existed.
    async fn insert_favorite(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<bool>;

    /// Deletes a favorite mark. Returns `false` when none existed.
    async fn delete_favorite(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<bool>;

    // --- Reading Progress ---
    async fn get_progress(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
    ) -> PortResult<Option<ReadingProgress>>;

    /// Writes the whole progress record keyed by (user, folktale).
    async fn upsert_progress(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<ReadingProgress>;

    async fn count_completed(&self, user_id: Uuid) -> PortResult<i64>;

    async fn recently_completed(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<CompletedStory>>;

    // --- Notes ---
    async fn get_note(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<Option<StoryNote>>;

    /// Writes the whole note record keyed by (user, folktale).
    async fn upsert_note(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
        notes: Option<&str>,
        key_takeaways: Option<&str>,
    ) -> PortResult<StoryNote>;

    // --- Track Metadata ---
    async fn list_tracks(&self, user_id: Uuid) -> PortResult<Vec<MusicTrack>>;

    async fn get_track_by_id(&self, track_id: Uuid) -> PortResult<MusicTrack>;

    async fn insert_track(&self, track: NewTrack) -> PortResult<MusicTrack>;

    async fn delete_track(&self, track_id: Uuid) -> PortResult<()>;
}

/// Binary object storage for uploaded audio, with public URL issuance.
#[async_trait]
pub trait ObjectStorageService: Send + Sync {
    /// Stores an object under a user-scoped path.
    async fn store(&self, path: &str, data: Bytes) -> PortResult<()>;

    /// Issues the public retrieval URL for a stored object.
    fn public_url(&self, path: &str) -> String;

    /// Removes a stored object by path.
    async fn remove(&self, path: &str) -> PortResult<()>;
}

/// Best-effort audio metadata probing.
#[async_trait]
pub trait AudioProbeService: Send + Sync {
    /// Probes the duration of an uploaded file in whole seconds.
    /// Failure to probe is non-fatal and reported as `None`.
    async fn probe_duration_secs(&self, data: &[u8]) -> Option<i64>;
}
