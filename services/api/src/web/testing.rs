//! services/api/src/web/testing.rs
//!
//! In-memory port implementations shared by the web-layer unit tests.

use crate::config::Config;
use crate::web::state::AppState;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use folktales_core::catalog::CatalogFilter;
use folktales_core::domain::{
    CompletedStory, Favorite, Folktale, MusicTrack, NewTrack, ReadingProgress, StoryNote, User,
    UserCredentials,
};
use folktales_core::ports::{
    AudioProbeService, DatabaseService, ObjectStorageService, PortError, PortResult,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A `DatabaseService` over plain vectors. Auth is not modelled; the web
/// tests enter below the auth middleware with an explicit user id.
#[derive(Default)]
pub struct InMemoryDb {
    pub folktales: Mutex<Vec<Folktale>>,
    pub favorites: Mutex<Vec<Favorite>>,
    pub progress: Mutex<Vec<ReadingProgress>>,
    pub notes: Mutex<Vec<StoryNote>>,
    pub tracks: Mutex<Vec<MusicTrack>>,
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user_with_email(
        &self,
        _email: &str,
        _hashed_password: &str,
        _display_name: Option<&str>,
    ) -> PortResult<User> {
        unimplemented!("auth is not modelled in the in-memory gateway")
    }
    async fn get_user_by_email(&self, _email: &str) -> PortResult<UserCredentials> {
        unimplemented!("auth is not modelled in the in-memory gateway")
    }
    async fn get_user(&self, _user_id: Uuid) -> PortResult<User> {
        unimplemented!("auth is not modelled in the in-memory gateway")
    }
    async fn create_auth_session(
        &self,
        _session_id: &str,
        _user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        unimplemented!("auth is not modelled in the in-memory gateway")
    }
    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
        unimplemented!("auth is not modelled in the in-memory gateway")
    }
    async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
        unimplemented!("auth is not modelled in the in-memory gateway")
    }

    async fn list_folktales(&self, filter: &CatalogFilter) -> PortResult<Vec<Folktale>> {
        let mut tales: Vec<Folktale> = self
            .folktales
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tales.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tales)
    }
    async fn get_folktale_by_id(&self, folktale_id: Uuid) -> PortResult<Folktale> {
        self.folktales
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == folktale_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Folktale {} not found", folktale_id)))
    }
    async fn list_regions(&self) -> PortResult<Vec<String>> {
        let mut regions: Vec<String> = self
            .folktales
            .lock()
            .unwrap()
            .iter()
            .filter_map(|t| t.region.clone())
            .collect();
        regions.sort();
        regions.dedup();
        Ok(regions)
    }
    async fn list_sources(&self) -> PortResult<Vec<String>> {
        let mut sources: Vec<String> = self
            .folktales
            .lock()
            .unwrap()
            .iter()
            .filter_map(|t| t.source.clone())
            .collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }
    async fn count_folktales(&self) -> PortResult<i64> {
        Ok(self.folktales.lock().unwrap().len() as i64)
    }

    async fn list_favorites(&self, user_id: Uuid) -> PortResult<Vec<Favorite>> {
        let folktales = self.folktales.lock().unwrap();
        let mut favorites: Vec<Favorite> = self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .map(|mut f| {
                f.folktale = folktales.iter().find(|t| t.id == f.folktale_id).cloned();
                f
            })
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites)
    }
    async fn favorite_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.folktale_id)
            .collect())
    }
    async fn insert_favorite(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<bool> {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites
            .iter()
            .any(|f| f.user_id == user_id && f.folktale_id == folktale_id)
        {
            return Ok(false);
        }
        favorites.push(Favorite {
            id: Uuid::new_v4(),
            user_id,
            folktale_id,
            created_at: Utc::now(),
            folktale: None,
        });
        Ok(true)
    }
    async fn delete_favorite(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<bool> {
        let mut favorites = self.favorites.lock().unwrap();
        let before = favorites.len();
        favorites.retain(|f| !(f.user_id == user_id && f.folktale_id == folktale_id));
        Ok(favorites.len() < before)
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
    ) -> PortResult<Option<ReadingProgress>> {
        Ok(self
            .progress
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.user_id == user_id && p.folktale_id == folktale_id)
            .cloned())
    }
    async fn upsert_progress(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<ReadingProgress> {
        let mut records = self.progress.lock().unwrap();
        if let Some(existing) = records
            .iter_mut()
            .find(|p| p.user_id == user_id && p.folktale_id == folktale_id)
        {
            existing.completed = completed;
            existing.completed_at = completed_at;
            return Ok(existing.clone());
        }
        let record = ReadingProgress {
            id: Uuid::new_v4(),
            user_id,
            folktale_id,
            completed,
            completed_at,
        };
        records.push(record.clone());
        Ok(record)
    }
    async fn count_completed(&self, user_id: Uuid) -> PortResult<i64> {
        Ok(self
            .progress
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .count() as i64)
    }
    async fn recently_completed(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<CompletedStory>> {
        let folktales = self.folktales.lock().unwrap();
        let mut completed: Vec<CompletedStory> = self
            .progress
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .filter_map(|p| {
                let tale = folktales.iter().find(|t| t.id == p.folktale_id)?;
                Some(CompletedStory {
                    folktale_id: p.folktale_id,
                    title: tale.title.clone(),
                    region: tale.region.clone(),
                    completed_at: p.completed_at?,
                })
            })
            .collect();
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        completed.truncate(limit as usize);
        Ok(completed)
    }

    async fn get_note(&self, user_id: Uuid, folktale_id: Uuid) -> PortResult<Option<StoryNote>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.user_id == user_id && n.folktale_id == folktale_id)
            .cloned())
    }
    async fn upsert_note(
        &self,
        user_id: Uuid,
        folktale_id: Uuid,
        notes: Option<&str>,
        key_takeaways: Option<&str>,
    ) -> PortResult<StoryNote> {
        let mut records = self.notes.lock().unwrap();
        if let Some(existing) = records
            .iter_mut()
            .find(|n| n.user_id == user_id && n.folktale_id == folktale_id)
        {
            existing.notes = notes.map(String::from);
            existing.key_takeaways = key_takeaways.map(String::from);
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let record = StoryNote {
            id: Uuid::new_v4(),
            user_id,
            folktale_id,
            notes: notes.map(String::from),
            key_takeaways: key_takeaways.map(String::from),
            updated_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list_tracks(&self, user_id: Uuid) -> PortResult<Vec<MusicTrack>> {
        let mut tracks: Vec<MusicTrack> = self
            .tracks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tracks)
    }
    async fn get_track_by_id(&self, track_id: Uuid) -> PortResult<MusicTrack> {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Track {} not found", track_id)))
    }
    async fn insert_track(&self, track: NewTrack) -> PortResult<MusicTrack> {
        let record = MusicTrack {
            id: Uuid::new_v4(),
            user_id: track.user_id,
            title: track.title,
            artist: track.artist,
            file_path: track.file_path,
            file_size: track.file_size,
            duration_secs: track.duration_secs,
            created_at: Utc::now(),
        };
        self.tracks.lock().unwrap().push(record.clone());
        Ok(record)
    }
    async fn delete_track(&self, track_id: Uuid) -> PortResult<()> {
        self.tracks.lock().unwrap().retain(|t| t.id != track_id);
        Ok(())
    }
}

/// An `ObjectStorageService` that records removals instead of touching disk.
#[derive(Default)]
pub struct RecordingStorage {
    pub stored: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorageService for RecordingStorage {
    async fn store(&self, path: &str, _data: Bytes) -> PortResult<()> {
        self.stored.lock().unwrap().push(path.to_string());
        Ok(())
    }
    fn public_url(&self, path: &str) -> String {
        format!("http://localhost:3000/media/{path}")
    }
    async fn remove(&self, path: &str) -> PortResult<()> {
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

/// An `AudioProbeService` that never finds a duration.
pub struct NoProbe;

#[async_trait]
impl AudioProbeService for NoProbe {
    async fn probe_duration_secs(&self, _data: &[u8]) -> Option<i64> {
        None
    }
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:3000".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        media_root: std::path::PathBuf::from("/tmp/media"),
        public_base_url: "http://localhost:3000".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
    }
}

/// Builds an `AppState` over the in-memory ports.
pub fn test_state(
    db: Arc<InMemoryDb>,
    storage: Arc<RecordingStorage>,
) -> Arc<AppState> {
    Arc::new(AppState {
        db,
        storage,
        probe: Arc::new(NoProbe),
        config: Arc::new(test_config()),
    })
}

pub fn tale(title: &str, region: Option<&str>, source: Option<&str>) -> Folktale {
    Folktale {
        id: Uuid::new_v4(),
        title: title.to_string(),
        text: "Once upon a time...".to_string(),
        region: region.map(String::from),
        source: source.map(String::from),
    }
}

pub fn track_for(user_id: Uuid, title: &str) -> MusicTrack {
    MusicTrack {
        id: Uuid::new_v4(),
        user_id,
        title: title.to_string(),
        artist: None,
        file_path: format!("{user_id}/{title}.mp3"),
        file_size: 1024,
        duration_secs: Some(180),
        created_at: Utc::now(),
    }
}
