//! crates/folktales_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single narrative text entry in the catalog, with optional region and
/// source tags. Immutable from the client's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct Folktale {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub region: Option<String>,
    pub source: Option<String>,
}

// Represents a user - used throughout the app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A user's bookmark on a catalog item. At most one exists per
/// (user, folktale) pair. The folktale itself is embedded when the
/// favorites listing joins it in.
#[derive(Debug, Clone)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folktale_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub folktale: Option<Folktale>,
}

/// Per-user completion state for one catalog item, upserted as a whole
/// record. `completed_at` is present exactly when `completed` is true.
#[derive(Debug, Clone)]
pub struct ReadingProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folktale_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-user free-text annotation for one catalog item. Empty fields are
/// stored as absent, never as empty strings.
#[derive(Debug, Clone)]
pub struct StoryNote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folktale_id: Uuid,
    pub notes: Option<String>,
    pub key_takeaways: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for one uploaded background-music track. The audio object itself
/// lives in storage under `file_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicTrack {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// The fields of a track metadata row before the gateway assigns its id.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub user_id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub duration_secs: Option<i64>,
}

/// One entry in the "recently completed" list of the reading statistics.
#[derive(Debug, Clone)]
pub struct CompletedStory {
    pub folktale_id: Uuid,
    pub title: String,
    pub region: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Aggregated reading statistics for one user.
#[derive(Debug, Clone)]
pub struct ReadingStats {
    pub total_stories: i64,
    pub completed_stories: i64,
    pub recently_completed: Vec<CompletedStory>,
}

impl ReadingStats {
    /// Completion rate in whole percent, 0 when the catalog is empty.
    pub fn completion_rate(&self) -> i64 {
        if self.total_stories <= 0 {
            return 0;
        }
        (self.completed_stories * 100 + self.total_stories / 2) / self.total_stories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: i64, completed: i64) -> ReadingStats {
        ReadingStats {
            total_stories: total,
            completed_stories: completed,
            recently_completed: Vec::new(),
        }
    }

    #[test]
    fn completion_rate_rounds_to_nearest_percent() {
        assert_eq!(stats(3, 1).completion_rate(), 33);
        assert_eq!(stats(3, 2).completion_rate(), 67);
        assert_eq!(stats(4, 4).completion_rate(), 100);
    }

    #[test]
    fn completion_rate_is_zero_for_empty_catalog() {
        assert_eq!(stats(0, 0).completion_rate(), 0);
    }
}
