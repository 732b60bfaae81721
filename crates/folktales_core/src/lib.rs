pub mod catalog;
pub mod domain;
pub mod notes;
pub mod playback;
pub mod ports;
pub mod upload;

pub use catalog::{CatalogFilter, ALL};
pub use domain::{
    AuthSession, CompletedStory, Favorite, Folktale, MusicTrack, NewTrack, ReadingProgress,
    ReadingStats, StoryNote, User, UserCredentials,
};
pub use playback::{PlaybackEvent, PlaybackPhase, PlaybackSession, PlayerCommand, SelectedTrack};
pub use ports::{
    AudioProbeService, DatabaseService, ObjectStorageService, PortError, PortResult,
};
