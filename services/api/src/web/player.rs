//! services/api/src/web/player.rs
//!
//! The per-connection player session: pairs the core playback state machine
//! with the gateway and storage ports. Each WebSocket connection owns exactly
//! one `PlayerSession`, so the single audio output is only ever driven by one
//! controller, and always through commands rather than shared state.

use crate::web::protocol::{ClientMessage, ServerMessage, TrackInfo};
use crate::web::state::AppState;
use folktales_core::playback::{PlaybackEvent, PlaybackSession, PlayerCommand, SelectedTrack};
use folktales_core::ports::PortResult;
use tracing::error;
use uuid::Uuid;

pub struct PlayerSession {
    user_id: Uuid,
    session: PlaybackSession,
}

impl PlayerSession {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            session: PlaybackSession::new(),
        }
    }

    pub fn current_track_id(&self) -> Option<Uuid> {
        self.session.current_track_id()
    }

    /// The user's tracks, most recent first, as a pushable message.
    pub async fn track_list(&self, state: &AppState) -> PortResult<ServerMessage> {
        let tracks = state.db.list_tracks(self.user_id).await?;
        Ok(ServerMessage::TrackList {
            tracks: tracks.iter().map(TrackInfo::from_domain).collect(),
        })
    }

    /// Handles one client command and returns the messages to send back.
    ///
    /// Failures never tear the session down: they surface once as an `Error`
    /// message and leave the playback state at its last-known-good value.
    pub async fn handle(&mut self, state: &AppState, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Select { track_id } => self.select(state, track_id).await,
            ClientMessage::TogglePlay => self.apply(PlayerCommand::TogglePlay),
            ClientMessage::SetVolume { volume } => self.apply(PlayerCommand::SetVolume(volume)),
            ClientMessage::Stop => self.apply(PlayerCommand::Stop),
            ClientMessage::TrackEnded => self.apply(PlayerCommand::TrackEnded),
            ClientMessage::DeleteTrack { track_id } => self.delete_track(state, track_id).await,
            ClientMessage::RefreshTracks => match self.track_list(state).await {
                Ok(list) => vec![list],
                Err(e) => {
                    error!("Failed to list tracks: {:?}", e);
                    vec![ServerMessage::Error {
                        message: "Failed to load music".to_string(),
                    }]
                }
            },
        }
    }

    fn apply(&mut self, command: PlayerCommand) -> Vec<ServerMessage> {
        self.session
            .apply(command)
            .into_iter()
            .map(event_to_message)
            .collect()
    }

    async fn select(&mut self, state: &AppState, track_id: Uuid) -> Vec<ServerMessage> {
        let track = match self.owned_track(state, track_id).await {
            Ok(track) => track,
            Err(message) => return vec![ServerMessage::Error { message }],
        };

        let url = state.storage.public_url(&track.file_path);
        self.apply(PlayerCommand::Select(SelectedTrack {
            track_id: track.id,
            url,
        }))
    }

    async fn delete_track(&mut self, state: &AppState, track_id: Uuid) -> Vec<ServerMessage> {
        let track = match self.owned_track(state, track_id).await {
            Ok(track) => track,
            Err(message) => return vec![ServerMessage::Error { message }],
        };

        // Stored object first, then the metadata row.
        if let Err(e) = state.storage.remove(&track.file_path).await {
            error!("Failed to remove stored object {}: {:?}", track.file_path, e);
            return vec![ServerMessage::Error {
                message: "Failed to delete music file".to_string(),
            }];
        }
        if let Err(e) = state.db.delete_track(track.id).await {
            error!("Failed to delete track {}: {:?}", track.id, e);
            return vec![ServerMessage::Error {
                message: "Failed to delete music file".to_string(),
            }];
        }

        let mut messages = Vec::new();

        // Deleting the selected track empties the session and releases the output.
        if self.session.current_track_id() == Some(track_id) {
            messages.extend(self.apply(PlayerCommand::Stop));
        }

        messages.push(ServerMessage::TrackDeleted { track_id });
        match self.track_list(state).await {
            Ok(list) => messages.push(list),
            Err(e) => error!("Failed to refresh track list: {:?}", e),
        }
        messages
    }

    /// Looks a track up and checks it belongs to this session's user.
    async fn owned_track(
        &self,
        state: &AppState,
        track_id: Uuid,
    ) -> Result<folktales_core::domain::MusicTrack, String> {
        match state.db.get_track_by_id(track_id).await {
            Ok(track) if track.user_id == self.user_id => Ok(track),
            Ok(_) => Err("Track not found".to_string()),
            Err(e) => {
                error!("Failed to load track {}: {:?}", track_id, e);
                Err("Track not found".to_string())
            }
        }
    }
}

fn event_to_message(event: PlaybackEvent) -> ServerMessage {
    match event {
        PlaybackEvent::Loaded { track_id, url } => ServerMessage::Loaded { track_id, url },
        PlaybackEvent::Unloaded => ServerMessage::Unloaded,
        PlaybackEvent::Started => ServerMessage::Started,
        PlaybackEvent::Paused => ServerMessage::Paused,
        PlaybackEvent::VolumeSet(volume) => ServerMessage::VolumeSet { volume },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{test_state, track_for, InMemoryDb, RecordingStorage};
    use std::sync::{Arc, Mutex};

    fn state_with_tracks(
        tracks: Vec<folktales_core::domain::MusicTrack>,
    ) -> (Arc<crate::web::state::AppState>, Arc<RecordingStorage>) {
        let db = Arc::new(InMemoryDb {
            tracks: Mutex::new(tracks),
            ..Default::default()
        });
        let storage = Arc::new(RecordingStorage::default());
        (test_state(db, storage.clone()), storage)
    }

    #[tokio::test]
    async fn select_loads_the_track_with_its_public_url() {
        let user_id = Uuid::new_v4();
        let track = track_for(user_id, "rain");
        let (state, _) = state_with_tracks(vec![track.clone()]);
        let mut player = PlayerSession::new(user_id);

        let messages = player
            .handle(&state, ClientMessage::Select { track_id: track.id })
            .await;

        assert!(matches!(
            &messages[..],
            [ServerMessage::Loaded { track_id, url }]
                if *track_id == track.id && url.ends_with(&track.file_path)
        ));
        assert_eq!(player.current_track_id(), Some(track.id));
    }

    #[tokio::test]
    async fn another_users_track_cannot_be_selected() {
        let user_id = Uuid::new_v4();
        let foreign = track_for(Uuid::new_v4(), "not-yours");
        let (state, _) = state_with_tracks(vec![foreign.clone()]);
        let mut player = PlayerSession::new(user_id);

        let messages = player
            .handle(&state, ClientMessage::Select { track_id: foreign.id })
            .await;

        assert!(matches!(&messages[..], [ServerMessage::Error { .. }]));
        assert_eq!(player.current_track_id(), None);
    }

    #[tokio::test]
    async fn deleting_the_selected_track_empties_the_session() {
        let user_id = Uuid::new_v4();
        let track = track_for(user_id, "rain");
        let (state, storage) = state_with_tracks(vec![track.clone()]);
        let mut player = PlayerSession::new(user_id);

        player
            .handle(&state, ClientMessage::Select { track_id: track.id })
            .await;
        player.handle(&state, ClientMessage::TogglePlay).await;

        let messages = player
            .handle(&state, ClientMessage::DeleteTrack { track_id: track.id })
            .await;

        assert!(messages.iter().any(|m| matches!(m, ServerMessage::Unloaded)));
        assert!(messages
            .iter()
            .any(|m| matches!(m, ServerMessage::TrackDeleted { track_id } if *track_id == track.id)));
        assert!(messages
            .iter()
            .any(|m| matches!(m, ServerMessage::TrackList { tracks } if tracks.is_empty())));
        assert_eq!(player.current_track_id(), None);
        assert_eq!(*storage.removed.lock().unwrap(), vec![track.file_path]);
    }

    #[tokio::test]
    async fn deleting_an_unselected_track_leaves_playback_alone() {
        let user_id = Uuid::new_v4();
        let playing = track_for(user_id, "rain");
        let doomed = track_for(user_id, "thunder");
        let (state, _) = state_with_tracks(vec![playing.clone(), doomed.clone()]);
        let mut player = PlayerSession::new(user_id);

        player
            .handle(&state, ClientMessage::Select { track_id: playing.id })
            .await;
        let messages = player
            .handle(&state, ClientMessage::DeleteTrack { track_id: doomed.id })
            .await;

        assert!(!messages.iter().any(|m| matches!(m, ServerMessage::Unloaded)));
        assert_eq!(player.current_track_id(), Some(playing.id));
    }

    #[tokio::test]
    async fn toggle_with_no_selection_produces_nothing() {
        let (state, _) = state_with_tracks(Vec::new());
        let mut player = PlayerSession::new(Uuid::new_v4());
        assert!(player.handle(&state, ClientMessage::TogglePlay).await.is_empty());
    }
}
