//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the background-music player. The server owns the playback
//! session; the client owns the audio element and applies the server's
//! directives to it.

use folktales_core::domain::MusicTrack;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The message-style commands a client can send to drive its player session.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Load a track into the session's single slot.
    Select { track_id: Uuid },

    /// Toggle between playing and paused. Ignored with no selected track.
    TogglePlay,

    /// Set the output volume. Values are clamped to [0, 1].
    SetVolume { volume: f32 },

    /// Release the selected track and detach the audio source.
    Stop,

    /// The audio element reports the current track finished.
    TrackEnded,

    /// Delete an uploaded track: its stored object and its metadata row.
    DeleteTrack { track_id: Uuid },

    /// Ask for a fresh copy of the user's track list (e.g. after an upload).
    RefreshTracks,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// A track as presented to the player UI, with its public audio URL.
#[derive(Serialize, Debug, Clone)]
pub struct TrackInfo {
    pub id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub file_size: i64,
    pub duration_secs: Option<i64>,
}

impl TrackInfo {
    pub fn from_domain(track: &MusicTrack) -> Self {
        Self {
            id: track.id,
            title: track.title.clone(),
            artist: track.artist.clone(),
            file_size: track.file_size,
            duration_secs: track.duration_secs,
        }
    }
}

/// The structured messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The user's uploaded tracks, most recent first. Sent on connect and
    /// whenever the list changes.
    TrackList { tracks: Vec<TrackInfo> },

    /// Attach this source to the audio element, paused at the start.
    Loaded { track_id: Uuid, url: String },

    /// Stop and detach the current source.
    Unloaded,

    /// Begin advancing the attached source.
    Started,

    /// Halt the attached source without detaching it.
    Paused,

    /// Apply this volume to the output immediately.
    VolumeSet { volume: f32 },

    /// A track was deleted; the list that follows reflects it.
    TrackDeleted { track_id: Uuid },

    /// Reports an error to the client, which should surface it transiently.
    Error { message: String },
}
