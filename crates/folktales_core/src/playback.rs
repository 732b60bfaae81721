//! crates/folktales_core/src/playback.rs
//!
//! The single-slot playback session state machine. One controller owns a
//! `PlaybackSession` and drives it exclusively through [`PlayerCommand`]s;
//! the machine answers with [`PlaybackEvent`]s the controller forwards to
//! whatever is attached to the audio output. At most one track is loaded at
//! a time - selecting a new one releases the previous source first.

use uuid::Uuid;

/// The volume a fresh session starts at.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// The track currently occupying the session's single slot, together with
/// the public URL its audio is fetched from.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTrack {
    pub track_id: Uuid,
    pub url: String,
}

/// Message-style commands, the only way to drive the session.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Load a track into the slot, releasing whatever was there. Lands in
    /// the paused state even when reselecting the current track.
    Select(SelectedTrack),
    /// Toggle between playing and paused. No-op with an empty slot.
    TogglePlay,
    /// Set the output volume, clamped to [0, 1]. Applies in any state.
    SetVolume(f32),
    /// Release the slot and detach the output source.
    Stop,
    /// The output reports the current track finished.
    TrackEnded,
}

/// What the attached output must do in response to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Stop and detach the previous source.
    Unloaded,
    /// Attach a new source, paused at the start.
    Loaded { track_id: Uuid, url: String },
    Started,
    Paused,
    VolumeSet(f32),
}

/// The observable phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Empty,
    Paused,
    Playing,
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    current: Option<SelectedTrack>,
    playing: bool,
    volume: f32,
    // End-of-track restarts the same source. Looping is the default policy.
    looping: bool,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            current: None,
            playing: false,
            volume: DEFAULT_VOLUME,
            looping: true,
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn phase(&self) -> PlaybackPhase {
        match (&self.current, self.playing) {
            (None, _) => PlaybackPhase::Empty,
            (Some(_), false) => PlaybackPhase::Paused,
            (Some(_), true) => PlaybackPhase::Playing,
        }
    }

    pub fn current_track_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|t| t.track_id)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Applies one command and returns the output directives it produced,
    /// in the order the output must apply them.
    pub fn apply(&mut self, command: PlayerCommand) -> Vec<PlaybackEvent> {
        match command {
            PlayerCommand::Select(track) => {
                let mut events = Vec::new();
                if self.current.is_some() {
                    events.push(PlaybackEvent::Unloaded);
                }
                events.push(PlaybackEvent::Loaded {
                    track_id: track.track_id,
                    url: track.url.clone(),
                });
                self.current = Some(track);
                self.playing = false;
                events
            }
            PlayerCommand::TogglePlay => {
                if self.current.is_none() {
                    return Vec::new();
                }
                self.playing = !self.playing;
                if self.playing {
                    vec![PlaybackEvent::Started]
                } else {
                    vec![PlaybackEvent::Paused]
                }
            }
            PlayerCommand::SetVolume(volume) => {
                self.volume = volume.clamp(0.0, 1.0);
                vec![PlaybackEvent::VolumeSet(self.volume)]
            }
            PlayerCommand::Stop => {
                if self.current.is_none() {
                    return Vec::new();
                }
                self.current = None;
                self.playing = false;
                vec![PlaybackEvent::Unloaded]
            }
            PlayerCommand::TrackEnded => {
                if self.current.is_none() || !self.playing {
                    return Vec::new();
                }
                if self.looping {
                    vec![PlaybackEvent::Started]
                } else {
                    self.playing = false;
                    vec![PlaybackEvent::Paused]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> SelectedTrack {
        SelectedTrack {
            track_id: Uuid::new_v4(),
            url: format!("http://localhost:3000/media/{name}"),
        }
    }

    #[test]
    fn select_from_empty_lands_paused() {
        let mut session = PlaybackSession::new();
        let t = track("a.mp3");
        let events = session.apply(PlayerCommand::Select(t.clone()));
        assert_eq!(
            events,
            vec![PlaybackEvent::Loaded {
                track_id: t.track_id,
                url: t.url,
            }]
        );
        assert_eq!(session.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn toggle_is_a_noop_with_no_track() {
        let mut session = PlaybackSession::new();
        assert!(session.apply(PlayerCommand::TogglePlay).is_empty());
        assert_eq!(session.phase(), PlaybackPhase::Empty);
    }

    #[test]
    fn toggle_moves_between_playing_and_paused() {
        let mut session = PlaybackSession::new();
        session.apply(PlayerCommand::Select(track("a.mp3")));
        assert_eq!(
            session.apply(PlayerCommand::TogglePlay),
            vec![PlaybackEvent::Started]
        );
        assert_eq!(session.phase(), PlaybackPhase::Playing);
        assert_eq!(
            session.apply(PlayerCommand::TogglePlay),
            vec![PlaybackEvent::Paused]
        );
        assert_eq!(session.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn select_while_playing_releases_old_source_and_lands_paused() {
        let mut session = PlaybackSession::new();
        session.apply(PlayerCommand::Select(track("a.mp3")));
        session.apply(PlayerCommand::TogglePlay);

        let b = track("b.mp3");
        let events = session.apply(PlayerCommand::Select(b.clone()));
        assert_eq!(
            events,
            vec![
                PlaybackEvent::Unloaded,
                PlaybackEvent::Loaded {
                    track_id: b.track_id,
                    url: b.url,
                },
            ]
        );
        // Never both playing: the new slot starts paused.
        assert_eq!(session.phase(), PlaybackPhase::Paused);
        assert_eq!(session.current_track_id(), Some(b.track_id));
    }

    #[test]
    fn reselecting_the_current_track_resets_to_paused() {
        let mut session = PlaybackSession::new();
        let t = track("a.mp3");
        session.apply(PlayerCommand::Select(t.clone()));
        session.apply(PlayerCommand::TogglePlay);

        let events = session.apply(PlayerCommand::Select(t.clone()));
        assert_eq!(events.len(), 2);
        assert_eq!(session.phase(), PlaybackPhase::Paused);
        assert_eq!(session.current_track_id(), Some(t.track_id));
    }

    #[test]
    fn volume_is_clamped_and_applies_in_any_state() {
        let mut session = PlaybackSession::new();
        assert_eq!(
            session.apply(PlayerCommand::SetVolume(1.5)),
            vec![PlaybackEvent::VolumeSet(1.0)]
        );
        assert_eq!(
            session.apply(PlayerCommand::SetVolume(-0.2)),
            vec![PlaybackEvent::VolumeSet(0.0)]
        );

        session.apply(PlayerCommand::Select(track("a.mp3")));
        session.apply(PlayerCommand::TogglePlay);
        assert_eq!(
            session.apply(PlayerCommand::SetVolume(0.25)),
            vec![PlaybackEvent::VolumeSet(0.25)]
        );
        assert_eq!(session.volume(), 0.25);
        assert_eq!(session.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn stop_releases_the_slot() {
        let mut session = PlaybackSession::new();
        session.apply(PlayerCommand::Select(track("a.mp3")));
        session.apply(PlayerCommand::TogglePlay);
        assert_eq!(
            session.apply(PlayerCommand::Stop),
            vec![PlaybackEvent::Unloaded]
        );
        assert_eq!(session.phase(), PlaybackPhase::Empty);
        assert!(session.apply(PlayerCommand::Stop).is_empty());
    }

    #[test]
    fn track_end_restarts_while_looping() {
        let mut session = PlaybackSession::new();
        session.apply(PlayerCommand::Select(track("a.mp3")));
        session.apply(PlayerCommand::TogglePlay);
        assert_eq!(
            session.apply(PlayerCommand::TrackEnded),
            vec![PlaybackEvent::Started]
        );
        assert_eq!(session.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn track_end_pauses_when_looping_is_disabled() {
        let mut session = PlaybackSession::new();
        session.set_looping(false);
        session.apply(PlayerCommand::Select(track("a.mp3")));
        session.apply(PlayerCommand::TogglePlay);
        assert_eq!(
            session.apply(PlayerCommand::TrackEnded),
            vec![PlaybackEvent::Paused]
        );
        assert_eq!(session.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn track_end_is_ignored_when_not_playing() {
        let mut session = PlaybackSession::new();
        assert!(session.apply(PlayerCommand::TrackEnded).is_empty());
        session.apply(PlayerCommand::Select(track("a.mp3")));
        assert!(session.apply(PlayerCommand::TrackEnded).is_empty());
    }
}
