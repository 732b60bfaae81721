//! crates/folktales_core/src/upload.rs
//!
//! Upload validation and storage-path generation for background music.
//! Validation runs before any storage or gateway call; a rejected file
//! never leaves the process.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Uploads above this size are rejected outright (50 MiB, inclusive limit).
pub const MAX_UPLOAD_BYTES: u64 = 52_428_800;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.-]").unwrap());

/// A file refused before any remote call was made.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UploadError {
    #[error("Not an audio file: {declared_type}")]
    NotAudio { declared_type: String },
    #[error("File too large: {size} bytes (limit {MAX_UPLOAD_BYTES})")]
    TooLarge { size: u64 },
}

/// Checks the declared content type and size of an upload.
pub fn validate_upload(declared_type: &str, size: u64) -> Result<(), UploadError> {
    if !declared_type.starts_with("audio/") {
        return Err(UploadError::NotAudio {
            declared_type: declared_type.to_string(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    Ok(())
}

/// Replaces every character outside `[A-Za-z0-9.-]` with an underscore.
pub fn sanitize_file_name(file_name: &str) -> String {
    UNSAFE_CHARS.replace_all(file_name, "_").into_owned()
}

/// A collision-resistant storage path scoped to the uploading user:
/// `<user_id>/<random uuid>-<sanitized file name>`.
pub fn storage_path(user_id: Uuid, file_name: &str) -> String {
    format!("{}/{}-{}", user_id, Uuid::new_v4(), sanitize_file_name(file_name))
}

/// The track title shown in the player: the file name without its extension.
pub fn title_from_file_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[..idx].to_string(),
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_audio_up_to_the_limit() {
        assert_eq!(validate_upload("audio/mpeg", 1024), Ok(()));
        // The limit itself is still allowed.
        assert_eq!(validate_upload("audio/wav", MAX_UPLOAD_BYTES), Ok(()));
    }

    #[test]
    fn rejects_oversized_files_before_any_remote_call() {
        let sixty_mib = 60 * 1024 * 1024;
        assert_eq!(
            validate_upload("audio/mpeg", sixty_mib),
            Err(UploadError::TooLarge { size: sixty_mib })
        );
    }

    #[test]
    fn rejects_non_audio_declared_types() {
        assert_eq!(
            validate_upload("video/mp4", 1024),
            Err(UploadError::NotAudio {
                declared_type: "video/mp4".to_string()
            })
        );
        assert!(validate_upload("application/octet-stream", 1).is_err());
    }

    #[test]
    fn sanitizes_everything_outside_the_safe_set() {
        assert_eq!(sanitize_file_name("my song (live)!.mp3"), "my_song__live__.mp3");
        assert_eq!(sanitize_file_name("plain-name.0.ogg"), "plain-name.0.ogg");
    }

    #[test]
    fn storage_paths_are_user_scoped_and_collision_resistant() {
        let user_id = Uuid::new_v4();
        let a = storage_path(user_id, "song.mp3");
        let b = storage_path(user_id, "song.mp3");
        assert!(a.starts_with(&format!("{user_id}/")));
        assert!(a.ends_with("-song.mp3"));
        assert_ne!(a, b);
    }

    #[test]
    fn title_drops_only_the_final_extension() {
        assert_eq!(title_from_file_name("evening rain.mp3"), "evening rain");
        assert_eq!(title_from_file_name("archive.tar.gz"), "archive.tar");
        assert_eq!(title_from_file_name("no_extension"), "no_extension");
        assert_eq!(title_from_file_name(".hidden"), ".hidden");
    }
}
