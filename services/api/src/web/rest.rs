//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use folktales_core::catalog::{CatalogFilter, ALL};
use folktales_core::domain::{Favorite, Folktale, MusicTrack, NewTrack, ReadingStats};
use folktales_core::notes::normalize_field;
use folktales_core::ports::PortError;
use folktales_core::upload::{storage_path, title_from_file_name, validate_upload};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::me_handler,
        list_folktales_handler,
        get_folktale_handler,
        list_regions_handler,
        list_sources_handler,
        list_favorites_handler,
        favorite_ids_handler,
        toggle_favorite_handler,
        get_progress_handler,
        put_progress_handler,
        get_notes_handler,
        put_notes_handler,
        reading_stats_handler,
        list_music_handler,
        upload_music_handler,
    ),
    components(schemas(
        SignupRequest,
        LoginRequest,
        AuthResponse,
        FolktaleResponse,
        FavoriteResponse,
        FavoriteToggleResponse,
        ProgressResponse,
        ProgressUpdateRequest,
        NotesResponse,
        NotesUpdateRequest,
        ReadingStatsResponse,
        CompletedStoryResponse,
        TrackResponse,
    )),
    tags(
        (name = "Folktales API", description = "API endpoints for the folktale reading application.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Catalog query parameters. Absent axes impose no restriction.
#[derive(Deserialize, IntoParams)]
pub struct CatalogQuery {
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    /// Exact region, or "all".
    pub region: Option<String>,
    /// Exact source label, or "all".
    pub source: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FolktaleResponse {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub region: Option<String>,
    pub source: Option<String>,
}

impl FolktaleResponse {
    fn from_domain(tale: Folktale) -> Self {
        Self {
            id: tale.id,
            title: tale.title,
            text: tale.text,
            region: tale.region,
            source: tale.source,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub id: Uuid,
    pub folktale_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub folktale: Option<FolktaleResponse>,
}

impl FavoriteResponse {
    fn from_domain(favorite: Favorite) -> Self {
        Self {
            id: favorite.id,
            folktale_id: favorite.folktale_id,
            created_at: favorite.created_at,
            folktale: favorite.folktale.map(FolktaleResponse::from_domain),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FavoriteToggleResponse {
    /// The membership value after the toggle.
    pub favorited: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ProgressUpdateRequest {
    pub completed: bool,
}

#[derive(Serialize, ToSchema)]
pub struct NotesResponse {
    pub notes: Option<String>,
    pub key_takeaways: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct NotesUpdateRequest {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub key_takeaways: String,
}

#[derive(Serialize, ToSchema)]
pub struct CompletedStoryResponse {
    pub folktale_id: Uuid,
    pub title: String,
    pub region: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ReadingStatsResponse {
    pub total_stories: i64,
    pub completed_stories: i64,
    /// Whole-percent completion rate over the current catalog.
    pub completion_rate: i64,
    pub recently_completed: Vec<CompletedStoryResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct TrackResponse {
    pub id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub file_size: i64,
    pub duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Public retrieval URL for the stored audio object.
    pub url: String,
}

impl TrackResponse {
    fn from_domain(track: MusicTrack, url: String) -> Self {
        Self {
            id: track.id,
            title: track.title,
            artist: track.artist,
            file_size: track.file_size,
            duration_secs: track.duration_secs,
            created_at: track.created_at,
            url,
        }
    }
}

//=========================================================================================
// Small Shared Helpers
//=========================================================================================

/// `completed_at` is present exactly while the record says completed.
fn completion_timestamp(completed: bool) -> Option<DateTime<Utc>> {
    completed.then(Utc::now)
}

fn internal(context: &str, e: PortError) -> (StatusCode, String) {
    error!("{context}: {e:?}");
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

fn not_found_or_internal(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => internal(context, other),
    }
}

//=========================================================================================
// Catalog Handlers
//=========================================================================================

/// Browse the catalog with optional search/region/source filters.
#[utoipa::path(
    get,
    path = "/folktales",
    params(CatalogQuery),
    responses(
        (status = 200, description = "The matching catalog items", body = [FolktaleResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_folktales_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filter = CatalogFilter::new(
        query.search.unwrap_or_default(),
        query.region.unwrap_or_else(|| ALL.to_string()),
        query.source.unwrap_or_else(|| ALL.to_string()),
    );

    let tales = state
        .db
        .list_folktales(&filter)
        .await
        .map_err(|e| internal("Failed to fetch folktales", e))?;

    Ok(Json(
        tales
            .into_iter()
            .map(FolktaleResponse::from_domain)
            .collect::<Vec<_>>(),
    ))
}

/// Fetch one story in full. Requires a signed-in identity.
#[utoipa::path(
    get,
    path = "/folktales/{id}",
    params(("id" = Uuid, Path, description = "The folktale id")),
    responses(
        (status = 200, description = "The story", body = FolktaleResponse),
        (status = 401, description = "Sign in required"),
        (status = 404, description = "Story not found")
    )
)]
pub async fn get_folktale_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let tale = state
        .db
        .get_folktale_by_id(id)
        .await
        .map_err(|e| not_found_or_internal("Failed to fetch folktale", e))?;
    Ok(Json(FolktaleResponse::from_domain(tale)))
}

/// The distinct regions available for filtering.
#[utoipa::path(
    get,
    path = "/filters/regions",
    responses((status = 200, description = "Distinct regions", body = [String]))
)]
pub async fn list_regions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let regions = state
        .db
        .list_regions()
        .await
        .map_err(|e| internal("Failed to fetch regions", e))?;
    Ok(Json(regions))
}

/// The distinct source labels available for filtering.
#[utoipa::path(
    get,
    path = "/filters/sources",
    responses((status = 200, description = "Distinct sources", body = [String]))
)]
pub async fn list_sources_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sources = state
        .db
        .list_sources()
        .await
        .map_err(|e| internal("Failed to fetch sources", e))?;
    Ok(Json(sources))
}

//=========================================================================================
// Favorite Handlers
//=========================================================================================

/// The user's favorites, most recent first, with the stories embedded.
#[utoipa::path(
    get,
    path = "/favorites",
    responses(
        (status = 200, description = "The user's favorites", body = [FavoriteResponse]),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn list_favorites_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let favorites = state
        .db
        .list_favorites(user_id)
        .await
        .map_err(|e| internal("Failed to fetch favorites", e))?;
    Ok(Json(
        favorites
            .into_iter()
            .map(FavoriteResponse::from_domain)
            .collect::<Vec<_>>(),
    ))
}

/// Just the favorited item ids, for marking cards on the browse screen.
#[utoipa::path(
    get,
    path = "/favorites/ids",
    responses(
        (status = 200, description = "Favorited folktale ids", body = [Uuid]),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn favorite_ids_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ids = state
        .db
        .favorite_ids(user_id)
        .await
        .map_err(|e| internal("Failed to fetch favorites", e))?;
    Ok(Json(ids))
}

/// Toggle a favorite mark in a single round trip.
///
/// A conditional delete runs first; if nothing was deleted, a conditional
/// insert runs instead, so concurrent toggles can never duplicate a mark.
#[utoipa::path(
    post,
    path = "/folktales/{id}/favorite",
    params(("id" = Uuid, Path, description = "The folktale id")),
    responses(
        (status = 200, description = "Membership after the toggle", body = FavoriteToggleResponse),
        (status = 401, description = "Sign in required"),
        (status = 404, description = "Story not found")
    )
)]
pub async fn toggle_favorite_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // A toggle on a missing story is a 404, not a dangling favorite.
    state
        .db
        .get_folktale_by_id(id)
        .await
        .map_err(|e| not_found_or_internal("Failed to fetch folktale", e))?;

    let removed = state
        .db
        .delete_favorite(user_id, id)
        .await
        .map_err(|e| internal("Failed to update favorite", e))?;

    let favorited = if removed {
        false
    } else {
        state
            .db
            .insert_favorite(user_id, id)
            .await
            .map_err(|e| internal("Failed to update favorite", e))?;
        true
    };

    Ok(Json(FavoriteToggleResponse { favorited }))
}

//=========================================================================================
// Progress & Notes Handlers
//=========================================================================================

/// Reading progress for one story. Absence means "not yet started".
#[utoipa::path(
    get,
    path = "/folktales/{id}/progress",
    params(("id" = Uuid, Path, description = "The folktale id")),
    responses(
        (status = 200, description = "The progress record or its defaults", body = ProgressResponse),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn get_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let progress = state
        .db
        .get_progress(user_id, id)
        .await
        .map_err(|e| internal("Failed to fetch progress", e))?;

    let response = match progress {
        Some(p) => ProgressResponse {
            completed: p.completed,
            completed_at: p.completed_at,
        },
        None => ProgressResponse {
            completed: false,
            completed_at: None,
        },
    };
    Ok(Json(response))
}

/// Write the whole progress record for one story.
#[utoipa::path(
    put,
    path = "/folktales/{id}/progress",
    request_body = ProgressUpdateRequest,
    params(("id" = Uuid, Path, description = "The folktale id")),
    responses(
        (status = 200, description = "The stored record", body = ProgressResponse),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn put_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProgressUpdateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let progress = state
        .db
        .upsert_progress(user_id, id, req.completed, completion_timestamp(req.completed))
        .await
        .map_err(|e| internal("Failed to update progress", e))?;

    Ok(Json(ProgressResponse {
        completed: progress.completed,
        completed_at: progress.completed_at,
    }))
}

/// Notes for one story. Absence means "no notes yet".
#[utoipa::path(
    get,
    path = "/folktales/{id}/notes",
    params(("id" = Uuid, Path, description = "The folktale id")),
    responses(
        (status = 200, description = "The note record or its defaults", body = NotesResponse),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn get_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let note = state
        .db
        .get_note(user_id, id)
        .await
        .map_err(|e| internal("Failed to fetch notes", e))?;

    let response = match note {
        Some(n) => NotesResponse {
            notes: n.notes,
            key_takeaways: n.key_takeaways,
            updated_at: Some(n.updated_at),
        },
        None => NotesResponse {
            notes: None,
            key_takeaways: None,
            updated_at: None,
        },
    };
    Ok(Json(response))
}

/// Write the whole note record for one story. Blank fields persist as absent.
#[utoipa::path(
    put,
    path = "/folktales/{id}/notes",
    request_body = NotesUpdateRequest,
    params(("id" = Uuid, Path, description = "The folktale id")),
    responses(
        (status = 200, description = "The stored record", body = NotesResponse),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn put_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotesUpdateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let notes = normalize_field(&req.notes);
    let key_takeaways = normalize_field(&req.key_takeaways);

    let note = state
        .db
        .upsert_note(user_id, id, notes.as_deref(), key_takeaways.as_deref())
        .await
        .map_err(|e| internal("Failed to save notes", e))?;

    Ok(Json(NotesResponse {
        notes: note.notes,
        key_takeaways: note.key_takeaways,
        updated_at: Some(note.updated_at),
    }))
}

/// Aggregated reading statistics for the signed-in user.
#[utoipa::path(
    get,
    path = "/progress/stats",
    responses(
        (status = 200, description = "Reading statistics", body = ReadingStatsResponse),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn reading_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let total_stories = state
        .db
        .count_folktales()
        .await
        .map_err(|e| internal("Failed to fetch stats", e))?;
    let completed_stories = state
        .db
        .count_completed(user_id)
        .await
        .map_err(|e| internal("Failed to fetch stats", e))?;
    let recently_completed = state
        .db
        .recently_completed(user_id, 5)
        .await
        .map_err(|e| internal("Failed to fetch stats", e))?;

    let stats = ReadingStats {
        total_stories,
        completed_stories,
        recently_completed,
    };

    Ok(Json(ReadingStatsResponse {
        total_stories: stats.total_stories,
        completed_stories: stats.completed_stories,
        completion_rate: stats.completion_rate(),
        recently_completed: stats
            .recently_completed
            .iter()
            .map(|c| CompletedStoryResponse {
                folktale_id: c.folktale_id,
                title: c.title.clone(),
                region: c.region.clone(),
                completed_at: c.completed_at,
            })
            .collect(),
    }))
}

//=========================================================================================
// Music Handlers
//=========================================================================================

/// The user's uploaded tracks, most recent first, with public URLs.
#[utoipa::path(
    get,
    path = "/music",
    responses(
        (status = 200, description = "The user's tracks", body = [TrackResponse]),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn list_music_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let tracks = state
        .db
        .list_tracks(user_id)
        .await
        .map_err(|e| internal("Failed to fetch music", e))?;

    Ok(Json(
        tracks
            .into_iter()
            .map(|t| {
                let url = state.storage.public_url(&t.file_path);
                TrackResponse::from_domain(t, url)
            })
            .collect::<Vec<_>>(),
    ))
}

/// Upload a background-music file.
///
/// Accepts a multipart/form-data request with a single file part. The
/// declared content type must be audio and the file at most 50 MiB; both
/// checks run before anything is stored.
#[utoipa::path(
    post,
    path = "/music",
    request_body(content_type = "multipart/form-data", description = "The audio file to upload."),
    responses(
        (status = 201, description = "Track uploaded", body = TrackResponse),
        (status = 400, description = "Bad request (missing file, wrong type, too large)"),
        (status = 401, description = "Sign in required"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_music_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })?
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        ));
    };

    let file_name = field.file_name().unwrap_or("untitled").to_string();
    let declared_type = field.content_type().unwrap_or("").to_string();
    let data = field.bytes().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read file bytes: {}", e),
        )
    })?;

    // Validation runs before any storage or gateway call.
    validate_upload(&declared_type, data.len() as u64)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let path = storage_path(user_id, &file_name);
    state
        .storage
        .store(&path, data.clone())
        .await
        .map_err(|e| internal("Failed to store music file", e))?;

    let duration_secs = state.probe.probe_duration_secs(&data).await;

    let track = match state
        .db
        .insert_track(NewTrack {
            user_id,
            title: title_from_file_name(&file_name),
            artist: None,
            file_path: path.clone(),
            file_size: data.len() as i64,
            duration_secs,
        })
        .await
    {
        Ok(track) => track,
        Err(e) => {
            // Do not leave an orphaned object behind a failed metadata write.
            if let Err(cleanup) = state.storage.remove(&path).await {
                error!("Failed to clean up stored object {}: {:?}", path, cleanup);
            }
            return Err(internal("Failed to save track metadata", e));
        }
    };

    let url = state.storage.public_url(&track.file_path);
    Ok((
        StatusCode::CREATED,
        Json(TrackResponse::from_domain(track, url)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{tale, test_state, InMemoryDb, RecordingStorage};
    use folktales_core::ports::DatabaseService;
    use std::sync::Mutex;

    fn seeded_state(tales: Vec<Folktale>) -> (Arc<AppState>, Arc<InMemoryDb>) {
        let db = Arc::new(InMemoryDb {
            folktales: Mutex::new(tales),
            ..Default::default()
        });
        let storage = Arc::new(RecordingStorage::default());
        (test_state(db.clone(), storage), db)
    }

    #[test]
    fn completion_timestamp_tracks_the_flag() {
        assert!(completion_timestamp(true).is_some());
        assert_eq!(completion_timestamp(false), None);
    }

    #[tokio::test]
    async fn double_toggle_restores_the_original_membership() {
        let story = tale("The Firebird", Some("Russia"), None);
        let (state, db) = seeded_state(vec![story.clone()]);
        let user_id = Uuid::new_v4();

        toggle_favorite_handler(State(state.clone()), Extension(user_id), Path(story.id))
            .await
            .unwrap();
        assert_eq!(db.favorite_ids(user_id).await.unwrap(), vec![story.id]);

        toggle_favorite_handler(State(state.clone()), Extension(user_id), Path(story.id))
            .await
            .unwrap();
        assert!(db.favorite_ids(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggling_a_missing_story_is_a_404() {
        let (state, db) = seeded_state(Vec::new());
        let user_id = Uuid::new_v4();

        let err = toggle_favorite_handler(State(state), Extension(user_id), Path(Uuid::new_v4()))
            .await
            .err()
            .expect("toggle on a missing story must fail");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert!(db.favorite_ids(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completing_a_story_sets_and_clears_the_timestamp() {
        let story = tale("Anansi", None, None);
        let (state, db) = seeded_state(vec![story.clone()]);
        let user_id = Uuid::new_v4();

        put_progress_handler(
            State(state.clone()),
            Extension(user_id),
            Path(story.id),
            Json(ProgressUpdateRequest { completed: true }),
        )
        .await
        .unwrap();
        let stored = db.get_progress(user_id, story.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert!(stored.completed_at.is_some());

        put_progress_handler(
            State(state.clone()),
            Extension(user_id),
            Path(story.id),
            Json(ProgressUpdateRequest { completed: false }),
        )
        .await
        .unwrap();
        let stored = db.get_progress(user_id, story.id).await.unwrap().unwrap();
        assert!(!stored.completed);
        assert_eq!(stored.completed_at, None);
    }

    #[tokio::test]
    async fn blank_note_fields_persist_as_absent() {
        let story = tale("Vasilisa", Some("Russia"), None);
        let (state, db) = seeded_state(vec![story.clone()]);
        let user_id = Uuid::new_v4();

        put_notes_handler(
            State(state.clone()),
            Extension(user_id),
            Path(story.id),
            Json(NotesUpdateRequest {
                notes: "   ".to_string(),
                key_takeaways: String::new(),
            }),
        )
        .await
        .unwrap();

        let stored = db.get_note(user_id, story.id).await.unwrap().unwrap();
        assert_eq!(stored.notes, None);
        assert_eq!(stored.key_takeaways, None);
    }

    #[tokio::test]
    async fn saved_notes_round_trip_unchanged() {
        let story = tale("Vasilisa", Some("Russia"), None);
        let (state, db) = seeded_state(vec![story.clone()]);
        let user_id = Uuid::new_v4();

        put_notes_handler(
            State(state.clone()),
            Extension(user_id),
            Path(story.id),
            Json(NotesUpdateRequest {
                notes: "  a story about courage ".to_string(),
                key_takeaways: "patience wins".to_string(),
            }),
        )
        .await
        .unwrap();

        let stored = db.get_note(user_id, story.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("a story about courage"));
        assert_eq!(stored.key_takeaways.as_deref(), Some("patience wins"));
    }
}
