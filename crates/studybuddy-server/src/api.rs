//! REST API surface.
//!
//! Thin JSON handlers over the core engines: they parse identifiers and
//! request bodies, take the database lock, delegate, and let [`ServerError`]
//! translate core error kinds into status codes.  No rendering or UI
//! formatting happens here.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use studybuddy_core::matching::{self, Buddy};
use studybuddy_core::reviews::{self, ReviewPage, ReviewQuery, ReviewSort};
use studybuddy_core::threads::{self, Thread};
use studybuddy_core::{messaging, CoreError};
use studybuddy_shared::constants::PROFILES_PAGE_SIZE;
use studybuddy_shared::{CourseId, MessageId, UserId};
use studybuddy_store::{Course, Database, Match, Message, Profile, User};

use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/inbox", get(inbox))
        .route("/users/{id}/threads/{partner_id}", get(conversation))
        .route("/courses", get(list_courses).post(create_course))
        .route("/profiles", get(list_profiles))
        .route("/profiles/{user_id}", get(get_profile).put(update_profile))
        .route("/profiles/{user_id}/buddies", get(buddies))
        .route("/messages", post(send_message))
        .route("/messages/{id}/read", post(mark_message_read))
        .route("/reviews", get(list_reviews).post(create_review))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    /// Institutional email, already syntactically validated by the signup
    /// flow; the core only enforces uniqueness.
    email: String,
    credential_hash: String,
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, ServerError> {
    let user = User::new(req.username, req.email, req.credential_hash);
    state.db.lock().await.create_user(&user)?;
    Ok(Json(user))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ServerError> {
    let user = state.db.lock().await.get_user(UserId(id))?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateCourseRequest {
    code: String,
    name: String,
    #[serde(default)]
    description: String,
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<Json<Course>, ServerError> {
    let course = Course::new(req.code, req.name, req.description);
    state.db.lock().await.create_course(&course)?;
    Ok(Json(course))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, ServerError> {
    let courses = state.db.lock().await.list_courses()?;
    Ok(Json(courses))
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Profile>, ServerError> {
    // Profiles are created lazily on first access.
    let profile = state.db.lock().await.get_or_create_profile(UserId(user_id))?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    first_name: String,
    last_name: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    major: Option<String>,
    #[serde(default)]
    availability: String,
    #[serde(default)]
    study_methods: String,
    #[serde(default)]
    avatar_ref: Option<String>,
    /// The full replacement enrollment set.
    #[serde(default)]
    courses: Vec<Uuid>,
}

#[derive(Serialize)]
struct ProfileSavedResponse {
    profile: Profile,
    /// Matches newly derived from this save.
    new_matches: Vec<Match>,
}

async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileSavedResponse>, ServerError> {
    let mut db = state.db.lock().await;

    let mut profile = db.get_or_create_profile(UserId(user_id))?;
    profile.first_name = req.first_name;
    profile.last_name = req.last_name;
    profile.bio = req.bio;
    profile.major = req.major;
    profile.availability = req.availability;
    profile.study_methods = req.study_methods;
    profile.avatar_ref = req.avatar_ref;
    profile.courses = req.courses.into_iter().map(CourseId).collect();

    // Reject unknown course references up front, before any write.
    for course_id in &profile.courses {
        db.get_course(*course_id).map_err(|e| match e {
            studybuddy_store::StoreError::NotFound => {
                ServerError::Core(CoreError::NotFound("course".into()))
            }
            other => other.into(),
        })?;
    }

    db.save_profile(&profile)?;
    let new_matches = matching::derive_matches(&mut db, profile.id)?;
    let profile = db.get_profile(profile.id)?;

    Ok(Json(ProfileSavedResponse {
        profile,
        new_matches,
    }))
}

#[derive(Deserialize, Default)]
struct ProfileListParams {
    /// Optional search text; blank or missing means "browse everyone".
    #[serde(default)]
    q: Option<String>,
    /// Lenient: a non-numeric value falls back to page 1.
    #[serde(default)]
    page: Option<String>,
}

#[derive(Serialize)]
struct ProfilePage {
    profiles: Vec<Profile>,
    page: usize,
    total_pages: usize,
    total: usize,
}

/// Slice a full result set down to one page, clamping out-of-range pages.
fn paginate_profiles(all: Vec<Profile>, requested_page: usize) -> ProfilePage {
    let total = all.len();
    let total_pages = total.div_ceil(PROFILES_PAGE_SIZE).max(1);
    let page = requested_page.clamp(1, total_pages);
    let start = (page - 1) * PROFILES_PAGE_SIZE;
    let profiles = all
        .into_iter()
        .skip(start)
        .take(PROFILES_PAGE_SIZE)
        .collect();
    ProfilePage {
        profiles,
        page,
        total_pages,
        total,
    }
}

async fn list_profiles(
    State(state): State<AppState>,
    Query(params): Query<ProfileListParams>,
) -> Result<Json<ProfilePage>, ServerError> {
    let db = state.db.lock().await;
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    let all = if query.is_empty() {
        db.list_profiles()?
    } else {
        db.search_profiles(query)?
    };
    let page = params
        .page
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    Ok(Json(paginate_profiles(all, page)))
}

async fn buddies(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Buddy>>, ServerError> {
    let db = state.db.lock().await;
    let profile = db.get_profile_for_user(UserId(user_id))?;
    let buddies = matching::buddies(&db, profile.id)?;
    Ok(Json(buddies))
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SendMessageRequest {
    sender: Uuid,
    receiver: Uuid,
    content: String,
    #[serde(default)]
    reply_to: Option<Uuid>,
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ServerError> {
    let db = state.db.lock().await;
    let message = messaging::send_message(
        &db,
        UserId(req.sender),
        UserId(req.receiver),
        &req.content,
        req.reply_to.map(MessageId),
    )?;
    Ok(Json(message))
}

#[derive(Serialize)]
struct MarkReadResponse {
    changed: bool,
}

async fn mark_message_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, ServerError> {
    let db = state.db.lock().await;
    let changed = messaging::mark_message_read(&db, MessageId(id))?;
    Ok(Json(MarkReadResponse { changed }))
}

async fn inbox(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Thread>>, ServerError> {
    let db = state.db.lock().await;
    let threads = threads::inbox(&db, UserId(id))?;
    Ok(Json(threads))
}

async fn conversation(
    State(state): State<AppState>,
    Path((id, partner_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let db = state.db.lock().await;
    let messages = threads::conversation(&db, UserId(id), UserId(partner_id))?;
    Ok(Json(messages))
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateReviewRequest {
    reviewer: Uuid,
    reviewed: Uuid,
    rating: i64,
    #[serde(default)]
    comment: Option<String>,
}

async fn create_review(
    State(state): State<AppState>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<Json<studybuddy_store::Review>, ServerError> {
    let db = state.db.lock().await;
    let review = reviews::create_review(
        &db,
        UserId(req.reviewer),
        UserId(req.reviewed),
        req.rating,
        req.comment,
    )?;
    Ok(Json(review))
}

#[derive(Deserialize, Default)]
struct ReviewListParams {
    /// Lenient: a non-numeric value means "no filter", not an error.
    #[serde(default)]
    min_rating: Option<String>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    page: Option<String>,
}

impl ReviewListParams {
    fn into_query(self) -> ReviewQuery {
        ReviewQuery {
            min_rating: self.min_rating.and_then(|s| s.parse().ok()),
            sort: self
                .sort
                .map(|s| ReviewSort::from_key(&s))
                .unwrap_or_default(),
            page: self.page.and_then(|s| s.parse().ok()).unwrap_or(1),
        }
    }
}

async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewListParams>,
) -> Result<Json<ReviewPage>, ServerError> {
    let db = state.db.lock().await;
    let page = reviews::list_reviews(&db, &params.into_query())?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_params_parse_leniently() {
        let params = ReviewListParams {
            min_rating: Some("4".into()),
            sort: Some("highest".into()),
            page: Some("2".into()),
        };
        let query = params.into_query();
        assert_eq!(query.min_rating, Some(4));
        assert_eq!(query.sort, ReviewSort::Highest);
        assert_eq!(query.page, 2);
    }

    #[test]
    fn bad_filter_values_fall_back_to_defaults() {
        let params = ReviewListParams {
            min_rating: Some("lots".into()),
            sort: Some("sideways".into()),
            page: Some("-1".into()),
        };
        let query = params.into_query();
        assert_eq!(query.min_rating, None);
        assert_eq!(query.sort, ReviewSort::Newest);
        assert_eq!(query.page, 1);
    }

    fn profiles(n: usize) -> Vec<Profile> {
        (0..n).map(|_| Profile::empty(UserId::new())).collect()
    }

    #[test]
    fn profile_pagination_slices_and_counts() {
        let page = paginate_profiles(profiles(PROFILES_PAGE_SIZE + 3), 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total, PROFILES_PAGE_SIZE + 3);
        assert_eq!(page.profiles.len(), 3);
    }

    #[test]
    fn profile_pagination_clamps_out_of_range_pages() {
        let past_end = paginate_profiles(profiles(5), 99);
        assert_eq!(past_end.page, 1);
        assert_eq!(past_end.profiles.len(), 5);

        let empty = paginate_profiles(profiles(0), 3);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.profiles.is_empty());
    }
}
