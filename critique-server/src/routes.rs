use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use critique_core::model::{AnalysisResult, BugFixRequest, BugFixResponse, Submission};

use crate::bugfix;
use crate::store::{RecentReview, UserRecord};
use crate::AppState;

/// No session issuance exists; clients get a fixed placeholder.
const SESSION_TOKEN_PLACEHOLDER: &str = "mock_jwt_token";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_reviews: i64,
    pub bugs_detected: i64,
    pub avg_quality_score: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub score: i64,
    pub language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReviewsResponse {
    pub stats: StatsResponse,
    pub recent_projects: Vec<ProjectResponse>,
}

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/fix-bugs", post(fix_bugs))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/stats/:user_id", get(user_stats))
        .route("/api/recent-projects/:user_id", get(recent_projects))
        .route("/api/user/:user_id/reviews", get(user_reviews))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "critique"
    }))
}

/// Analyze a submission. Reasoning-service trouble never surfaces here: the
/// pipeline degrades to its synthetic fallback, so the only failure mode
/// left is storage.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<Submission>,
) -> Result<Json<AnalysisResult>, StatusCode> {
    state
        .pipeline
        .analyze(&submission)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Propose a fixed version of the code. Infallible by design: the pipeline
/// returns the original code with an explanation when the service fails.
async fn fix_bugs(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BugFixRequest>,
) -> Json<BugFixResponse> {
    Json(bugfix::fix_bugs(state.service.as_ref(), &request).await)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, (StatusCode, Json<serde_json::Value>)> {
    let created = state
        .store
        .insert_user(
            &request.first_name,
            &request.last_name,
            &request.email,
            &request.password,
        )
        .await
        .map_err(|e| {
            error!("Failed to register user: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Internal storage error" })),
            )
        })?;

    match created {
        Some(user) => Ok(Json(user.into())),
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        )),
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<serde_json::Value>)> {
    let user = state
        .store
        .authenticate(&request.email, &request.password)
        .await
        .map_err(|e| {
            error!("Failed to check credentials: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Internal storage error" })),
            )
        })?;

    match user {
        Some(user) => Ok(Json(LoginResponse {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            token: SESSION_TOKEN_PLACEHOLDER.to_string(),
        })),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid email or password" })),
        )),
    }
}

async fn user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<StatsResponse>, StatusCode> {
    let stats = state
        .store
        .user_stats(user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(StatsResponse {
        total_reviews: stats.total_reviews,
        bugs_detected: stats.bugs_detected,
        avg_quality_score: stats.avg_quality_score,
    }))
}

async fn recent_projects(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ProjectResponse>>, StatusCode> {
    let reviews = state
        .store
        .recent_reviews(user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(reviews.into_iter().map(project_from).collect()))
}

async fn user_reviews(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserReviewsResponse>, StatusCode> {
    let stats = state
        .store
        .user_stats(user_id)
        .await
        .map_err(internal_error)?;
    let reviews = state
        .store
        .recent_reviews(user_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(UserReviewsResponse {
        stats: StatsResponse {
            total_reviews: stats.total_reviews,
            bugs_detected: stats.bugs_detected,
            avg_quality_score: stats.avg_quality_score,
        },
        recent_projects: reviews.into_iter().map(project_from).collect(),
    }))
}

fn internal_error(err: anyhow::Error) -> StatusCode {
    error!("Storage failure: {err:#}");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn project_from(review: RecentReview) -> ProjectResponse {
    ProjectResponse {
        id: review.id,
        name: format!("{} Project", capitalize(&review.language)),
        date: review.date,
        score: review.quality_score,
        language: review.language,
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
