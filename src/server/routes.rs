//! HTTP route handlers for the Tradenomix API.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{AuthIdentity, AuthOutcome, SignupForm, UserRecord, UsernamePolicy};
use crate::core::errors::TradenomixError;
use crate::core::ids::{ConversationId, IdentityId, PostId, TraderId};
use crate::directory::{self, LeaderboardEntry, TraderProfile};
use crate::feed::{Comment, Post};
use crate::messaging::{Conversation, Message};

use super::state::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route("/api/conversations/{id}", get(get_conversation))
        .route("/api/conversations/{id}/messages", post(send_message))
        .route("/api/posts", get(feed).post(create_post))
        .route("/api/posts/{id}", get(get_post))
        .route("/api/posts/{id}/like", post(like_post))
        .route(
            "/api/posts/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/traders", get(list_traders))
        .route("/api/traders/{id}", get(get_trader))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/session", get(restore_session))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/oauth/{provider}", get(begin_oauth))
        .route("/api/auth/callback", post(complete_oauth))
        .route("/api/auth/username-available", get(username_available))
        .route("/api/auth/reconcile", post(reconcile))
        .with_state(state)
}

fn api_error(err: &TradenomixError) -> (StatusCode, String) {
    let status = match err {
        TradenomixError::UsernameTaken(_) => StatusCode::CONFLICT,
        TradenomixError::Validation(_) | TradenomixError::InvalidId(_) => StatusCode::BAD_REQUEST,
        TradenomixError::Provider(_) => StatusCode::UNAUTHORIZED,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {err}");
    }
    (status, err.to_string())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tradenomix",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Conversation list filter.
#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    /// Only conversations this participant belongs to, most recent first.
    pub participant: Option<IdentityId>,
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationQuery>,
) -> Json<Vec<Conversation>> {
    Json(match query.participant {
        Some(participant) => state.conversations.conversations_for(&participant),
        None => state.conversations.get_conversations(),
    })
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<Conversation>> {
    state
        .conversations
        .get_conversation_by_id(&id)
        .map(Json)
        .ok_or_else(|| api_error(&TradenomixError::ConversationNotFound(id)))
}

/// New conversation request.
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// The two participants.
    pub participants: Vec<IdentityId>,
}

async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateConversationRequest>,
) -> ApiResult<Json<Conversation>> {
    state
        .conversations
        .create_conversation(request.participants)
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Send message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Author of the message.
    pub sender_id: IdentityId,
    /// Message text.
    pub content: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state
        .conversations
        .compose_message(&id, request.sender_id, &request.content)
        .map_err(|e| api_error(&e))?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Feed paging.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Maximum number of posts, capped by `feed.max_limit`.
    pub limit: Option<usize>,
}

async fn feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Json<Vec<Post>> {
    let limit = query
        .limit
        .unwrap_or(state.config.feed.default_limit)
        .min(state.config.feed.max_limit);
    Json(state.posts.feed(limit))
}

/// New post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    /// Author of the post.
    pub author_id: IdentityId,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Attached image.
    pub media_url: Option<String>,
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state
        .posts
        .create_post(request.author_id, &request.content, request.media_url)
        .map_err(|e| api_error(&e))?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
) -> ApiResult<Json<Post>> {
    state
        .posts
        .get_post(&id)
        .map(Json)
        .ok_or_else(|| api_error(&TradenomixError::PostNotFound(id)))
}

async fn like_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
) -> ApiResult<Json<Post>> {
    state
        .posts
        .like_post(&id)
        .map(Json)
        .map_err(|e| api_error(&e))
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
) -> ApiResult<Json<Vec<Comment>>> {
    state
        .posts
        .comments(&id)
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// New comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    /// Author of the comment.
    pub author_id: IdentityId,
    /// Comment text.
    pub content: String,
}

async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PostId>,
    Json(request): Json<AddCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .posts
        .add_comment(&id, request.author_id, &request.content)
        .map_err(|e| api_error(&e))?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn leaderboard() -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    directory::leaderboard()
        .map(Json)
        .map_err(|e| api_error(&e))
}

async fn list_traders() -> ApiResult<Json<Vec<TraderProfile>>> {
    directory::fetch_all_traders()
        .map(Json)
        .map_err(|e| api_error(&e))
}

async fn get_trader(Path(id): Path<TraderId>) -> ApiResult<Json<TraderProfile>> {
    directory::fetch_trader_by_id(&id)
        .map_err(|e| api_error(&e))?
        .map(Json)
        .ok_or_else(|| api_error(&TradenomixError::TraderNotFound(id)))
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignupForm>,
) -> ApiResult<Json<AuthOutcome>> {
    state
        .auth
        .sign_up(&form)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Password sign-in request.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<Json<AuthOutcome>> {
    state
        .auth
        .sign_in(&request.email, &request.password)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Session token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn require_token(headers: &HeaderMap) -> ApiResult<&str> {
    bearer_token(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "missing bearer token".to_string(),
        )
    })
}

/// Resume the caller's session. `null` without a token or for an unknown one.
async fn restore_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Option<AuthOutcome>>> {
    let Some(token) = bearer_token(&headers) else {
        return Ok(Json(None));
    };
    state
        .auth
        .restore_session(token)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = require_token(&headers)?;
    state
        .auth
        .sign_out(token)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| api_error(&e))
}

/// OAuth redirect response.
#[derive(Debug, Serialize)]
pub struct OAuthRedirect {
    /// Where to send the browser.
    pub url: String,
}

async fn begin_oauth(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> ApiResult<Json<OAuthRedirect>> {
    let url = state
        .auth
        .begin_oauth(&provider)
        .await
        .map_err(|e| api_error(&e))?;
    Ok(Json(OAuthRedirect { url: url.into() }))
}

async fn complete_oauth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthOutcome>> {
    let token = require_token(&headers)?;
    state
        .auth
        .complete_oauth(token)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Username availability query.
#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    /// Username to check.
    pub username: String,
}

/// Username availability response.
#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    /// Username that was checked.
    pub username: String,
    /// Whether nobody holds it yet.
    pub available: bool,
}

async fn username_available(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> ApiResult<Json<UsernameAvailability>> {
    let taken = state
        .auth
        .is_username_taken(&query.username)
        .await
        .map_err(|e| api_error(&e))?;
    Ok(Json(UsernameAvailability {
        username: query.username,
        available: !taken,
    }))
}

/// Reconciliation request for an identity authenticated by the client.
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    /// The authenticated identity.
    pub identity: AuthIdentity,
    /// Preferred username, overriding the identity's own.
    pub username: Option<String>,
}

/// Reconciliation response.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// Whether the record was created by this call.
    pub created: bool,
    /// The user record.
    pub record: UserRecord,
}

async fn reconcile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReconcileRequest>,
) -> ApiResult<Json<ReconcileResponse>> {
    let reconciliation = state
        .reconciler
        .reconcile(
            &request.identity,
            request.username.as_deref(),
            UsernamePolicy::FallbackToFabricated,
        )
        .await
        .map_err(|e| api_error(&e))?;
    Ok(Json(ReconcileResponse {
        created: reconciliation.is_created(),
        record: reconciliation.into_record(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio_rusqlite::Connection;
    use tower::ServiceExt;

    use crate::auth::{InMemoryIdentityProvider, SqliteUserRecordStore};
    use crate::core::config::TradenomixConfig;

    async fn app() -> Router {
        let conn = Connection::open_in_memory().await.unwrap();
        let records = SqliteUserRecordStore::with_connection(conn, "users")
            .await
            .unwrap();
        let state = AppState::new(
            TradenomixConfig::default(),
            Arc::new(InMemoryIdentityProvider::new()),
            Arc::new(records),
        )
        .unwrap();
        create_router(state)
    }

    async fn call(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        call_as(app, None, method, uri, body).await
    }

    async fn call_as(
        app: Router,
        token: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app().await, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_and_get_conversations() {
        let app = app().await;
        let (status, body) = call(app.clone(), "GET", "/api/conversations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (status, body) = call(app.clone(), "GET", "/api/conversations/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "1");

        let (status, _) = call(app, "GET", "/api/conversations/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_send_message() {
        let app = app().await;
        let payload = serde_json::json!({ "senderId": "you", "content": "gm" });
        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/conversations/1/messages",
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["content"], "gm");

        let (_, conversation) = call(app.clone(), "GET", "/api/conversations/1", None).await;
        assert_eq!(conversation["lastMessage"], "gm");

        let (status, _) = call(
            app.clone(),
            "POST",
            "/api/conversations/999/messages",
            Some(payload),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let blank = serde_json::json!({ "senderId": "you", "content": "   " });
        let (status, _) = call(app, "POST", "/api/conversations/1/messages", Some(blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_conversation_rejects_single_participant() {
        let payload = serde_json::json!({ "participants": ["you", "you"] });
        let (status, _) = call(app().await, "POST", "/api/conversations", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_directory_routes() {
        let app = app().await;
        let (status, body) = call(app.clone(), "GET", "/api/leaderboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["rank"], 1);

        let (status, body) = call(app.clone(), "GET", "/api/traders/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["handle"], "@SQTrades");

        let (status, _) = call(app, "GET", "/api/traders/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_signup_then_taken_username_conflicts() {
        let app = app().await;
        let form = serde_json::json!({
            "username": "pipqueen",
            "email": "maria@example.com",
            "password": "Secret123!",
            "confirmPassword": "Secret123!"
        });
        let (status, body) = call(app.clone(), "POST", "/api/auth/signup", Some(form)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["username"], "pipqueen");
        assert_eq!(body["destination"], "/feed");

        let (_, body) = call(
            app.clone(),
            "GET",
            "/api/auth/username-available?username=pipqueen",
            None,
        )
        .await;
        assert_eq!(body["available"], false);

        let again = serde_json::json!({
            "username": "pipqueen",
            "email": "other@example.com",
            "password": "Secret123!",
            "confirmPassword": "Secret123!"
        });
        let (status, _) = call(app, "POST", "/api/auth/signup", Some(again)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_bad_credentials_unauthorized() {
        let payload = serde_json::json!({ "email": "ghost@example.com", "password": "nope" });
        let (status, _) = call(app().await, "POST", "/api/auth/signin", Some(payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let app = app().await;
        let payload = serde_json::json!({
            "identity": {
                "id": "8c1d2e3f-aaaa-bbbb",
                "email": "oauth@example.com",
                "provider": "google"
            }
        });
        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/auth/reconcile",
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], true);
        assert_eq!(body["record"]["username"], "user_8c1d2e3f");

        let (_, body) = call(app, "POST", "/api/auth/reconcile", Some(payload)).await;
        assert_eq!(body["created"], false);
    }

    #[tokio::test]
    async fn test_session_routes_require_the_callers_token() {
        let app = app().await;
        let form = serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "Secret123!",
            "confirmPassword": "Secret123!"
        });
        let (_, body) = call(app.clone(), "POST", "/api/auth/signup", Some(form)).await;
        let token = body["sessionToken"].as_str().unwrap().to_string();

        let (status, body) = call(app.clone(), "GET", "/api/auth/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());

        let (_, body) =
            call_as(app.clone(), Some("forged"), "GET", "/api/auth/session", None).await;
        assert!(body.is_null());

        let (status, _) = call(app.clone(), "POST", "/api/auth/signout", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, body) = call_as(app.clone(), Some(&token), "GET", "/api/auth/session", None).await;
        assert_eq!(body["record"]["username"], "alice");

        let (status, _) =
            call_as(app.clone(), Some(&token), "POST", "/api/auth/signout", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = call_as(app, Some(&token), "GET", "/api/auth/session", None).await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_oauth_begin_and_callback() {
        let app = app().await;
        let (status, body) = call(app.clone(), "GET", "/api/auth/oauth/google", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().contains("provider=google"));

        let (status, _) = call(app.clone(), "GET", "/api/auth/oauth/myspace", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call_as(app, Some("stale"), "POST", "/api/auth/callback", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_feed_routes() {
        let app = app().await;
        let (status, body) = call(app.clone(), "GET", "/api/posts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let payload = serde_json::json!({ "authorId": "you", "content": "Flat into the close" });
        let (status, created) = call(app.clone(), "POST", "/api/posts", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["likesCount"], 0);

        let (_, body) = call(app.clone(), "GET", "/api/posts?limit=1", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], created["id"]);

        let (status, body) = call(app.clone(), "POST", "/api/posts/1/like", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likesCount"], 13);

        let comment = serde_json::json!({ "authorId": "you", "content": "Agreed" });
        let (status, _) = call(app.clone(), "POST", "/api/posts/2/comments", Some(comment)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = call(app.clone(), "GET", "/api/posts/2/comments", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, _) = call(app.clone(), "POST", "/api/posts/77/like", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let blank = serde_json::json!({ "authorId": "you", "content": " " });
        let (status, _) = call(app, "POST", "/api/posts", Some(blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
