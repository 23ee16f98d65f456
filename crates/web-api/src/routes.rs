use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use application::{
    AttachmentUpload, CreateGroupRequest, FriendRequestDto, GroupDto, GroupMemberDto,
    GroupRequestDto, LoginRequest, MessageDto, SendMessageRequest, SignupRequest,
    UpdateGroupRequest, UserDto, UserProfileDto,
};
use domain::{GroupId, RequestId, UserId, UserStatus};

use crate::auth::LoginResponse;
use crate::error::ApiError;
use crate::state::AppState;
use crate::websocket::websocket_upgrade;

#[derive(Debug, Deserialize, Validate)]
struct SignupPayload {
    #[validate(length(min = 3, max = 20))]
    pseudo: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6))]
    password: String,
    birthdate: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProfilePayload {
    #[validate(length(min = 3, max = 20))]
    pseudo: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAvatarPayload {
    avatar_url: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordPayload {
    old_password: String,
    #[validate(length(min = 6))]
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusPayload {
    status: UserStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FriendRequestAction {
    Accept,
    Deny,
}

#[derive(Debug, Deserialize)]
struct AnswerFriendRequestPayload {
    action: FriendRequestAction,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateGroupPayload {
    #[validate(length(min = 1, max = 50))]
    name: String,
    is_public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGroupPayload {
    name: Option<String>,
    is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum InvitationAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
struct AnswerInvitationPayload {
    action: InvitationAction,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/users/me", get(own_profile).put(update_profile).delete(delete_account))
        .route("/users/me/avatar", put(update_avatar))
        .route("/users/me/password", put(change_password))
        .route("/users/me/status", put(update_status))
        .route("/users/me/friends", get(list_friends))
        .route("/users/{id}", get(public_profile))
        .route("/friends/requests", get(list_friend_requests))
        .route(
            "/friends/requests/{id}",
            post(send_friend_request).put(answer_friend_request),
        )
        .route("/friends/{friend_id}", delete(unfriend))
        .route("/groups", post(create_group).get(list_groups))
        .route("/groups/invitations", get(list_invitations))
        .route("/groups/invitations/{request_id}", put(answer_invitation))
        .route("/groups/{id}", put(update_group).delete(delete_group))
        .route("/groups/{id}/join", post(join_group))
        .route("/groups/{id}/leave", post(leave_group))
        .route(
            "/groups/{id}/invitations/{user_id}",
            post(invite_to_group).delete(cancel_invitation),
        )
        .route("/groups/{id}/members", get(list_group_members))
        .route("/groups/{id}/members/{user_id}", delete(exclude_member))
        .route(
            "/groups/{id}/messages",
            post(send_group_message).get(group_history),
        )
        .route("/groups/{id}/messages/files", post(send_group_file))
        .route(
            "/messages/{contact_id}",
            post(send_private_message).get(private_history),
        )
        .route("/messages/{receiver_id}/files", post(send_private_file))
        .route("/search/users", get(search_users))
        .route("/search/groups", get(search_groups))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn validated<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

// ---------------------------------------------------------------------------
// 认证

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    validated(&payload)?;
    let user = state
        .auth_service
        .signup(SignupRequest {
            pseudo: payload.pseudo,
            email: payload.email,
            password: payload.password,
            birthdate: payload.birthdate,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .auth_service
        .login(LoginRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(Uuid::from(user.id))?;
    Ok(Json(LoginResponse {
        user: UserDto::from(&user),
        token,
    }))
}

// ---------------------------------------------------------------------------
// 用户

async fn own_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state.user_service.profile(user_id).await?;
    Ok(Json(dto))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    validated(&payload)?;
    let dto = state
        .user_service
        .change_pseudo(user_id, payload.pseudo)
        .await?;
    Ok(Json(dto))
}

async fn update_avatar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateAvatarPayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .user_service
        .set_avatar(user_id, payload.avatar_url)
        .await?;
    Ok(Json(dto))
}

async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    validated(&payload)?;
    state
        .user_service
        .change_password(user_id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.user_service.set_status(user_id, payload.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.user_service.delete_account(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn public_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfileDto>, ApiError> {
    state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state.user_service.public_profile(UserId::from(id)).await?;
    Ok(Json(dto))
}

async fn list_friends(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserProfileDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let friends = state.user_service.list_friends(user_id).await?;
    Ok(Json(friends))
}

// ---------------------------------------------------------------------------
// 好友

async fn send_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receiver_id): Path<Uuid>,
) -> Result<(StatusCode, Json<FriendRequestDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .friend_service
        .send_request(user_id, UserId::from(receiver_id))
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn list_friend_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FriendRequestDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let requests = state.friend_service.list_pending(user_id).await?;
    Ok(Json(requests))
}

async fn answer_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<AnswerFriendRequestPayload>,
) -> Result<Json<FriendRequestDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let accept = matches!(payload.action, FriendRequestAction::Accept);
    let dto = state
        .friend_service
        .answer(user_id, RequestId::from(request_id), accept)
        .await?;
    Ok(Json(dto))
}

async fn unfriend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(friend_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .friend_service
        .unfriend(user_id, UserId::from(friend_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// 群组

async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<(StatusCode, Json<GroupDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    validated(&payload)?;
    let dto = state
        .group_service
        .create(
            user_id,
            CreateGroupRequest {
                name: payload.name,
                is_public: payload.is_public,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn update_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGroupPayload>,
) -> Result<Json<GroupDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .group_service
        .update(
            user_id,
            GroupId::from(id),
            UpdateGroupRequest {
                name: payload.name,
                is_public: payload.is_public,
            },
        )
        .await?;
    Ok(Json(dto))
}

async fn delete_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.group_service.delete(user_id, GroupId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn join_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.group_service.join(user_id, GroupId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state.group_service.leave(user_id, GroupId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn invite_to_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, invitee_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<GroupRequestDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .group_service
        .invite(user_id, GroupId::from(id), UserId::from(invitee_id))
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn list_invitations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<GroupRequestDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let invitations = state.group_service.list_invitations(user_id).await?;
    Ok(Json(invitations))
}

async fn answer_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<AnswerInvitationPayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let accept = matches!(payload.action, InvitationAction::Accept);
    state
        .group_service
        .answer_invitation(user_id, RequestId::from(request_id), accept)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, invitee_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .group_service
        .cancel_invitation(user_id, GroupId::from(id), UserId::from(invitee_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn exclude_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .group_service
        .exclude_member(user_id, GroupId::from(id), UserId::from(member_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<GroupDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let groups = state.group_service.list_for_user(user_id).await?;
    Ok(Json(groups))
}

async fn list_group_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GroupMemberDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let members = state
        .group_service
        .list_members(user_id, GroupId::from(id))
        .await?;
    Ok(Json(members))
}

// ---------------------------------------------------------------------------
// 消息

async fn send_private_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receiver_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .message_service
        .send_private(
            user_id,
            UserId::from(receiver_id),
            SendMessageRequest {
                content: Some(payload.content),
                attachment: None,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn private_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let messages = state
        .message_service
        .private_history(user_id, UserId::from(contact_id))
        .await?;
    Ok(Json(messages))
}

async fn send_private_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receiver_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let request = read_message_multipart(multipart).await?;
    let dto = state
        .message_service
        .send_private(user_id, UserId::from(receiver_id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn send_group_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .message_service
        .send_group(
            user_id,
            GroupId::from(id),
            SendMessageRequest {
                content: Some(payload.content),
                attachment: None,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn group_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let messages = state
        .message_service
        .group_history(user_id, GroupId::from(id))
        .await?;
    Ok(Json(messages))
}

async fn send_group_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let request = read_message_multipart(multipart).await?;
    let dto = state
        .message_service
        .send_group(user_id, GroupId::from(id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

/// 附件上传表单：`file` 字段是附件本体，可选的 `content` 字段作为消息正文。
async fn read_message_multipart(
    mut multipart: Multipart,
) -> Result<SendMessageRequest, ApiError> {
    let mut request = SendMessageRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {}", err)))?
    {
        let name = field.name().map(|name| name.to_owned());
        match name.as_deref() {
            Some("content") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::bad_request(format!("invalid content field: {}", err)))?;
                request.content = Some(text);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("file").to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::bad_request(format!("invalid file field: {}", err)))?
                    .to_vec();
                request.attachment = Some(AttachmentUpload { file_name, bytes });
            }
            _ => {}
        }
    }
    if request.attachment.is_none() {
        return Err(ApiError::bad_request("missing file field"));
    }
    Ok(request)
}

// ---------------------------------------------------------------------------
// 搜索

async fn search_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserProfileDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let users = state.search_service.search_users(user_id, &query.q).await?;
    Ok(Json(users))
}

async fn search_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<GroupDto>>, ApiError> {
    state.jwt_service.extract_user_from_headers(&headers)?;
    let groups = state.search_service.search_groups(&query.q).await?;
    Ok(Json(groups))
}
