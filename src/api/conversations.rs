use crate::api::AppState;
use crate::api::dto::chat::{
    ConversationDto, MessageDto, OpenConversationRequest, SendMessageRequest, SendMessageResponse,
};
use crate::api::middleware::AuthUser;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Opens (or reuses) the conversation for a listing with the caller as
/// buyer.
///
/// # Errors
/// Returns `AppError::BadRequest` if the caller is the seller.
pub async fn open_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<OpenConversationRequest>,
) -> Result<impl IntoResponse> {
    let conversation =
        state.chat_service.open_conversation(request.listing_id, auth_user.user_id, request.seller_id).await?;

    Ok(Json(ConversationDto::from(conversation)))
}

/// Lists the conversations the caller participates in, newest first.
pub async fn list_conversations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let conversations = state.chat_service.conversations(auth_user.user_id).await?;

    Ok(Json(conversations.into_iter().map(ConversationDto::from).collect::<Vec<_>>()))
}

/// Returns the conversation history in send order. Filtered messages carry
/// their redacted text for every viewer, the sender included.
///
/// # Errors
/// Returns `AppError::NotFound` for an unknown conversation and
/// `AppError::Forbidden` for a non-participant.
pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let messages = state.chat_service.messages(conversation_id, auth_user.user_id).await?;

    Ok(Json(messages.iter().map(MessageDto::from).collect::<Vec<_>>()))
}

/// Sends a message through the redaction pipeline.
///
/// # Errors
/// Returns `AppError::BadRequest` for empty or oversized content, plus the
/// access errors of [`list_messages`].
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let receipt = state.chat_service.send_message(conversation_id, auth_user.user_id, &request.content).await?;

    let response =
        SendMessageResponse { message: MessageDto::from(&receipt.message), was_filtered: receipt.was_filtered };

    Ok((StatusCode::CREATED, Json(response)))
}
