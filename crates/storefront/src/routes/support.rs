//! Support ticket routes for ticket owners and administrators.
//!
//! A thread is visible to its owner and to administrators. Anyone else gets
//! 404 so ticket ids reveal nothing. The viewer decides which messages count
//! as unread: the owner reads admin replies, an admin reads customer messages.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::support::{Message, Ticket, TicketThread, validate_content, validate_subject};
use vitrine_core::{MessageAuthor, TicketId};

use crate::db::tickets::{TicketFilter, TicketSummary};
use crate::db::{RepositoryError, TicketRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::middleware::extract::{Json, Path};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// New ticket request.
#[derive(Debug, Deserialize)]
pub struct NewTicket {
    pub subject: String,
    pub content: String,
}

/// New message request.
#[derive(Debug, Deserialize)]
pub struct NewMessage {
    pub content: String,
}

/// A thread as seen by one viewer.
#[derive(Debug, Serialize)]
pub struct ThreadView {
    #[serde(flatten)]
    pub thread: TicketThread,
    pub viewer: MessageAuthor,
    /// Messages this request marked read.
    pub newly_read: usize,
}

/// Result of marking a thread read.
#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked: u64,
}

// =============================================================================
// Access
// =============================================================================

fn ticket_not_found() -> AppError {
    AppError::NotFound("Ticket".to_string())
}

/// Load a ticket and decide which side `user` reads it as.
///
/// The owner always views as the customer. Anyone else must currently hold
/// the admin role in the database.
pub(crate) async fn open_as(
    state: &AppState,
    user: &CurrentUser,
    id: TicketId,
) -> Result<(Ticket, MessageAuthor)> {
    let ticket = TicketRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(ticket_not_found)?;

    if ticket.user_id == user.id {
        return Ok((ticket, MessageAuthor::User));
    }

    let role = UserRepository::new(state.pool()).role(user.id).await?;
    if role.is_some_and(vitrine_core::Role::is_admin) {
        Ok((ticket, MessageAuthor::Admin))
    } else {
        Err(ticket_not_found())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// The signed-in user's own tickets, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<TicketSummary>>> {
    let filter = TicketFilter {
        owner: Some(user.id),
        status: None,
    };
    let tickets = TicketRepository::new(state.pool())
        .list(filter, MessageAuthor::User)
        .await?;
    Ok(Json(tickets))
}

/// Open a ticket with its first message.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<NewTicket>,
) -> Result<(StatusCode, Json<TicketThread>)> {
    let subject = validate_subject(&body.subject)?;
    let content = validate_content(&body.content)?;

    let thread = TicketRepository::new(state.pool())
        .create(user.id, &subject, &content)
        .await?;
    tracing::info!(ticket_id = %thread.ticket.id, "ticket opened");

    Ok((StatusCode::CREATED, Json(thread)))
}

/// Open a thread. Marks the other side's messages read for this viewer.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<ThreadView>> {
    let id = TicketId::new(id);
    let (_, viewer) = open_as(&state, &user, id).await?;

    let repo = TicketRepository::new(state.pool());
    let mut thread = repo.thread(id).await?.ok_or_else(ticket_not_found)?;

    let newly_read = thread.unread_count(viewer);
    if let Some(last) = thread.messages.last().map(|m| m.id)
        && newly_read > 0
    {
        repo.mark_read_through(id, viewer, last).await?;
        thread.mark_read(viewer);
    }
    tracing::debug!(newly_read, ?viewer, "thread opened");

    Ok(Json(ThreadView {
        thread,
        viewer,
        newly_read,
    }))
}

/// Append a message to an open ticket as the viewer's side.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn post_message(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>)> {
    let id = TicketId::new(id);
    let (_, author) = open_as(&state, &user, id).await?;

    let message = TicketRepository::new(state.pool())
        .append(id, author, &body.content)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => ticket_not_found(),
            other => other.into(),
        })?;
    tracing::info!(ticket_id = %id, ?author, message_id = %message.id, "message posted");

    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark the other side's messages read without loading the thread.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<MarkedRead>> {
    let id = TicketId::new(id);
    let (_, viewer) = open_as(&state, &user, id).await?;
    let marked = TicketRepository::new(state.pool())
        .mark_read(id, viewer)
        .await?;
    Ok(Json(MarkedRead { marked }))
}
