//! Support tickets: a message thread between one customer and the store.
//!
//! A ticket starts `open` with a single message written by the customer.
//! Messages are appended by either side while the ticket is open; once an
//! administrator closes it the thread is frozen. Read state is tracked per
//! message and is always relative to a viewer: each side only "reads" what
//! the other side wrote.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{MessageAuthor, MessageId, TicketId, TicketStatus, UserId};

/// Maximum length of a ticket subject, in characters.
pub const MAX_SUBJECT_LENGTH: usize = 200;

/// Maximum length of a message body, in characters.
pub const MAX_CONTENT_LENGTH: usize = 5000;

/// Number of characters kept in a message preview.
pub const PREVIEW_LENGTH: usize = 80;

/// Ticket and message rule violations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    #[error("subject cannot be empty")]
    EmptySubject,
    #[error("subject must be at most {max} characters")]
    SubjectTooLong { max: usize },
    #[error("message cannot be empty")]
    EmptyContent,
    #[error("message must be at most {max} characters")]
    ContentTooLong { max: usize },
    #[error("ticket is closed")]
    Closed,
}

/// Trim and validate a ticket subject.
///
/// # Errors
///
/// Returns an error if the subject is empty after trimming or too long.
pub fn validate_subject(subject: &str) -> Result<String, ThreadError> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return Err(ThreadError::EmptySubject);
    }
    if trimmed.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(ThreadError::SubjectTooLong {
            max: MAX_SUBJECT_LENGTH,
        });
    }
    Ok(trimmed.to_owned())
}

/// Trim and validate a message body.
///
/// # Errors
///
/// Returns an error if the content is empty after trimming or too long.
pub fn validate_content(content: &str) -> Result<String, ThreadError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ThreadError::EmptyContent);
    }
    if trimmed.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ThreadError::ContentTooLong {
            max: MAX_CONTENT_LENGTH,
        });
    }
    Ok(trimmed.to_owned())
}

/// Shorten a message to a single-line preview.
#[must_use]
pub fn preview(content: &str) -> String {
    let flat: String = content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= PREVIEW_LENGTH {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_LENGTH).collect();
    cut.push('…');
    cut
}

/// A message in a ticket thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: MessageAuthor,
    pub read: bool,
}

impl Message {
    /// Whether `viewer` has yet to read this message.
    #[must_use]
    pub fn is_unread_by(&self, viewer: MessageAuthor) -> bool {
        !self.read && self.author == viewer.counterpart()
    }
}

/// Ticket header without its messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub status: TicketStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A ticket with its messages in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketThread {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub messages: Vec<Message>,
}

impl TicketThread {
    /// Append a message from `author` and return it, with its content
    /// trimmed. The id follows the last message's id.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::Closed`] for a closed ticket, or a validation
    /// error for bad content.
    pub fn append(
        &mut self,
        author: MessageAuthor,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Message, ThreadError> {
        if !self.ticket.status.accepts_messages() {
            return Err(ThreadError::Closed);
        }
        let content = validate_content(content)?;
        let next_id = self
            .messages
            .last()
            .map_or(1, |m| m.id.as_i32().saturating_add(1));
        let message = Message {
            id: MessageId::new(next_id),
            content,
            created_at: now,
            author,
            read: false,
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Close the ticket. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.ticket.status == TicketStatus::Closed {
            return false;
        }
        self.ticket.status = TicketStatus::Closed;
        true
    }

    /// Messages written by the other side that `viewer` has not read.
    #[must_use]
    pub fn unread_count(&self, viewer: MessageAuthor) -> usize {
        self.messages.iter().filter(|m| m.is_unread_by(viewer)).count()
    }

    /// Mark everything the other side wrote as read. Returns how many
    /// messages changed.
    pub fn mark_read(&mut self, viewer: MessageAuthor) -> usize {
        let mut changed = 0;
        for message in &mut self.messages {
            if message.is_unread_by(viewer) {
                message.read = true;
                changed += 1;
            }
        }
        changed
    }
}
