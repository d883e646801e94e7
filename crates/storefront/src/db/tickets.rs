//! Support ticket repository.
//!
//! Messages are rows in `ticket_message`, so an append is an `INSERT` and can
//! never lose a concurrent reply. Writes load the thread under a lock on the
//! ticket row and let [`TicketThread`] decide: appends share the lock, closing
//! takes it exclusively, so a message cannot slip in after a close commits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use vitrine_core::support::{Message, Ticket, TicketThread, preview};
use vitrine_core::{Email, MessageAuthor, MessageId, TicketId, TicketStatus, UserId};

use super::RepositoryError;

const TICKET_COLUMNS: &str = "id, user_id, subject, status, created_at";
const MESSAGE_COLUMNS: &str = "id, content, created_at, author, is_read";

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: TicketId,
    user_id: UserId,
    subject: String,
    status: TicketStatus,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(r: TicketRow) -> Self {
        Self {
            id: r.id,
            subject: r.subject,
            status: r.status,
            user_id: r.user_id,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: MessageId,
    content: String,
    created_at: DateTime<Utc>,
    author: MessageAuthor,
    is_read: bool,
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Self {
            id: r.id,
            content: r.content,
            created_at: r.created_at,
            author: r.author,
            read: r.is_read,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    owner_email: String,
    unread_count: i64,
    message_count: i64,
    last_content: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
}

/// A ticket as shown in a ticket list, relative to one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSummary {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub owner_email: Email,
    pub unread_count: i64,
    pub message_count: i64,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl TryFrom<SummaryRow> for TicketSummary {
    type Error = RepositoryError;

    fn try_from(r: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            owner_email: Email::parse(&r.owner_email)
                .map_err(|e| RepositoryError::corrupt("email", e))?,
            ticket: r.ticket.into(),
            unread_count: r.unread_count,
            message_count: r.message_count,
            last_message_preview: r.last_content.as_deref().map(preview),
            last_message_at: r.last_message_at,
        })
    }
}

/// Which tickets a listing covers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketFilter {
    /// Only tickets owned by this user.
    pub owner: Option<UserId>,
    pub status: Option<TicketStatus>,
}

pub struct TicketRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TicketRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a ticket with its first, user-authored message.
    ///
    /// `subject` and `content` must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        subject: &str,
        content: &str,
    ) -> Result<TicketThread, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO storefront.ticket (user_id, subject) VALUES ($1, $2) \
             RETURNING {TICKET_COLUMNS}"
        );
        let ticket = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(user_id)
            .bind(subject)
            .fetch_one(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO storefront.ticket_message (ticket_id, author, content) \
             VALUES ($1, $2, $3) RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(ticket.id)
            .bind(MessageAuthor::User)
            .bind(content)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(TicketThread {
            ticket: ticket.into(),
            messages: vec![message.into()],
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM storefront.ticket WHERE id = $1");
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Ticket::from))
    }

    /// A ticket with all of its messages in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn thread(&self, id: TicketId) -> Result<Option<TicketThread>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_thread(&mut conn, id, "").await
    }

    /// Append a message to an open ticket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ticket and
    /// `RepositoryError::Rule` if the ticket is closed or the content is
    /// invalid.
    pub async fn append(
        &self,
        ticket_id: TicketId,
        author: MessageAuthor,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut thread = load_thread(&mut tx, ticket_id, " FOR SHARE")
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let pending = thread.append(author, content, Utc::now())?;

        let sql = format!(
            "INSERT INTO storefront.ticket_message (ticket_id, author, content) \
             VALUES ($1, $2, $3) RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(ticket_id)
            .bind(pending.author)
            .bind(&pending.content)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message.into())
    }

    /// Close a ticket. Returns the ticket and whether this call changed it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ticket.
    pub async fn close(&self, id: TicketId) -> Result<(Ticket, bool), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut thread = load_thread(&mut tx, id, " FOR UPDATE")
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let changed = thread.close();

        if changed {
            sqlx::query("UPDATE storefront.ticket SET status = $2 WHERE id = $1")
                .bind(id)
                .bind(thread.ticket.status)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok((thread.ticket, changed))
    }

    /// Mark every message the other side wrote as read by `viewer`.
    /// Returns the number of messages that changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_read(
        &self,
        ticket_id: TicketId,
        viewer: MessageAuthor,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.ticket_message SET is_read = TRUE \
             WHERE ticket_id = $1 AND author = $2 AND NOT is_read",
        )
        .bind(ticket_id)
        .bind(viewer.counterpart())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Like [`Self::mark_read`], but only for messages up to and including
    /// `last`, the newest message the viewer was shown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_read_through(
        &self,
        ticket_id: TicketId,
        viewer: MessageAuthor,
        last: MessageId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.ticket_message SET is_read = TRUE \
             WHERE ticket_id = $1 AND author = $2 AND NOT is_read AND id <= $3",
        )
        .bind(ticket_id)
        .bind(viewer.counterpart())
        .bind(last)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Tickets matching `filter`, newest first, with unread counts for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: TicketFilter,
        viewer: MessageAuthor,
    ) -> Result<Vec<TicketSummary>, RepositoryError> {
        sqlx::query_as::<_, SummaryRow>(
            "SELECT t.id, t.user_id, t.subject, t.status, t.created_at, \
                    u.email AS owner_email, \
                    (SELECT count(*) FROM storefront.ticket_message m \
                      WHERE m.ticket_id = t.id AND m.author = $3 AND NOT m.is_read) AS unread_count, \
                    (SELECT count(*) FROM storefront.ticket_message m \
                      WHERE m.ticket_id = t.id) AS message_count, \
                    last.content AS last_content, \
                    last.created_at AS last_message_at \
             FROM storefront.ticket t \
             JOIN storefront.user u ON u.id = t.user_id \
             LEFT JOIN LATERAL ( \
                 SELECT content, created_at FROM storefront.ticket_message m \
                 WHERE m.ticket_id = t.id ORDER BY m.id DESC LIMIT 1 \
             ) last ON TRUE \
             WHERE ($1::INTEGER IS NULL OR t.user_id = $1) \
               AND ($2::storefront.ticket_status IS NULL OR t.status = $2) \
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(filter.owner)
        .bind(filter.status)
        .bind(viewer.counterpart())
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TicketSummary::try_from)
        .collect()
    }
}

/// Load a ticket and its messages. `lock` is appended to the ticket query.
async fn load_thread(
    conn: &mut PgConnection,
    id: TicketId,
    lock: &str,
) -> Result<Option<TicketThread>, RepositoryError> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM storefront.ticket WHERE id = $1{lock}");
    let Some(ticket) = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM storefront.ticket_message \
         WHERE ticket_id = $1 ORDER BY id"
    );
    let messages = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    Ok(Some(TicketThread {
        ticket: ticket.into(),
        messages,
    }))
}
