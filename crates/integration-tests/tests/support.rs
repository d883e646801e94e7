//! Support ticket threads against a real database.
//!
//! Run with: `cargo test -p vitrine-integration-tests -- --ignored`

use vitrine_core::support::ThreadError;
use vitrine_core::{MessageAuthor, Role, TicketId, TicketStatus};
use vitrine_integration_tests::TestContext;
use vitrine_storefront::db::tickets::{TicketFilter, TicketSummary};
use vitrine_storefront::db::{RepositoryError, TicketRepository};

async fn summary_for(
    repo: &TicketRepository<'_>,
    id: TicketId,
    viewer: MessageAuthor,
) -> TicketSummary {
    repo.list(TicketFilter::default(), viewer)
        .await
        .expect("list tickets")
        .into_iter()
        .find(|s| s.ticket.id == id)
        .expect("ticket is listed")
}

// ============================================================================
// Thread lifecycle
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_shipping_delay_conversation() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = TicketRepository::new(&ctx.pool);

    let thread = repo
        .create(user.id, "Shipping delay", "Where is my order?")
        .await
        .expect("create ticket");
    let id = thread.ticket.id;
    assert_eq!(thread.messages.len(), 1);

    // The opening message is unread for the admin side only.
    let admin_view = summary_for(&repo, id, MessageAuthor::Admin).await;
    assert_eq!(admin_view.unread_count, 1);
    assert_eq!(admin_view.owner_email, user.email);
    let user_view = summary_for(&repo, id, MessageAuthor::User).await;
    assert_eq!(user_view.unread_count, 0);

    repo.append(id, MessageAuthor::Admin, "Shipped yesterday")
        .await
        .expect("admin reply");

    let thread = repo.thread(id).await.expect("thread").expect("exists");
    assert_eq!(thread.messages.len(), 2);
    assert_eq!(thread.ticket.status, TicketStatus::Open);

    // Replying does not mark the user's message read.
    let admin_view = summary_for(&repo, id, MessageAuthor::Admin).await;
    assert_eq!(admin_view.unread_count, 1);
    assert_eq!(admin_view.message_count, 2);
    assert_eq!(
        admin_view.last_message_preview.as_deref(),
        Some("Shipped yesterday")
    );

    assert_eq!(repo.mark_read(id, MessageAuthor::Admin).await.expect("mark"), 1);
    let admin_view = summary_for(&repo, id, MessageAuthor::Admin).await;
    assert_eq!(admin_view.unread_count, 0);

    // The reply is unread for the owner.
    let user_view = summary_for(&repo, id, MessageAuthor::User).await;
    assert_eq!(user_view.unread_count, 1);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_appends_keep_order() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = TicketRepository::new(&ctx.pool);

    let id = repo
        .create(user.id, "Sizing", "message 0")
        .await
        .expect("create ticket")
        .ticket
        .id;

    for n in 1..=5 {
        let author = if n % 2 == 0 {
            MessageAuthor::User
        } else {
            MessageAuthor::Admin
        };
        repo.append(id, author, &format!("message {n}"))
            .await
            .expect("append");
    }

    let thread = repo.thread(id).await.expect("thread").expect("exists");
    let contents: Vec<_> = thread.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        [
            "message 0",
            "message 1",
            "message 2",
            "message 3",
            "message 4",
            "message 5"
        ]
    );
}

// ============================================================================
// Closing
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_close_is_idempotent_and_blocks_replies() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = TicketRepository::new(&ctx.pool);

    let id = repo
        .create(user.id, "Refund", "Please refund order 12.")
        .await
        .expect("create ticket")
        .ticket
        .id;

    let (ticket, changed) = repo.close(id).await.expect("first close");
    assert!(changed);
    assert_eq!(ticket.status, TicketStatus::Closed);

    let (ticket, changed) = repo.close(id).await.expect("second close");
    assert!(!changed);
    assert_eq!(ticket.status, TicketStatus::Closed);

    let result = repo.append(id, MessageAuthor::User, "Any news?").await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(ThreadError::Closed))
    ));

    let thread = repo.thread(id).await.expect("thread").expect("exists");
    assert_eq!(thread.messages.len(), 1);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_append_trims_and_rejects_blank_content() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = TicketRepository::new(&ctx.pool);

    let id = repo
        .create(user.id, "Sizing", "Do the tees run small?")
        .await
        .expect("create ticket")
        .ticket
        .id;

    let message = repo
        .append(id, MessageAuthor::Admin, "  They run true to size.\n")
        .await
        .expect("append");
    assert_eq!(message.content, "They run true to size.");
    assert!(!message.read);

    assert!(matches!(
        repo.append(id, MessageAuthor::User, " \t ").await,
        Err(RepositoryError::Rule(ThreadError::EmptyContent))
    ));
    let thread = repo.thread(id).await.expect("thread").expect("exists");
    assert_eq!(thread.messages.len(), 2);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_mark_read_through_leaves_later_replies_unread() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = TicketRepository::new(&ctx.pool);

    let id = repo
        .create(user.id, "Exchange", "Can I swap for a medium?")
        .await
        .expect("create ticket")
        .ticket
        .id;
    let shown = repo
        .thread(id)
        .await
        .expect("thread")
        .expect("exists")
        .messages
        .last()
        .map(|m| m.id)
        .expect("first message");

    repo.append(id, MessageAuthor::User, "A large works too.")
        .await
        .expect("append");

    let marked = repo
        .mark_read_through(id, MessageAuthor::Admin, shown)
        .await
        .expect("mark");
    assert_eq!(marked, 1);
    assert_eq!(
        summary_for(&repo, id, MessageAuthor::Admin)
            .await
            .unread_count,
        1
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_unknown_ticket() {
    let ctx = TestContext::new().await;
    let repo = TicketRepository::new(&ctx.pool);
    let missing = TicketId::new(i32::MAX);

    assert!(repo.thread(missing).await.expect("thread").is_none());
    assert!(matches!(
        repo.append(missing, MessageAuthor::Admin, "hello").await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repo.close(missing).await,
        Err(RepositoryError::NotFound)
    ));
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_owner_and_status_filters() {
    let ctx = TestContext::new().await;
    let owner = ctx.user(Role::User).await;
    let other = ctx.user(Role::User).await;
    let repo = TicketRepository::new(&ctx.pool);

    let older = repo
        .create(owner.id, "First", "one")
        .await
        .expect("create")
        .ticket
        .id;
    let newer = repo
        .create(owner.id, "Second", "two")
        .await
        .expect("create")
        .ticket
        .id;
    repo.create(other.id, "Not mine", "three")
        .await
        .expect("create");
    repo.close(older).await.expect("close");

    let mine = repo
        .list(
            TicketFilter {
                owner: Some(owner.id),
                status: None,
            },
            MessageAuthor::User,
        )
        .await
        .expect("list");
    let ids: Vec<_> = mine.iter().map(|s| s.ticket.id).collect();
    assert_eq!(ids, [newer, older]);

    let open = repo
        .list(
            TicketFilter {
                owner: Some(owner.id),
                status: Some(TicketStatus::Open),
            },
            MessageAuthor::User,
        )
        .await
        .expect("list");
    let ids: Vec<_> = open.iter().map(|s| s.ticket.id).collect();
    assert_eq!(ids, [newer]);
}
