//! Accounts, roles, profile versioning and order history against a real
//! database.
//!
//! Run with: `cargo test -p vitrine-integration-tests -- --ignored`

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

use vitrine_core::Role;
use vitrine_core::profile::Address;
use vitrine_integration_tests::{PASSWORD, TestContext};
use vitrine_storefront::config::MediaConfig;
use vitrine_storefront::db::{OrderRepository, RepositoryError, UserRepository};
use vitrine_storefront::services::auth::{AuthError, AuthService, Registration};

// ============================================================================
// Registration & login
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_new_user_starts_plain() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;

    assert_eq!(user.role, Role::User);
    assert_eq!(user.version, 1);
    assert!(user.address.is_empty());
    assert!(user.profile_image_url.is_none());
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_duplicate_email_is_rejected_ignoring_case() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;

    let result = AuthService::new(&ctx.pool)
        .register(Registration {
            email: &user.email.as_str().to_uppercase(),
            password: PASSWORD,
            display_name: "Someone Else",
            birth_date: None,
            address: Address::default(),
        })
        .await;
    assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_login() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let auth = AuthService::new(&ctx.pool);

    let signed_in = auth
        .login(&format!("  {}  ", user.email), PASSWORD)
        .await
        .expect("login");
    assert_eq!(signed_in.id, user.id);

    assert!(matches!(
        auth.login(user.email.as_str(), "wrong password entirely").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login(&TestContext::unique_email(), PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));
}

// ============================================================================
// Roles
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_role_grant_and_revoke() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = UserRepository::new(&ctx.pool);

    repo.set_role(&user.email, Role::Admin).await.expect("grant");
    assert_eq!(repo.role(user.id).await.expect("role"), Some(Role::Admin));

    repo.set_role(&user.email, Role::User).await.expect("revoke");
    assert_eq!(repo.role(user.id).await.expect("role"), Some(Role::User));
}

// ============================================================================
// Profile versioning
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_stale_version_conflicts() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = UserRepository::new(&ctx.pool);

    let address = Address {
        street: "Harbour Road".to_owned(),
        number: "12".to_owned(),
        postal_code: "8000".to_owned(),
        city: "Aarhus".to_owned(),
    };
    let updated = repo
        .update_address(user.id, user.version, &address)
        .await
        .expect("first write");
    assert_eq!(updated.version, user.version + 1);
    assert_eq!(updated.address, address);

    // A second tab still holding the old version loses.
    let result = repo
        .update_details(user.id, user.version, "Renamed", None)
        .await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    let renamed = repo
        .update_details(user.id, updated.version, "Renamed", None)
        .await
        .expect("fresh write");
    assert_eq!(renamed.display_name, "Renamed");
    assert_eq!(renamed.address, address);
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_orders_are_listed_newest_first() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let stranger = ctx.user(Role::User).await;

    let first = ctx
        .order(&user, "delivered", &[("Pocket Tee", 2), ("Trail Cap", 1)])
        .await;
    let second = ctx.order(&user, "processing", &[("Day Pack", 1)]).await;
    ctx.order(&stranger, "delivered", &[("Run Shorts", 1)]).await;

    let orders = OrderRepository::new(&ctx.pool)
        .list_for_user(user.id)
        .await
        .expect("list orders");

    let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, [second, first]);
    assert_eq!(orders[1].item_count(), 3);
    assert_eq!(orders[1].lines[0].product_name, "Pocket Tee");
    assert_eq!(orders[0].status, "processing");

    let none = OrderRepository::new(&ctx.pool)
        .list_for_user(ctx.user(Role::User).await.id)
        .await
        .expect("list orders");
    assert!(none.is_empty());
}

// ============================================================================
// Profile picture
// ============================================================================

/// A media API that fails every upload.
async fn failing_media() -> MediaConfig {
    let router = axum::Router::new().route(
        "/v1_1/demo/image/upload",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, router).await.expect("serve") });
    MediaConfig {
        cloud_name: "demo".to_owned(),
        upload_preset: "unsigned".to_owned(),
        api_base: Url::parse(&format!("http://{addr}")).expect("url"),
    }
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_failed_upload_keeps_previous_picture() {
    let ctx = TestContext::new().await;
    let app = ctx.app_with_media(Some(failing_media().await));
    let (cookie, user) = ctx.sign_up(&app).await;
    let users = UserRepository::new(&ctx.pool);
    users
        .set_profile_image(user.id, "https://cdn.example/demo/old.png")
        .await
        .expect("seed picture");

    let boundary = "vitrine-upload-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/account/picture")
        .header(header::COOKIE, &cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");
    let response = app.oneshot(request).await.expect("upload");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body, json!({ "error": "Image upload failed" }));

    let profile = users
        .get_by_id(user.id)
        .await
        .expect("load")
        .expect("user exists");
    assert_eq!(
        profile.profile_image_url.as_deref(),
        Some("https://cdn.example/demo/old.png")
    );
}
