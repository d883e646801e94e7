//! Favorites against a real database.
//!
//! Run with: `cargo test -p vitrine-integration-tests -- --ignored`

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use vitrine_core::catalog::Category;
use vitrine_core::favorites::Toggle;
use vitrine_core::{ProductId, Role};
use vitrine_integration_tests::TestContext;
use vitrine_storefront::db::{FavoriteRepository, RepositoryError};

// ============================================================================
// Toggle semantics
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_toggle_twice_restores_original_set() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let kept = ctx.product("Pocket Tee", Category::TShirts, 3).await;
    let toggled = ctx.product("Run Shorts", Category::Shorts, 3).await;
    let repo = FavoriteRepository::new(&ctx.pool);

    repo.toggle(user.id, &kept.id).await.expect("add kept");
    let before = repo.list(user.id).await.expect("list").expect("user exists");

    let (first, favorites) = repo
        .toggle(user.id, &toggled.id)
        .await
        .expect("first toggle")
        .expect("user exists");
    assert_eq!(first, Toggle::Added);
    assert!(favorites.contains(&toggled.id));

    let (second, favorites) = repo
        .toggle(user.id, &toggled.id)
        .await
        .expect("second toggle")
        .expect("user exists");
    assert_eq!(second, Toggle::Removed);
    assert_eq!(favorites, before);
    assert_eq!(
        repo.list(user.id).await.expect("list").expect("user exists"),
        before
    );
    assert_eq!(repo.count(user.id).await.expect("count"), 1);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_concurrent_double_toggles_restore_state() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let product = ctx.product("Down Vest", Category::Vests, 1).await;

    for _ in 0..50 {
        let before = FavoriteRepository::new(&ctx.pool)
            .list(user.id)
            .await
            .expect("list")
            .expect("user exists");

        let repo_a = FavoriteRepository::new(&ctx.pool);
        let repo_b = FavoriteRepository::new(&ctx.pool);
        let (a, b) = tokio::join!(
            repo_a.toggle(user.id, &product.id),
            repo_b.toggle(user.id, &product.id),
        );
        let (a, _) = a.expect("toggle a").expect("user exists");
        let (b, _) = b.expect("toggle b").expect("user exists");
        assert_ne!(a, b, "one toggle must add and the other remove");

        let after = FavoriteRepository::new(&ctx.pool)
            .list(user.id)
            .await
            .expect("list")
            .expect("user exists");
        assert_eq!(after, before);
    }
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_favorites_keep_insertion_order() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let repo = FavoriteRepository::new(&ctx.pool);

    let mut expected = Vec::new();
    for name in ["Day Pack", "Trail Cap", "Down Vest"] {
        let product = ctx.product(name, Category::Bags, 1).await;
        repo.toggle(user.id, &product.id).await.expect("toggle");
        expected.push(product.id);
    }

    let favorites = repo.list(user.id).await.expect("list").expect("user exists");
    assert_eq!(favorites.ids(), expected.as_slice());
}

// ============================================================================
// Missing rows
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_toggle_unknown_product_is_not_found() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let missing = ProductId::parse("no-such-product-anywhere").expect("valid id");
    let repo = FavoriteRepository::new(&ctx.pool);

    let result = repo.toggle(user.id, &missing).await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));

    let favorites = repo.list(user.id).await.expect("list").expect("user exists");
    assert!(favorites.is_empty());
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_deleted_user_has_no_favorites() {
    let ctx = TestContext::new().await;
    let user = ctx.user(Role::User).await;
    let product = ctx.product("Logo Hoodie", Category::Hoodies, 2).await;
    ctx.delete_user(&user).await;

    let repo = FavoriteRepository::new(&ctx.pool);
    assert!(repo.list(user.id).await.expect("list").is_none());
    assert!(
        repo.toggle(user.id, &product.id)
            .await
            .expect("toggle")
            .is_none()
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_session_of_deleted_user_is_unauthorized() {
    let ctx = TestContext::new().await;
    let product = ctx.product("Court Sneaker", Category::Shoes, 2).await;
    let app = ctx.app();
    let (cookie, user) = ctx.sign_up(&app).await;
    ctx.delete_user(&user).await;

    let toggle = Request::builder()
        .method("POST")
        .uri(format!("/api/favorites/{}", product.id))
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(toggle).await.expect("toggle");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body, json!({ "error": "Authentication required" }));

    let list = Request::builder()
        .uri("/api/favorites")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(list).await.expect("list");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
