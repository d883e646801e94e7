//! Shared fixtures for the database-backed integration tests.
//!
//! Tests need a migrated `PostgreSQL` database named by `TEST_DATABASE_URL`
//! and are `#[ignore]`d by default:
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://localhost/vitrine_test \
//!     cargo test -p vitrine-integration-tests -- --ignored
//! ```
//!
//! Fixtures never clean up. Every user and product gets a unique key, so
//! tests can share one database and run in parallel.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;
use serde_json::json;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use uuid::Uuid;

use vitrine_core::catalog::{Category, Product};
use vitrine_core::profile::{Address, UserProfile};
use vitrine_core::{Email, OrderId, Price, ProductId, Role};
use vitrine_storefront::app;
use vitrine_storefront::config::{LogFormat, MediaConfig, StorefrontConfig};
use vitrine_storefront::db::products::ProductWrite;
use vitrine_storefront::db::{MIGRATOR, ProductRepository, UserRepository};
use vitrine_storefront::services::auth::{AuthService, Registration};
use vitrine_storefront::state::AppState;

/// Password given to every fixture user.
pub const PASSWORD: &str = "correct horse battery staple";

/// Connection to the test database.
pub struct TestContext {
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to `TEST_DATABASE_URL` and apply migrations.
    ///
    /// # Panics
    ///
    /// Panics if the variable is unset, the database is unreachable or a
    /// migration fails.
    pub async fn new() -> Self {
        let _ = dotenvy::dotenv();
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = PgPool::connect(&url)
            .await
            .expect("Failed to connect to test database");
        MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        Self { pool }
    }

    /// The full router over the test database, with in-memory sessions and
    /// uploads disabled.
    #[must_use]
    pub fn app(&self) -> Router {
        self.app_with_media(None)
    }

    /// The full router over the test database, uploading to `media`.
    ///
    /// # Panics
    ///
    /// Panics if the router cannot be built.
    #[must_use]
    pub fn app_with_media(&self, media: Option<MediaConfig>) -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused".to_string()),
            host: "127.0.0.1".parse().expect("valid address"),
            port: 0,
            base_url: "http://localhost".to_string(),
            session_secret: SecretString::from("s".repeat(64)),
            media,
            sentry_dsn: None,
            sentry_environment: None,
            log_format: LogFormat::Text,
        };
        let state = AppState::new(config, self.pool.clone()).expect("Failed to build state");
        app(state, MemoryStore::default()).expect("Failed to build router")
    }

    /// Register a fresh user through `app` and return its session cookie.
    ///
    /// # Panics
    ///
    /// Panics if registration does not answer 201 with a cookie.
    pub async fn sign_up(&self, app: &Router) -> (String, UserProfile) {
        let email = Self::unique_email();
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "198.51.100.77")
            .body(Body::from(
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "display_name": "Integration Tester",
                })
                .to_string(),
            ))
            .expect("register request");
        let response = app.clone().oneshot(request).await.expect("register");
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("session cookie")
            .to_owned();
        (cookie, self.user_by_email(&email).await)
    }

    /// A unique, never-registered email address.
    #[must_use]
    pub fn unique_email() -> String {
        format!("it-{}@example.org", Uuid::new_v4().simple())
    }

    /// A unique product id with a readable prefix.
    ///
    /// # Panics
    ///
    /// Never in practice: the generated id is always valid.
    #[must_use]
    pub fn unique_product_id(prefix: &str) -> ProductId {
        ProductId::parse(&format!("{prefix}-{}", Uuid::new_v4().simple()))
            .expect("generated product id is valid")
    }

    /// Register a fresh user through the auth service.
    ///
    /// # Panics
    ///
    /// Panics if registration or the role change fails.
    pub async fn user(&self, role: Role) -> UserProfile {
        let email = Self::unique_email();
        let profile = AuthService::new(&self.pool)
            .register(Registration {
                email: &email,
                password: PASSWORD,
                display_name: "Integration Tester",
                birth_date: None,
                address: Address::default(),
            })
            .await
            .expect("Failed to register fixture user");

        if role == Role::User {
            return profile;
        }
        UserRepository::new(&self.pool)
            .set_role(&profile.email, role)
            .await
            .expect("Failed to set fixture role")
    }

    /// Look up a registered user by email.
    ///
    /// # Panics
    ///
    /// Panics if the address is invalid or no such user exists.
    pub async fn user_by_email(&self, email: &str) -> UserProfile {
        let email = Email::parse(email).expect("valid email");
        UserRepository::new(&self.pool)
            .get_by_email(&email)
            .await
            .expect("Failed to look up user")
            .expect("user exists")
    }

    /// Delete a user row, as an operator removing an account would.
    ///
    /// # Panics
    ///
    /// Panics if the delete fails.
    pub async fn delete_user(&self, user: &UserProfile) {
        sqlx::query("DELETE FROM storefront.user WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .expect("Failed to delete user");
    }

    /// Create a product in `category` with the given stock.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn product(&self, name: &str, category: Category, stock: u32) -> Product {
        let write = ProductWrite {
            id: Self::unique_product_id(category.slug()),
            name: name.to_owned(),
            price: Price::new(Decimal::new(4_999, 2)).expect("fixture price is valid"),
            description: String::new(),
            image_url: String::new(),
            category,
            stock,
        };
        let (product, inserted) = ProductRepository::new(&self.pool)
            .upsert(&write)
            .await
            .expect("Failed to insert fixture product");
        assert!(inserted);
        product
    }

    /// Insert a product row whose category is stored verbatim, as rows
    /// written before categories were normalized to slugs are.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn legacy_product(&self, raw_category: &str) -> ProductId {
        let id = Self::unique_product_id("legacy");
        sqlx::query(
            "INSERT INTO storefront.product (id, name, price, category, stock) \
             VALUES ($1, 'Legacy Item', 10.00, $2, 1)",
        )
        .bind(&id)
        .bind(raw_category)
        .execute(&self.pool)
        .await
        .expect("Failed to insert legacy product");
        id
    }

    /// Record a past order with the given `(product name, quantity)` lines.
    ///
    /// # Panics
    ///
    /// Panics if an insert fails.
    pub async fn order(&self, user: &UserProfile, status: &str, lines: &[(&str, i32)]) -> OrderId {
        let id = sqlx::query_scalar::<_, OrderId>(
            "INSERT INTO storefront.customer_order (user_id, status) VALUES ($1, $2) RETURNING id",
        )
        .bind(user.id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert order");

        for (product_name, quantity) in lines {
            sqlx::query(
                "INSERT INTO storefront.order_line (order_id, product_name, quantity) \
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(product_name)
            .bind(quantity)
            .execute(&self.pool)
            .await
            .expect("Failed to insert order line");
        }
        id
    }
}
