//! Catalog queries and product writes against a real database.
//!
//! Run with: `cargo test -p vitrine-integration-tests -- --ignored`

use rust_decimal::Decimal;

use vitrine_core::Price;
use vitrine_core::catalog::Category;
use vitrine_integration_tests::TestContext;
use vitrine_storefront::db::ProductRepository;
use vitrine_storefront::db::products::ProductWrite;
use vitrine_storefront::services::catalog::CatalogService;

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_category_lookup_ignores_case() {
    let ctx = TestContext::new().await;
    let slug_row = ctx.product("Down Vest", Category::Vests, 2).await;
    let legacy = ctx.legacy_product("VESTS").await;
    let catalog = CatalogService::new();

    for query in ["vests", "Vests", " VESTS "] {
        let ids: Vec<_> = catalog
            .by_category(&ctx.pool, query)
            .await
            .expect("list by category")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert!(ids.contains(&slug_row.id), "{query}");
        assert!(ids.contains(&legacy), "{query}");
    }

    assert!(
        catalog
            .by_category(&ctx.pool, "spaceships")
            .await
            .expect("list by category")
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_upsert_creates_then_replaces() {
    let ctx = TestContext::new().await;
    let repo = ProductRepository::new(&ctx.pool);
    let id = TestContext::unique_product_id("rain-shell");

    let mut write = ProductWrite {
        id: id.clone(),
        name: "Rain Shell".to_owned(),
        price: Price::new(Decimal::new(12_950, 2)).expect("price"),
        description: "Packable".to_owned(),
        image_url: String::new(),
        category: Category::Jackets,
        stock: 4,
    };
    let (created, inserted) = repo.upsert(&write).await.expect("insert");
    assert!(inserted);
    assert_eq!(created.category, "jackets");

    write.stock = 0;
    write.description = String::new();
    let (replaced, inserted) = repo.upsert(&write).await.expect("replace");
    assert!(!inserted);
    assert_eq!(replaced.stock, 0);
    assert_eq!(replaced.description, "");
    assert!(!replaced.is_available());

    let image = repo
        .set_image_url(&id, "https://img.example.org/shell.png")
        .await
        .expect("set image");
    assert_eq!(image.image_url, "https://img.example.org/shell.png");
    assert!(repo.exists(&id).await.expect("exists"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn test_search_sees_writes_after_invalidate() {
    let ctx = TestContext::new().await;
    let catalog = CatalogService::default();
    let marker = TestContext::unique_product_id("zq").to_string();

    let before = catalog.search(&ctx.pool, &marker, 10).await.expect("search");
    assert_eq!(before.total, 0);

    let product = ctx.product(&format!("Beanie {marker}"), Category::Hats, 5).await;

    // The snapshot is cached, so the new product stays hidden until invalidated.
    let cached = catalog.search(&ctx.pool, &marker, 10).await.expect("search");
    assert_eq!(cached.total, 0);

    catalog.invalidate().await;
    let fresh = catalog
        .search(&ctx.pool, &marker.to_uppercase(), 10)
        .await
        .expect("search");
    assert_eq!(fresh.total, 1);
    assert_eq!(fresh.products[0].id, product.id);
}
