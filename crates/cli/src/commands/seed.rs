//! Seed the catalog from a YAML file.
//!
//! Every entry is validated with the same rules as the admin product API
//! before the database is touched. Entries are whole-record writes: an
//! existing product with the same id is replaced.
//!
//! ```yaml
//! products:
//!   - id: rain-shell
//!     name: Rain Shell
//!     price: "129.50"
//!     category: jackets
//!     stock: 12
//!     description: Packable waterproof shell.
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use vitrine_core::ProductId;
use vitrine_storefront::db::products::ProductWrite;
use vitrine_storefront::db::{ProductRepository, RepositoryError};
use vitrine_storefront::routes::admin::ProductInput;

use super::{ConnectError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} invalid product(s) in seed file")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    id: String,
    #[serde(flatten)]
    input: ProductInput,
}

/// Parse and validate seed file contents.
///
/// Every problem is logged before failing, so one run reports them all.
fn parse_seed(content: &str) -> Result<Vec<ProductWrite>, SeedError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let mut seen = HashSet::new();
    let mut writes = Vec::with_capacity(file.products.len());
    let mut invalid = 0;

    for entry in file.products {
        let result = ProductId::parse(&entry.id)
            .map_err(|e| e.to_string())
            .and_then(|id| entry.input.validate(id).map_err(|e| e.to_string()));

        match result {
            Ok(write) if !seen.insert(write.id.clone()) => {
                error!(id = %entry.id, "Duplicate product id");
                invalid += 1;
            }
            Ok(write) => writes.push(write),
            Err(reason) => {
                error!(id = %entry.id, %reason, "Invalid product");
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        return Err(SeedError::Invalid(invalid));
    }
    Ok(writes)
}

/// Create or replace every product in the file.
pub async fn products(file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::NotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let writes = parse_seed(&content)?;
    info!(products = writes.len(), "Parsed seed file");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let mut created = 0_usize;
    let mut replaced = 0_usize;
    for write in &writes {
        let (product, inserted) = repo.upsert(write).await?;
        if inserted {
            created += 1;
        } else {
            replaced += 1;
        }
        info!(id = %product.id, inserted, "Product written");
    }

    info!(created, replaced, "Seeding complete");
    Ok(())
}
