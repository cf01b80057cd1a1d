//! # SQL Product Catalog
//!
//! Product lookup over the per-store `products` table.
//!
//! ## Price Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The database stores integer cents (base_price_cents).                 │
//! │  This module converts them ONCE to scale-2 decimals on the way out.    │
//! │  The kernel never rounds afterwards, and NOTHING here ever substitutes │
//! │  a fallback price: an unknown or inactive product is invalid, full     │
//! │  stop.                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::debug;

use till_core::{KernelError, KernelResult, ProductCatalog, ProductCheck, ProductInfo};

use crate::error::StoreResult;

/// Row shape of the `products` table.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    sku: String,
    name: String,
    description: Option<String>,
    category_id: Option<String>,
    base_price_cents: i64,
    is_active: bool,
}

impl From<ProductRow> for ProductInfo {
    fn from(row: ProductRow) -> Self {
        ProductInfo {
            sku: row.sku,
            name: row.name,
            description: row.description,
            category: row.category_id,
            base_price: Decimal::new(row.base_price_cents, 2),
            is_active: row.is_active,
        }
    }
}

/// Catalog backed by one store's SQLite database.
#[derive(Debug, Clone)]
pub struct SqlCatalog {
    pool: SqlitePool,
}

impl SqlCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        SqlCatalog { pool }
    }

    /// Looks a product up by SKU (case-insensitive).
    pub async fn get_by_sku(&self, sku: &str) -> StoreResult<Option<ProductInfo>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT sku, name, description, category_id, base_price_cents, is_active
            FROM products
            WHERE sku = ?1 COLLATE NOCASE
            "#,
        )
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProductInfo::from))
    }

    /// Case-insensitive LIKE search over sku and name. An empty term lists
    /// active products.
    pub async fn search(&self, term: &str, max_results: u32) -> StoreResult<Vec<ProductInfo>> {
        let term = term.trim();
        debug!(term = %term, max_results, "searching products");

        let rows = if term.is_empty() {
            sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT sku, name, description, category_id, base_price_cents, is_active
                FROM products
                WHERE is_active = 1
                ORDER BY name
                LIMIT ?1
                "#,
            )
            .bind(max_results)
            .fetch_all(&self.pool)
            .await?
        } else {
            let pattern = format!("%{}%", term);
            sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT sku, name, description, category_id, base_price_cents, is_active
                FROM products
                WHERE is_active = 1
                  AND (sku LIKE ?1 COLLATE NOCASE OR name LIKE ?1 COLLATE NOCASE)
                ORDER BY name
                LIMIT ?2
                "#,
            )
            .bind(pattern)
            .bind(max_results)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.into_iter().map(ProductInfo::from).collect())
    }

    /// Active products by category then name. The reference schema has no
    /// sales-history table to rank by.
    pub async fn popular(&self, limit: u32) -> StoreResult<Vec<ProductInfo>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT sku, name, description, category_id, base_price_cents, is_active
            FROM products
            WHERE is_active = 1
            ORDER BY category_id, name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductInfo::from).collect())
    }
}

// =============================================================================
// Kernel-Facing Contract
// =============================================================================

const POPULAR_ITEM_LIMIT: u32 = 12;

#[async_trait]
impl ProductCatalog for SqlCatalog {
    async fn validate_product(&self, product_id: &str) -> KernelResult<ProductCheck> {
        let found = self
            .get_by_sku(product_id)
            .await
            .map_err(|e| KernelError::Extension(e.to_string()))?;

        Ok(match found {
            None => ProductCheck::invalid(format!("Unknown product '{}'.", product_id.trim())),
            Some(product) if !product.is_active => ProductCheck::invalid(format!(
                "Product '{}' is not available for sale.",
                product.sku
            )),
            Some(product) => ProductCheck::valid(product),
        })
    }

    async fn search_products(
        &self,
        term: &str,
        max_results: u32,
    ) -> KernelResult<Vec<ProductInfo>> {
        self.search(term, max_results)
            .await
            .map_err(|e| KernelError::Extension(e.to_string()))
    }

    async fn get_popular_items(&self) -> KernelResult<Vec<ProductInfo>> {
        self.popular(POPULAR_ITEM_LIMIT)
            .await
            .map_err(|e| KernelError::Extension(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreDb;
    use rust_decimal_macros::dec;

    async fn seeded_catalog() -> SqlCatalog {
        let db = StoreDb::in_memory().await.unwrap();
        sqlx::raw_sql(
            r#"
            CREATE TABLE products (
                sku TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                category_id TEXT,
                base_price_cents INTEGER NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1
            );
            INSERT INTO products VALUES
                ('COFFEE.SMALL', 'Small Coffee', 'House blend', 'drinks', 350, 1),
                ('COFFEE.LARGE', 'Large Coffee', NULL, 'drinks', 450, 1),
                ('BAGEL', 'Plain Bagel', NULL, 'food', 200, 1),
                ('RETIRED', 'Old Item', NULL, 'food', 100, 0);
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();
        SqlCatalog::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_validate_known_product() {
        let catalog = seeded_catalog().await;
        let check = catalog.validate_product("coffee.small").await.unwrap();
        assert!(check.is_valid);
        assert_eq!(check.effective_price, dec!(3.50));
        assert_eq!(check.product.unwrap().sku, "COFFEE.SMALL");
    }

    #[tokio::test]
    async fn test_validate_unknown_and_inactive() {
        let catalog = seeded_catalog().await;

        let unknown = catalog.validate_product("NOPE").await.unwrap();
        assert!(!unknown.is_valid);
        assert!(unknown.error_message.unwrap().contains("Unknown product"));
        assert_eq!(unknown.effective_price, dec!(0));

        let inactive = catalog.validate_product("RETIRED").await.unwrap();
        assert!(!inactive.is_valid);
        assert!(inactive
            .error_message
            .unwrap()
            .contains("not available for sale"));
    }

    #[tokio::test]
    async fn test_search_and_empty_term() {
        let catalog = seeded_catalog().await;

        let hits = catalog.search("coffee", 10).await.unwrap();
        assert_eq!(hits.len(), 2);

        // Empty term lists active products; the retired item never shows.
        let all = catalog.search("", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|p| p.is_active));
    }

    #[tokio::test]
    async fn test_popular_is_deterministic() {
        let catalog = seeded_catalog().await;
        let a = catalog.popular(10).await.unwrap();
        let b = catalog.popular(10).await.unwrap();
        let skus: Vec<_> = a.iter().map(|p| p.sku.clone()).collect();
        assert_eq!(skus, b.iter().map(|p| p.sku.clone()).collect::<Vec<_>>());
    }
}
