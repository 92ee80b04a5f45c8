//! Catalog collaborator trait and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Category, Product, ProductId};

/// Read-only access to catalog products.
///
/// Product CRUD lives outside this workspace; the cart only needs to look up
/// the current name and price of a product at the moment it is added.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a product by ID.
    async fn product(&self, id: &ProductId) -> Option<Product>;

    /// Lists the products in a category, in listing order.
    async fn products_in(&self, category: Category) -> Vec<Product>;
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<Vec<Product>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog seeded with the given products.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: Arc::new(RwLock::new(products.into_iter().collect())),
        }
    }

    /// Inserts a product, replacing any existing one with the same ID.
    pub async fn upsert(&self, product: Product) {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    /// Removes a product from the catalog.
    pub async fn remove(&self, id: &ProductId) {
        self.products.write().await.retain(|p| &p.id != id);
    }

    /// Returns the number of listed products.
    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    /// Returns true if nothing is listed.
    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product(&self, id: &ProductId) -> Option<Product> {
        self.products
            .read()
            .await
            .iter()
            .find(|p| &p.id == id)
            .cloned()
    }

    async fn products_in(&self, category: Category) -> Vec<Product> {
        self.products
            .read()
            .await
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect()
    }
}
