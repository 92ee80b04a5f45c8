//! Catalog listing endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::{Category, Condition, Product};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

const LISTED_CATEGORIES: [Category; 2] = [Category::Electronics, Category::Digital];

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub unit_price: String,
    pub category: &'static str,
    pub condition: Option<Condition>,
    pub image: Option<String>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            unit_price: product.unit_price.to_fixed2(),
            category: product.category.as_str(),
            condition: product.condition,
            image: product.image,
        }
    }
}

/// GET /products?category=: products in one category, or every category.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let categories = match query.category.as_deref() {
        Some(name) => vec![
            name.parse::<Category>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        ],
        None => LISTED_CATEGORIES.to_vec(),
    };

    let mut products = Vec::new();
    for category in categories {
        products.extend(
            state
                .catalog
                .products_in(category)
                .await
                .into_iter()
                .map(ProductResponse::from),
        );
    }

    Ok(Json(products))
}
