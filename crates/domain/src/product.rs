//! Catalog products as seen by the cart.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DomainError, Money, ProductId};

/// Storefront department a product is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Digital,
}

impl Category {
    /// Returns the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Digital => "Digital",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "electronics" => Ok(Category::Electronics),
            "digital" => Ok(Category::Digital),
            _ => Err(DomainError::UnknownCategory(s.to_string())),
        }
    }
}

/// Physical condition of an electronics product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    New,
    Used,
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(Condition::New),
            "used" => Ok(Condition::Used),
            _ => Err(DomainError::UnknownCondition(s.to_string())),
        }
    }
}

/// A catalog product.
///
/// Read-only from the cart's point of view: adding a product to a cart copies
/// its name and price into a line item at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub category: Category,
    /// Only tracked for electronics.
    pub condition: Option<Condition>,
    pub image: Option<String>,
}

impl Product {
    /// Creates a product, rejecting negative prices.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        category: Category,
    ) -> Result<Self, DomainError> {
        if unit_price.is_negative() {
            return Err(DomainError::NegativePrice { price: unit_price });
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            category,
            condition: None,
            image: None,
        })
    }

    /// Sets the condition. Ignored for categories that do not track one.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        if self.category == Category::Electronics {
            self.condition = Some(condition);
        }
        self
    }

    /// Sets the image reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}
