//! Catalog entities handed to the indexer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::CategoryId;

/// A technical specification of a product. Either value may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub resolution: Option<String>,
    pub memory: Option<String>,
}

impl Specification {
    pub fn new(resolution: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            resolution: Some(resolution.into()),
            memory: Some(memory.into()),
        }
    }

    /// True when neither value carries any text.
    pub fn is_blank(&self) -> bool {
        is_blank(&self.resolution) && is_blank(&self.memory)
    }
}

/// A purchasable variant of a product, indexed as a child document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProperty {
    pub id: i64,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl ProductProperty {
    /// Document id of this property under `product_id`.
    ///
    /// Property ids are only unique per product, so the id is composed as
    /// `<product id><property id>0000`.
    pub fn document_id(&self, product_id: i64) -> String {
        format!("{}{}0000", product_id, self.id)
    }
}

/// A product as maintained by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub sold_out: bool,
    pub available_date: Option<DateTime<Utc>>,
    pub boost_factor: f64,
    pub keywords: Vec<String>,
    pub categories: Vec<CategoryId>,
    pub specifications: Vec<Specification>,
    pub properties: Vec<ProductProperty>,
}

impl Product {
    pub fn new(id: i64, title: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            price,
            sold_out: false,
            available_date: None,
            boost_factor: 0.0,
            keywords: Vec::new(),
            categories: Vec::new(),
            specifications: Vec::new(),
            properties: Vec::new(),
        }
    }
}

/// A group of products, the root of the parent/child relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub products: Vec<Product>,
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_document_id() {
        let property = ProductProperty {
            id: 2,
            size: Some("21 inch".to_string()),
            color: None,
        };
        assert_eq!(property.document_id(13), "1320000");
    }

    #[test]
    fn test_specification_blank() {
        assert!(Specification::default().is_blank());
        assert!(Specification {
            resolution: Some("  ".to_string()),
            memory: None
        }
        .is_blank());
        assert!(!Specification {
            resolution: None,
            memory: Some("8 GB".to_string())
        }
        .is_blank());
    }
}
