//! Turns catalog entities into index documents.

use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::{json, Map, Value};

use catalog_search_shared::schema::fields;
use catalog_search_shared::{CategoryTree, Product, ProductGroup, ProductProperty, Specification};

use crate::errors::DocumentBuildError;

/// Builds the JSON bodies stored for products, groups and properties.
///
/// Category assignments are resolved against the shared category tree and
/// flattened into one element per (category, level) pair.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    categories: Arc<CategoryTree>,
}

impl DocumentBuilder {
    pub fn new(categories: Arc<CategoryTree>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    /// Build the product document.
    ///
    /// Fails when the product carries a non-finite number, a blank title, or
    /// a category the tree cannot flatten.
    pub fn product_document(&self, product: &Product) -> Result<Value, DocumentBuildError> {
        if product.title.trim().is_empty() {
            return Err(DocumentBuildError::invalid_product(product.id, "title is blank"));
        }
        if !product.price.is_finite() {
            return Err(DocumentBuildError::invalid_product(
                product.id,
                format!("price {} is not a finite number", product.price),
            ));
        }
        if !product.boost_factor.is_finite() {
            return Err(DocumentBuildError::invalid_product(
                product.id,
                format!("boost factor {} is not a finite number", product.boost_factor),
            ));
        }

        let mut doc = Map::new();
        doc.insert(fields::TITLE.to_string(), json!(product.title));
        if let Some(description) = &product.description {
            doc.insert(fields::DESCRIPTION.to_string(), json!(description));
        }
        doc.insert(fields::PRICE.to_string(), json!(product.price));
        doc.insert(fields::SOLD_OUT.to_string(), json!(product.sold_out));
        if let Some(date) = product.available_date {
            doc.insert(
                fields::AVAILABLE_DATE.to_string(),
                json!(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        doc.insert(fields::BOOST_FACTOR.to_string(), json!(product.boost_factor));
        doc.insert(fields::KEYWORDS.to_string(), json!(product.keywords));
        doc.insert(
            fields::CATEGORIES.to_string(),
            Value::Array(self.category_elements(product)?),
        );
        doc.insert(
            fields::SPECIFICATIONS.to_string(),
            Value::Array(
                product
                    .specifications
                    .iter()
                    .filter(|spec| !spec.is_blank())
                    .map(specification_element)
                    .collect(),
            ),
        );

        Ok(Value::Object(doc))
    }

    pub fn group_document(&self, group: &ProductGroup) -> Value {
        let mut doc = Map::new();
        doc.insert(fields::GROUP_TITLE.to_string(), json!(group.title));
        if let Some(description) = &group.description {
            doc.insert(fields::GROUP_DESCRIPTION.to_string(), json!(description));
        }
        Value::Object(doc)
    }

    /// Property values are lower-cased so child filters match case-insensitively.
    pub fn property_document(&self, property: &ProductProperty) -> Value {
        let mut doc = Map::new();
        if let Some(size) = &property.size {
            doc.insert(fields::PROPERTY_SIZE.to_string(), json!(size.to_lowercase()));
        }
        if let Some(color) = &property.color {
            doc.insert(fields::PROPERTY_COLOR.to_string(), json!(color.to_lowercase()));
        }
        Value::Object(doc)
    }

    fn category_elements(&self, product: &Product) -> Result<Vec<Value>, DocumentBuildError> {
        let flattened = self.categories.flatten(&product.categories)?;

        Ok(flattened
            .into_iter()
            .map(|category| {
                let field = category.field();
                let mut element = Map::new();
                element.insert(
                    format!("{}.{}", field, fields::FACET),
                    json!(category.name),
                );
                element.insert(
                    format!("{}.{}", field, fields::FACET_FILTER),
                    json!(category.filter_value()),
                );
                element.insert(
                    format!("{}.{}", field, fields::SUGGEST),
                    json!(category.name),
                );
                Value::Object(element)
            })
            .collect())
    }
}

fn specification_element(spec: &Specification) -> Value {
    let mut element = Map::new();
    if let Some(resolution) = &spec.resolution {
        element.insert(fields::RESOLUTION.to_string(), json!(resolution));
    }
    if let Some(memory) = &spec.memory {
        element.insert(fields::MEMORY.to_string(), json!(memory));
    }
    Value::Object(element)
}
