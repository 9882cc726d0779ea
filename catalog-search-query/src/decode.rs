//! Conversion of stored product sources into result types.
//!
//! Missing or mistyped fields fall back to neutral values; only an id that is
//! not a product number drops the document.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use catalog_search_repository::{SearchHit, StoredDocument};
use catalog_search_shared::schema::fields;
use catalog_search_shared::{CategoryValue, ProductDetails, ProductSummary};

pub fn product_summary(hit: &SearchHit) -> Option<ProductSummary> {
    let id = product_id(&hit.id)?;
    let source = &hit.source;

    Some(ProductSummary {
        id,
        title: string(source, fields::TITLE).unwrap_or_default(),
        price: number(source, fields::PRICE),
        sold_out: boolean(source, fields::SOLD_OUT),
        score: hit.score,
    })
}

pub fn product_details(document: &StoredDocument) -> Option<ProductDetails> {
    let id = product_id(&document.id)?;
    let source = &document.source;

    let available_date = string(source, fields::AVAILABLE_DATE).and_then(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|e| warn!(id = id, error = %e, "Ignoring unparseable availability date"))
            .ok()
    });

    let keywords = match source.get(fields::KEYWORDS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(keyword)) => vec![keyword.clone()],
        _ => Vec::new(),
    };

    Some(ProductDetails {
        id,
        title: string(source, fields::TITLE).unwrap_or_default(),
        description: string(source, fields::DESCRIPTION),
        price: number(source, fields::PRICE),
        sold_out: boolean(source, fields::SOLD_OUT),
        available_date,
        boost_factor: number(source, fields::BOOST_FACTOR),
        keywords,
        categories: category_values(source),
    })
}

/// Stored `.facet` values of every category element, in document order.
fn category_values(source: &Value) -> Vec<CategoryValue> {
    let suffix = format!(".{}", fields::FACET);
    let elements = match source.get(fields::CATEGORIES) {
        Some(Value::Array(elements)) => elements.as_slice(),
        Some(element @ Value::Object(_)) => std::slice::from_ref(element),
        _ => return Vec::new(),
    };

    elements
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|element| element.iter())
        .filter_map(|(key, value)| {
            let field = key.strip_suffix(&suffix)?;
            Some(CategoryValue {
                field: field.to_string(),
                name: value.as_str()?.to_string(),
            })
        })
        .collect()
}

fn product_id(raw: &str) -> Option<i64> {
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(id = %raw, "Skipping document with a non-numeric id");
            None
        }
    }
}

fn string(source: &Value, field: &str) -> Option<String> {
    source.get(field).and_then(Value::as_str).map(str::to_string)
}

fn number(source: &Value, field: &str) -> Option<f64> {
    match source.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn boolean(source: &Value, field: &str) -> bool {
    match source.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
