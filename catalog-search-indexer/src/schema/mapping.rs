//! Strict document mappings for products, product groups and product
//! properties.
//!
//! Mappings are computed from the site configuration and the category facet
//! table alone; no document instance is needed.

use catalog_search_shared::schema::{category_facet_fields, fields};
use catalog_search_shared::{AnalysisComponent, IndexConfig};
use serde_json::{json, Map, Value};

/// Builds the per-type mappings of one site index.
#[derive(Debug, Clone, Copy)]
pub struct MappingBuilder {
    config: IndexConfig,
    parent_relationship: bool,
}

impl MappingBuilder {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            parent_relationship: false,
        }
    }

    /// Declare the group -> product -> property join in every mapping.
    pub fn with_parent_relationship(mut self, enabled: bool) -> Self {
        self.parent_relationship = enabled;
        self
    }

    pub fn parent_relationship(&self) -> bool {
        self.parent_relationship
    }

    /// Every mapping of the index in the order it must be applied: groups,
    /// products, then properties.
    pub fn mappings(&self) -> Vec<(&'static str, Value)> {
        vec![
            (self.config.group_document_type, self.group_mapping()),
            (self.config.document_type, self.product_mapping()),
            (self.config.property_document_type, self.property_mapping()),
        ]
    }

    pub fn product_mapping(&self) -> Value {
        let free_text = self.config.analysis_name(AnalysisComponent::FreeTextAnalyzer);
        let suggestion = self
            .config
            .analysis_name(AnalysisComponent::AutoSuggestionAnalyzer);

        let mut properties = self.common_properties();
        let product_fields = json!({
            (fields::TITLE): {
                "type": "text",
                "store": true,
                "analyzer": free_text,
                "fielddata": true
            },
            (fields::DESCRIPTION): {
                "type": "text",
                "store": true,
                "analyzer": free_text,
                "fielddata": true
            },
            (fields::PRICE): {
                "type": "double",
                "store": true
            },
            (fields::SOLD_OUT): {
                "type": "boolean",
                "store": true
            },
            (fields::AVAILABLE_DATE): {
                "type": "date",
                "store": true
            },
            (fields::BOOST_FACTOR): {
                "type": "float",
                "store": true
            },
            (fields::KEYWORDS): {
                "type": "completion",
                "analyzer": suggestion
            },
            (fields::SPECIFICATIONS): {
                "type": "nested",
                "properties": {
                    (fields::RESOLUTION): { "type": "keyword", "store": true },
                    (fields::MEMORY): { "type": "keyword", "store": true }
                }
            },
            (fields::CATEGORIES): {
                "type": "nested",
                "include_in_parent": true,
                "properties": self.category_properties(&suggestion)
            }
        });
        extend(&mut properties, product_fields);

        strict(properties)
    }

    pub fn group_mapping(&self) -> Value {
        let free_text = self.config.analysis_name(AnalysisComponent::FreeTextAnalyzer);

        let mut properties = self.common_properties();
        extend(
            &mut properties,
            json!({
                (fields::GROUP_TITLE): {
                    "type": "text",
                    "store": true,
                    "analyzer": free_text
                },
                (fields::GROUP_DESCRIPTION): {
                    "type": "text",
                    "store": true,
                    "analyzer": free_text
                }
            }),
        );

        strict(properties)
    }

    /// Size and colour are stored lower-cased, so plain keywords match the
    /// lower-cased child filters.
    pub fn property_mapping(&self) -> Value {
        let mut properties = self.common_properties();
        extend(
            &mut properties,
            json!({
                (fields::PROPERTY_SIZE): { "type": "keyword", "store": true },
                (fields::PROPERTY_COLOR): { "type": "keyword", "store": true }
            }),
        );

        strict(properties)
    }

    /// Three variants per category facet field and level.
    fn category_properties(&self, suggestion_analyzer: &str) -> Value {
        let mut properties = Map::new();
        for field in category_facet_fields() {
            properties.insert(
                format!("{}.{}", field, fields::FACET),
                json!({ "type": "keyword", "store": true }),
            );
            properties.insert(
                format!("{}.{}", field, fields::FACET_FILTER),
                json!({ "type": "keyword" }),
            );
            properties.insert(
                format!("{}.{}", field, fields::SUGGEST),
                json!({ "type": "text", "analyzer": suggestion_analyzer }),
            );
        }
        Value::Object(properties)
    }

    fn common_properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        properties.insert(fields::DOC_TYPE.to_string(), json!({ "type": "keyword" }));

        if self.parent_relationship {
            properties.insert(
                fields::RELATION.to_string(),
                json!({
                    "type": "join",
                    "relations": {
                        self.config.group_document_type: self.config.document_type,
                        self.config.document_type: self.config.property_document_type
                    }
                }),
            );
        }

        properties
    }
}

fn extend(properties: &mut Map<String, Value>, more: Value) {
    if let Value::Object(more) = more {
        properties.extend(more);
    }
}

fn strict(properties: Map<String, Value>) -> Value {
    json!({
        "dynamic": "strict",
        "properties": properties
    })
}
