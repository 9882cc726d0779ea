//! Index settings and analysis chain.
//!
//! Every filter and analyzer name is derived from the site's locale through
//! [`IndexConfig::analysis_name`], so mappings and settings always agree.

use catalog_search_shared::{AnalysisComponent, IndexConfig};
use serde_json::{json, Value};

/// Synonym pairs shipped with every index.
const DEFAULT_SYNONYMS: [&str; 2] = ["laptop, notebook", "tv, television"];

/// Settings body used when creating an index generation.
///
/// The configuration includes:
/// - stop word, stemming, word delimiter, synonym, shingle and edge n-gram filters
/// - free text, standard text, auto-suggestion and facet analyzers
///
/// # Sharding Configuration
///
/// - 1 primary shard, so parent/child routing never crosses shards
/// - 1 replica for redundancy
pub fn index_settings(config: &IndexConfig) -> Value {
    let name = |component| config.analysis_name(component);
    let locale = config.locale;

    let stopwords = name(AnalysisComponent::StopwordsFilter);
    let snowball = name(AnalysisComponent::SnowballFilter);
    let word_delimiter = name(AnalysisComponent::WordDelimiterFilter);
    let synonyms = name(AnalysisComponent::SynonymsFilter);
    let shingle = name(AnalysisComponent::ShingleFilter);
    let edge_ngram = name(AnalysisComponent::EdgeNGramFilter);
    let standard_text = name(AnalysisComponent::StandardTextAnalyzer);
    let free_text = name(AnalysisComponent::FreeTextAnalyzer);
    let auto_suggestion = name(AnalysisComponent::AutoSuggestionAnalyzer);
    let facet = name(AnalysisComponent::FacetAnalyzer);

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1,
            "analysis": {
                "filter": {
                    stopwords.as_str(): {
                        "type": "stop",
                        "stopwords": locale.stopwords()
                    },
                    snowball.as_str(): {
                        "type": "snowball",
                        "language": locale.stemmer_language()
                    },
                    word_delimiter.as_str(): {
                        "type": "word_delimiter",
                        "split_on_numerics": true,
                        "generate_number_parts": true,
                        "preserve_original": true
                    },
                    synonyms.as_str(): {
                        "type": "synonym",
                        "synonyms": DEFAULT_SYNONYMS,
                        "expand": true
                    },
                    shingle.as_str(): {
                        "type": "shingle",
                        "min_shingle_size": 2,
                        "max_shingle_size": 4
                    },
                    edge_ngram.as_str(): {
                        "type": "edge_ngram",
                        "min_gram": 4,
                        "max_gram": 30
                    }
                },
                "analyzer": {
                    standard_text.as_str(): {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", stopwords, synonyms, snowball]
                    },
                    free_text.as_str(): {
                        "type": "custom",
                        "tokenizer": "whitespace",
                        "char_filter": ["html_strip"],
                        "filter": ["lowercase", word_delimiter, stopwords, synonyms, snowball]
                    },
                    auto_suggestion.as_str(): {
                        "type": "custom",
                        "tokenizer": "keyword",
                        "filter": ["lowercase"]
                    },
                    facet.as_str(): {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", snowball, synonyms]
                    }
                }
            }
        }
    })
}
