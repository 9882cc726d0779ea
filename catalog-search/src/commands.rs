//! Command line commands and their handlers.
//!
//! Every handler returns a JSON value so `main` only has to print it.

use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::info;

use catalog_search_shared::{AnalysisComponent, IndexConfig, SearchCriteria, SortOrder};

use crate::config::Dependencies;
use crate::AppError;

/// Fields compared by `similar` when none are given.
pub const DEFAULT_SIMILAR_FIELDS: [&str; 2] = ["title", "description"];

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Recreate every configured site index from the sample catalog
    Setup,
    /// Run a faceted product search
    Search(SearchArgs),
    /// Show the stored fields of one product
    Product {
        #[arg(long, default_value = "com")]
        site: String,
        id: i64,
    },
    /// Complete a typed prefix from product keywords
    Suggest {
        #[arg(long, default_value = "com")]
        site: String,
        text: String,
    },
    /// Find products similar to a given product
    Similar {
        #[arg(long, default_value = "com")]
        site: String,
        /// Fields to compare (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
        id: i64,
    },
    /// Run text through one of the site's analyzers
    Analyze {
        #[arg(long, default_value = "com")]
        site: String,
        /// `standard`, `freetext`, `autosuggestion`, `facet` or a full analyzer name
        #[arg(long, default_value = "freetext")]
        analyzer: String,
        text: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Asc => SortOrder::Asc,
            SortArg::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    #[arg(long, default_value = "com")]
    pub site: String,

    /// Free text
    #[arg(long, short)]
    pub query: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub from: usize,

    #[arg(long, default_value_t = catalog_search_shared::criteria::DEFAULT_PAGE_SIZE)]
    pub size: usize,

    /// Facet code to aggregate (repeatable)
    #[arg(long = "facet")]
    pub facets: Vec<String>,

    /// Single-select filter `code=value` (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Multi-select filter `code=value`; values of one code are ORed (repeatable)
    #[arg(long = "select")]
    pub selects: Vec<String>,

    /// Product property `size:color`, either side may be empty (repeatable)
    #[arg(long = "property")]
    pub properties: Vec<String>,

    /// Specification `resolution:memory`, either side may be empty (repeatable)
    #[arg(long = "spec")]
    pub specifications: Vec<String>,

    /// Sort by availability date
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Move products that are not sold out forward
    #[arg(long)]
    pub rescore: bool,

    /// Add each product's boost factor to its score
    #[arg(long)]
    pub boost: bool,

    #[arg(long)]
    pub no_facets: bool,
}

/// Build search criteria for `config` from command line arguments.
pub fn build_criteria(config: &IndexConfig, args: &SearchArgs) -> Result<SearchCriteria, AppError> {
    let mut builder = SearchCriteria::builder()
        .index(config.alias)
        .document_type(config.document_type)
        .from(args.from)
        .size(args.size)
        .facets(args.facets.iter().cloned())
        .rescore_on_sold_out(args.rescore)
        .use_boosting_factor(args.boost)
        .no_facets(args.no_facets);

    if let Some(query) = &args.query {
        builder = builder.query(query.as_str());
    }
    if let Some(sort) = args.sort {
        builder = builder.sort_order(sort.into());
    }

    for filter in &args.filters {
        let (code, value) = split_pair(filter, '=')?;
        builder = builder.single_select(code, value);
    }
    for select in &args.selects {
        let (code, value) = split_pair(select, '=')?;
        builder = builder.multi_select(code, value);
    }
    for property in &args.properties {
        let (size, color) = split_pair(property, ':')?;
        builder = builder.property(optional(size), optional(color));
    }
    for specification in &args.specifications {
        let (resolution, memory) = split_pair(specification, ':')?;
        builder = builder.specification(optional(resolution), optional(memory));
    }

    Ok(builder.build())
}

/// Resolve a short analyzer name to the site's analyzer.
pub fn analyzer_name(config: &IndexConfig, analyzer: &str) -> String {
    let component = match analyzer.trim().to_ascii_lowercase().as_str() {
        "standard" => AnalysisComponent::StandardTextAnalyzer,
        "freetext" => AnalysisComponent::FreeTextAnalyzer,
        "autosuggestion" => AnalysisComponent::AutoSuggestionAnalyzer,
        "facet" => AnalysisComponent::FacetAnalyzer,
        _ => return analyzer.trim().to_string(),
    };
    config.analysis_name(component)
}

/// Run one command.
pub async fn run(dependencies: &Dependencies, command: &Command) -> Result<Value, AppError> {
    match command {
        Command::Setup => {
            let reports = dependencies.setup().await?;
            Ok(serde_json::to_value(reports)?)
        }
        Command::Search(args) => {
            let config = dependencies.settings.site(&args.site)?;
            let criteria = build_criteria(&config, args)?;
            let result = dependencies.query.search_products(&config, &criteria).await?;
            Ok(serde_json::to_value(result)?)
        }
        Command::Product { site, id } => {
            let config = dependencies.settings.site(site)?;
            match dependencies.query.get_product(&config, *id).await? {
                Some(product) => Ok(serde_json::to_value(product)?),
                None => {
                    info!(id = id, "Product not found");
                    Ok(Value::Null)
                }
            }
        }
        Command::Suggest { site, text } => {
            let config = dependencies.settings.site(site)?;
            let suggestions = dependencies.query.auto_suggestions(&config, text).await?;
            Ok(serde_json::to_value(suggestions)?)
        }
        Command::Similar { site, fields, id } => {
            let config = dependencies.settings.site(site)?;
            let fields: Vec<&str> = if fields.is_empty() {
                DEFAULT_SIMILAR_FIELDS.to_vec()
            } else {
                fields.iter().map(String::as_str).collect()
            };
            let similar = dependencies
                .query
                .find_similar_products(&config, &fields, *id)
                .await?;
            Ok(serde_json::to_value(similar)?)
        }
        Command::Analyze {
            site,
            analyzer,
            text,
        } => {
            let config = dependencies.settings.site(site)?;
            let analyzer = analyzer_name(&config, analyzer);
            let tokens = dependencies
                .lifecycle
                .analyze_text(config.alias, &analyzer, text)
                .await?;
            Ok(json!({ "analyzer": analyzer, "tokens": tokens }))
        }
    }
}

fn split_pair(raw: &str, separator: char) -> Result<(&str, &str), AppError> {
    raw.split_once(separator)
        .map(|(left, right)| (left.trim(), right.trim()))
        .ok_or_else(|| {
            AppError::invalid_argument(format!("expected `a{}b`, got `{}`", separator, raw))
        })
}

fn optional(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, Settings};

    async fn memory() -> Dependencies {
        let settings = Settings {
            sites: vec![IndexConfig::COM_WEBSITE],
            parent_relationship: true,
            ..Settings::default()
        };
        Dependencies::new(settings, Backend::Memory).await.unwrap()
    }

    fn search(args: SearchArgs) -> Command {
        Command::Search(SearchArgs {
            site: "com".to_string(),
            size: 10,
            ..args
        })
    }

    fn total(value: &Value) -> u64 {
        value["total_count"].as_u64().unwrap()
    }

    #[test]
    fn test_build_criteria() {
        let args = SearchArgs {
            query: Some("macbook".to_string()),
            size: 5,
            filters: vec!["searchfacettype_brand_level_2 = Apple".to_string()],
            selects: vec![
                "searchfacettype_color_level_2=Red".to_string(),
                "searchfacettype_color_level_2=Blue".to_string(),
            ],
            properties: vec![":Brown".to_string()],
            specifications: vec!["3200 x 1800:8 GB".to_string()],
            sort: Some(SortArg::Desc),
            ..SearchArgs::default()
        };

        let criteria = build_criteria(&IndexConfig::NL_WEBSITE, &args).unwrap();

        assert_eq!(criteria.indices(), &["nlwebsite".to_string()]);
        assert_eq!(criteria.query(), Some("macbook"));
        assert_eq!(criteria.size(), 5);
        assert_eq!(
            criteria.single_select_filters(),
            &[("searchfacettype_brand_level_2".to_string(), "Apple".to_string())]
        );
        assert_eq!(criteria.multi_select_filters()[0].1.len(), 2);
        assert_eq!(criteria.property_filters()[0].size, None);
        assert_eq!(criteria.property_filters()[0].color.as_deref(), Some("Brown"));
        assert_eq!(criteria.specifications()[0].memory.as_deref(), Some("8 GB"));
        assert_eq!(criteria.sort_order(), Some(SortOrder::Desc));
    }

    #[test]
    fn test_malformed_pair_is_rejected() {
        let args = SearchArgs {
            filters: vec!["soldout".to_string()],
            ..SearchArgs::default()
        };
        assert!(matches!(
            build_criteria(&IndexConfig::COM_WEBSITE, &args),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_analyzer_name() {
        let config = IndexConfig::NL_WEBSITE;
        assert_eq!(
            analyzer_name(&config, "autosuggestion"),
            "catalog_analyzer_autosuggestion_nl_NL"
        );
        assert_eq!(analyzer_name(&config, "keyword"), "keyword");
    }

    #[tokio::test]
    async fn test_search_scenarios() {
        let dependencies = memory().await;

        let everything = run(&dependencies, &search(SearchArgs::default())).await.unwrap();
        assert_eq!(total(&everything), 50);
        assert_eq!(everything["products"].as_array().unwrap().len(), 10);

        let macbooks = search(SearchArgs {
            filters: vec!["searchfacettype_product_type_level_3=Macbook".to_string()],
            facets: vec![
                "searchfacettype_product_type_level_2".to_string(),
                "searchfacettype_brand_level_2".to_string(),
                "searchfacettype_age_level_2".to_string(),
                "searchfacettype_color_level_2".to_string(),
                "product_price_range".to_string(),
            ],
            ..SearchArgs::default()
        });
        let result = run(&dependencies, &macbooks).await.unwrap();
        assert_eq!(total(&result), 10);
        assert_eq!(result["facets"].as_array().unwrap().len(), 5);

        let brown = search(SearchArgs {
            properties: vec!["21 inch:Brown".to_string()],
            ..SearchArgs::default()
        });
        assert_eq!(total(&run(&dependencies, &brown).await.unwrap()), 5);

        let specs = search(SearchArgs {
            specifications: vec![
                "3200 x 1800:8 GB".to_string(),
                "1920 x 1200:6 GB".to_string(),
            ],
            ..SearchArgs::default()
        });
        assert_eq!(total(&run(&dependencies, &specs).await.unwrap()), 10);
    }

    #[tokio::test]
    async fn test_lookup_commands() {
        let dependencies = memory().await;

        let product = run(
            &dependencies,
            &Command::Product {
                site: "com".to_string(),
                id: 12,
            },
        )
        .await
        .unwrap();
        assert_eq!(product["title"], "Title 12");

        let missing = run(
            &dependencies,
            &Command::Product {
                site: "com".to_string(),
                id: 500,
            },
        )
        .await
        .unwrap();
        assert!(missing.is_null());

        let suggestions = run(
            &dependencies,
            &Command::Suggest {
                site: "com".to_string(),
                text: "Keyword 2".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(suggestions.as_array().unwrap().len(), 11);

        let similar = run(
            &dependencies,
            &Command::Similar {
                site: "com".to_string(),
                fields: Vec::new(),
                id: 0,
            },
        )
        .await
        .unwrap();
        assert!(similar
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p["id"] != 0));

        let analyzed = run(
            &dependencies,
            &Command::Analyze {
                site: "com".to_string(),
                analyzer: "autosuggestion".to_string(),
                text: "Macbook Air".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(analyzed["tokens"], json!(["macbook air"]));
    }

    #[tokio::test]
    async fn test_unconfigured_site() {
        let dependencies = memory().await;

        let result = run(
            &dependencies,
            &Command::Suggest {
                site: "nl".to_string(),
                text: "Keyword".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
