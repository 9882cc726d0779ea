//! Index naming, facet codes and document field names.
//!
//! Every name the index schema, the indexer and the query side agree on lives
//! here so the three never drift apart.

use serde::Serialize;

/// Deepest category level that is flattened into facet fields.
pub const MAX_CATEGORY_DEPTH: usize = 4;

/// Prefix shared by every category facet code.
pub const CATEGORY_FACET_PREFIX: &str = "searchfacettype_";

/// Separator between a category facet code and its level number.
pub const LEVEL_SEPARATOR: &str = "_level_";

pub const PRICE_RANGE_FACET: &str = "product_price_range";
pub const PROPERTY_SIZE_FACET: &str = "product_property_size";
pub const PROPERTY_COLOR_FACET: &str = "product_property_color";
pub const SPECIFICATION_RESOLUTION_FACET: &str = "specification_resolution";
pub const SPECIFICATION_MEMORY_FACET: &str = "specification_memory";
pub const AUTO_SUGGESTION: &str = "auto_suggestion";

/// Field names used in stored documents.
pub mod fields {
    pub const DOC_TYPE: &str = "doc_type";
    pub const RELATION: &str = "relation";

    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const PRICE: &str = "price";
    pub const SOLD_OUT: &str = "soldout";
    pub const AVAILABLE_DATE: &str = "availabledate";
    pub const BOOST_FACTOR: &str = "boostfactor";
    pub const KEYWORDS: &str = "keywords";
    pub const CATEGORIES: &str = "categories";
    pub const SPECIFICATIONS: &str = "specifications";
    pub const RESOLUTION: &str = "resolution";
    pub const MEMORY: &str = "memory";

    pub const GROUP_TITLE: &str = "titlepg";
    pub const GROUP_DESCRIPTION: &str = "descriptionpg";

    pub const PROPERTY_SIZE: &str = "size";
    pub const PROPERTY_COLOR: &str = "color";

    /// Stored, original-case category value used for aggregation.
    pub const FACET: &str = "facet";
    /// Lower-cased category value used for filtering.
    pub const FACET_FILTER: &str = "facetfilter";
    /// Analyzed category value used for suggestions and free text.
    pub const SUGGEST: &str = "suggest";

    /// `categories.<facet_field>.<variant>`
    pub fn category_path(facet_field: &str, variant: &str) -> String {
        format!("{}.{}.{}", CATEGORIES, facet_field, variant)
    }

    /// `specifications.<field>`
    pub fn specification_path(field: &str) -> String {
        format!("{}.{}", SPECIFICATIONS, field)
    }
}

/// Languages an index can be analyzed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SupportedLocale {
    English,
    Dutch,
}

impl SupportedLocale {
    /// Tag appended to analysis component names.
    pub fn tag(&self) -> &'static str {
        match self {
            SupportedLocale::English => "en_EN",
            SupportedLocale::Dutch => "nl_NL",
        }
    }

    /// Snowball stemmer language.
    pub fn stemmer_language(&self) -> &'static str {
        match self {
            SupportedLocale::English => "English",
            SupportedLocale::Dutch => "Dutch",
        }
    }

    /// Built-in stop word list name.
    pub fn stopwords(&self) -> &'static str {
        match self {
            SupportedLocale::English => "_english_",
            SupportedLocale::Dutch => "_dutch_",
        }
    }
}

/// Analysis filters and analyzers declared in every index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisComponent {
    StopwordsFilter,
    SnowballFilter,
    WordDelimiterFilter,
    SynonymsFilter,
    ShingleFilter,
    EdgeNGramFilter,
    StandardTextAnalyzer,
    FreeTextAnalyzer,
    AutoSuggestionAnalyzer,
    FacetAnalyzer,
}

impl AnalysisComponent {
    fn prefix(&self) -> &'static str {
        match self {
            AnalysisComponent::StopwordsFilter => "catalog_filter_stopwords",
            AnalysisComponent::SnowballFilter => "catalog_filter_snowball",
            AnalysisComponent::WordDelimiterFilter => "catalog_filter_worddelimiter",
            AnalysisComponent::SynonymsFilter => "catalog_filter_synonyms",
            AnalysisComponent::ShingleFilter => "catalog_filter_shingle",
            AnalysisComponent::EdgeNGramFilter => "catalog_filter_edgengram",
            AnalysisComponent::StandardTextAnalyzer => "catalog_analyzer_standard_freetext",
            AnalysisComponent::FreeTextAnalyzer => "catalog_analyzer_custom_freetext",
            AnalysisComponent::AutoSuggestionAnalyzer => "catalog_analyzer_autosuggestion",
            AnalysisComponent::FacetAnalyzer => "catalog_analyzer_custom_facet",
        }
    }
}

/// A searchable site: its alias, document type names and locale.
///
/// The alias doubles as the prefix of every physical index generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexConfig {
    pub site: &'static str,
    pub alias: &'static str,
    pub document_type: &'static str,
    pub group_document_type: &'static str,
    pub property_document_type: &'static str,
    pub locale: SupportedLocale,
}

impl IndexConfig {
    pub const COM_WEBSITE: IndexConfig = IndexConfig {
        site: "com",
        alias: "comwebsite",
        document_type: "product",
        group_document_type: "productgroup",
        property_document_type: "productproperty",
        locale: SupportedLocale::English,
    };

    pub const NL_WEBSITE: IndexConfig = IndexConfig {
        site: "nl",
        alias: "nlwebsite",
        document_type: "product",
        group_document_type: "productgroup",
        property_document_type: "productproperty",
        locale: SupportedLocale::Dutch,
    };

    /// All configured sites.
    pub const ALL: [IndexConfig; 2] = [IndexConfig::COM_WEBSITE, IndexConfig::NL_WEBSITE];

    /// Look up a site by its short name (`com`, `nl`).
    pub fn for_site(site: &str) -> Option<IndexConfig> {
        Self::ALL
            .iter()
            .copied()
            .find(|config| config.site.eq_ignore_ascii_case(site.trim()))
    }

    /// Name of an analysis component for this site's locale.
    pub fn analysis_name(&self, component: AnalysisComponent) -> String {
        format!("{}_{}", component.prefix(), self.locale.tag())
    }
}

/// Category facet families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CategoryFacet {
    ProductType,
    Brand,
    Age,
    Color,
}

impl CategoryFacet {
    pub const ALL: [CategoryFacet; 4] = [
        CategoryFacet::ProductType,
        CategoryFacet::Brand,
        CategoryFacet::Age,
        CategoryFacet::Color,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            CategoryFacet::ProductType => "searchfacettype_product_type",
            CategoryFacet::Brand => "searchfacettype_brand",
            CategoryFacet::Age => "searchfacettype_age",
            CategoryFacet::Color => "searchfacettype_color",
        }
    }

    pub fn from_code(code: &str) -> Option<CategoryFacet> {
        Self::ALL.iter().copied().find(|facet| facet.code() == code)
    }

    /// Facet field for a level, e.g. `searchfacettype_brand_level_2`.
    pub fn field(&self, level: usize) -> String {
        format!("{}{}{}", self.code(), LEVEL_SEPARATOR, level)
    }
}

/// Every `<facet>_level_<n>` field, facet-major.
pub fn category_facet_fields() -> Vec<String> {
    CategoryFacet::ALL
        .iter()
        .flat_map(|facet| (1..=MAX_CATEGORY_DEPTH).map(move |level| facet.field(level)))
        .collect()
}

/// What a facet or filter code refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetKind {
    Category { facet: CategoryFacet, level: usize },
    PriceRange,
    PropertySize,
    PropertyColor,
    SpecificationResolution,
    SpecificationMemory,
    /// Any other code is treated as a plain document field.
    Field(String),
}

impl FacetKind {
    pub fn parse(code: &str) -> FacetKind {
        match code {
            PRICE_RANGE_FACET => return FacetKind::PriceRange,
            PROPERTY_SIZE_FACET => return FacetKind::PropertySize,
            PROPERTY_COLOR_FACET => return FacetKind::PropertyColor,
            SPECIFICATION_RESOLUTION_FACET => return FacetKind::SpecificationResolution,
            SPECIFICATION_MEMORY_FACET => return FacetKind::SpecificationMemory,
            _ => {}
        }

        if code.starts_with(CATEGORY_FACET_PREFIX) {
            if let Some((facet_code, level)) = code.rsplit_once(LEVEL_SEPARATOR) {
                let facet = CategoryFacet::from_code(facet_code);
                let level = level.parse::<usize>().ok();
                if let (Some(facet), Some(level)) = (facet, level) {
                    if (1..=MAX_CATEGORY_DEPTH).contains(&level) {
                        return FacetKind::Category { facet, level };
                    }
                }
            }
        }

        FacetKind::Field(code.to_string())
    }
}
