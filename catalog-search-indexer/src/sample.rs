//! Sample catalog used by the CLI `setup` command and by tests.
//!
//! Fifty products in four blocks, four category trees, nine distinct product
//! properties and ten groups of five products.

use std::sync::Arc;

use chrono::{Duration, Utc};

use catalog_search_shared::{
    CategoryError, CategoryFacet, CategoryTree, Product, ProductGroup, ProductProperty,
    Specification,
};

pub const COMPUTER: &str = "Computer";
pub const LAPTOPS: &str = "Laptops";
pub const MACBOOK: &str = "Macbook";
pub const MACBOOK_PRO: &str = "Macbook Pro";
pub const MACBOOK_AIR: &str = "Macbook Air";
pub const CHROMEBOOK: &str = "Chromebook";
pub const NETBOOK: &str = "Netbook";

pub const BRANDS: &str = "Brands";
pub const APPLE: &str = "Apple";
pub const HP: &str = "HP";
pub const DELL: &str = "Dell";

pub const AGE: &str = "Age";
pub const AGE_0_12_YEARS: &str = "0-12 years";
pub const AGE_12_18_YEARS: &str = "12-18 years";
pub const AGE_18_PLUS_YEARS: &str = "18 + years";

pub const COLORS: &str = "Colors";
pub const RED: &str = "Red";
pub const GREEN: &str = "Green";
pub const BLUE: &str = "Blue";

pub const SIZE_12_INCH: &str = "12 inch";
pub const SIZE_13_INCH: &str = "13 inch";
pub const SIZE_15_INCH: &str = "15 inch";
pub const SIZE_17_INCH: &str = "17 inch";
pub const SIZE_21_INCH: &str = "21 inch";

pub const COLOR_BLACK: &str = "Black";
pub const COLOR_GREY: &str = "Grey";
pub const COLOR_YELLOW: &str = "Yellow";
pub const COLOR_PURPLE: &str = "Purple";
pub const COLOR_BROWN: &str = "Brown";

pub const RESOLUTION_1024_600: &str = "1024 x 600";
pub const RESOLUTION_1024_758: &str = "1024 x 758";
pub const RESOLUTION_1920_1080: &str = "1920 x 1080";
pub const RESOLUTION_1920_1200: &str = "1920 x 1200";
pub const RESOLUTION_3200_1800: &str = "3200 x 1800";

pub const MEMORY_6144_MB: &str = "6144 MB";
pub const MEMORY_2_GB: &str = "2 GB";
pub const MEMORY_4_GB: &str = "4 GB";
pub const MEMORY_6_GB: &str = "6 GB";
pub const MEMORY_8_GB: &str = "8 GB";

const PRODUCT_COUNT: i64 = 50;
const GROUP_COUNT: i64 = 10;
const GROUP_SIZE: usize = 5;

/// The generated catalog: its category tree and products arranged in groups.
#[derive(Debug, Clone)]
pub struct SampleCatalog {
    pub categories: Arc<CategoryTree>,
    pub properties: Vec<ProductProperty>,
    pub groups: Vec<ProductGroup>,
}

impl SampleCatalog {
    pub fn generate() -> Result<Self, CategoryError> {
        let categories = category_tree()?;
        let properties = product_properties();
        let products = products(&categories, &properties)?;

        let mut products = products.into_iter();
        let groups = (1..=GROUP_COUNT)
            .map(|id| ProductGroup {
                id,
                title: format!("groupTitle{}", id),
                description: Some(format!("groupDescription{}", id)),
                products: products.by_ref().take(GROUP_SIZE).collect(),
            })
            .collect();

        Ok(Self {
            categories: Arc::new(categories),
            properties,
            groups,
        })
    }

    /// Every product, in id order.
    pub fn products(&self) -> Vec<Product> {
        self.groups
            .iter()
            .flat_map(|group| group.products.iter().cloned())
            .collect()
    }

    /// The property with this size and colour, if generated.
    pub fn find_property(&self, size: &str, color: &str) -> Option<&ProductProperty> {
        find_property(&self.properties, size, color)
    }
}

fn category_tree() -> Result<CategoryTree, CategoryError> {
    let mut tree = CategoryTree::new();

    let computer = tree.add_root(COMPUTER, CategoryFacet::ProductType)?;
    let laptops = tree.add_child(computer, LAPTOPS)?;
    let macbook = tree.add_child(laptops, MACBOOK)?;
    tree.add_child(macbook, MACBOOK_PRO)?;
    tree.add_child(macbook, MACBOOK_AIR)?;
    tree.add_child(laptops, CHROMEBOOK)?;
    tree.add_child(laptops, NETBOOK)?;

    let brands = tree.add_root(BRANDS, CategoryFacet::Brand)?;
    for brand in [APPLE, HP, DELL] {
        tree.add_child(brands, brand)?;
    }

    let age = tree.add_root(AGE, CategoryFacet::Age)?;
    for range in [AGE_0_12_YEARS, AGE_12_18_YEARS, AGE_18_PLUS_YEARS] {
        tree.add_child(age, range)?;
    }

    let colors = tree.add_root(COLORS, CategoryFacet::Color)?;
    for color in [RED, GREEN, BLUE] {
        tree.add_child(colors, color)?;
    }

    Ok(tree)
}

/// Ten candidates, deduplicated by (size, colour) keeping the first id.
fn product_properties() -> Vec<ProductProperty> {
    let sizes = [SIZE_12_INCH, SIZE_13_INCH, SIZE_15_INCH, SIZE_17_INCH, SIZE_21_INCH];
    let colors = [COLOR_BLACK, COLOR_GREY, COLOR_YELLOW, COLOR_PURPLE, COLOR_BROWN];

    let mut properties: Vec<ProductProperty> = Vec::new();
    for i in 0..10usize {
        let (size, color) = if i < 5 {
            (sizes[i], colors[i])
        } else {
            (sizes[i - 5], colors[9 - i])
        };
        if find_property(&properties, size, color).is_none() {
            properties.push(ProductProperty {
                id: i as i64,
                size: Some(size.to_string()),
                color: Some(color.to_string()),
            });
        }
    }
    properties
}

fn find_property<'a>(
    properties: &'a [ProductProperty],
    size: &str,
    color: &str,
) -> Option<&'a ProductProperty> {
    properties
        .iter()
        .find(|p| p.size.as_deref() == Some(size) && p.color.as_deref() == Some(color))
}

fn products(
    tree: &CategoryTree,
    properties: &[ProductProperty],
) -> Result<Vec<Product>, CategoryError> {
    let property = |size: &str, color: &str| find_property(properties, size, color).cloned();

    let now = Utc::now();
    let mut products = Vec::with_capacity(PRODUCT_COUNT as usize);

    for i in 0..PRODUCT_COUNT {
        let mut product = Product::new(i, format!("Title {}", i), i as f64);
        product.description = Some(format!("Description{}", i));
        product.available_date = Some(now + Duration::days(i));
        product.keywords = vec![format!("Keyword {}", i)];
        product.sold_out = i % 2 == 0;
        product.boost_factor = i as f64 / 10000.0;

        let (names, props, specs): (Vec<&str>, Vec<(&str, &str)>, [(&str, &str); 2]) = match i {
            0..=4 => (
                vec![MACBOOK_AIR, APPLE, RED, AGE_18_PLUS_YEARS],
                vec![(SIZE_21_INCH, COLOR_BROWN), (SIZE_17_INCH, COLOR_PURPLE)],
                [
                    (RESOLUTION_3200_1800, MEMORY_8_GB),
                    (RESOLUTION_1920_1200, MEMORY_6_GB),
                ],
            ),
            5..=9 => (
                vec![MACBOOK_PRO, APPLE, BLUE],
                vec![(SIZE_15_INCH, COLOR_YELLOW), (SIZE_17_INCH, COLOR_PURPLE)],
                [
                    (RESOLUTION_1920_1080, MEMORY_6_GB),
                    (RESOLUTION_1920_1200, MEMORY_6_GB),
                ],
            ),
            10..=19 => (
                vec![HP, AGE_12_18_YEARS],
                vec![(SIZE_12_INCH, COLOR_BLACK)],
                [
                    (RESOLUTION_1920_1080, MEMORY_4_GB),
                    (RESOLUTION_1920_1080, MEMORY_2_GB),
                ],
            ),
            _ => (
                vec![DELL, GREEN, AGE_0_12_YEARS],
                vec![(SIZE_13_INCH, COLOR_GREY)],
                [
                    (RESOLUTION_1024_758, MEMORY_2_GB),
                    (RESOLUTION_1024_600, MEMORY_6144_MB),
                ],
            ),
        };

        product.categories = names
            .into_iter()
            .map(|name| tree.require(name))
            .collect::<Result<_, _>>()?;
        product.properties = props
            .into_iter()
            .filter_map(|(size, color)| property(size, color))
            .collect();
        product.specifications = specs
            .into_iter()
            .map(|(resolution, memory)| Specification::new(resolution, memory))
            .collect();

        products.push(product);
    }

    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sample_catalog() {
        let catalog = SampleCatalog::generate().unwrap();

        assert_eq!(catalog.categories.len(), 19);
        assert_eq!(catalog.properties.len(), 9);
        assert_eq!(catalog.groups.len(), 10);
        assert!(catalog.groups.iter().all(|g| g.products.len() == 5));

        let products = catalog.products();
        assert_eq!(products.len(), 50);
        assert_eq!(products[0].id, 0);
        assert_eq!(products[49].id, 49);
        assert_eq!(catalog.groups[1].products[0].id, 5);
    }

    #[test]
    fn test_sample_product_blocks() {
        let catalog = SampleCatalog::generate().unwrap();
        let products = catalog.products();
        let tree = &catalog.categories;

        let air = &products[2];
        assert_eq!(air.title, "Title 2");
        assert!(air.sold_out);
        assert_eq!(air.categories.len(), 4);
        assert_eq!(tree.get(air.categories[0]).unwrap().name, MACBOOK_AIR);
        assert_eq!(air.properties.len(), 2);
        assert_eq!(air.specifications[0], Specification::new(RESOLUTION_3200_1800, MEMORY_8_GB));

        let hp = &products[12];
        assert_eq!(tree.get(hp.categories[0]).unwrap().name, HP);
        assert_eq!(hp.properties[0].size.as_deref(), Some(SIZE_12_INCH));

        let dell = &products[31];
        assert!(!dell.sold_out);
        assert_eq!(dell.price, 31.0);
        assert!((dell.boost_factor - 0.0031).abs() < 1e-12);
    }

    #[test]
    fn test_property_ids_are_stable() {
        let catalog = SampleCatalog::generate().unwrap();
        let brown = catalog.find_property(SIZE_21_INCH, COLOR_BROWN).unwrap();
        assert_eq!(brown.id, 4);
        assert_eq!(brown.document_id(0), "040000");
        assert!(catalog.find_property(SIZE_21_INCH, COLOR_GREY).is_none());
    }
}
