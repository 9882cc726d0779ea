//! Category hierarchy and its flattening into per-level facet values.
//!
//! Categories live in an arena owned by [`CategoryTree`]; nodes refer to their
//! parent by [`CategoryId`]. Names are unique across the tree and act as the
//! category identity for lookups.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{CategoryFacet, MAX_CATEGORY_DEPTH};

/// Handle to a category inside a [`CategoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(usize);

/// A single category node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub facet: CategoryFacet,
    pub parent: Option<CategoryId>,
}

/// Errors raised while building or flattening the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("Unknown category: {0:?}")]
    UnknownCategory(CategoryId),

    #[error("Unknown category name: {0}")]
    UnknownName(String),

    #[error("Duplicate category name: {0}")]
    DuplicateName(String),

    #[error("Category '{name}' is at depth {depth}, deeper than the supported {max}")]
    TooDeep {
        name: String,
        depth: usize,
        max: usize,
    },
}

/// One facet value produced by flattening: the ancestor at `level` of an
/// assigned category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenedCategory {
    pub facet: CategoryFacet,
    pub level: usize,
    pub name: String,
}

impl FlattenedCategory {
    /// Facet field name, e.g. `searchfacettype_product_type_level_3`.
    pub fn field(&self) -> String {
        self.facet.field(self.level)
    }

    /// Lower-cased value stored for filtering.
    pub fn filter_value(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Arena of categories with a name index built as nodes are added.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: Vec<Category>,
    by_name: HashMap<String, CategoryId>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level category for a facet family.
    pub fn add_root(
        &mut self,
        name: impl Into<String>,
        facet: CategoryFacet,
    ) -> Result<CategoryId, CategoryError> {
        self.insert(name.into(), facet, None)
    }

    /// Add a child category; it inherits the parent's facet family.
    pub fn add_child(
        &mut self,
        parent: CategoryId,
        name: impl Into<String>,
    ) -> Result<CategoryId, CategoryError> {
        let facet = self.node(parent)?.facet;
        self.insert(name.into(), facet, Some(parent))
    }

    fn insert(
        &mut self,
        name: String,
        facet: CategoryFacet,
        parent: Option<CategoryId>,
    ) -> Result<CategoryId, CategoryError> {
        if self.by_name.contains_key(&name) {
            return Err(CategoryError::DuplicateName(name));
        }

        let id = CategoryId(self.nodes.len());
        self.by_name.insert(name.clone(), id);
        self.nodes.push(Category {
            id,
            name,
            facet,
            parent,
        });
        Ok(id)
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(id.0)
    }

    /// Find a category by its exact name.
    pub fn find(&self, name: &str) -> Option<CategoryId> {
        self.by_name.get(name).copied()
    }

    /// Like [`CategoryTree::find`], failing when the name is unknown.
    pub fn require(&self, name: &str) -> Result<CategoryId, CategoryError> {
        self.find(name)
            .ok_or_else(|| CategoryError::UnknownName(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: CategoryId) -> Result<&Category, CategoryError> {
        self.get(id).ok_or(CategoryError::UnknownCategory(id))
    }

    /// Ids from the root down to `id`, inclusive.
    fn path_to(&self, id: CategoryId) -> Result<Vec<CategoryId>, CategoryError> {
        let mut path = vec![id];
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            path.push(parent);
            current = self.node(parent)?;
        }
        path.reverse();
        Ok(path)
    }

    /// Depth of a category; roots are at depth 1.
    pub fn depth_of(&self, id: CategoryId) -> Result<usize, CategoryError> {
        Ok(self.path_to(id)?.len())
    }

    /// The ancestor of `id` at `level` (1 = root), or `None` when `level`
    /// is below the category itself.
    pub fn ancestor_at_level(
        &self,
        id: CategoryId,
        level: usize,
    ) -> Result<Option<CategoryId>, CategoryError> {
        if level == 0 {
            return Ok(None);
        }
        Ok(self.path_to(id)?.get(level - 1).copied())
    }

    /// Union of every assigned category's ancestors, keyed by level.
    ///
    /// A product assigned to `Macbook Pro` (depth 4) contributes the
    /// categories at levels 1 through 4 of that path. Duplicates collapse.
    pub fn level_map(
        &self,
        assigned: &[CategoryId],
    ) -> Result<BTreeMap<usize, BTreeSet<CategoryId>>, CategoryError> {
        let mut levels: BTreeMap<usize, BTreeSet<CategoryId>> = BTreeMap::new();

        for &id in assigned {
            let path = self.path_to(id)?;
            if path.len() > MAX_CATEGORY_DEPTH {
                return Err(CategoryError::TooDeep {
                    name: self.node(id)?.name.clone(),
                    depth: path.len(),
                    max: MAX_CATEGORY_DEPTH,
                });
            }
            for (index, ancestor) in path.into_iter().enumerate() {
                levels.entry(index + 1).or_default().insert(ancestor);
            }
        }

        Ok(levels)
    }

    /// Flatten assigned categories into facet values ordered by level.
    pub fn flatten(
        &self,
        assigned: &[CategoryId],
    ) -> Result<Vec<FlattenedCategory>, CategoryError> {
        let levels = self.level_map(assigned)?;
        let mut flattened = Vec::new();

        for (level, ids) in levels {
            for id in ids {
                let category = self.node(id)?;
                flattened.push(FlattenedCategory {
                    facet: category.facet,
                    level,
                    name: category.name.clone(),
                });
            }
        }

        Ok(flattened)
    }
}
