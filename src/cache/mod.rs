//! Recipebox aggregate caches
//!
//! Composite listings are expensive to build: the recipe listing touches the
//! ingredient store once per reference. Both listings are memoized here and
//! invalidated by the write paths.
//!
//! - **`allIngredients`**: the flat ingredient listing
//! - **`allRecipes`**: every recipe with its ingredients expanded

mod aggregate;

pub use aggregate::{AggregateCache, Generation};

use crate::domain::entities::{ExpandedRecipe, Ingredient};

pub const ALL_INGREDIENTS_KEY: &str = "allIngredients";
pub const ALL_RECIPES_KEY: &str = "allRecipes";

pub(crate) const METRIC_CACHE_HIT: &str = "recipebox_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "recipebox_cache_miss_total";
pub(crate) const METRIC_CACHE_INVALIDATE: &str = "recipebox_cache_invalidate_total";

/// The two aggregate caches owned by the catalog services.
#[derive(Debug)]
pub struct CatalogCaches {
    pub ingredients: AggregateCache<Vec<Ingredient>>,
    pub recipes: AggregateCache<Vec<ExpandedRecipe>>,
}

impl CatalogCaches {
    pub fn new() -> Self {
        Self {
            ingredients: AggregateCache::new("ingredients"),
            recipes: AggregateCache::new("recipes"),
        }
    }

    pub fn invalidate_ingredients(&self) {
        self.ingredients.invalidate(ALL_INGREDIENTS_KEY);
    }

    pub fn invalidate_recipes(&self) {
        self.recipes.invalidate(ALL_RECIPES_KEY);
    }
}

impl Default for CatalogCaches {
    fn default() -> Self {
        Self::new()
    }
}
