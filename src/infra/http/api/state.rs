use std::sync::Arc;

use crate::application::ingredients::IngredientCatalogService;
use crate::application::recipes::RecipeCatalogService;
use crate::application::repos::HealthRepo;
use crate::hub::Hub;

#[derive(Clone)]
pub struct ApiState {
    pub ingredients: Arc<IngredientCatalogService>,
    pub recipes: Arc<RecipeCatalogService>,
    pub hub: Hub,
    pub health: Arc<dyn HealthRepo>,
}
