use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::{counter, histogram};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::application::error::CatalogError;
use crate::application::repos::{IngredientsRepo, NewRecipe, RecipesRepo, RecipesWriteRepo};
use crate::cache::{ALL_RECIPES_KEY, CatalogCaches};
use crate::config::AggregationSettings;
use crate::domain::catalog::{normalize_name, parse_references};
use crate::domain::entities::{ExpandedRecipe, RecipeRecord};
use crate::domain::error::DomainError;
use crate::domain::object_id::ObjectId;

const ENTITY: &str = "recipe";
const METRIC_EXPANSION_MS: &str = "recipebox_recipe_expansion_ms";
const METRIC_EXPANSION_FAILED: &str = "recipebox_recipe_expansion_failed_total";

/// Limits applied to a single recipe expansion pass.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionSettings {
    pub deadline: Duration,
    /// Abort sibling tasks as soon as one recipe fails instead of letting them finish.
    pub cancel_on_failure: bool,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(10),
            cancel_on_failure: false,
        }
    }
}

impl From<&AggregationSettings> for ExpansionSettings {
    fn from(settings: &AggregationSettings) -> Self {
        Self {
            deadline: settings.deadline,
            cancel_on_failure: settings.cancel_on_failure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateRecipeCommand {
    pub name: String,
    pub ingredient_ids: Vec<String>,
}

#[derive(Clone)]
pub struct RecipeCatalogService {
    reader: Arc<dyn RecipesRepo>,
    writer: Arc<dyn RecipesWriteRepo>,
    ingredients: Arc<dyn IngredientsRepo>,
    caches: Arc<CatalogCaches>,
    expansion: ExpansionSettings,
}

impl RecipeCatalogService {
    pub fn new(
        reader: Arc<dyn RecipesRepo>,
        writer: Arc<dyn RecipesWriteRepo>,
        ingredients: Arc<dyn IngredientsRepo>,
        caches: Arc<CatalogCaches>,
        expansion: ExpansionSettings,
    ) -> Self {
        Self {
            reader,
            writer,
            ingredients,
            caches,
            expansion,
        }
    }

    /// Every recipe with its ingredient references resolved, in store order.
    ///
    /// Recipes are expanded concurrently, one task each; references inside a
    /// recipe are resolved one after another so the embedded ingredients keep
    /// reference order. The first failure is returned and nothing is cached.
    /// A successful result is cached under `allRecipes` unless a write
    /// invalidated that key while the expansion was running.
    pub async fn expanded_recipes(&self) -> Result<Arc<Vec<ExpandedRecipe>>, CatalogError> {
        if let Some(cached) = self.caches.recipes.load(ALL_RECIPES_KEY) {
            return Ok(cached);
        }

        let generation = self.caches.recipes.generation(ALL_RECIPES_KEY);
        let started = Instant::now();
        let expanded = match tokio::time::timeout(self.expansion.deadline, self.expand_all()).await
        {
            Ok(Ok(expanded)) => expanded,
            Ok(Err(err)) => {
                counter!(METRIC_EXPANSION_FAILED).increment(1);
                return Err(err);
            }
            Err(_) => {
                counter!(METRIC_EXPANSION_FAILED).increment(1);
                warn!(
                    target = "recipebox::application::recipes",
                    deadline_ms = self.expansion.deadline.as_millis() as u64,
                    "recipe expansion exceeded its deadline"
                );
                return Err(CatalogError::DeadlineExceeded(self.expansion.deadline));
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        histogram!(METRIC_EXPANSION_MS).record(elapsed_ms as f64);

        let expanded = Arc::new(expanded);
        let stored =
            self.caches
                .recipes
                .store_if_current(ALL_RECIPES_KEY, generation, Arc::clone(&expanded));
        info!(
            target = "recipebox::application::recipes",
            recipes = expanded.len(),
            elapsed_ms,
            cached = stored,
            "recipe listing expanded"
        );
        Ok(expanded)
    }

    async fn expand_all(&self) -> Result<Vec<ExpandedRecipe>, CatalogError> {
        let recipes = self.reader.list_recipes().await?;
        let mut slots: Vec<Option<ExpandedRecipe>> = Vec::with_capacity(recipes.len());
        slots.resize_with(recipes.len(), || None);

        // Dropping the set (deadline expiry) aborts whatever is still running.
        let mut tasks = JoinSet::new();
        for (index, recipe) in recipes.into_iter().enumerate() {
            let ingredients = Arc::clone(&self.ingredients);
            tasks.spawn(async move { (index, expand_recipe(ingredients.as_ref(), recipe).await) });
        }

        let mut first_failure: Option<CatalogError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(expanded))) => slots[index] = Some(expanded),
                Ok((_, Err(err))) => {
                    if first_failure.is_none() {
                        if self.expansion.cancel_on_failure {
                            tasks.abort_all();
                        }
                        first_failure = Some(err);
                    } else {
                        debug!(
                            target = "recipebox::application::recipes",
                            error = %err,
                            "discarding additional expansion failure"
                        );
                    }
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    if first_failure.is_none() {
                        first_failure = Some(CatalogError::Task(join_err.to_string()));
                    }
                }
            }
        }

        if let Some(err) = first_failure {
            warn!(
                target = "recipebox::application::recipes",
                error = %err,
                "recipe expansion failed"
            );
            return Err(err);
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| CatalogError::Task("recipe expansion produced no result".into()))
            })
            .collect()
    }

    pub async fn create_recipes(
        &self,
        commands: Vec<CreateRecipeCommand>,
    ) -> Result<Vec<ObjectId>, CatalogError> {
        if commands.is_empty() {
            return Err(DomainError::validation("at least one recipe is required").into());
        }

        let mut batch = Vec::with_capacity(commands.len());
        for command in commands {
            let name = normalize_name(&command.name, "name")?;
            let ingredient_ids = parse_references(&command.ingredient_ids).map_err(
                |(position, reason)| CatalogError::InvalidReference {
                    recipe: name.clone(),
                    position,
                    reason,
                },
            )?;
            batch.push(NewRecipe {
                name,
                ingredient_ids,
            });
        }

        let ids = self.writer.insert_recipes(batch).await?;
        self.caches.invalidate_recipes();
        info!(
            target = "recipebox::application::recipes",
            count = ids.len(),
            "recipes inserted"
        );
        Ok(ids)
    }

    pub async fn get_recipe(&self, raw_id: &str) -> Result<RecipeRecord, CatalogError> {
        let id = ObjectId::parse_hex(raw_id.trim())?;
        self.reader
            .find_recipe(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(ENTITY))
    }

    pub async fn delete_recipe(&self, raw_id: &str) -> Result<(), CatalogError> {
        let id = ObjectId::parse_hex(raw_id.trim())?;
        let deleted = self.writer.delete_recipe(id).await?;
        if deleted == 0 {
            return Err(CatalogError::not_found(ENTITY));
        }
        self.caches.invalidate_recipes();
        info!(
            target = "recipebox::application::recipes",
            recipe_id = %id,
            "recipe deleted"
        );
        Ok(())
    }
}

async fn expand_recipe(
    ingredients: &dyn IngredientsRepo,
    recipe: RecipeRecord,
) -> Result<ExpandedRecipe, CatalogError> {
    let mut resolved = Vec::with_capacity(recipe.ingredient_ids.len());
    for ingredient_id in &recipe.ingredient_ids {
        match ingredients.find_ingredient(*ingredient_id).await? {
            Some(ingredient) => resolved.push(ingredient),
            None => {
                return Err(CatalogError::DanglingReference {
                    recipe: recipe.id,
                    ingredient: *ingredient_id,
                });
            }
        }
    }

    Ok(ExpandedRecipe {
        id: recipe.id,
        name: recipe.name,
        ingredients: resolved,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::application::repos::RepoError;
    use crate::domain::entities::Ingredient;

    #[derive(Default)]
    struct MemoryCatalog {
        ingredients: Mutex<HashMap<ObjectId, Ingredient>>,
        recipes: Mutex<Vec<RecipeRecord>>,
        delays: HashMap<ObjectId, Duration>,
        list_calls: AtomicUsize,
        completed_lookups: AtomicUsize,
    }

    impl MemoryCatalog {
        async fn add_ingredient(&self, name: &str) -> ObjectId {
            let id = ObjectId::generate();
            self.ingredients.lock().await.insert(
                id,
                Ingredient {
                    id,
                    name: name.to_string(),
                    calories_per_gram: 1,
                },
            );
            id
        }

        async fn add_recipe(&self, name: &str, ingredient_ids: Vec<ObjectId>) -> ObjectId {
            let id = ObjectId::generate();
            self.recipes.lock().await.push(RecipeRecord {
                id,
                name: name.to_string(),
                ingredient_ids,
            });
            id
        }
    }

    #[async_trait]
    impl IngredientsRepo for MemoryCatalog {
        async fn list_ingredients(&self) -> Result<Vec<Ingredient>, RepoError> {
            Ok(self.ingredients.lock().await.values().cloned().collect())
        }

        async fn find_ingredient(&self, id: ObjectId) -> Result<Option<Ingredient>, RepoError> {
            if let Some(delay) = self.delays.get(&id) {
                tokio::time::sleep(*delay).await;
            }
            let found = self.ingredients.lock().await.get(&id).cloned();
            self.completed_lookups.fetch_add(1, Ordering::SeqCst);
            Ok(found)
        }
    }

    #[async_trait]
    impl RecipesRepo for MemoryCatalog {
        async fn list_recipes(&self) -> Result<Vec<RecipeRecord>, RepoError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.recipes.lock().await.clone())
        }

        async fn find_recipe(&self, id: ObjectId) -> Result<Option<RecipeRecord>, RepoError> {
            Ok(self
                .recipes
                .lock()
                .await
                .iter()
                .find(|recipe| recipe.id == id)
                .cloned())
        }
    }

    #[async_trait]
    impl RecipesWriteRepo for MemoryCatalog {
        async fn insert_recipes(
            &self,
            recipes: Vec<NewRecipe>,
        ) -> Result<Vec<ObjectId>, RepoError> {
            let mut rows = self.recipes.lock().await;
            let mut ids = Vec::new();
            for recipe in recipes {
                let id = ObjectId::generate();
                rows.push(RecipeRecord {
                    id,
                    name: recipe.name,
                    ingredient_ids: recipe.ingredient_ids,
                });
                ids.push(id);
            }
            Ok(ids)
        }

        async fn delete_recipe(&self, id: ObjectId) -> Result<u64, RepoError> {
            let mut rows = self.recipes.lock().await;
            let before = rows.len();
            rows.retain(|recipe| recipe.id != id);
            Ok((before - rows.len()) as u64)
        }
    }

    fn service_with(
        catalog: Arc<MemoryCatalog>,
        expansion: ExpansionSettings,
    ) -> (RecipeCatalogService, Arc<CatalogCaches>) {
        let caches = Arc::new(CatalogCaches::new());
        let service = RecipeCatalogService::new(
            catalog.clone(),
            catalog.clone(),
            catalog,
            Arc::clone(&caches),
            expansion,
        );
        (service, caches)
    }

    fn service(catalog: Arc<MemoryCatalog>) -> (RecipeCatalogService, Arc<CatalogCaches>) {
        service_with(catalog, ExpansionSettings::default())
    }

    #[tokio::test]
    async fn expansion_preserves_recipe_and_reference_order() {
        let slow = ObjectId::generate();
        let mut catalog = MemoryCatalog::default();
        catalog.delays.insert(slow, Duration::from_millis(80));
        let catalog = Arc::new(catalog);

        catalog.ingredients.lock().await.insert(
            slow,
            Ingredient {
                id: slow,
                name: "saffron".into(),
                calories_per_gram: 3,
            },
        );
        let rice = catalog.add_ingredient("rice").await;
        let stock = catalog.add_ingredient("stock").await;
        catalog.add_recipe("paella", vec![slow, rice]).await;
        catalog.add_recipe("risotto", vec![stock, rice]).await;
        catalog.add_recipe("plain rice", vec![rice]).await;

        let (service, _) = service(catalog);
        let expanded = service.expanded_recipes().await.expect("expanded");

        let names: Vec<_> = expanded.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["paella", "risotto", "plain rice"]);
        let paella: Vec<_> = expanded[0]
            .ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(paella, ["saffron", "rice"]);
    }

    #[tokio::test]
    async fn empty_store_expands_to_empty_listing() {
        let (service, caches) = service(Arc::new(MemoryCatalog::default()));
        let expanded = service.expanded_recipes().await.expect("expanded");

        assert!(expanded.is_empty());
        assert!(caches.recipes.load(ALL_RECIPES_KEY).is_some());
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let catalog = Arc::new(MemoryCatalog::default());
        let flour = catalog.add_ingredient("flour").await;
        catalog.add_recipe("bread", vec![flour]).await;
        let (service, _) = service(catalog.clone());

        let first = service.expanded_recipes().await.expect("first");
        let second = service.expanded_recipes().await.expect("second");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dangling_reference_fails_and_caches_nothing() {
        let catalog = Arc::new(MemoryCatalog::default());
        let flour = catalog.add_ingredient("flour").await;
        let ghost = ObjectId::generate();
        catalog.add_recipe("bread", vec![flour]).await;
        let broken = catalog.add_recipe("cake", vec![flour, ghost]).await;
        let (service, caches) = service(catalog.clone());

        let err = service.expanded_recipes().await.unwrap_err();
        match err {
            CatalogError::DanglingReference { recipe, ingredient } => {
                assert_eq!(recipe, broken);
                assert_eq!(ingredient, ghost);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(caches.recipes.load(ALL_RECIPES_KEY).is_none());

        catalog.ingredients.lock().await.insert(
            ghost,
            Ingredient {
                id: ghost,
                name: "sugar".into(),
                calories_per_gram: 4,
            },
        );
        let expanded = service.expanded_recipes().await.expect("retry succeeds");
        assert_eq!(expanded.len(), 2);
        assert_eq!(catalog.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn siblings_run_to_completion_by_default() {
        let slow = ObjectId::generate();
        let mut catalog = MemoryCatalog::default();
        catalog.delays.insert(slow, Duration::from_millis(50));
        let catalog = Arc::new(catalog);
        catalog.add_recipe("slow", vec![slow]).await;
        catalog.add_recipe("broken", vec![ObjectId::generate()]).await;
        let (service, _) = service(catalog.clone());

        service.expanded_recipes().await.unwrap_err();

        assert_eq!(catalog.completed_lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn siblings_are_aborted_when_cancellation_is_enabled() {
        let slow = ObjectId::generate();
        let mut catalog = MemoryCatalog::default();
        catalog.delays.insert(slow, Duration::from_millis(200));
        let catalog = Arc::new(catalog);
        catalog.add_recipe("slow", vec![slow]).await;
        catalog.add_recipe("broken", vec![ObjectId::generate()]).await;
        let (service, _) = service_with(
            catalog.clone(),
            ExpansionSettings {
                cancel_on_failure: true,
                ..ExpansionSettings::default()
            },
        );

        let err = service.expanded_recipes().await.unwrap_err();
        assert!(matches!(err, CatalogError::DanglingReference { .. }));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(catalog.completed_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_expiry_fails_without_caching() {
        let slow = ObjectId::generate();
        let mut catalog = MemoryCatalog::default();
        catalog.delays.insert(slow, Duration::from_secs(5));
        let catalog = Arc::new(catalog);
        catalog.add_recipe("forever", vec![slow]).await;
        let (service, caches) = service_with(
            catalog,
            ExpansionSettings {
                deadline: Duration::from_millis(30),
                cancel_on_failure: false,
            },
        );

        let err = service.expanded_recipes().await.unwrap_err();

        assert!(matches!(err, CatalogError::DeadlineExceeded(_)));
        assert!(caches.recipes.load(ALL_RECIPES_KEY).is_none());
    }

    #[tokio::test]
    async fn result_computed_across_an_invalidation_is_not_cached() {
        let slow = ObjectId::generate();
        let mut catalog = MemoryCatalog::default();
        catalog.delays.insert(slow, Duration::from_millis(100));
        let catalog = Arc::new(catalog);
        catalog.ingredients.lock().await.insert(
            slow,
            Ingredient {
                id: slow,
                name: "vanilla".into(),
                calories_per_gram: 3,
            },
        );
        catalog.add_recipe("custard", vec![slow]).await;
        let (service, caches) = service(catalog);

        let running = {
            let service = service.clone();
            tokio::spawn(async move { service.expanded_recipes().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        caches.invalidate_recipes();

        let expanded = running.await.expect("join").expect("expanded");
        assert_eq!(expanded.len(), 1);
        assert!(caches.recipes.load(ALL_RECIPES_KEY).is_none());
    }

    #[tokio::test]
    async fn writes_invalidate_the_listing() {
        let catalog = Arc::new(MemoryCatalog::default());
        let flour = catalog.add_ingredient("flour").await;
        let (service, caches) = service(catalog.clone());
        service.expanded_recipes().await.expect("warm");

        let ids = service
            .create_recipes(vec![CreateRecipeCommand {
                name: "bread".into(),
                ingredient_ids: vec![flour.to_hex()],
            }])
            .await
            .expect("insert");
        assert!(caches.recipes.load(ALL_RECIPES_KEY).is_none());
        assert_eq!(service.expanded_recipes().await.expect("listing").len(), 1);

        service.delete_recipe(&ids[0].to_hex()).await.expect("delete");
        assert!(caches.recipes.load(ALL_RECIPES_KEY).is_none());
        assert!(service.expanded_recipes().await.expect("listing").is_empty());
    }

    #[tokio::test]
    async fn malformed_reference_is_rejected_before_any_write() {
        let catalog = Arc::new(MemoryCatalog::default());
        let (service, _) = service(catalog.clone());

        let err = service
            .create_recipes(vec![CreateRecipeCommand {
                name: "soup".into(),
                ingredient_ids: vec![ObjectId::generate().to_hex(), "carrot".into()],
            }])
            .await
            .unwrap_err();

        match err {
            CatalogError::InvalidReference { position, .. } => assert_eq!(position, 1),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(catalog.recipes.lock().await.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unknown_recipe_is_not_found() {
        let (service, _) = service(Arc::new(MemoryCatalog::default()));
        let err = service
            .delete_recipe(&ObjectId::generate().to_hex())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }
}
