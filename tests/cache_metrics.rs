use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use tokio::sync::mpsc;

use recipebox::application::recipes::{CreateRecipeCommand, ExpansionSettings, RecipeCatalogService};
use recipebox::application::repos::{
    IngredientsRepo, NewRecipe, RecipesRepo, RecipesWriteRepo, RepoError,
};
use recipebox::cache::CatalogCaches;
use recipebox::domain::entities::{Ingredient, RecipeRecord};
use recipebox::domain::object_id::ObjectId;
use recipebox::hub::{FrameSink, FrameSource, Hub, HubConfig, HubError, InboundFrame};

struct FixedCatalog {
    ingredients: Vec<Ingredient>,
    recipes: Mutex<Vec<RecipeRecord>>,
}

#[async_trait]
impl IngredientsRepo for FixedCatalog {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, RepoError> {
        Ok(self.ingredients.clone())
    }

    async fn find_ingredient(&self, id: ObjectId) -> Result<Option<Ingredient>, RepoError> {
        Ok(self.ingredients.iter().find(|item| item.id == id).cloned())
    }
}

#[async_trait]
impl RecipesRepo for FixedCatalog {
    async fn list_recipes(&self) -> Result<Vec<RecipeRecord>, RepoError> {
        Ok(self.recipes.lock().unwrap().clone())
    }

    async fn find_recipe(&self, id: ObjectId) -> Result<Option<RecipeRecord>, RepoError> {
        let recipes = self.recipes.lock().unwrap();
        Ok(recipes.iter().find(|item| item.id == id).cloned())
    }
}

#[async_trait]
impl RecipesWriteRepo for FixedCatalog {
    async fn insert_recipes(&self, recipes: Vec<NewRecipe>) -> Result<Vec<ObjectId>, RepoError> {
        let mut stored = self.recipes.lock().unwrap();
        let mut ids = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let id = ObjectId::generate();
            stored.push(RecipeRecord {
                id,
                name: recipe.name,
                ingredient_ids: recipe.ingredient_ids,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_recipe(&self, id: ObjectId) -> Result<u64, RepoError> {
        let mut stored = self.recipes.lock().unwrap();
        let before = stored.len();
        stored.retain(|item| item.id != id);
        Ok((before - stored.len()) as u64)
    }
}

fn service(catalog: Arc<FixedCatalog>) -> RecipeCatalogService {
    RecipeCatalogService::new(
        catalog.clone(),
        catalog.clone(),
        catalog,
        Arc::new(CatalogCaches::new()),
        ExpansionSettings::default(),
    )
}

struct ScriptedSource(mpsc::Receiver<InboundFrame>);

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, HubError>> {
        self.0.recv().await.map(Ok)
    }
}

struct CollectingSink(mpsc::UnboundedSender<String>);

#[async_trait]
impl FrameSink for CollectingSink {
    async fn send_text(&mut self, text: &str) -> Result<(), HubError> {
        self.0.send(text.to_string()).map_err(HubError::transport)
    }

    async fn close(&mut self) {}
}

#[tokio::test]
async fn catalog_and_hub_emit_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("install debugging recorder");

    let salt = Ingredient {
        id: ObjectId::generate(),
        name: "salt".to_string(),
        calories_per_gram: 0,
    };
    let healthy = Arc::new(FixedCatalog {
        ingredients: vec![salt.clone()],
        recipes: Mutex::new(vec![RecipeRecord {
            id: ObjectId::generate(),
            name: "brine".to_string(),
            ingredient_ids: vec![salt.id],
        }]),
    });
    let recipes = service(healthy);
    recipes.expanded_recipes().await.expect("first listing");
    recipes.expanded_recipes().await.expect("cached listing");
    recipes
        .create_recipes(vec![CreateRecipeCommand {
            name: "salt water".to_string(),
            ingredient_ids: vec![salt.id.to_hex()],
        }])
        .await
        .expect("create recipe");

    let broken = Arc::new(FixedCatalog {
        ingredients: Vec::new(),
        recipes: Mutex::new(vec![RecipeRecord {
            id: ObjectId::generate(),
            name: "ghost".to_string(),
            ingredient_ids: vec![ObjectId::generate()],
        }]),
    });
    service(broken)
        .expanded_recipes()
        .await
        .expect_err("dangling reference");

    let (hub, workers) = Hub::new(HubConfig::default());
    tokio::spawn(workers.run());
    let (frames, frame_rx) = mpsc::channel(4);
    let (sink_tx, mut received) = mpsc::unbounded_channel();
    let connection = {
        let hub = hub.clone();
        tokio::spawn(async move {
            hub.serve_connection(
                "ana".to_string(),
                ScriptedSource(frame_rx),
                CollectingSink(sink_tx),
            )
            .await
        })
    };
    frames
        .send(InboundFrame::Text(r#"{"message":"hi","timestamp":"1"}"#.to_string()))
        .await
        .expect("connection is reading");
    tokio::time::timeout(Duration::from_secs(2), received.recv())
        .await
        .expect("relayed in time")
        .expect("sink open");
    drop(frames);
    connection
        .await
        .expect("connection task")
        .expect("clean close");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "recipebox_cache_hit_total",
        "recipebox_cache_miss_total",
        "recipebox_cache_invalidate_total",
        "recipebox_recipe_expansion_ms",
        "recipebox_recipe_expansion_failed_total",
        "recipebox_realtime_clients",
        "recipebox_realtime_messages_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
