use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::models::{
    NewIngredient, NewSavedRecipe, PantryIngredient, PreferenceEntry, PreferenceKind,
    RecipeFilters, RecipePage, RecipeSummary, SavedRecipe, UpdateIngredient, User,
    UserPreferences,
};
use crate::recommend::{self, PreferenceSnapshot};
use crate::spoonacular::{CandidateRecipe, RecipeInformation, RecipeQuery, RemoteServiceError};

/// The remote recipe service.
///
/// The CLI implements this with reqwest; tests use in-process fakes.
#[async_trait]
pub trait RecipeProvider: Send + Sync {
    async fn find_by_ingredients(
        &self,
        query: &RecipeQuery,
    ) -> Result<Vec<CandidateRecipe>, RemoteServiceError>;

    async fn information_bulk(
        &self,
        ids: &[i64],
    ) -> Result<Vec<RecipeInformation>, RemoteServiceError>;

    /// `Ok(None)` when the service has no recipe with this id.
    async fn information(&self, id: i64) -> Result<Option<RecipeInformation>, RemoteServiceError>;
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Recipe detail as returned to clients: the remote record plus `isSaved`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetailView {
    #[serde(flatten)]
    pub recipe: RecipeInformation,
    pub is_saved: bool,
}

pub struct LarderService {
    db: Mutex<Database>,
    provider: Arc<dyn RecipeProvider>,
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc: String, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

impl LarderService {
    pub fn new(db: Database, provider: Arc<dyn RecipeProvider>) -> Self {
        Self {
            db: Mutex::new(db),
            provider,
        }
    }

    // The guard must never live across an `.await`.
    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Users ---

    pub fn create_user(&self, username: &str) -> ServiceResult<User> {
        let username = username.trim();
        let db = self.db();
        if db.get_user_by_username(username)?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "User '{username}' already exists"
            )));
        }
        let user = db.create_user(username, &generate_token())?;
        info!(user_id = user.id, username = %user.username, "created user");
        Ok(user)
    }

    pub fn ensure_user(&self, username: &str) -> ServiceResult<User> {
        let existing = self.db().get_user_by_username(username)?;
        match existing {
            Some(user) => Ok(user),
            None => self.create_user(username),
        }
    }

    pub fn find_user(&self, username: &str) -> ServiceResult<User> {
        self.db()
            .get_user_by_username(username)?
            .ok_or_else(|| ServiceError::NotFound(format!("User '{username}' not found")))
    }

    pub fn get_user(&self, id: i64) -> ServiceResult<User> {
        Ok(self.db().get_user(id)?)
    }

    pub fn authenticate(&self, api_token: &str) -> ServiceResult<Option<User>> {
        Ok(self.db().get_user_by_token(api_token)?)
    }

    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.db().list_users()?)
    }

    // --- Pantry ---

    pub fn list_pantry(&self, user_id: i64) -> ServiceResult<Vec<PantryIngredient>> {
        Ok(self.db().list_ingredients(user_id)?)
    }

    pub fn add_pantry_item(
        &self,
        user_id: i64,
        item: &NewIngredient,
    ) -> ServiceResult<PantryIngredient> {
        Ok(self.db().insert_ingredient(user_id, item)?)
    }

    fn owned_ingredient(
        db: &Database,
        user_id: i64,
        id: i64,
        action: &str,
    ) -> ServiceResult<PantryIngredient> {
        let item = db
            .get_ingredient(id)?
            .ok_or_else(|| ServiceError::NotFound("Ingredient not found".to_string()))?;
        if item.user_id != user_id {
            warn!(user_id, ingredient_id = id, "pantry ownership check failed");
            return Err(ServiceError::Forbidden(format!(
                "You don't have permission to {action} this ingredient"
            )));
        }
        Ok(item)
    }

    pub fn update_pantry_item(
        &self,
        user_id: i64,
        id: i64,
        update: &UpdateIngredient,
    ) -> ServiceResult<PantryIngredient> {
        let db = self.db();
        Self::owned_ingredient(&db, user_id, id, "update")?;
        db.update_ingredient(id, update)?
            .ok_or_else(|| ServiceError::NotFound("Ingredient not found".to_string()))
    }

    pub fn remove_pantry_item(&self, user_id: i64, id: i64) -> ServiceResult<()> {
        let db = self.db();
        Self::owned_ingredient(&db, user_id, id, "delete")?;
        if db.delete_ingredient(id)? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Ingredient not found".to_string()))
        }
    }

    // --- Preferences ---

    pub fn get_preferences(&self, user_id: i64) -> ServiceResult<UserPreferences> {
        let db = self.db();
        let entries = |kind| -> Result<Vec<PreferenceEntry>> {
            Ok(db
                .list_preferences(user_id, kind)?
                .iter()
                .map(PreferenceEntry::from)
                .collect())
        };
        Ok(UserPreferences {
            diets: entries(PreferenceKind::Diet)?,
            avoid_ingredients: entries(PreferenceKind::Avoid)?,
            cuisine_preferences: entries(PreferenceKind::Cuisine)?,
            settings: db.get_or_create_recipe_settings(user_id)?,
        })
    }

    /// Upserts every listed key. Keys not mentioned keep their stored state.
    pub fn update_preferences(&self, user_id: i64, prefs: &UserPreferences) -> ServiceResult<()> {
        let db = self.db();
        for kind in PreferenceKind::ALL {
            for entry in prefs.entries(kind) {
                db.upsert_preference(user_id, kind, entry.id.trim(), entry.active)?;
            }
        }
        db.set_recipe_settings(user_id, &prefs.settings)?;
        info!(user_id, "updated preferences");
        Ok(())
    }

    fn preference_snapshot(&self, user_id: i64) -> Result<PreferenceSnapshot> {
        let db = self.db();
        Ok(PreferenceSnapshot {
            pantry: db
                .list_ingredients(user_id)?
                .into_iter()
                .map(|i| i.name)
                .collect(),
            active_diets: db.active_preference_keys(user_id, PreferenceKind::Diet)?,
            active_avoids: db.active_preference_keys(user_id, PreferenceKind::Avoid)?,
            settings: db.get_recipe_settings(user_id)?,
        })
    }

    fn saved_id_set(&self, user_id: i64) -> Result<HashSet<String>> {
        Ok(self
            .db()
            .list_saved_recipes(user_id)?
            .into_iter()
            .map(|s| s.recipe_id)
            .collect())
    }

    // --- Recommendations ---

    /// Candidate ids from the ingredient search feed the bulk information
    /// call, so the two remote calls run in order.
    pub async fn recommend(
        &self,
        user_id: i64,
        filters: &RecipeFilters,
    ) -> ServiceResult<RecipePage> {
        let snapshot = self.preference_snapshot(user_id)?;
        let mut query = recommend::build_query(&snapshot);
        recommend::apply_filters(&mut query, filters);
        let saved_ids = self.saved_id_set(user_id)?;

        debug!(user_id, ingredients = %query.ingredients, "searching recipes by ingredients");
        let candidates = self.provider.find_by_ingredients(&query).await?;
        if candidates.is_empty() {
            return Ok(RecipePage {
                recipes: Vec::new(),
                total: 0,
            });
        }

        let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
        let infos = self.provider.information_bulk(&ids).await?;

        let mut recipes = recommend::merge(&candidates, &infos, &saved_ids);
        recommend::rank(&mut recipes, filters.sort);
        let page = recommend::paginate(recipes, filters.limit);
        info!(
            user_id,
            candidates = candidates.len(),
            total = page.total,
            returned = page.recipes.len(),
            "recommended recipes"
        );
        Ok(page)
    }

    pub async fn recipe_detail(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> ServiceResult<RecipeDetailView> {
        let is_saved = self
            .db()
            .get_saved_recipe(user_id, &recipe_id.to_string())?
            .is_some();
        let recipe = self
            .provider
            .information(recipe_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Recipe not found".to_string()))?;
        Ok(RecipeDetailView { recipe, is_saved })
    }

    pub async fn save_recipe(&self, user_id: i64, recipe_id: i64) -> ServiceResult<SavedRecipe> {
        let key = recipe_id.to_string();
        let already_saved = self.db().get_saved_recipe(user_id, &key)?.is_some();
        if already_saved {
            return Err(ServiceError::Conflict("Recipe already saved".to_string()));
        }

        let recipe = self
            .provider
            .information(recipe_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Recipe not found".to_string()))?;

        let new = NewSavedRecipe {
            recipe_id: key,
            title: recipe.title,
            image: recipe.image,
        };
        // A concurrent save of the same id can land between the check and here.
        let saved = self
            .db()
            .save_recipe(user_id, &new)?
            .ok_or_else(|| ServiceError::Conflict("Recipe already saved".to_string()))?;
        info!(user_id, recipe_id = %saved.recipe_id, "saved recipe");
        Ok(saved)
    }

    pub async fn saved_recipes(&self, user_id: i64) -> ServiceResult<Vec<RecipeSummary>> {
        let saved = self.db().list_saved_recipes(user_id)?;
        if saved.is_empty() {
            return Ok(Vec::new());
        }

        let saved_ids: HashSet<String> = saved.iter().map(|s| s.recipe_id.clone()).collect();
        let ids: Vec<i64> = saved
            .iter()
            .filter_map(|s| s.recipe_id.parse().ok())
            .collect();
        let infos = self.provider.information_bulk(&ids).await?;
        Ok(recommend::merge(&[], &infos, &saved_ids))
    }

    pub fn unsave_recipe(&self, user_id: i64, recipe_id: &str) -> ServiceResult<()> {
        if self.db().delete_saved_recipe(user_id, recipe_id)? {
            info!(user_id, recipe_id, "removed saved recipe");
            Ok(())
        } else {
            Err(ServiceError::NotFound("Saved recipe not found".to_string()))
        }
    }
}
