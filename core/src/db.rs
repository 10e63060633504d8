use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{
    NewIngredient, NewSavedRecipe, PantryIngredient, PreferenceKind, PreferenceToggle,
    RecipeSettings, SavedRecipe, UpdateIngredient, User,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    api_token TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS pantry_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    amount INTEGER,
                    unit TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS dietary_preferences (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    preference TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    UNIQUE (user_id, preference)
                );

                CREATE TABLE IF NOT EXISTS avoid_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    ingredient TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    UNIQUE (user_id, ingredient)
                );

                CREATE TABLE IF NOT EXISTS cuisine_preferences (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    cuisine TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    UNIQUE (user_id, cuisine)
                );

                CREATE TABLE IF NOT EXISTS saved_recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    recipe_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    image TEXT,
                    saved_at TEXT NOT NULL,
                    UNIQUE (user_id, recipe_id)
                );

                CREATE TABLE IF NOT EXISTS recipe_settings (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    exclude_ingredients INTEGER NOT NULL,
                    prioritize_healthy INTEGER NOT NULL,
                    show_nutrition_info INTEGER NOT NULL,
                    prefer_quick_recipes INTEGER NOT NULL,
                    include_wine_pairings INTEGER NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_pantry_user ON pantry_ingredients(user_id);
                CREATE INDEX IF NOT EXISTS idx_saved_user ON saved_recipes(user_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            api_token: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<PantryIngredient> {
        Ok(PantryIngredient {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            amount: row.get(3)?,
            unit: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn saved_recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<SavedRecipe> {
        Ok(SavedRecipe {
            id: row.get(0)?,
            user_id: row.get(1)?,
            recipe_id: row.get(2)?,
            title: row.get(3)?,
            image: row.get(4)?,
            saved_at: row.get(5)?,
        })
    }

    // --- Users ---

    pub fn create_user(&self, username: &str, api_token: &str) -> Result<User> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO users (username, api_token, created_at) VALUES (?1, ?2, ?3)",
                params![username, api_token, now],
            )
            .with_context(|| format!("Failed to create user '{username}'"))?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, username, api_token, created_at FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .context("User not found")
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, api_token, created_at FROM users WHERE username = ?1",
                params![username],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_token(&self, api_token: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, api_token, created_at FROM users WHERE api_token = ?1",
                params![api_token],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, api_token, created_at FROM users ORDER BY username")?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // --- Pantry ---

    pub fn list_ingredients(&self, user_id: i64) -> Result<Vec<PantryIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, amount, unit, created_at
             FROM pantry_ingredients WHERE user_id = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![user_id], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn get_ingredient(&self, id: i64) -> Result<Option<PantryIngredient>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, user_id, name, amount, unit, created_at
                 FROM pantry_ingredients WHERE id = ?1",
                params![id],
                Self::ingredient_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn insert_ingredient(&self, user_id: i64, item: &NewIngredient) -> Result<PantryIngredient> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pantry_ingredients (user_id, name, amount, unit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, item.name.trim(), item.amount, item.unit, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_ingredient(id)?.context("Ingredient not found")
    }

    pub fn update_ingredient(
        &self,
        id: i64,
        update: &UpdateIngredient,
    ) -> Result<Option<PantryIngredient>> {
        if self.get_ingredient(id)?.is_none() {
            return Ok(None);
        }

        if let Some(ref name) = update.name {
            self.conn.execute(
                "UPDATE pantry_ingredients SET name = ?1 WHERE id = ?2",
                params![name.trim(), id],
            )?;
        }
        if let Some(amount) = update.amount {
            self.conn.execute(
                "UPDATE pantry_ingredients SET amount = ?1 WHERE id = ?2",
                params![amount, id],
            )?;
        }
        if let Some(ref unit) = update.unit {
            self.conn.execute(
                "UPDATE pantry_ingredients SET unit = ?1 WHERE id = ?2",
                params![unit, id],
            )?;
        }

        self.get_ingredient(id)
    }

    pub fn delete_ingredient(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pantry_ingredients WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Preference toggles ---

    pub fn list_preferences(
        &self,
        user_id: i64,
        kind: PreferenceKind,
    ) -> Result<Vec<PreferenceToggle>> {
        let sql = format!(
            "SELECT id, user_id, {col}, active FROM {table} WHERE user_id = ?1 ORDER BY id",
            col = kind.key_column(),
            table = kind.table(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let toggles = stmt
            .query_map(params![user_id], |row| {
                Ok(PreferenceToggle {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    key: row.get(2)?,
                    active: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(toggles)
    }

    pub fn active_preference_keys(&self, user_id: i64, kind: PreferenceKind) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {col} FROM {table} WHERE user_id = ?1 AND active = 1 ORDER BY id",
            col = kind.key_column(),
            table = kind.table(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Insert the key or flip its `active` flag; keys stay unique per user.
    pub fn upsert_preference(
        &self,
        user_id: i64,
        kind: PreferenceKind,
        key: &str,
        active: bool,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {table} (user_id, {col}, active) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, {col}) DO UPDATE SET active = excluded.active",
            col = kind.key_column(),
            table = kind.table(),
        );
        self.conn.execute(&sql, params![user_id, key, active])?;
        Ok(())
    }

    // --- Recipe settings ---

    pub fn get_recipe_settings(&self, user_id: i64) -> Result<Option<RecipeSettings>> {
        let settings = self
            .conn
            .query_row(
                "SELECT exclude_ingredients, prioritize_healthy, show_nutrition_info,
                        prefer_quick_recipes, include_wine_pairings
                 FROM recipe_settings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(RecipeSettings {
                        exclude_ingredients: row.get(0)?,
                        prioritize_healthy: row.get(1)?,
                        show_nutrition_info: row.get(2)?,
                        prefer_quick_recipes: row.get(3)?,
                        include_wine_pairings: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    pub fn set_recipe_settings(&self, user_id: i64, settings: &RecipeSettings) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO recipe_settings
                (user_id, exclude_ingredients, prioritize_healthy, show_nutrition_info,
                 prefer_quick_recipes, include_wine_pairings, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id,
                settings.exclude_ingredients,
                settings.prioritize_healthy,
                settings.show_nutrition_info,
                settings.prefer_quick_recipes,
                settings.include_wine_pairings,
                now,
            ],
        )?;
        Ok(())
    }

    /// Returns stored settings, persisting the defaults on first read.
    pub fn get_or_create_recipe_settings(&self, user_id: i64) -> Result<RecipeSettings> {
        if let Some(settings) = self.get_recipe_settings(user_id)? {
            return Ok(settings);
        }
        let defaults = RecipeSettings::default();
        self.set_recipe_settings(user_id, &defaults)?;
        Ok(defaults)
    }

    // --- Saved recipes ---

    pub fn list_saved_recipes(&self, user_id: i64) -> Result<Vec<SavedRecipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, recipe_id, title, image, saved_at
             FROM saved_recipes WHERE user_id = ?1 ORDER BY saved_at DESC, id DESC",
        )?;
        let saved = stmt
            .query_map(params![user_id], Self::saved_recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(saved)
    }

    pub fn get_saved_recipe(&self, user_id: i64, recipe_id: &str) -> Result<Option<SavedRecipe>> {
        let saved = self
            .conn
            .query_row(
                "SELECT id, user_id, recipe_id, title, image, saved_at
                 FROM saved_recipes WHERE user_id = ?1 AND recipe_id = ?2",
                params![user_id, recipe_id],
                Self::saved_recipe_from_row,
            )
            .optional()?;
        Ok(saved)
    }

    /// Returns `None` when the (user, recipe) pair is already saved.
    pub fn save_recipe(&self, user_id: i64, recipe: &NewSavedRecipe) -> Result<Option<SavedRecipe>> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO saved_recipes (user_id, recipe_id, title, image, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, recipe.recipe_id, recipe.title, recipe.image, now],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_saved_recipe(user_id, &recipe.recipe_id)
    }

    pub fn delete_saved_recipe(&self, user_id: i64, recipe_id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM saved_recipes WHERE user_id = ?1 AND recipe_id = ?2",
            params![user_id, recipe_id],
        )?;
        Ok(rows > 0)
    }
}
