use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub created_at: String,
}

// --- Pantry ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryIngredient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub amount: Option<i64>,
    pub unit: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub amount: Option<i64>,
    pub unit: Option<String>,
}

/// Partial update. The outer `Option` on `amount`/`unit` means "field present";
/// the inner one distinguishes an explicit `null` from a value.
#[derive(Debug, Clone, Default)]
pub struct UpdateIngredient {
    pub name: Option<String>,
    pub amount: Option<Option<i64>>,
    pub unit: Option<Option<String>>,
}

impl UpdateIngredient {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.amount.is_none() && self.unit.is_none()
    }
}

// --- Preferences ---

/// The three per-user toggle lists. They share a row shape and differ only in
/// the table and key column they live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKind {
    Diet,
    Avoid,
    Cuisine,
}

impl PreferenceKind {
    pub const ALL: [PreferenceKind; 3] = [Self::Diet, Self::Avoid, Self::Cuisine];

    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Diet => "dietary_preferences",
            Self::Avoid => "avoid_ingredients",
            Self::Cuisine => "cuisine_preferences",
        }
    }

    pub(crate) fn key_column(self) -> &'static str {
        match self {
            Self::Diet => "preference",
            Self::Avoid => "ingredient",
            Self::Cuisine => "cuisine",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceToggle {
    pub id: i64,
    pub user_id: i64,
    pub key: String,
    pub active: bool,
}

/// Wire shape of one toggle in the preferences document. `id` is the stored
/// key; `name` is only for display and ignored on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub id: String,
    pub name: String,
    pub active: bool,
}

impl From<&PreferenceToggle> for PreferenceEntry {
    fn from(toggle: &PreferenceToggle) -> Self {
        Self {
            id: toggle.key.clone(),
            name: format_preference_name(&toggle.key),
            active: toggle.active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct RecipeSettings {
    pub exclude_ingredients: bool,
    pub prioritize_healthy: bool,
    pub show_nutrition_info: bool,
    pub prefer_quick_recipes: bool,
    pub include_wine_pairings: bool,
}

impl Default for RecipeSettings {
    fn default() -> Self {
        Self {
            exclude_ingredients: true,
            prioritize_healthy: true,
            show_nutrition_info: true,
            prefer_quick_recipes: false,
            include_wine_pairings: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub diets: Vec<PreferenceEntry>,
    pub avoid_ingredients: Vec<PreferenceEntry>,
    pub cuisine_preferences: Vec<PreferenceEntry>,
    pub settings: RecipeSettings,
}

impl UserPreferences {
    #[must_use]
    pub fn entries(&self, kind: PreferenceKind) -> &[PreferenceEntry] {
        match kind {
            PreferenceKind::Diet => &self.diets,
            PreferenceKind::Avoid => &self.avoid_ingredients,
            PreferenceKind::Cuisine => &self.cuisine_preferences,
        }
    }
}

/// "gluten-free" -> "Gluten Free"
#[must_use]
pub fn format_preference_name(key: &str) -> String {
    key.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// --- Saved recipes ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    pub id: i64,
    pub user_id: i64,
    pub recipe_id: String,
    pub title: String,
    pub image: Option<String>,
    pub saved_at: String,
}

#[derive(Debug, Clone)]
pub struct NewSavedRecipe {
    pub recipe_id: String,
    pub title: String,
    pub image: Option<String>,
}

// --- Recommendation types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn from_minutes(ready_in_minutes: u32) -> Self {
        if ready_in_minutes <= 20 {
            Self::Easy
        } else if ready_in_minutes <= 40 {
            Self::Medium
        } else {
            Self::Hard
        }
    }

    #[must_use]
    pub fn score(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Match,
    Time,
    Difficulty,
    Rating,
}

impl SortKey {
    /// Unknown values fall back to `Match`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "time" => Self::Time,
            "difficulty" => Self::Difficulty,
            "rating" => Self::Rating,
            _ => Self::Match,
        }
    }
}

/// Caller-supplied overrides for a recommendation request.
#[derive(Debug, Clone)]
pub struct RecipeFilters {
    pub sort: SortKey,
    pub diet: Option<String>,
    pub cuisine: Option<String>,
    pub query: Option<String>,
    pub limit: usize,
    /// Accepted and validated, but not applied when slicing.
    pub offset: usize,
}

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

impl Default for RecipeFilters {
    fn default() -> Self {
        Self {
            sort: SortKey::Match,
            diet: None,
            cuisine: None,
            query: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    pub image: String,
    pub ready_in_minutes: u32,
    pub servings: u32,
    pub summary: String,
    pub diets: Vec<String>,
    pub difficulty: Difficulty,
    pub missing_ingredients: u32,
    pub rating: f64,
    pub is_saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipePage {
    pub recipes: Vec<RecipeSummary>,
    pub total: usize,
}

// --- Validation ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "name must not be empty"));
    }
}

fn check_amount(amount: Option<i64>, errors: &mut Vec<FieldError>) {
    if amount.is_some_and(|a| a < 0) {
        errors.push(FieldError::new("amount", "amount must not be negative"));
    }
}

pub fn validate_new_ingredient(ingredient: &NewIngredient) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    check_name(&ingredient.name, &mut errors);
    check_amount(ingredient.amount, &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_ingredient_update(update: &UpdateIngredient) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if update.is_empty() {
        errors.push(FieldError::new("body", "at least one field must be provided"));
    }
    if let Some(name) = &update.name {
        check_name(name, &mut errors);
    }
    check_amount(update.amount.flatten(), &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_preferences(prefs: &UserPreferences) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    for (field, entries) in [
        ("diets", &prefs.diets),
        ("avoidIngredients", &prefs.avoid_ingredients),
        ("cuisinePreferences", &prefs.cuisine_preferences),
    ] {
        for (i, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("{field}[{i}].id"),
                    "id must not be empty",
                ));
            }
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Remote recipe ids are numeric; anything else never reaches the remote URL.
pub fn parse_recipe_id(raw: &str) -> Result<i64, FieldError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| FieldError::new("id", format!("invalid recipe id '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_preference_name() {
        assert_eq!(format_preference_name("gluten-free"), "Gluten Free");
        assert_eq!(format_preference_name("vegan"), "Vegan");
        assert_eq!(format_preference_name("lacto-ovo-vegetarian"), "Lacto Ovo Vegetarian");
        assert_eq!(format_preference_name(""), "");
    }

    #[test]
    fn test_difficulty_boundaries() {
        assert_eq!(Difficulty::from_minutes(0), Difficulty::Easy);
        assert_eq!(Difficulty::from_minutes(20), Difficulty::Easy);
        assert_eq!(Difficulty::from_minutes(21), Difficulty::Medium);
        assert_eq!(Difficulty::from_minutes(40), Difficulty::Medium);
        assert_eq!(Difficulty::from_minutes(41), Difficulty::Hard);
    }

    #[test]
    fn test_difficulty_serializes_as_label() {
        let json = serde_json::to_string(&Difficulty::Medium).unwrap();
        assert_eq!(json, "\"Medium\"");
        assert_eq!(Difficulty::Hard.to_string(), "Hard");
        assert!(Difficulty::Easy.score() < Difficulty::Hard.score());
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("time"), SortKey::Time);
        assert_eq!(SortKey::parse("Rating"), SortKey::Rating);
        assert_eq!(SortKey::parse("difficulty"), SortKey::Difficulty);
        assert_eq!(SortKey::parse("match"), SortKey::Match);
        assert_eq!(SortKey::parse("bogus"), SortKey::Match);
    }

    #[test]
    fn test_validate_new_ingredient() {
        let ok = NewIngredient {
            name: "Eggs".to_string(),
            amount: Some(6),
            unit: None,
        };
        assert!(validate_new_ingredient(&ok).is_ok());

        let bad = NewIngredient {
            name: "  ".to_string(),
            amount: Some(-1),
            unit: None,
        };
        let errors = validate_new_ingredient(&bad).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "amount"]);
    }

    #[test]
    fn test_validate_ingredient_update_requires_a_field() {
        let errors = validate_ingredient_update(&UpdateIngredient::default()).unwrap_err();
        assert_eq!(errors[0].field, "body");

        let clear_amount = UpdateIngredient {
            amount: Some(None),
            ..Default::default()
        };
        assert!(validate_ingredient_update(&clear_amount).is_ok());
    }

    #[test]
    fn test_validate_preferences_flags_empty_ids() {
        let prefs = UserPreferences {
            diets: vec![PreferenceEntry {
                id: String::new(),
                name: "Nothing".to_string(),
                active: true,
            }],
            avoid_ingredients: vec![],
            cuisine_preferences: vec![],
            settings: RecipeSettings::default(),
        };
        let errors = validate_preferences(&prefs).unwrap_err();
        assert_eq!(errors[0].field, "diets[0].id");
    }

    #[test]
    fn test_parse_recipe_id() {
        assert_eq!(parse_recipe_id("716429").unwrap(), 716_429);
        assert!(parse_recipe_id("abc").is_err());
        assert!(parse_recipe_id("../secret").is_err());
        assert!(parse_recipe_id("0").is_err());
        assert!(parse_recipe_id("-4").is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let s = RecipeSettings::default();
        assert!(s.exclude_ingredients);
        assert!(s.prioritize_healthy);
        assert!(s.show_nutrition_info);
        assert!(!s.prefer_quick_recipes);
        assert!(!s.include_wine_pairings);
    }
}
