//! The recommendation pipeline: aggregate stored preferences into a query,
//! merge the two remote result sets, rank, and slice.

use std::collections::{HashMap, HashSet};

use crate::models::{
    Difficulty, RecipeFilters, RecipePage, RecipeSettings, RecipeSummary, SortKey,
};
use crate::spoonacular::{
    CandidateRecipe, RankingMode, RecipeInformation, RecipeQuery, default_image_url,
};

pub const DEFAULT_RESULT_COUNT: u32 = 10;
const DEFAULT_READY_IN_MINUTES: u32 = 30;
const DEFAULT_SERVINGS: u32 = 4;
const DEFAULT_RATING: f64 = 4.5;

/// Everything the aggregator reads from storage for one user.
#[derive(Debug, Clone, Default)]
pub struct PreferenceSnapshot {
    pub pantry: Vec<String>,
    pub active_diets: Vec<String>,
    pub active_avoids: Vec<String>,
    pub settings: Option<RecipeSettings>,
}

fn join_non_empty(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

#[must_use]
pub fn build_query(snapshot: &PreferenceSnapshot) -> RecipeQuery {
    let settings = snapshot.settings.unwrap_or_default();
    let ranking = if settings.prioritize_healthy {
        RankingMode::MinimizeMissing
    } else {
        RankingMode::MaximizeUsed
    };
    RecipeQuery {
        ingredients: snapshot.pantry.join(","),
        diet: join_non_empty(&snapshot.active_diets),
        intolerances: join_non_empty(&snapshot.active_avoids),
        cuisine: None,
        query: None,
        number: DEFAULT_RESULT_COUNT,
        ranking,
        ignore_pantry: false,
    }
}

/// Layer request-level overrides on top of the aggregated query.
pub fn apply_filters(query: &mut RecipeQuery, filters: &RecipeFilters) {
    if let Some(diet) = filters.diet.as_deref().filter(|d| !d.is_empty()) {
        query.diet = Some(diet.to_string());
    }
    if let Some(cuisine) = filters.cuisine.as_deref().filter(|c| !c.is_empty()) {
        query.cuisine = Some(cuisine.to_string());
    }
    if let Some(q) = filters.query.as_deref().filter(|q| !q.is_empty()) {
        query.query = Some(q.to_string());
    }
    if filters.limit > 0 {
        query.number = u32::try_from(filters.limit).unwrap_or(u32::MAX);
    }
}

/// Round to one decimal by the exact binary value of `x`; exact halves go up.
fn round_to_tenth(x: f64) -> f64 {
    // Only multiples of 0.25 sit exactly on a half tenth.
    let quarters = x * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        return (x * 10.0 + 0.5).floor() / 10.0;
    }
    format!("{x:.1}").parse().unwrap_or(x)
}

/// `score / 20` to one decimal. A missing or zero score rates 4.5.
#[must_use]
pub fn rating_from_score(spoonacular_score: Option<f64>) -> f64 {
    match spoonacular_score.filter(|s| *s != 0.0) {
        Some(score) => round_to_tenth(score / 20.0),
        None => DEFAULT_RATING,
    }
}

/// Difficulty comes from the reported time. A recipe with no time at all
/// counts as hard.
#[must_use]
pub fn difficulty_for(ready_in_minutes: Option<u32>) -> Difficulty {
    ready_in_minutes.map_or(Difficulty::Hard, Difficulty::from_minutes)
}

#[must_use]
pub fn summarize(
    info: &RecipeInformation,
    missing_ingredients: u32,
    saved_ids: &HashSet<String>,
) -> RecipeSummary {
    let id = info.id.to_string();
    // Zero means "not reported" for time and servings.
    let ready_in_minutes = info
        .ready_in_minutes
        .filter(|m| *m != 0)
        .unwrap_or(DEFAULT_READY_IN_MINUTES);
    RecipeSummary {
        is_saved: saved_ids.contains(&id),
        title: info.title.clone(),
        image: info
            .image
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| default_image_url(info.id)),
        ready_in_minutes,
        servings: info
            .servings
            .filter(|n| *n != 0)
            .unwrap_or(DEFAULT_SERVINGS),
        summary: info.summary.clone().unwrap_or_default(),
        diets: info.diets.clone(),
        difficulty: difficulty_for(info.ready_in_minutes),
        missing_ingredients,
        rating: rating_from_score(info.spoonacular_score),
        id,
    }
}

/// Join bulk information records with their candidates by id. Every
/// information record yields exactly one summary, matched or not.
#[must_use]
pub fn merge(
    candidates: &[CandidateRecipe],
    infos: &[RecipeInformation],
    saved_ids: &HashSet<String>,
) -> Vec<RecipeSummary> {
    let missing_by_id: HashMap<i64, u32> = candidates
        .iter()
        .map(|c| (c.id, c.missed_ingredient_count.unwrap_or(0)))
        .collect();

    infos
        .iter()
        .map(|info| {
            let missing = missing_by_id.get(&info.id).copied().unwrap_or(0);
            summarize(info, missing, saved_ids)
        })
        .collect()
}

/// Order among equal keys is unspecified.
pub fn rank(recipes: &mut [RecipeSummary], sort: SortKey) {
    match sort {
        SortKey::Match => recipes.sort_by_key(|r| r.missing_ingredients),
        SortKey::Time => recipes.sort_by_key(|r| r.ready_in_minutes),
        SortKey::Difficulty => recipes.sort_by_key(|r| r.difficulty.score()),
        SortKey::Rating => recipes.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }
}

/// Keep the first `limit` recipes. `total` counts the full merged list.
#[must_use]
pub fn paginate(mut recipes: Vec<RecipeSummary>, limit: usize) -> RecipePage {
    let total = recipes.len();
    recipes.truncate(limit);
    RecipePage { recipes, total }
}
