use anyhow::Result;

use larder_core::models::{RecipeFilters, SortKey};
use larder_core::service::LarderService;

use super::helpers::{print_json, print_recipe_table};
use super::resolve_user;

#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_recipes_suggest(
    service: &LarderService,
    username: &str,
    sort: Option<&str>,
    diet: Option<String>,
    cuisine: Option<String>,
    query: Option<String>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let user = resolve_user(service, username)?;
    let filters = RecipeFilters {
        sort: sort.map_or(SortKey::Match, SortKey::parse),
        diet,
        cuisine,
        query,
        limit,
        offset: 0,
    };

    let page = service.recommend(user.id, &filters).await?;

    if json {
        return print_json(&page);
    }
    if page.recipes.is_empty() {
        eprintln!("No recipes found. Add ingredients with `larder pantry add <name>`");
        return Ok(());
    }
    print_recipe_table(&page.recipes);
    let shown = page.recipes.len();
    let total = page.total;
    println!("Showing {shown} of {total} recipes");
    Ok(())
}

pub(crate) async fn cmd_recipes_saved(
    service: &LarderService,
    username: &str,
    json: bool,
) -> Result<()> {
    let user = resolve_user(service, username)?;
    let recipes = service.saved_recipes(user.id).await?;

    if json {
        return print_json(&recipes);
    }
    if recipes.is_empty() {
        eprintln!("No saved recipes");
        return Ok(());
    }
    print_recipe_table(&recipes);
    Ok(())
}
