use anyhow::{Result, bail};

use larder_core::models::{NewIngredient, validate_new_ingredient};
use larder_core::service::LarderService;

use super::helpers::{print_json, print_pantry_table};
use super::resolve_user;

pub(crate) fn cmd_pantry_add(
    service: &LarderService,
    username: &str,
    name: &str,
    amount: Option<i64>,
    unit: Option<String>,
    json: bool,
) -> Result<()> {
    let user = resolve_user(service, username)?;
    let item = NewIngredient {
        name: name.to_string(),
        amount,
        unit,
    };
    if let Err(errors) = validate_new_ingredient(&item) {
        let details: Vec<String> = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        bail!("Invalid ingredient: {}", details.join(", "));
    }

    let item = service.add_pantry_item(user.id, &item)?;

    if json {
        print_json(&item)?;
    } else {
        let name = &item.name;
        let id = item.id;
        println!("Added to pantry: {name} (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_list(service: &LarderService, username: &str, json: bool) -> Result<()> {
    let user = resolve_user(service, username)?;
    let items = service.list_pantry(user.id)?;

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        eprintln!("Pantry is empty");
        return Ok(());
    }
    print_pantry_table(&items);
    Ok(())
}

pub(crate) fn cmd_pantry_remove(
    service: &LarderService,
    username: &str,
    id: i64,
    json: bool,
) -> Result<()> {
    let user = resolve_user(service, username)?;
    service.remove_pantry_item(user.id, id)?;

    if json {
        print_json(&serde_json::json!({ "deleted": id }))?;
    } else {
        println!("Removed pantry item {id}");
    }
    Ok(())
}
