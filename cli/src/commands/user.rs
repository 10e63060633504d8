use anyhow::Result;
use serde::Serialize;

use larder_core::service::LarderService;

use super::helpers::{print_json, print_user_table};

pub(crate) fn cmd_user_create(service: &LarderService, username: &str, json: bool) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CreatedUser<'a> {
        id: i64,
        username: &'a str,
        api_token: &'a str,
    }

    let user = service.create_user(username)?;

    if json {
        print_json(&CreatedUser {
            id: user.id,
            username: &user.username,
            api_token: &user.api_token,
        })?;
    } else {
        let name = &user.username;
        let id = user.id;
        let token = &user.api_token;
        println!("Created user: {name} (id: {id})");
        println!("API token: {token}");
        println!("Include in requests: Authorization: Bearer {token}");
    }

    Ok(())
}

pub(crate) fn cmd_user_list(service: &LarderService, json: bool) -> Result<()> {
    let users = service.list_users()?;

    if json {
        return print_json(&users);
    }
    if users.is_empty() {
        eprintln!("No users yet. Create one with `larder user create <name>`");
        return Ok(());
    }
    print_user_table(&users);
    Ok(())
}
