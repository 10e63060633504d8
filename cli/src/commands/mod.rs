mod helpers;
mod pantry;
mod recipes;
mod user;

use anyhow::Result;

use larder_core::models::User;
use larder_core::service::LarderService;

pub(crate) use pantry::{cmd_pantry_add, cmd_pantry_list, cmd_pantry_remove};
pub(crate) use recipes::{cmd_recipes_saved, cmd_recipes_suggest};
pub(crate) use user::{cmd_user_create, cmd_user_list};

/// Username used by `--no-auth` serving and by commands run without `--user`.
pub(crate) const LOCAL_USER: &str = "local";

/// Look up the acting user. The local user is created on first use; any
/// other name must already exist.
pub(super) fn resolve_user(service: &LarderService, username: &str) -> Result<User> {
    if username == LOCAL_USER {
        Ok(service.ensure_user(LOCAL_USER)?)
    } else {
        Ok(service.find_user(username)?)
    }
}
