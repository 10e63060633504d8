use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use larder_core::spoonacular::DEFAULT_BASE_URL;

const DEFAULT_API_KEY: &str = "demo-key";

pub struct Config {
    pub db_path: PathBuf,
    pub spoonacular_api_key: String,
    pub spoonacular_base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;
        Self::from_lookup(proj_dirs.data_dir(), |name| std::env::var(name).ok())
    }

    /// Resolve settings against `data_dir`, reading variables through `lookup`.
    fn from_lookup(data_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let db_path = if let Some(path) = non_empty("LARDER_DB_PATH") {
            PathBuf::from(path)
        } else {
            std::fs::create_dir_all(data_dir).with_context(|| {
                format!("Failed to create data directory: {}", data_dir.display())
            })?;
            data_dir.join("larder.db")
        };

        let spoonacular_api_key =
            non_empty("SPOONACULAR_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.to_string());
        let spoonacular_base_url = non_empty("SPOONACULAR_BASE_URL")
            .map_or_else(|| DEFAULT_BASE_URL.to_string(), |u| u.trim_end_matches('/').to_string());

        Ok(Config {
            db_path,
            spoonacular_api_key,
            spoonacular_base_url,
        })
    }

    pub fn using_demo_key(&self) -> bool {
        self.spoonacular_api_key == DEFAULT_API_KEY
    }
}
