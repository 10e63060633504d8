mod commands;
mod config;
mod server;
mod spoonacular;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;

use crate::commands::{
    LOCAL_USER, cmd_pantry_add, cmd_pantry_list, cmd_pantry_remove, cmd_recipes_saved,
    cmd_recipes_suggest, cmd_user_create, cmd_user_list,
};
use crate::config::Config;
use crate::server::AuthMode;
use crate::spoonacular::SpoonacularClient;
use larder_core::db::Database;
use larder_core::models::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use larder_core::service::LarderService;

const DEFAULT_LOG_FILTER: &str = "larder=info,larder_core=info,tower_http=info";

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "Recipe suggestions from what's in your pantry"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable token authentication; every request acts as the local user
        #[arg(long)]
        no_auth: bool,
    },
    /// Manage users and their API tokens
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage pantry ingredients
    Pantry {
        /// Act as this user
        #[arg(short, long, global = true, default_value = LOCAL_USER)]
        user: String,
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Get recipe suggestions
    Recipes {
        /// Act as this user
        #[arg(short, long, global = true, default_value = LOCAL_USER)]
        user: String,
        #[command(subcommand)]
        command: RecipeCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print its API token
    Create {
        /// Username
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Add an ingredient
    Add {
        /// Ingredient name
        name: String,
        /// Amount on hand
        #[arg(long)]
        amount: Option<i64>,
        /// Unit for the amount (e.g. "g", "cups")
        #[arg(long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List ingredients
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient by ID
    Remove {
        /// Pantry item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Suggest recipes from the pantry and preferences
    Suggest {
        /// Sort order: match, time, difficulty, rating
        #[arg(short, long)]
        sort: Option<String>,
        /// Diet filter, overrides stored preferences
        #[arg(long)]
        diet: Option<String>,
        /// Cuisine filter
        #[arg(long)]
        cuisine: Option<String>,
        /// Free-text search
        #[arg(short, long)]
        query: Option<String>,
        /// Number of recipes to show
        #[arg(short, long, default_value_t = DEFAULT_PAGE_LIMIT, value_parser = parse_limit)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved recipes
    Saved {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_limit(s: &str) -> Result<usize, String> {
    let limit: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (1..=MAX_PAGE_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(format!("must be between 1 and {MAX_PAGE_LIMIT}"))
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;
    let client = SpoonacularClient::new(&config.spoonacular_base_url, &config.spoonacular_api_key)?;
    let service = LarderService::new(db, Arc::new(client));

    match cli.command {
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            if config.using_demo_key() {
                eprintln!("Warning: SPOONACULAR_API_KEY is not set; using the demo key.");
            }
            let auth = if no_auth {
                AuthMode::SingleUser(service.ensure_user(LOCAL_USER)?)
            } else {
                AuthMode::Token
            };
            server::start_server(service, port, &bind, auth).await
        }
        Commands::User { command } => match command {
            UserCommands::Create { username, json } => cmd_user_create(&service, &username, json),
            UserCommands::List { json } => cmd_user_list(&service, json),
        },
        Commands::Pantry { user, command } => match command {
            PantryCommands::Add {
                name,
                amount,
                unit,
                json,
            } => cmd_pantry_add(&service, &user, &name, amount, unit, json),
            PantryCommands::List { json } => cmd_pantry_list(&service, &user, json),
            PantryCommands::Remove { id, json } => cmd_pantry_remove(&service, &user, id, json),
        },
        Commands::Recipes { user, command } => match command {
            RecipeCommands::Suggest {
                sort,
                diet,
                cuisine,
                query,
                limit,
                json,
            } => {
                cmd_recipes_suggest(
                    &service,
                    &user,
                    sort.as_deref(),
                    diet,
                    cuisine,
                    query,
                    limit,
                    json,
                )
                .await
            }
            RecipeCommands::Saved { json } => cmd_recipes_saved(&service, &user, json).await,
        },
    }
}
