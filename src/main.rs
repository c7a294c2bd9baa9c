use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use warp::Filter;

use foodgram::api::{self, AppState};
use foodgram::config::Config;
use foodgram::fixtures::Fixtures;
use foodgram::memory::MemoryStore;
use foodgram::postgres::PgStore;
use foodgram::schema::UserRole;
use foodgram::store::Store;

/// Foodgram recipe backend.
#[derive(Parser, Debug)]
#[command(name = "foodgram", version, about = "Foodgram recipe backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default).
    Serve {
        /// Catalog file to load before serving; overrides `FIXTURES`.
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },

    /// Load ingredients and tags from a JSON file.
    LoadFixtures {
        /// Either `{"ingredients": [...], "tags": [...]}` or a bare ingredient list.
        path: PathBuf,
    },

    /// Grant the admin role, which may edit and delete any recipe.
    Promote {
        /// Email of the user to promote.
        email: String,
    },
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections)
                .await
                .context("Error building a connection pool")?;
            store.migrate().await.context("Error running migrations")?;

            log::info!("Connected to PostgreSQL");
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL is not set, data is kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Loads the catalog file, if any, so a fresh store has tags and ingredients.
async fn seed(store: &dyn Store, fixtures: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = fixtures else {
        return Ok(());
    };

    Fixtures::read(path)
        .await?
        .load(store)
        .await
        .with_context(|| format!("Error loading fixtures from {}", path.display()))?;
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let address = config.address()?;
    let store = open_store(&config).await?;
    seed(store.as_ref(), config.fixtures.as_deref()).await?;

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("Could not create media root {:?}", config.media_root))?;

    let routes = api::routes(AppState::new(store, config)).with(warp::log("foodgram::api"));

    log::info!("Listening on http://{address}");
    warp::serve(routes).run(address).await;
    Ok(())
}

async fn load_fixtures(config: Config, path: PathBuf) -> anyhow::Result<()> {
    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL must be set to load fixtures; use `serve --fixtures` without one");
    }

    let store = open_store(&config).await?;
    seed(store.as_ref(), Some(&path)).await
}

async fn promote(config: Config, email: String) -> anyhow::Result<()> {
    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL must be set to promote users");
    }

    let store = open_store(&config).await?;
    let user = store
        .find_user_by_email(&email)
        .await?
        .with_context(|| format!("No user with email {email}"))?;
    store.set_role(user.id, UserRole::Admin).await?;

    log::info!("User {} ({}) is now an admin", user.id, user.username);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if config.debug {
        log::warn!("DEBUG is enabled; do not run this configuration in production");
    }

    match cli.command.unwrap_or(Commands::Serve { fixtures: None }) {
        Commands::Serve { fixtures } => {
            if fixtures.is_some() {
                config.fixtures = fixtures;
            }
            serve(config).await
        }
        Commands::LoadFixtures { path } => load_fixtures(config, path).await,
        Commands::Promote { email } => promote(config, email).await,
    }
}
