use crate::{config::Config, prelude::*, storage::LocalStore, sv};

pub struct Services<'a> {
  pub updates: sv::Updates<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub store: Arc<LocalStore>,
  pub config: Config,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    migration::Migrator::up(&db, None)
      .await
      .context("Failed to run migrations")?;

    Ok(Self::with_parts(db, config))
  }

  pub fn with_parts(db: DatabaseConnection, config: Config) -> Self {
    let store = Arc::new(LocalStore::new(&config));
    Self { db, store, config }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      updates: sv::Updates::new(&self.db, self.store.as_ref(), &self.config),
    }
  }
}
