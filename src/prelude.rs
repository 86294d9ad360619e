pub use std::{sync::Arc, time::Duration};

pub use anyhow::Context;
pub use async_trait::async_trait;
pub use chrono::Utc;
pub use dashmap::DashMap;
pub use migration::MigratorTrait;
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait,
  NotSet, QueryFilter, QueryOrder, QuerySelect, Set,
};
pub use tokio::time;
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
