use std::sync::Arc;

use crate::{
  plugins::Plugin, prelude::*, state::AppState, storage::ArtifactStore,
};

/// Periodically drops upload grants that expired without being used.
pub struct Janitor;

#[async_trait]
impl Plugin for Janitor {
  fn name(&self) -> &'static str {
    "janitor"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let mut interval = time::interval(Duration::from_secs(60));
    loop {
      interval.tick().await;

      let purged = app.store.purge_expired();
      if purged > 0 {
        info!("Purged {purged} expired upload grants");
      }
    }
  }
}
