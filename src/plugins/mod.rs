pub mod janitor;
pub mod server;

use std::sync::Arc;

use crate::{prelude::*, state::AppState};

const RESTART_DELAY: Duration = Duration::from_secs(5);

/// A long-running unit of the server, restarted whenever it stops.
#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  /// Spawns every plugin under its own supervisor and waits for them.
  pub async fn run(self, app: Arc<AppState>) {
    let supervisors: Vec<_> = self
      .plugins
      .into_iter()
      .map(|plugin| tokio::spawn(supervise(plugin, app.clone())))
      .collect();

    futures::future::join_all(supervisors).await;
  }
}

async fn supervise(plugin: Arc<dyn Plugin>, app: Arc<AppState>) {
  let name = plugin.name();
  info!("SYSTEM: Service `{name}` initialized");

  loop {
    let handle = tokio::spawn({
      let (app, plugin) = (app.clone(), plugin.clone());
      async move { plugin.start(app).await }
    });

    match handle.await {
      Ok(Ok(())) => warn!("Service `{name}` stopped unexpectedly (Ok)."),
      Ok(Err(err)) => error!("Service `{name}` crashed with error: {err:#}."),
      Err(join_err) if join_err.is_cancelled() => {
        info!("Service `{name}` shutdown.");
        break;
      }
      Err(_) => error!("Service `{name}` PANICKED!"),
    }

    time::sleep(RESTART_DELAY).await;
    info!("SYSTEM: Restarting service `{name}`...");
  }
}
