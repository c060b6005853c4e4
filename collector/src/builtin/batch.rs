use collector_core::{Component, ComponentSettings};
use serde::Deserialize;
use std::time::Duration;

pub const TYPE_NAME: &str = "batch";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchSettings {
  #[serde(default = "default_send_batch_size")]
  send_batch_size: u64,

  #[serde(default = "default_timeout_ms")]
  timeout_ms: u64,
}

fn default_send_batch_size() -> u64 {
  8192
}

fn default_timeout_ms() -> u64 {
  200
}

pub fn create(settings: &ComponentSettings) -> anyhow::Result<Box<dyn Component>> {
  let cfg: BatchSettings = settings.decode()?;
  if cfg.send_batch_size == 0 {
    anyhow::bail!("{}: send_batch_size must be > 0", settings.id);
  }

  Ok(Box::new(Batch {
    id: settings.id.clone(),
    send_batch_size: cfg.send_batch_size,
    timeout: Duration::from_millis(cfg.timeout_ms),
  }))
}

struct Batch {
  id: String,
  send_batch_size: u64,
  timeout: Duration,
}

impl Component for Batch {
  fn start(&mut self) -> anyhow::Result<()> {
    tracing::debug!(
      processor = %self.id,
      send_batch_size = self.send_batch_size,
      timeout_ms = self.timeout.as_millis() as u64,
      "batch processor started"
    );
    Ok(())
  }

  fn shutdown(&mut self) -> anyhow::Result<()> {
    tracing::debug!(processor = %self.id, "batch processor stopped");
    Ok(())
  }
}
