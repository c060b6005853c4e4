use collector_core::{Component, ComponentSettings};
use serde::Deserialize;

pub const TYPE_NAME: &str = "logging";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Verbosity {
  Basic,
  #[default]
  Normal,
  Detailed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingSettings {
  #[serde(default)]
  verbosity: Verbosity,
}

pub fn create(settings: &ComponentSettings) -> anyhow::Result<Box<dyn Component>> {
  let cfg: LoggingSettings = settings.decode()?;
  Ok(Box::new(LoggingExporter {
    id: settings.id.clone(),
    verbosity: cfg.verbosity,
  }))
}

/// Writes telemetry to the collector's own log.
struct LoggingExporter {
  id: String,
  verbosity: Verbosity,
}

impl Component for LoggingExporter {
  fn start(&mut self) -> anyhow::Result<()> {
    match self.verbosity {
      Verbosity::Basic => tracing::debug!(exporter = %self.id, "logging exporter started"),
      Verbosity::Normal | Verbosity::Detailed => {
        tracing::info!(exporter = %self.id, verbosity = ?self.verbosity, "logging exporter started")
      }
    }
    Ok(())
  }

  fn shutdown(&mut self) -> anyhow::Result<()> {
    tracing::info!(exporter = %self.id, "logging exporter stopped");
    Ok(())
  }
}
