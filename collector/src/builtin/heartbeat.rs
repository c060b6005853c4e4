use collector_core::{Component, ComponentSettings};
use serde::Deserialize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

pub const TYPE_NAME: &str = "heartbeat";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeartbeatSettings {
  #[serde(default = "default_interval_seconds")]
  interval_seconds: u64,
}

fn default_interval_seconds() -> u64 {
  60
}

pub fn create(settings: &ComponentSettings) -> anyhow::Result<Box<dyn Component>> {
  let cfg: HeartbeatSettings = settings.decode()?;
  if cfg.interval_seconds == 0 {
    anyhow::bail!("{}: interval_seconds must be > 0", settings.id);
  }

  Ok(Box::new(Heartbeat {
    id: settings.id.clone(),
    interval: Duration::from_secs(cfg.interval_seconds),
    worker: None,
  }))
}

/// Emits a liveness record on a fixed interval.
struct Heartbeat {
  id: String,
  interval: Duration,
  worker: Option<(mpsc::Sender<()>, thread::JoinHandle<()>)>,
}

impl Component for Heartbeat {
  fn start(&mut self) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let id = self.id.clone();
    let interval = self.interval;

    let handle = thread::Builder::new()
      .name(format!("receiver-{id}"))
      .spawn(move || {
        let mut beats: u64 = 0;
        loop {
          match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
              beats += 1;
              tracing::info!(receiver = %id, beats, "heartbeat");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
          }
        }
      })?;

    self.worker = Some((stop_tx, handle));
    Ok(())
  }

  fn shutdown(&mut self) -> anyhow::Result<()> {
    if let Some((stop_tx, handle)) = self.worker.take() {
      let _ = stop_tx.send(());
      handle
        .join()
        .map_err(|_| anyhow::anyhow!("{} worker panicked", self.id))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings(raw: &str) -> ComponentSettings {
    ComponentSettings {
      id: "heartbeat".into(),
      settings: toml::from_str(raw).unwrap(),
    }
  }

  #[test]
  fn shutdown_joins_the_worker_promptly() {
    let mut receiver = create(&settings("interval_seconds = 3600")).unwrap();
    receiver.start().unwrap();
    receiver.shutdown().unwrap();
    // A second shutdown has nothing left to stop.
    receiver.shutdown().unwrap();
  }

  #[test]
  fn zero_interval_is_rejected() {
    let err = match create(&settings("interval_seconds = 0")) {
      Ok(_) => panic!("zero interval accepted"),
      Err(e) => e,
    };
    assert!(err.to_string().contains("interval_seconds"));
  }

  #[test]
  fn unknown_settings_are_rejected() {
    assert!(create(&settings("intervall = 5")).is_err());
  }
}
