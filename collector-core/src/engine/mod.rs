use crate::settings::RunSettings;
use std::sync::mpsc;

mod collector;
pub use collector::Collector;

/// Builds runnable pipeline instances from the assembled settings.
pub trait PipelineEngine: Send + Sync {
  fn build(&self, settings: &RunSettings) -> anyhow::Result<Box<dyn EngineHandle>>;
}

/// A built pipeline.
pub trait EngineHandle: Send + Sync {
  /// Blocks until the pipeline stops on its own or `stop` is called.
  /// `ready` must be notified once every component has started; returning
  /// without notifying means startup failed.
  fn run(&self, ready: ReadySignal) -> anyhow::Result<()>;

  /// Asks a running (or about to run) `run` call to return. Never blocks and
  /// may be called any number of times.
  fn stop(&self);
}

/// One-shot "pipeline is up" notification.
#[derive(Debug)]
pub struct ReadySignal {
  tx: Option<mpsc::SyncSender<()>>,
}

impl ReadySignal {
  pub fn channel() -> (Self, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (Self { tx: Some(tx) }, rx)
  }

  /// A signal nobody waits for.
  pub fn detached() -> Self {
    Self { tx: None }
  }

  pub fn notify(mut self) {
    if let Some(tx) = self.tx.take() {
      let _ = tx.try_send(());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dropping_an_unnotified_signal_disconnects_the_waiter() {
    let (ready, rx) = ReadySignal::channel();
    drop(ready);
    assert!(rx.recv().is_err());
  }

  #[test]
  fn notify_wakes_the_waiter() {
    let (ready, rx) = ReadySignal::channel();
    ready.notify();
    assert!(rx.recv().is_ok());
  }
}
