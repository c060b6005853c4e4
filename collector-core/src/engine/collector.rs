use super::{EngineHandle, PipelineEngine, ReadySignal};
use crate::build_info::BuildDescriptor;
use crate::factory::{Component, ComponentKind, ComponentSettings};
use crate::settings::RunSettings;
use anyhow::Context;
use std::sync::{mpsc, Mutex};

/// Downstream components start first so receivers never emit into a
/// component that is not running yet.
const START_ORDER: [ComponentKind; 3] = [
  ComponentKind::Exporter,
  ComponentKind::Processor,
  ComponentKind::Receiver,
];

/// The default engine: instantiates every configured component from the
/// factory registry and keeps them running until stopped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collector;

impl PipelineEngine for Collector {
  fn build(&self, settings: &RunSettings) -> anyhow::Result<Box<dyn EngineHandle>> {
    let mut slots = Vec::new();
    for kind in START_ORDER {
      for cfg in settings.config.components(kind) {
        let factory = settings
          .factories
          .get(kind, &cfg.type_name)
          .ok_or_else(|| {
            anyhow::anyhow!(
              "unknown {kind} type {:?} (is it compiled into this distribution?)",
              cfg.type_name
            )
          })?;

        let component_settings = ComponentSettings {
          id: cfg.id(),
          settings: cfg.settings.clone(),
        };
        let component = factory
          .create(&component_settings)
          .with_context(|| format!("failed to create {kind} {:?}", component_settings.id))?;

        slots.push(Slot {
          kind,
          id: component_settings.id,
          component,
        });
      }
    }

    Ok(Box::new(CollectorHandle::new(settings.build.clone(), slots)))
  }
}

struct Slot {
  kind: ComponentKind,
  id: String,
  component: Box<dyn Component>,
}

struct CollectorHandle {
  build: BuildDescriptor,
  slots: Mutex<Vec<Slot>>,
  stop_tx: Mutex<Option<mpsc::Sender<()>>>,
  stop_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl CollectorHandle {
  fn new(build: BuildDescriptor, slots: Vec<Slot>) -> Self {
    let (stop_tx, stop_rx) = mpsc::channel();
    Self {
      build,
      slots: Mutex::new(slots),
      stop_tx: Mutex::new(Some(stop_tx)),
      stop_rx: Mutex::new(Some(stop_rx)),
    }
  }
}

impl EngineHandle for CollectorHandle {
  fn run(&self, ready: ReadySignal) -> anyhow::Result<()> {
    let stop_rx = self
      .stop_rx
      .lock()
      .map_err(|_| anyhow::anyhow!("collector state poisoned"))?
      .take()
      .ok_or_else(|| anyhow::anyhow!("collector has already been run"))?;

    let mut slots = self
      .slots
      .lock()
      .map_err(|_| anyhow::anyhow!("collector state poisoned"))?;

    tracing::info!(
      name = %self.build.name,
      version = %self.build.version,
      components = slots.len(),
      "starting collector"
    );

    let failed = slots
      .iter_mut()
      .enumerate()
      .find_map(|(i, slot)| match slot.component.start() {
        Ok(()) => {
          tracing::info!(kind = %slot.kind, id = %slot.id, "component started");
          None
        }
        Err(e) => Some((i, e.context(format!("failed to start {} {:?}", slot.kind, slot.id)))),
      });

    if let Some((started, err)) = failed {
      let _ = shutdown_all(&mut slots[..started]);
      return Err(err);
    }

    tracing::info!("Everything is ready. Begin running and processing data.");
    ready.notify();

    // A disconnected channel means the handle is gone; treat it like a stop.
    let _ = stop_rx.recv();
    tracing::info!("received stop signal, shutting down");

    shutdown_all(&mut slots)?;
    tracing::info!("shutdown complete");
    Ok(())
  }

  fn stop(&self) {
    if let Ok(mut tx) = self.stop_tx.lock() {
      if let Some(tx) = tx.take() {
        let _ = tx.send(());
      }
    }
  }
}

/// Shuts components down in reverse start order. Every component gets its
/// shutdown call; the first error is returned.
fn shutdown_all(slots: &mut [Slot]) -> anyhow::Result<()> {
  let mut first_err = None;
  for slot in slots.iter_mut().rev() {
    match slot.component.shutdown() {
      Ok(()) => tracing::debug!(kind = %slot.kind, id = %slot.id, "component stopped"),
      Err(e) => {
        tracing::error!(kind = %slot.kind, id = %slot.id, error = ?e, "component shutdown failed");
        if first_err.is_none() {
          first_err = Some(e.context(format!("failed to shut down {} {:?}", slot.kind, slot.id)));
        }
      }
    }
  }
  match first_err {
    Some(e) => Err(e),
    None => Ok(()),
  }
}
