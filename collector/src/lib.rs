//! Hardware Sentry OpenTelemetry Collector distribution: the fixed set of
//! component factories and the build identity stamped into the binary.

mod builtin;

use collector_core::build_info::stamped_version;
use collector_core::{BuildDescriptor, ComponentKind, Factories, Factory, Stability};

pub const NAME: &str = "hws-otel-collector";
pub const DESCRIPTION: &str = "Hardware Sentry OpenTelemetry Collector distribution";

pub fn build_info() -> BuildDescriptor {
  BuildDescriptor::new(
    NAME,
    DESCRIPTION,
    stamped_version(
      env!("CARGO_PKG_VERSION"),
      option_env!("HWS_BUILD_NUMBER"),
      option_env!("HWS_BUILD_TIMESTAMP"),
    ),
  )
}

/// Every factory compiled into this distribution.
pub fn components() -> anyhow::Result<Factories> {
  Factories::builder()
    .register(Factory::new(
      ComponentKind::Receiver,
      builtin::heartbeat::TYPE_NAME,
      Stability::Beta,
      builtin::heartbeat::create,
    ))
    .register(Factory::new(
      ComponentKind::Processor,
      builtin::batch::TYPE_NAME,
      Stability::Beta,
      builtin::batch::create,
    ))
    .register(Factory::new(
      ComponentKind::Exporter,
      builtin::logging::TYPE_NAME,
      Stability::Development,
      builtin::logging::create,
    ))
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use collector_core::config::Config;

  #[test]
  fn registry_covers_the_default_config() {
    let factories = components().unwrap();
    let cfg = Config::default();
    for kind in [
      ComponentKind::Receiver,
      ComponentKind::Processor,
      ComponentKind::Exporter,
    ] {
      for component in cfg.components(kind) {
        assert!(
          factories.get(kind, &component.type_name).is_some(),
          "{kind} {} missing",
          component.type_name
        );
      }
    }
  }

  #[test]
  fn default_pipeline_starts_and_stops() {
    use collector_core::engine::{Collector, EngineHandle, PipelineEngine, ReadySignal};
    use collector_core::settings::RunSettings;
    use std::sync::Arc;

    let settings = RunSettings::new(build_info(), components().unwrap(), Config::default());
    let handle: Arc<dyn EngineHandle> = Arc::from(Collector.build(&settings).unwrap());

    let (ready, ready_rx) = ReadySignal::channel();
    let runner = Arc::clone(&handle);
    let worker = std::thread::spawn(move || runner.run(ready));

    ready_rx.recv().unwrap();
    handle.stop();
    worker.join().unwrap().unwrap();
  }

  #[test]
  fn build_info_uses_crate_version() {
    let info = build_info();
    assert_eq!(info.name, NAME);
    assert!(info.version.starts_with(env!("CARGO_PKG_VERSION")));
  }
}
