use crate::engine::{EngineHandle, PipelineEngine, ReadySignal};
use crate::error::BootstrapError;
use crate::settings::RunSettings;
use std::sync::Arc;

/// Builds the pipeline and runs it on the calling thread. `install_interrupt`
/// receives the handle so an operator interrupt can stop the run.
pub fn run_interactive(
  settings: &RunSettings,
  engine: &dyn PipelineEngine,
  install_interrupt: impl FnOnce(Arc<dyn EngineHandle>) -> anyhow::Result<()>,
) -> Result<(), BootstrapError> {
  let handle: Arc<dyn EngineHandle> = Arc::from(
    engine
      .build(settings)
      .map_err(|e| BootstrapError::EngineRuntime(e.context("failed to build pipeline")))?,
  );

  install_interrupt(Arc::clone(&handle)).map_err(|e| {
    BootstrapError::EngineRuntime(e.context("failed to install interrupt handler"))
  })?;

  handle
    .run(ReadySignal::detached())
    .map_err(BootstrapError::EngineRuntime)?;
  tracing::info!("collector stopped");
  Ok(())
}

/// Ctrl-C / console close stops the pipeline.
pub fn install_ctrlc(handle: Arc<dyn EngineHandle>) -> anyhow::Result<()> {
  ctrlc::set_handler(move || {
    tracing::info!("interrupt received, stopping collector");
    handle.stop();
  })?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{run_settings, Script, ScriptedEngine};

  #[test]
  fn interrupt_stops_the_run() {
    let engine = ScriptedEngine::new(Script::RunUntilStopped);
    // Simulates the operator interrupting right away.
    run_interactive(&run_settings(), &engine, |handle| {
      handle.stop();
      Ok(())
    })
    .unwrap();
    assert_eq!(engine.run_calls(), 1);
    assert_eq!(engine.stop_calls(), 1);
  }

  #[test]
  fn build_failure_is_an_engine_error() {
    let engine = ScriptedEngine::new(Script::FailBuild);
    let err = run_interactive(&run_settings(), &engine, |_| Ok(())).unwrap_err();
    assert!(matches!(err, BootstrapError::EngineRuntime(_)));
    assert_eq!(engine.run_calls(), 0);
  }

  #[test]
  fn engine_error_propagates() {
    let engine = ScriptedEngine::new(Script::FailBeforeReady);
    let err = run_interactive(&run_settings(), &engine, |_| Ok(())).unwrap_err();
    match err {
      BootstrapError::EngineRuntime(cause) => {
        assert_eq!(cause.to_string(), "receiver failed to bind")
      }
      other => panic!("unexpected error kind: {other:?}"),
    }
  }

  #[test]
  fn interrupt_installation_failure_aborts_before_run() {
    let engine = ScriptedEngine::new(Script::RunUntilStopped);
    let err = run_interactive(&run_settings(), &engine, |_| {
      anyhow::bail!("handler already installed")
    })
    .unwrap_err();
    assert!(matches!(err, BootstrapError::EngineRuntime(_)));
    assert_eq!(engine.run_calls(), 0);
  }
}
