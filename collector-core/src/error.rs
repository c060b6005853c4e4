/// Fatal startup and runtime failures. None of them are retried; each one ends
/// the process with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
  #[error("failed to assemble collector settings")]
  StartupAssembly(#[source] anyhow::Error),

  #[error("failed to determine if we are running in an interactive session")]
  ModeDetection(#[source] anyhow::Error),

  #[error("failed to register with the service control manager")]
  ServiceRegistration(#[source] anyhow::Error),

  #[error("collector server run finished with error")]
  EngineRuntime(#[source] anyhow::Error),
}

impl BootstrapError {
  pub fn kind(&self) -> &'static str {
    match self {
      BootstrapError::StartupAssembly(_) => "startup_assembly",
      BootstrapError::ModeDetection(_) => "mode_detection",
      BootstrapError::ServiceRegistration(_) => "service_registration",
      BootstrapError::EngineRuntime(_) => "engine_runtime",
    }
  }
}
