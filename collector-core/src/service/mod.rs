//! OS service-manager integration.
//!
//! `state` is the lifecycle contract as a finite-state machine, `adapter`
//! drives the pipeline engine through it. The Windows binding translates
//! Service Control Manager callbacks into [`ControlRequest`]s and
//! [`StatusReport`]s into `SetServiceStatus` calls.

mod adapter;
mod state;

#[cfg(windows)]
mod scm;

pub use adapter::{ControlOutcome, ServiceAdapter, StatusReporter};
pub use state::{
  AcceptedControls, ControlRequest, ServiceStatus, StatusReport, FAILURE_EXIT_CODE,
  PENDING_WAIT_HINT,
};

use crate::engine::PipelineEngine;
use crate::error::BootstrapError;
use crate::settings::RunSettings;

/// Hands the process over to the service dispatcher. Blocks until the
/// service has reported `Stopped`.
pub fn run_managed(
  settings: RunSettings,
  engine: Box<dyn PipelineEngine>,
) -> Result<(), BootstrapError> {
  #[cfg(windows)]
  {
    scm::run_service(settings, engine)
  }
  #[cfg(not(windows))]
  {
    let _ = (settings, engine);
    Err(BootstrapError::ServiceRegistration(anyhow::anyhow!(
      "this platform has no service control manager"
    )))
  }
}
