use super::state::{ControlRequest, ServiceStatus, StatusReport, FAILURE_EXIT_CODE};
use crate::engine::{EngineHandle, PipelineEngine, ReadySignal};
use crate::error::BootstrapError;
use crate::settings::RunSettings;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

/// Delivers status reports to the OS service manager.
pub trait StatusReporter: Send + Sync {
  fn report(&self, report: &StatusReport) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
  /// The request was valid for the current status and acted upon.
  Accepted,
  /// The request is not in the accepted-controls set; nothing happened.
  Rejected,
  /// Interrogate: the current status was reported again.
  Reported,
}

struct Inner {
  status: ServiceStatus,
  checkpoint: u32,
  exit_code: u32,
  /// Present only while `Running`; taken when the stop signal is sent.
  engine: Option<Arc<dyn EngineHandle>>,
}

/// Drives the pipeline engine according to the service manager's lifecycle
/// contract. Every transition happens under one lock together with its
/// report, so the manager never observes two transitions interleaved.
pub struct ServiceAdapter<R> {
  reporter: R,
  inner: Mutex<Inner>,
}

impl<R: StatusReporter> ServiceAdapter<R> {
  pub fn new(reporter: R) -> Self {
    Self {
      reporter,
      inner: Mutex::new(Inner {
        status: ServiceStatus::StartPending,
        checkpoint: 1,
        exit_code: 0,
        engine: None,
      }),
    }
  }

  pub fn status(&self) -> ServiceStatus {
    self.lock().status
  }

  pub fn reporter(&self) -> &R {
    &self.reporter
  }

  /// Runs the whole service lifecycle on the calling thread and returns once
  /// `Stopped` has been reported.
  pub fn run(
    &self,
    settings: &RunSettings,
    engine: &dyn PipelineEngine,
  ) -> Result<(), BootstrapError> {
    let outcome = self.drive(settings, engine);
    self.finish(outcome.is_ok());
    outcome
  }

  /// Like [`run`](Self::run), but hands the outcome to `record` before
  /// `Stopped` is reported. The service manager may end the process as soon
  /// as it sees `Stopped`.
  pub fn run_recording(
    &self,
    settings: &RunSettings,
    engine: &dyn PipelineEngine,
    record: impl FnOnce(Result<(), BootstrapError>),
  ) {
    let outcome = self.drive(settings, engine);
    let success = outcome.is_ok();
    record(outcome);
    self.finish(success);
  }

  /// Everything up to, but not including, the final `Stopped` report.
  fn drive(
    &self,
    settings: &RunSettings,
    engine: &dyn PipelineEngine,
  ) -> Result<(), BootstrapError> {
    {
      let inner = self.lock();
      self
        .publish(&inner)
        .map_err(|e| BootstrapError::ServiceRegistration(e.context("report start pending")))?;
    }
    tracing::info!(instance_id = %settings.instance_id, "service starting");

    let handle: Arc<dyn EngineHandle> = Arc::from(
      engine
        .build(settings)
        .map_err(|e| BootstrapError::EngineRuntime(e.context("failed to build pipeline")))?,
    );

    let (ready, ready_rx) = ReadySignal::channel();
    let runner = Arc::clone(&handle);
    let worker = thread::Builder::new()
      .name("pipeline".into())
      .spawn(move || runner.run(ready))
      .map_err(|e| {
        BootstrapError::EngineRuntime(anyhow::Error::new(e).context("spawn pipeline thread"))
      })?;

    // A disconnect means run() returned before the pipeline came up.
    if ready_rx.recv().is_ok() {
      self.mark_running(handle);
    }

    worker
      .join()
      .unwrap_or_else(|_| Err(anyhow::anyhow!("pipeline thread panicked")))
      .map_err(BootstrapError::EngineRuntime)
  }

  /// Entry point for requests delivered by the service manager's callback.
  pub fn handle_control(&self, request: ControlRequest) -> ControlOutcome {
    let mut inner = self.lock();

    if request == ControlRequest::Interrogate {
      if let Err(e) = self.publish(&inner) {
        tracing::error!(error = ?e, "failed to report status on interrogate");
      }
      return ControlOutcome::Reported;
    }

    if !inner.status.accepted_controls().accepts(request) {
      tracing::debug!(request = ?request, status = %inner.status, "control request not accepted");
      return ControlOutcome::Rejected;
    }

    match request {
      ControlRequest::Stop | ControlRequest::Shutdown => {
        tracing::info!(request = ?request, "stop requested by service manager");
        self.transition(&mut inner, ServiceStatus::StopPending);
        if let Some(engine) = inner.engine.take() {
          engine.stop();
        }
        ControlOutcome::Accepted
      }
      ControlRequest::Start | ControlRequest::Interrogate => ControlOutcome::Rejected,
    }
  }

  fn mark_running(&self, handle: Arc<dyn EngineHandle>) {
    let mut inner = self.lock();
    if inner.status != ServiceStatus::StartPending {
      return;
    }
    inner.engine = Some(handle);
    self.transition(&mut inner, ServiceStatus::Running);
    tracing::info!("service running");
  }

  fn finish(&self, success: bool) {
    let mut inner = self.lock();
    if inner.status == ServiceStatus::Stopped {
      return;
    }
    inner.engine = None;
    inner.exit_code = if success { 0 } else { FAILURE_EXIT_CODE };
    self.transition(&mut inner, ServiceStatus::Stopped);
    tracing::info!(exit_code = inner.exit_code, "service stopped");
  }

  fn transition(&self, inner: &mut Inner, next: ServiceStatus) {
    if !inner.status.can_transition_to(next) {
      tracing::warn!(from = %inner.status, to = %next, "ignoring invalid service status transition");
      return;
    }

    inner.status = next;
    inner.checkpoint = if next.is_pending() {
      inner.checkpoint.saturating_add(1)
    } else {
      0
    };

    if let Err(e) = self.publish(inner) {
      tracing::error!(status = %next, error = ?e, "failed to report service status");
    }
  }

  fn publish(&self, inner: &Inner) -> anyhow::Result<()> {
    self.reporter.report(&StatusReport {
      status: inner.status,
      accepted: inner.status.accepted_controls(),
      wait_hint: inner.status.wait_hint(),
      checkpoint: inner.checkpoint,
      exit_code: inner.exit_code,
    })
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
