use super::adapter::{ServiceAdapter, StatusReporter};
use super::state::{AcceptedControls, ControlRequest, ServiceStatus, StatusReport};
use crate::engine::PipelineEngine;
use crate::error::BootstrapError;
use crate::settings::RunSettings;
use std::ffi::OsString;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use windows_service::define_windows_service;
use windows_service::service::{
  ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState,
  ServiceStatus as ScmServiceStatus, ServiceType,
};
use windows_service::service_control_handler::{
  self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::service_dispatcher;

/// Own-process services are dispatched regardless of the table name.
pub const SERVICE_NAME: &str = "hws-otel-collector";

type ServiceBody = Box<dyn FnOnce() + Send>;

// The dispatcher calls a plain fn; these carry the work in and the outcome out.
static PENDING: Mutex<Option<ServiceBody>> = Mutex::new(None);
static OUTCOME: Mutex<Option<Result<(), BootstrapError>>> = Mutex::new(None);

define_windows_service!(ffi_service_main, service_main);

pub fn run_service(
  settings: RunSettings,
  engine: Box<dyn PipelineEngine>,
) -> Result<(), BootstrapError> {
  *lock(&PENDING) = Some(Box::new(move || {
    run_service_inner(&settings, engine.as_ref(), record_outcome)
  }));

  service_dispatcher::start(SERVICE_NAME, ffi_service_main).map_err(|e| {
    BootstrapError::ServiceRegistration(
      anyhow::Error::new(e).context("start service control dispatcher"),
    )
  })?;

  lock(&OUTCOME).take().unwrap_or_else(|| {
    Err(BootstrapError::ServiceRegistration(anyhow::anyhow!(
      "service control manager never started the service"
    )))
  })
}

fn service_main(_arguments: Vec<OsString>) {
  match lock(&PENDING).take() {
    Some(body) => body(),
    None => record_outcome(Err(BootstrapError::ServiceRegistration(anyhow::anyhow!(
      "service entry point invoked twice"
    )))),
  }
}

fn record_outcome(outcome: Result<(), BootstrapError>) {
  *lock(&OUTCOME) = Some(outcome);
}

/// `record` receives the outcome before `Stopped` goes out; the dispatcher
/// may return, and the process end, right after that report.
fn run_service_inner(
  settings: &RunSettings,
  engine: &dyn PipelineEngine,
  record: fn(Result<(), BootstrapError>),
) {
  let (control_tx, control_rx) = mpsc::channel::<ControlRequest>();

  let registered = service_control_handler::register(SERVICE_NAME, move |control_event| {
    let request = match control_event {
      ServiceControl::Stop => ControlRequest::Stop,
      ServiceControl::Shutdown => ControlRequest::Shutdown,
      ServiceControl::Interrogate => ControlRequest::Interrogate,
      _ => return ServiceControlHandlerResult::NotImplemented,
    };
    match control_tx.send(request) {
      Ok(()) => ServiceControlHandlerResult::NoError,
      Err(_) => ServiceControlHandlerResult::NotImplemented,
    }
  });
  let status_handle = match registered {
    Ok(handle) => handle,
    Err(e) => {
      record(Err(BootstrapError::ServiceRegistration(
        anyhow::Error::new(e).context("register service control handler"),
      )));
      return;
    }
  };

  let adapter = Arc::new(ServiceAdapter::new(ScmReporter {
    handle: status_handle,
  }));

  let control_adapter = Arc::clone(&adapter);
  let spawned = thread::Builder::new()
    .name("service-control".into())
    .spawn(move || {
      for request in control_rx {
        control_adapter.handle_control(request);
      }
    });
  if let Err(e) = spawned {
    record(Err(BootstrapError::ServiceRegistration(
      anyhow::Error::new(e).context("spawn service control thread"),
    )));
    return;
  }

  adapter.run_recording(settings, engine, record);
}

struct ScmReporter {
  handle: ServiceStatusHandle,
}

impl StatusReporter for ScmReporter {
  fn report(&self, report: &StatusReport) -> anyhow::Result<()> {
    self.handle.set_service_status(scm_status(report))?;
    Ok(())
  }
}

fn scm_status(report: &StatusReport) -> ScmServiceStatus {
  let mut controls_accepted = ServiceControlAccept::empty();
  if report.accepted.contains(AcceptedControls::STOP) {
    controls_accepted |= ServiceControlAccept::STOP;
  }
  if report.accepted.contains(AcceptedControls::SHUTDOWN) {
    controls_accepted |= ServiceControlAccept::SHUTDOWN;
  }

  let exit_code = match report.exit_code {
    0 => ServiceExitCode::Win32(0),
    code => ServiceExitCode::ServiceSpecific(code),
  };

  ScmServiceStatus {
    service_type: ServiceType::OWN_PROCESS,
    current_state: match report.status {
      ServiceStatus::StartPending => ServiceState::StartPending,
      ServiceStatus::Running => ServiceState::Running,
      ServiceStatus::StopPending => ServiceState::StopPending,
      ServiceStatus::Stopped => ServiceState::Stopped,
    },
    controls_accepted,
    exit_code,
    checkpoint: report.checkpoint,
    wait_hint: report.wait_hint,
    process_id: None,
  }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}
