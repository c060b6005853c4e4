use std::fmt;
use std::ops::BitOr;
use std::time::Duration;

/// How long the service manager should wait between pending reports.
pub const PENDING_WAIT_HINT: Duration = Duration::from_secs(10);

/// Service-specific exit code reported with `Stopped` after a failure.
pub const FAILURE_EXIT_CODE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
  Start,
  Stop,
  Interrogate,
  Shutdown,
}

impl ControlRequest {
  fn as_accepted(self) -> AcceptedControls {
    match self {
      ControlRequest::Stop => AcceptedControls::STOP,
      ControlRequest::Shutdown => AcceptedControls::SHUTDOWN,
      ControlRequest::Start | ControlRequest::Interrogate => AcceptedControls::NONE,
    }
  }
}

/// Set of control requests the service is currently willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptedControls(u8);

impl AcceptedControls {
  pub const NONE: Self = Self(0);
  pub const STOP: Self = Self(1);
  pub const SHUTDOWN: Self = Self(1 << 1);

  pub fn contains(self, other: Self) -> bool {
    other.0 != 0 && self.0 & other.0 == other.0
  }

  pub fn accepts(self, request: ControlRequest) -> bool {
    self.contains(request.as_accepted())
  }

  pub fn is_empty(self) -> bool {
    self.0 == 0
  }
}

impl BitOr for AcceptedControls {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
  StartPending,
  Running,
  StopPending,
  Stopped,
}

impl ServiceStatus {
  pub fn accepted_controls(self) -> AcceptedControls {
    match self {
      ServiceStatus::Running => AcceptedControls::STOP | AcceptedControls::SHUTDOWN,
      ServiceStatus::StartPending | ServiceStatus::StopPending | ServiceStatus::Stopped => {
        AcceptedControls::NONE
      }
    }
  }

  pub fn wait_hint(self) -> Duration {
    if self.is_pending() {
      PENDING_WAIT_HINT
    } else {
      Duration::ZERO
    }
  }

  pub fn is_pending(self) -> bool {
    matches!(self, ServiceStatus::StartPending | ServiceStatus::StopPending)
  }

  /// Legal forward transitions. `Stopped` is terminal.
  pub fn can_transition_to(self, next: ServiceStatus) -> bool {
    use ServiceStatus::*;
    matches!(
      (self, next),
      (StartPending, Running)
        | (StartPending, Stopped)
        | (Running, StopPending)
        | (Running, Stopped)
        | (StopPending, Stopped)
    )
  }
}

impl fmt::Display for ServiceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ServiceStatus::StartPending => "start_pending",
      ServiceStatus::Running => "running",
      ServiceStatus::StopPending => "stop_pending",
      ServiceStatus::Stopped => "stopped",
    })
  }
}

/// What gets sent to the service manager on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
  pub status: ServiceStatus,
  pub accepted: AcceptedControls,
  pub wait_hint: Duration,
  /// Progress counter for pending states; zero otherwise.
  pub checkpoint: u32,
  pub exit_code: u32,
}
