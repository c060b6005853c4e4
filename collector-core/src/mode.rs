//! Interactive vs service-managed execution.
//!
//! The decision is taken once per process, before the pipeline engine is
//! built, and is never revisited.

use crate::error::BootstrapError;
use std::ffi::OsStr;

/// Set to anything other than `0` to skip service detection entirely, e.g.
/// when the host cannot register the process as a service.
pub const NO_SERVICE_ENV: &str = "NO_WINDOWS_SERVICE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Interactive,
  Managed,
}

/// Platform answer to "is this session attached to an interactive user".
pub trait SessionProbe {
  fn is_interactive_session(&self) -> anyhow::Result<bool>;
}

/// Used where the platform has no service manager: always interactive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOnly;

impl SessionProbe for ConsoleOnly {
  fn is_interactive_session(&self) -> anyhow::Result<bool> {
    Ok(true)
  }
}

pub fn select_mode(probe: &dyn SessionProbe) -> Result<Mode, BootstrapError> {
  let override_value = std::env::var_os(NO_SERVICE_ENV);
  select_mode_with(override_value.as_deref(), probe)
}

pub fn select_mode_with(
  override_value: Option<&OsStr>,
  probe: &dyn SessionProbe,
) -> Result<Mode, BootstrapError> {
  if let Some(value) = override_value {
    if value != "0" {
      tracing::debug!(env = NO_SERVICE_ENV, "service detection bypassed by override");
      return Ok(Mode::Interactive);
    }
  }

  let interactive = probe
    .is_interactive_session()
    .map_err(BootstrapError::ModeDetection)?;

  Ok(if interactive {
    Mode::Interactive
  } else {
    Mode::Managed
  })
}

#[cfg(windows)]
pub use self::windows_session::InteractiveTokenProbe;

#[cfg(windows)]
mod windows_session {
  use super::SessionProbe;
  use anyhow::Context;
  use windows::Win32::Foundation::{BOOL, HANDLE};
  use windows::Win32::Security::{
    AllocateAndInitializeSid, CheckTokenMembership, FreeSid, PSID, SECURITY_NT_AUTHORITY,
  };
  use windows::Win32::System::SystemServices::SECURITY_INTERACTIVE_RID;

  /// Checks whether the process token is a member of the well-known
  /// INTERACTIVE group (S-1-5-4). Processes started by the service control
  /// manager are not.
  #[derive(Debug, Clone, Copy, Default)]
  pub struct InteractiveTokenProbe;

  impl SessionProbe for InteractiveTokenProbe {
    fn is_interactive_session(&self) -> anyhow::Result<bool> {
      let mut sid = PSID::default();
      unsafe {
        AllocateAndInitializeSid(
          &SECURITY_NT_AUTHORITY,
          1,
          SECURITY_INTERACTIVE_RID as u32,
          0,
          0,
          0,
          0,
          0,
          0,
          0,
          &mut sid,
        )
      }
      .context("allocate interactive group SID")?;

      let mut is_member = BOOL::default();
      let res = unsafe { CheckTokenMembership(HANDLE::default(), sid, &mut is_member) };
      unsafe { FreeSid(sid) };
      res.context("check token membership")?;

      Ok(is_member.as_bool())
    }
  }
}

/// The probe for the platform this binary was built for.
pub fn platform_probe() -> Box<dyn SessionProbe> {
  #[cfg(windows)]
  {
    Box::new(InteractiveTokenProbe)
  }
  #[cfg(not(windows))]
  {
    Box::new(ConsoleOnly)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::ScriptedProbe;
  use std::ffi::OsString;

  #[test]
  fn override_forces_interactive_for_any_value_but_zero() {
    for value in ["1", "", "true", "00", " 0", "no"] {
      let probe = ScriptedProbe::answer(false);
      let value = OsString::from(value);
      let mode = select_mode_with(Some(&value), &probe).unwrap();
      assert_eq!(mode, Mode::Interactive, "override value {value:?}");
      assert_eq!(probe.calls(), 0, "probe consulted for {value:?}");
    }
  }

  #[test]
  fn override_wins_even_when_probe_would_fail() {
    let probe = ScriptedProbe::failing("access denied");
    let mode = select_mode_with(Some(OsStr::new("1")), &probe).unwrap();
    assert_eq!(mode, Mode::Interactive);
  }

  #[test]
  fn zero_override_defers_to_the_platform() {
    let probe = ScriptedProbe::answer(false);
    let mode = select_mode_with(Some(OsStr::new("0")), &probe).unwrap();
    assert_eq!(mode, Mode::Managed);
    assert_eq!(probe.calls(), 1);
  }

  #[test]
  fn absent_override_returns_probe_answer() {
    assert_eq!(
      select_mode_with(None, &ScriptedProbe::answer(true)).unwrap(),
      Mode::Interactive
    );
    assert_eq!(
      select_mode_with(None, &ScriptedProbe::answer(false)).unwrap(),
      Mode::Managed
    );
  }

  #[test]
  fn probe_failure_is_fatal_and_keeps_its_cause() {
    let err = select_mode_with(None, &ScriptedProbe::failing("token query failed")).unwrap_err();
    match err {
      BootstrapError::ModeDetection(cause) => {
        assert_eq!(cause.to_string(), "token query failed");
      }
      other => panic!("unexpected error kind: {other:?}"),
    }
  }

  #[test]
  fn console_only_platforms_are_always_interactive() {
    assert_eq!(select_mode_with(None, &ConsoleOnly).unwrap(), Mode::Interactive);
  }
}
